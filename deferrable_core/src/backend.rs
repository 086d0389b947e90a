use deferrable_queue::Queue;

/// A main/error queue pair scoped to one `group`.
///
/// `queue` is where `later` pushes and `run_once` pops; `error_queue` is
/// where items that exhaust their retries or fail fatally are routed.
pub struct Backend<Q, E> {
    /// The namespace this backend's queues are scoped to.
    pub group: String,
    /// The main queue.
    pub queue: Q,
    /// The error queue.
    pub error_queue: E,
}

impl<Q, E> Backend<Q, E>
where
    Q: Queue,
    E: Queue,
{
    /// Wraps an already-constructed queue pair under `group`.
    pub fn new(group: impl Into<String>, queue: Q, error_queue: E) -> Self {
        Self {
            group: group.into(),
            queue,
            error_queue,
        }
    }
}

/// The only place that knows how to name a group's queues.
///
/// A factory turns a bare group name into a ready-to-use [`Backend`]: base
/// name, optionally suffixed by the group and/or an environment suffix, per
/// spec.md §4.4.
pub trait BackendFactory {
    /// The concrete main-queue type this factory produces.
    type Queue: Queue;
    /// The concrete error-queue type this factory produces.
    type ErrorQueue: Queue;

    /// Builds the `{group, queue, error_queue}` triple for `group`.
    fn create_backend_for_group(&self, group: &str) -> Backend<Self::Queue, Self::ErrorQueue>;
}
