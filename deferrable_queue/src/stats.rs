/// Point-in-time counts reported by a [`crate::Queue`].
///
/// Any field a backend cannot know is `None` rather than a guessed zero —
/// the cloud-bus backend in particular can only report `delayed` on a
/// best-effort basis (see `SPEC_FULL.md`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Items that are queued and ready to be popped.
    pub available: Option<u64>,
    /// Items that have been popped but not yet completed.
    pub in_flight: Option<u64>,
    /// Items whose delay has not yet elapsed.
    pub delayed: Option<u64>,
}
