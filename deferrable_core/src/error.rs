use thiserror::Error;

/// Failures surfaced by [`crate::Deferrable::later`] and
/// [`crate::Deferrable::run_once`].
///
/// `register`'s own failure mode (invalid options) is a narrower
/// [`crate::RegistrationError`] returned directly from `register`, not
/// wrapped here; a resolution failure encountered mid-`run_once` (an item
/// referencing a callable this worker has not registered, e.g. during a
/// rolling deploy) is folded into the ordinary retry/error-queue routing
/// rather than surfaced as a distinct variant, since it is handled exactly
/// like any other callable failure.
#[derive(Debug, Error)]
pub enum EngineError<QE, EE>
where
    QE: std::error::Error + Send + Sync + 'static,
    EE: std::error::Error + Send + Sync + 'static,
{
    /// The main queue's transport failed. Per spec.md §7, this propagates
    /// rather than being retried internally.
    #[error("main queue transport error: {0}")]
    Queue(QE),
    /// The error queue's transport failed.
    #[error("error queue transport error: {0}")]
    ErrorQueue(EE),
}
