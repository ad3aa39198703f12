use thiserror::Error;

use crate::lifecycle::TrackerPhase;

/// Failure taxonomy for lifecycle commands.
///
/// Store-level "no record" is not an error; lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A submitted record for today already exists. Not retryable without
    /// deleting today's record first.
    #[error("a submitted session already exists for today")]
    AlreadySubmittedToday,

    /// The identity provider has no signed-in user.
    #[error("no authenticated user")]
    NotAuthenticated,

    /// Command issued from a phase its guard does not allow.
    #[error("cannot {action} while the tracker is {phase:?}")]
    InvalidTransition {
        action: &'static str,
        phase: TrackerPhase,
    },

    /// Submission below the daily target requires a justification comment of
    /// a minimum length. Recovered locally by re-prompting; no state change.
    #[error("a justification of at least {min_len} characters is required when under the daily target")]
    MissingJustification { min_len: usize },

    /// Another store write is still outstanding for this tracker.
    #[error("another store operation is still in flight")]
    OperationInFlight,

    /// A SessionStore operation failed. The lifecycle phase does not advance
    /// past the failing transition, so the caller can retry.
    #[error("persistence failure: {0}")]
    Persistence(anyhow::Error),
}

impl From<anyhow::Error> for TrackerError {
    fn from(err: anyhow::Error) -> Self {
        TrackerError::Persistence(err)
    }
}
