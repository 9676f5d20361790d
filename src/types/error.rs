use anyhow::Error;
use thiserror::Error;

/// Application-level error types for retention-cleaner.
///
/// Only conditions that stop a run (or that the caller must act on) are
/// modelled here. Per-directory walk errors and per-candidate deletion
/// failures are absorbed where they happen and surface as warnings and
/// counters instead.
///
/// ## Exit Codes
///
/// Each variant maps to an exit code (via `exit_code()`):
/// - 1: General errors (RootUnavailable)
/// - 2: Configuration errors (InvalidConfig)
/// - 3: Partial failure (warnings promoted by `--warn-as-error`)
///
/// A cancelled run is not an error: the walker and the workers stop
/// quietly and the run exits 0.
#[derive(Error, Debug, PartialEq)]
pub enum RetentionError {
    /// Retention policy or run options are unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The data root is missing, unreadable or not a directory.
    #[error("Data root unavailable: {0}")]
    RootUnavailable(String),

    /// Some candidates could not be removed.
    #[error("Partial failure: {deleted} deleted, {failed} failed")]
    PartialFailure { deleted: u64, failed: u64 },
}

impl RetentionError {
    /// Get the appropriate process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            RetentionError::InvalidConfig(_) => 2,
            RetentionError::PartialFailure { .. } => 3,
            _ => 1,
        }
    }
}

/// Extract the exit code from an anyhow::Error, defaulting to 1.
pub fn exit_code_from_error(e: &Error) -> i32 {
    if let Some(err) = e.downcast_ref::<RetentionError>() {
        return err.exit_code();
    }
    1
}
