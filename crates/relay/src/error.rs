use std::path::PathBuf;
use thiserror::Error;

/// Failure taxonomy for one relay run.
///
/// Every kind except [`RelayError::NotificationFailed`] is fatal and
/// unrecoverable: each names a precondition the pipeline cannot restore
/// at runtime. A notification failure is reported and swallowed by the
/// orchestrator so a completed relay is never hidden behind an
/// unrelated mail problem.
#[derive(Error, Debug)]
pub enum RelayError {
    /// The settings file does not exist.
    #[error("config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The settings file cannot be used: unreadable, bad syntax, or
    /// missing a key required by the requested run path.
    #[error("config error: {0}")]
    Config(String),

    /// No file under the scan root matched the suffix filter.
    #[error("no candidate file ending in {:?} under {}", .suffixes, .root.display())]
    NoCandidateFile { root: PathBuf, suffixes: Vec<String> },

    /// The extraction tool could not be started, timed out, or exited
    /// non-zero. There is nothing to relay.
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    /// The relay daemon could not be started, timed out, or exited
    /// non-zero. The message was not delivered.
    #[error("relay failed: {0}")]
    RelayFailed(String),

    /// The confirmation mail could not be sent. Non-fatal.
    #[error("notification failed: {0}")]
    NotificationFailed(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;
