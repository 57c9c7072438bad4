//! Error types for muse-run
//!
//! Errors fall into four groups:
//! - Fatal to the run: [`Error::InvalidTrack`], [`Error::Backend`] and anything
//!   unexpected. Cleanup runs and the error reaches the caller of `Run::execute`.
//! - Scheduled termination: [`Error::ScheduledShutdown`]. Not a failure; the run
//!   turns it into an application shutdown request.
//! - Capacity: [`Error::QueueFull`], raised synchronously from `JobQueue::add`.
//! - Soft-degraded: [`Error::Commentary`]. Logged by the playback loop, which then
//!   carries on without commentary.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for muse-run
#[derive(Error, Debug)]
pub enum Error {
    /// Sequencer produced a track whose file is missing or not a regular file
    #[error("Invalid track file: {0}")]
    InvalidTrack(PathBuf),

    /// Job queue already holds its maximum number of pending jobs
    #[error("Job queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// A schedule asked for the application to shut down
    #[error("Scheduled shutdown requested")]
    ScheduledShutdown,

    /// Native playback backend failure
    #[error("Playback backend error: {0}")]
    Backend(String),

    /// Commentary subsystem failure (never fatal to a run)
    #[error("Commentary error: {0}")]
    Commentary(String),

    /// Track sequencing failure
    #[error("Sequencer error: {0}")]
    Sequencer(String),

    /// Invalid run configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors from shared code
    #[error(transparent)]
    Common(#[from] muse_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for the scheduled-shutdown signal, which is not a failure
    pub fn is_scheduled_shutdown(&self) -> bool {
        matches!(self, Error::ScheduledShutdown)
    }
}

/// Convenience Result type using muse-run Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduled_shutdown_is_distinct() {
        assert!(Error::ScheduledShutdown.is_scheduled_shutdown());
        assert!(!Error::Backend("boom".to_string()).is_scheduled_shutdown());
        assert!(!Error::InvalidTrack(PathBuf::from("/x.mp3")).is_scheduled_shutdown());
    }

    #[test]
    fn test_queue_full_message_names_capacity() {
        let err = Error::QueueFull { capacity: 50 };
        assert_eq!(err.to_string(), "Job queue full (capacity 50)");
    }

    #[test]
    fn test_common_error_converts() {
        let common = muse_common::Error::Config("bad".to_string());
        let err: Error = common.into();
        assert!(matches!(err, Error::Common(_)));
        assert_eq!(err.to_string(), "Configuration error: bad");
    }
}
