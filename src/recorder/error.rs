//! Recording errors
//!
//! Shared by the gaze log and the capture session.

use crate::capture::session::CaptureState;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during recording
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Failed to open gaze log {path:?}: {source}")]
    LogOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write gaze log: {0}")]
    LogWrite(#[source] std::io::Error),

    #[error("Gaze log is closed")]
    LogClosed,

    #[error("No supported capture resolution")]
    NoSupportedResolution,

    #[error("Failed to create video capture device")]
    DeviceCreationFailed,

    #[error("Failed to start video recording (hresult {0:#x})")]
    RecordingStartFailed(i64),

    #[error("Already recording")]
    AlreadyRecording,

    #[error("Capture step '{0}' is still outstanding")]
    StepInFlight(&'static str),

    #[error("Capture step requires state {expected}, session is {actual}")]
    InvalidState {
        expected: CaptureState,
        actual: CaptureState,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Result type for recording operations
pub type RecordingResult<T> = Result<T, RecordingError>;
