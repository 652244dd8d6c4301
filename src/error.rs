//! Error types for campreview operations

use thiserror::Error;

/// Result type alias using campreview's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for campreview operations
#[derive(Error, Debug)]
pub enum Error {
    /// The device reported no usable preview sizes
    #[error("Capture device reported no supported preview sizes")]
    NoSupportedSizes,

    /// A resolution with a zero dimension
    #[error("Invalid resolution: {0}")]
    InvalidResolution(String),

    /// Camera-related errors
    #[error("Camera error: {0}")]
    Camera(String),

    /// Camera device not found
    #[error("Camera device not found: {0}")]
    CameraNotFound(String),

    /// Camera exists but could not be opened
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    /// Failed to capture frame from camera
    #[error("Frame capture failed: {0}")]
    FrameCapture(String),

    /// No frame arrived within the configured frame timeout
    #[error("Timed out waiting for a frame")]
    FrameTimeout,

    /// Camera access was refused
    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

// V4L errors are converted manually in camera module

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Other(format!("JSON error: {}", e))
    }
}
