use thiserror::Error;

/// A specialized `Result` type for device capability calls.
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Errors raised by the injected screen and mouse capabilities.
///
/// Every variant is fatal for the run that observed it.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Screen capture failed: {description}")]
    CaptureFailed { description: String },

    #[error("Mouse input failed at ({x}, {y}): {description}")]
    InputFailed { x: i32, y: i32, description: String },

    #[error("Failed to release held {button:?} button: {description}")]
    ReleaseFailed {
        button: super::types::MouseButton,
        description: String,
    },

    #[error("Failed to query cursor position: {description}")]
    CursorQueryFailed { description: String },
}

impl DeviceError {
    pub fn capture(description: impl Into<String>) -> Self {
        DeviceError::CaptureFailed {
            description: description.into(),
        }
    }

    pub fn input(x: i32, y: i32, description: impl Into<String>) -> Self {
        DeviceError::InputFailed {
            x,
            y,
            description: description.into(),
        }
    }

    /// Whether the failure happened while reading the screen rather than driving the mouse
    pub fn is_capture_failure(&self) -> bool {
        matches!(self, DeviceError::CaptureFailed { .. })
    }
}
