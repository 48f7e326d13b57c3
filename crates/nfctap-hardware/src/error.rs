//! Error types for radio operations.
//!
//! These errors describe what went wrong at the radio/tag level. The engine
//! folds them into [`nfctap_core::ErrorKind`] before they reach a caller.

/// Result type alias for radio operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while talking to the radio or a presented tag.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Radio is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Operation timed out after specified duration.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Operation is not supported by the radio or the negotiated technology.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// Frame exchange with the tag failed.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Invalid data received from the radio.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Sector key was rejected.
    #[error("Authentication failed for sector {sector}")]
    AuthenticationFailed { sector: u8 },

    /// The tag left the field or no tag is active.
    #[error("Tag was lost")]
    TagLost,

    /// Tag memory is locked.
    #[error("Tag is read-only")]
    ReadOnly,

    /// Message does not fit in tag memory.
    #[error("Tag capacity exceeded: {required} bytes required, {available} available")]
    CapacityExceeded { required: usize, available: usize },

    /// A technology request is already pending on this radio.
    #[error("Radio is busy with another technology request")]
    Busy,

    /// PC/SC service error.
    #[cfg(feature = "hardware-pcsc")]
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a new authentication failure.
    pub fn authentication_failed(sector: u8) -> Self {
        Self::AuthenticationFailed { sector }
    }

    /// Create a new capacity error.
    pub fn capacity_exceeded(required: usize, available: usize) -> Self {
        Self::CapacityExceeded {
            required,
            available,
        }
    }
}
