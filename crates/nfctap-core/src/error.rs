use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure categories surfaced by the tag-interaction engine.
///
/// Every lower-level failure (radio, protocol, codec) is folded into one of
/// these kinds before it reaches a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// NFC hardware is absent.
    Unsupported,
    /// NFC hardware is present but switched off by the user.
    Disabled,
    /// No compatible tag was presented within the session window.
    AcquisitionTimeout,
    /// The tag speaks a decodable technology but its content is invalid.
    MalformedPayload,
    /// The sector key handshake failed.
    AuthRequired,
    /// The text could not be encoded for writing.
    EncodingFailed,
    /// The tag refused or could not hold the encoded message.
    WriteRejected,
    /// The caller supplied nothing to write.
    EmptyInput,
}

impl ErrorKind {
    /// Stable, human-readable name of the kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unsupported => "unsupported",
            Self::Disabled => "disabled",
            Self::AcquisitionTimeout => "acquisition timeout",
            Self::MalformedPayload => "malformed payload",
            Self::AuthRequired => "authentication required",
            Self::EncodingFailed => "encoding failed",
            Self::WriteRejected => "write rejected",
            Self::EmptyInput => "empty input",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Error {
    #[error("NFC is not supported on this device")]
    Unsupported,

    #[error("NFC is disabled, enable it in the device settings")]
    Disabled,

    #[error("No tag presented: {message}")]
    AcquisitionTimeout { message: String },

    #[error("Malformed payload: {message}")]
    MalformedPayload { message: String },

    #[error("Authentication required for sector {sector}: {message}")]
    AuthRequired { sector: u8, message: String },

    #[error("Failed to encode message: {message}")]
    EncodingFailed { message: String },

    #[error("Writing to NFC tag failed: {message}")]
    WriteRejected { message: String },

    #[error("Please enter some text first")]
    EmptyInput,
}

impl Error {
    pub fn acquisition_timeout(message: impl Into<String>) -> Self {
        Self::AcquisitionTimeout {
            message: message.into(),
        }
    }

    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }

    pub fn auth_required(sector: u8, message: impl Into<String>) -> Self {
        Self::AuthRequired {
            sector,
            message: message.into(),
        }
    }

    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    pub fn write_rejected(message: impl Into<String>) -> Self {
        Self::WriteRejected {
            message: message.into(),
        }
    }

    /// The category this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unsupported => ErrorKind::Unsupported,
            Self::Disabled => ErrorKind::Disabled,
            Self::AcquisitionTimeout { .. } => ErrorKind::AcquisitionTimeout,
            Self::MalformedPayload { .. } => ErrorKind::MalformedPayload,
            Self::AuthRequired { .. } => ErrorKind::AuthRequired,
            Self::EncodingFailed { .. } => ErrorKind::EncodingFailed,
            Self::WriteRejected { .. } => ErrorKind::WriteRejected,
            Self::EmptyInput => ErrorKind::EmptyInput,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
