use crate::codec::CodecError;
use crate::decode::DecodeError;

/// Errors surfaced by a picker round-trip
#[derive(Debug)]
pub enum PickerError {
    /// Rejected before submission (bounds, batch sink sizing)
    InvalidRequest(String),
    /// Callback string did not have the shape expected for the submitted mode
    Malformed(String),
    /// Empty path: user dismissed the picker or storage is full
    Cancelled(String),
    /// The selected file could not be read or decoded
    Decode(DecodeError),
    /// The facility entry point itself failed (JNI, class lookup, ...)
    Facility(String),
    PlatformNotSupported(String),
    /// The callback channel closed before the facility answered
    Disconnected(String),
}

impl std::fmt::Display for PickerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PickerError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            PickerError::Malformed(msg) => write!(f, "Malformed callback: {}", msg),
            PickerError::Cancelled(msg) => write!(f, "Cancelled: {}", msg),
            PickerError::Decode(e) => write!(f, "Decode error: {}", e),
            PickerError::Facility(msg) => write!(f, "Picker facility error: {}", msg),
            PickerError::PlatformNotSupported(msg) => write!(f, "Platform not supported: {}", msg),
            PickerError::Disconnected(msg) => write!(f, "Disconnected: {}", msg),
        }
    }
}

impl std::error::Error for PickerError {}

impl From<DecodeError> for PickerError {
    fn from(err: DecodeError) -> Self {
        PickerError::Decode(err)
    }
}

impl From<CodecError> for PickerError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::EmptyPath { .. } => PickerError::Cancelled(err.to_string()),
            CodecError::Malformed(_) => PickerError::Malformed(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for PickerError {
    fn from(err: serde_json::Error) -> Self {
        PickerError::InvalidRequest(format!("Settings serialization failed: {}", err))
    }
}
