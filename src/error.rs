use image_picker::PickerError;
use std::fmt;

/// Central error types for the gallery app
#[derive(Debug)]
pub enum AppError {
    /// Filesystem error
    Filesystem(std::io::Error),
    /// Picker round-trip failed
    Picker(PickerError),
    /// Image processing error
    ImageProcessing(String),
    /// Config file could not be parsed
    Config(String),
    /// General error
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Filesystem(e) => write!(f, "Filesystem error: {}", e),
            AppError::Picker(e) => write!(f, "Picker error: {}", e),
            AppError::ImageProcessing(msg) => write!(f, "Image processing error: {}", msg),
            AppError::Config(msg) => write!(f, "Config error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}

// Conversions from other error types
impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Filesystem(e)
    }
}

impl From<PickerError> for AppError {
    fn from(e: PickerError) -> Self {
        AppError::Picker(e)
    }
}

impl From<image::ImageError> for AppError {
    fn from(e: image::ImageError) -> Self {
        AppError::ImageProcessing(e.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(e: toml::de::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

/// User-friendly error messages for UI
impl AppError {
    pub fn user_message(&self) -> String {
        match self {
            AppError::Filesystem(_) => {
                "Error accessing files. Please check app permissions.".to_string()
            }
            AppError::Picker(PickerError::Cancelled(_)) => {
                "No image was loaded. The storage may be full or the file invalid, please try again."
                    .to_string()
            }
            AppError::Picker(PickerError::PlatformNotSupported(_)) => {
                "The image picker is not available on this device.".to_string()
            }
            AppError::Picker(_) => "The image picker reported an error.".to_string(),
            AppError::ImageProcessing(_) => "Error processing image.".to_string(),
            AppError::Config(msg) => format!("Invalid settings: {}", msg),
            AppError::Other(msg) => msg.clone(),
        }
    }
}
