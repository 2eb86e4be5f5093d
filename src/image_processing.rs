use crate::error::AppError;
use base64::Engine;
use std::path::Path;

/// Simple MIME type from the file extension
fn guess_mime_from_ext(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

/// Reads an image from `path` and returns it as a base64 data URL
pub fn image_path_to_data_url(path: &Path) -> Result<String, AppError> {
    let mime = guess_mime_from_ext(path);
    let data = std::fs::read(path)
        .map_err(|e| AppError::ImageProcessing(format!("Reading image failed: {}", e)))?;
    let b64 = base64::engine::general_purpose::STANDARD.encode(data);
    Ok(format!("data:{};base64,{}", mime, b64))
}
