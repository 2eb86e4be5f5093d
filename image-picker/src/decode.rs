//! Turns a resolved file path into pixels and hands them to a sink.

use crate::models::ImageSink;
use image::{imageops::FilterType, RgbaImage};
use std::path::{Path, PathBuf};

/// Error type for the decode step
#[derive(Debug)]
pub enum DecodeError {
    Missing(PathBuf),
    IoError(std::io::Error),
    Codec(String),
    Task(String),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Missing(path) => write!(f, "File not found: {}", path.display()),
            DecodeError::IoError(e) => write!(f, "IO error: {}", e),
            DecodeError::Codec(msg) => write!(f, "Image decode error: {}", msg),
            DecodeError::Task(msg) => write!(f, "Task join error: {}", msg),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<std::io::Error> for DecodeError {
    fn from(err: std::io::Error) -> Self {
        DecodeError::IoError(err)
    }
}

impl From<image::ImageError> for DecodeError {
    fn from(err: image::ImageError) -> Self {
        DecodeError::Codec(err.to_string())
    }
}

/// Downscale bounds of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitBounds {
    pub max_width: u32,
    pub max_height: u32,
    pub best_fit: bool,
}

/// Target dimensions for an image of `width`x`height`. Never upscales.
pub fn fit_dimensions(width: u32, height: u32, bounds: FitBounds) -> (u32, u32) {
    if bounds.max_width == 0 || bounds.max_height == 0 {
        return (width, height);
    }

    if !bounds.best_fit {
        return (width.min(bounds.max_width), height.min(bounds.max_height));
    }

    let ratio = (width as f32 / bounds.max_width as f32)
        .max(height as f32 / bounds.max_height as f32);

    if ratio > 1.0 {
        let new_width = ((width as f32 / ratio) as u32).clamp(1, bounds.max_width);
        let new_height = ((height as f32 / ratio) as u32).clamp(1, bounds.max_height);
        (new_width, new_height)
    } else {
        (width, height)
    }
}

/// Decodes encoded bytes and applies the bounds
pub fn decode_bytes(bytes: &[u8], bounds: FitBounds) -> Result<RgbaImage, DecodeError> {
    let img = image::load_from_memory(bytes)?;
    let (width, height) = fit_dimensions(img.width(), img.height(), bounds);

    if (width, height) == (img.width(), img.height()) {
        Ok(img.into_rgba8())
    } else {
        log::debug!(
            "Downscaling {}x{} to {}x{}",
            img.width(),
            img.height(),
            width,
            height
        );
        Ok(img
            .resize_exact(width, height, FilterType::Lanczos3)
            .into_rgba8())
    }
}

fn read_and_decode(path: &Path, bounds: FitBounds) -> Result<RgbaImage, DecodeError> {
    if !path.exists() {
        return Err(DecodeError::Missing(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    decode_bytes(&bytes, bounds)
}

/// Reads and decodes `path` on a blocking thread.
///
/// This is the only suspension point of the pipeline.
pub async fn resolve(path: PathBuf, bounds: FitBounds) -> Result<RgbaImage, DecodeError> {
    tokio::task::spawn_blocking(move || read_and_decode(&path, bounds))
        .await
        .map_err(|e| DecodeError::Task(e.to_string()))?
}

/// Hands a decoded image to its sink
pub fn deliver(sink: &ImageSink, image: RgbaImage) {
    match sink {
        ImageSink::Texture(texture) => texture.load(image),
        ImageSink::Callback(callback) => callback(image),
    }
}

/// Resolves `path` and delivers the result to `sink`.
///
/// Failures are logged and returned; the sink is left untouched.
pub async fn resolve_into(
    path: PathBuf,
    bounds: FitBounds,
    sink: &ImageSink,
) -> Result<(u32, u32), DecodeError> {
    log::debug!("Loading picked image {}", path.display());
    match resolve(path.clone(), bounds).await {
        Ok(image) => {
            let dimensions = image.dimensions();
            deliver(sink, image);
            Ok(dimensions)
        }
        Err(e) => {
            log::error!("Failed to load {}: {}", path.display(), e);
            Err(e)
        }
    }
}
