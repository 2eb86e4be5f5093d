//! Decoding of the result strings the picker facility calls back with.
//!
//! Two shapes exist: a plain path for `selectImage`/`openFile`, and
//! `"<index>|<path>"` for the receive entry points. An empty path means the
//! facility gave up on that entry (user dismissed the UI, storage full, or an
//! unsupported file); it is reported separately from a string that does not
//! have the expected shape at all.

use std::path::PathBuf;

const INDEX_SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Well-formed callback carrying no path
    EmptyPath { index: Option<usize> },
    /// Callback did not match the expected shape
    Malformed(String),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::EmptyPath { index: Some(i) } => {
                write!(f, "SDCard full or invalid file selected (entry {})", i)
            }
            CodecError::EmptyPath { index: None } => {
                write!(f, "SDCard full or invalid file selected")
            }
            CodecError::Malformed(raw) => {
                write!(f, "Callback was not valid for the executed action: {:?}", raw)
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// One entry of an indexed receive callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedResult {
    pub index: usize,
    pub path: PathBuf,
}

/// Decodes a single-result callback: the payload is the path itself.
pub fn decode_single(raw: Option<&str>) -> Result<PathBuf, CodecError> {
    match raw {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Err(CodecError::EmptyPath { index: None }),
    }
}

/// Decodes an indexed callback of the form `"<index>|<path>"`.
pub fn decode_indexed(raw: Option<&str>) -> Result<IndexedResult, CodecError> {
    let raw = raw.unwrap_or_default();
    let parts: Vec<&str> = raw.split(INDEX_SEPARATOR).collect();
    if parts.len() != 2 {
        return Err(CodecError::Malformed(raw.to_string()));
    }

    // digits only: "-1|x" and "+1|x" are malformed rather than clamped or accepted
    if parts[0].is_empty() || !parts[0].bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::Malformed(raw.to_string()));
    }
    let index = parts[0]
        .parse::<usize>()
        .map_err(|_| CodecError::Malformed(raw.to_string()))?;

    if parts[1].is_empty() {
        return Err(CodecError::EmptyPath { index: Some(index) });
    }

    Ok(IndexedResult {
        index,
        path: PathBuf::from(parts[1]),
    })
}
