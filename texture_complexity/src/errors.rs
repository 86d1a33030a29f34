//! Texture Analysis Error Types
//!
//! Errors that can cross the public API. Degenerate pixel content never shows
//! up here: it is answered with documented default scores instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Pixel buffer holds {actual} pixels but {width}x{height} needs {expected}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to read pixels: {0}")]
    PixelRead(String),

    #[error("Codec rejected {format}: {message}")]
    Codec { format: String, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, TextureError>;
