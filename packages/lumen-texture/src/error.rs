//! Error handling for the texture cache and loaders

use crate::load_state::TransitionError;
use crate::types::TextureId;

/// Errors raised by texture loading and cache operations
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("Image decode failed: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Mask texture {mask_id} is not available as a pixel buffer")]
    MaskUnavailable { mask_id: TextureId },

    #[error("Texture {0} is not in the cache")]
    NotCached(TextureId),

    #[error("Texture {0} holds no pixel data")]
    NoPixelData(TextureId),

    #[error("Invalid url '{0}'")]
    InvalidUrl(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image loader channel closed")]
    LoaderClosed,
}

impl From<image::ImageError> for TextureError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => TextureError::UnsupportedFormat(e.to_string()),
            image::ImageError::IoError(e) => TextureError::Io(e),
            other => TextureError::Decode(other.to_string()),
        }
    }
}

/// Result type for texture operations
pub type TextureResult<T> = Result<T, TextureError>;
