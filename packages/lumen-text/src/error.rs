//! Error handling for the text model pipeline

/// Errors raised by text model operations
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    #[error("Invalid range: start {start}, end {end}, length {length}")]
    InvalidRange {
        start: usize,
        end: usize,
        length: usize,
    },

    #[error("Font not found for family '{0}'")]
    FontNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for text model operations
pub type TextResult<T> = Result<T, TextError>;
