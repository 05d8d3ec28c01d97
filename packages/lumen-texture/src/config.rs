//! Configuration for the texture manager

use serde::{Deserialize, Serialize};

use crate::error::{TextureError, TextureResult};

/// Configuration of the texture manager and its worker pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureConfig {
    /// Number of image decoding threads
    pub worker_threads: usize,
    /// Capacity of the job channel feeding the workers
    pub load_queue_capacity: usize,
    /// Width and height of the fallback texture
    pub fallback_texture_size: u32,
    /// Premultiply alpha of decoded images unless a request says otherwise
    pub premultiply_on_load: bool,
    /// Image shown instead of a texture that failed to load
    pub broken_image_url: Option<String>,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            load_queue_capacity: 256,
            fallback_texture_size: 2,
            premultiply_on_load: true,
            broken_image_url: None,
        }
    }
}

impl TextureConfig {
    /// Parse a configuration from JSON, missing fields take their defaults
    pub fn from_json_str(json: &str) -> TextureResult<Self> {
        let config: TextureConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TextureResult<()> {
        if self.worker_threads == 0 {
            return Err(TextureError::Config(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if self.load_queue_capacity == 0 {
            return Err(TextureError::Config(
                "load_queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.fallback_texture_size == 0 {
            return Err(TextureError::Config(
                "fallback_texture_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config = TextureConfig::from_json_str(r#"{ "worker_threads": 2 }"#).unwrap();
        assert_eq!(config.worker_threads, 2);
        assert_eq!(config.fallback_texture_size, 2);
        assert!(config.premultiply_on_load);
    }

    #[test]
    fn rejects_empty_pool() {
        let err = TextureConfig::from_json_str(r#"{ "worker_threads": 0 }"#).unwrap_err();
        assert!(matches!(err, TextureError::Config(_)));
    }
}
