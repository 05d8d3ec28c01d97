//! Configuration for the text model pipeline

use serde::{Deserialize, Serialize};

use crate::error::{TextError, TextResult};
use crate::types::{LayoutDirection, LineWrapMode, MatchLayoutDirection};

/// Default point size in 26.6 units (12pt)
pub const DEFAULT_POINT_SIZE: u32 = 768;

/// Number of points per one unit of point size (26.6 fixed point)
pub const POINTS_PER_UNIT: u32 = 64;

/// Configuration consumed by the model updater
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Scale applied to every point size
    pub font_size_scale: f32,
    /// Line wrap mode, hyphenation runs for `Hyphenation` and `Mixed`
    pub line_wrap_mode: LineWrapMode,
    /// Layout direction of the owning control
    pub layout_direction: LayoutDirection,
    /// Where the paragraph base direction comes from
    pub match_layout_direction: MatchLayoutDirection,
    /// Family used when no font description names one
    pub default_font_family: String,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            font_size_scale: 1.0,
            line_wrap_mode: LineWrapMode::Word,
            layout_direction: LayoutDirection::LeftToRight,
            match_layout_direction: MatchLayoutDirection::Inherit,
            default_font_family: String::from("sans"),
        }
    }
}

impl TextConfig {
    /// Parse a configuration from JSON, missing fields take their defaults
    pub fn from_json_str(json: &str) -> TextResult<Self> {
        let config: TextConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TextResult<()> {
        if !(self.font_size_scale.is_finite() && self.font_size_scale > 0.0) {
            return Err(TextError::Config(format!(
                "font_size_scale must be positive, got {}",
                self.font_size_scale
            )));
        }
        Ok(())
    }

    /// Whether the system language direction decides the paragraph direction
    #[inline]
    pub fn match_system_language_direction(&self) -> bool {
        self.match_layout_direction != MatchLayoutDirection::Contents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config = TextConfig::from_json_str(r#"{ "line_wrap_mode": "Mixed" }"#).unwrap();
        assert_eq!(config.line_wrap_mode, LineWrapMode::Mixed);
        assert_eq!(config.font_size_scale, 1.0);
        assert!(config.match_system_language_direction());
    }

    #[test]
    fn rejects_non_positive_scale() {
        let err = TextConfig::from_json_str(r#"{ "font_size_scale": 0.0 }"#).unwrap_err();
        assert!(matches!(err, TextError::Config(_)));
    }
}
