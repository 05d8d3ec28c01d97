//! Character layout info and the metrics source it is measured with

use serde::{Deserialize, Serialize};

use super::Size;
use crate::fonts::FontClient;
use crate::scripts::is_new_paragraph;
use crate::types::{FontDescription, GlyphInfo};

/// Style attached to a span of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    /// Font family, empty for the font client's default
    pub font_family: String,
    /// Point size in points
    pub point_size: f32,
    pub weight: u16,
    pub italic: bool,
    pub underline: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: String::new(),
            point_size: 12.0,
            weight: 400,
            italic: false,
            underline: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyledText {
    pub text: String,
    pub style: TextStyle,
}

impl StyledText {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, TextStyle::default())
    }
}

/// Natural metrics of one character
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CharacterMetrics {
    pub advance: f32,
    /// Line height of the character's font
    pub height: f32,
    pub ascender: f32,
    pub bearing: f32,
}

pub trait LayoutMetrics {
    fn character_metrics(&self, character: char, style: &TextStyle) -> CharacterMetrics;
}

/// Same metrics for every character
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedMetrics {
    pub advance: f32,
    pub height: f32,
    pub ascender: f32,
}

impl LayoutMetrics for FixedMetrics {
    fn character_metrics(&self, _character: char, _style: &TextStyle) -> CharacterMetrics {
        CharacterMetrics {
            advance: self.advance,
            height: self.height,
            ascender: self.ascender,
            bearing: self.ascender,
        }
    }
}

/// Measures characters with the glyph metrics of a [`FontClient`]
pub struct FontClientMetrics<'a> {
    client: &'a dyn FontClient,
}

impl<'a> FontClientMetrics<'a> {
    pub fn new(client: &'a dyn FontClient) -> Self {
        Self { client }
    }
}

impl LayoutMetrics for FontClientMetrics<'_> {
    fn character_metrics(&self, character: char, style: &TextStyle) -> CharacterMetrics {
        let description = FontDescription {
            family: style.font_family.clone(),
            weight: style.weight,
            italic: style.italic,
        };
        let point_size = (style.point_size * self.client.points_per_unit() as f32) as u32;

        let font_id = match self.client.find_font(&description, point_size) {
            Ok(id) => id,
            Err(err) => {
                log::warn!("{err}, measuring with the default font");
                match self.client.find_font(&FontDescription::default(), point_size) {
                    Ok(id) => id,
                    Err(_) => return CharacterMetrics::default(),
                }
            }
        };

        let mut glyph = GlyphInfo {
            font_id,
            index: self.client.glyph_index(font_id, character),
            ..Default::default()
        };
        self.client.glyph_metrics(&mut glyph);

        CharacterMetrics {
            advance: glyph.advance,
            height: glyph.height,
            ascender: glyph.y_bearing,
            bearing: glyph.y_bearing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CharacterLayoutInfo {
    pub character: char,
    pub style: TextStyle,
    /// Natural size, the width is the advance except for new paragraph characters
    pub size: Size,
    pub advance: f32,
    pub bearing: f32,
    pub ascender: f32,
    /// Position computed by the last relayout
    pub position: (f32, f32),
    /// Alignment and justification offset of the last relayout
    pub offset: (f32, f32),
}

impl CharacterLayoutInfo {
    pub fn new(character: char, style: &TextStyle, metrics: &dyn LayoutMetrics) -> Self {
        let natural = metrics.character_metrics(character, style);
        let width = if is_new_paragraph(character) {
            0.0
        } else {
            natural.advance
        };

        Self {
            character,
            style: style.clone(),
            size: Size::new(width, natural.height),
            advance: natural.advance,
            bearing: natural.bearing,
            ascender: natural.ascender,
            position: (0.0, 0.0),
            offset: (0.0, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::BasicFontClient;

    #[test]
    fn new_paragraph_has_no_width() {
        let metrics = FixedMetrics {
            advance: 5.0,
            height: 10.0,
            ascender: 8.0,
        };
        let info = CharacterLayoutInfo::new('\n', &TextStyle::default(), &metrics);
        assert_eq!(info.size, Size::new(0.0, 10.0));
        assert_eq!(info.advance, 5.0);
    }

    #[test]
    fn font_client_metrics_scale_with_point_size() {
        let client = BasicFontClient::default();
        let metrics = FontClientMetrics::new(&client);
        let small = metrics.character_metrics('a', &TextStyle::default());
        let large = metrics.character_metrics(
            'a',
            &TextStyle {
                point_size: 24.0,
                ..Default::default()
            },
        );
        assert!(small.advance > 0.0);
        assert_eq!(large.advance, small.advance * 2.0);
    }
}
