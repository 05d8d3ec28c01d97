//! Core run and glyph types shared by the text pipeline
//!
//! Every attribute of the logical model is stored as a run: a contiguous
//! character range carrying one value. Glyph-indexed attributes of the
//! visual model use the same shape over glyph indices.

use serde::{Deserialize, Serialize};
use unicode_script::Script;

pub type CharacterIndex = usize;
pub type GlyphIndex = usize;
pub type FontId = u32;
pub type ColorIndex = u16;

/// Point size in 26.6 fixed point units
pub type PointSize26Dot6 = u32;

/// `true` when the character is laid out right to left
pub type CharacterDirection = bool;

/// Break opportunity after a character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineBreakInfo {
    MustBreak,
    AllowBreak,
    #[default]
    NoBreak,
    HyphenationBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineWrapMode {
    #[default]
    Word,
    Character,
    Hyphenation,
    Mixed,
}

impl LineWrapMode {
    /// Whether word hyphenation should run during line breaking
    #[inline]
    pub const fn needs_hyphenation(self) -> bool {
        matches!(self, LineWrapMode::Hyphenation | LineWrapMode::Mixed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LayoutDirection {
    #[default]
    LeftToRight,
    RightToLeft,
}

/// Source of a paragraph's base direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchLayoutDirection {
    #[default]
    Inherit,
    Locale,
    Contents,
}

/// Linear RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);
    pub const LIGHT_BLUE: Color = Color::new(0.75, 0.96, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Relative luminance (WCAG 2.0)
    #[inline]
    pub fn luminance(&self) -> f32 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharacterRun {
    pub character_index: CharacterIndex,
    pub number_of_characters: usize,
}

impl CharacterRun {
    pub const fn new(character_index: CharacterIndex, number_of_characters: usize) -> Self {
        Self {
            character_index,
            number_of_characters,
        }
    }

    /// One past the last character of the run
    #[inline]
    pub const fn end(&self) -> CharacterIndex {
        self.character_index + self.number_of_characters
    }

    #[inline]
    pub const fn contains(&self, index: CharacterIndex) -> bool {
        index >= self.character_index && index < self.end()
    }

    /// Whether the run intersects the inclusive range `[start, last]`
    #[inline]
    pub const fn overlaps_inclusive(&self, start: CharacterIndex, last: CharacterIndex) -> bool {
        self.character_index <= last && start < self.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlyphRun {
    pub glyph_index: GlyphIndex,
    pub number_of_glyphs: usize,
}

/// Access to the character range of any logical run kind
pub trait HasCharacterRun {
    fn character_run(&self) -> &CharacterRun;
    fn character_run_mut(&mut self) -> &mut CharacterRun;
}

macro_rules! impl_has_character_run {
    ($($ty:ty),* $(,)?) => {
        $(
            impl HasCharacterRun for $ty {
                #[inline]
                fn character_run(&self) -> &CharacterRun {
                    &self.character_run
                }

                #[inline]
                fn character_run_mut(&mut self) -> &mut CharacterRun {
                    &mut self.character_run
                }
            }
        )*
    };
}

impl HasCharacterRun for CharacterRun {
    #[inline]
    fn character_run(&self) -> &CharacterRun {
        self
    }

    #[inline]
    fn character_run_mut(&mut self) -> &mut CharacterRun {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptRun {
    pub character_run: CharacterRun,
    pub script: Script,
    pub is_right_to_left: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FontDescription {
    /// Family name, empty for the platform default
    pub family: String,
    pub weight: u16,
    pub italic: bool,
}

/// Font override applied by markup or the application
#[derive(Debug, Clone, PartialEq)]
pub struct FontDescriptionRun {
    pub character_run: CharacterRun,
    pub family: Option<String>,
    pub weight: Option<u16>,
    pub italic: Option<bool>,
    /// Point size in points
    pub size: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontRun {
    pub character_run: CharacterRun,
    pub font_id: FontId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorRun {
    pub character_run: CharacterRun,
    pub color: Color,
}

/// Paragraph boundaries derived from the line break info
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParagraphRun {
    pub character_run: CharacterRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidirectionalParagraphInfoRun {
    pub character_run: CharacterRun,
    /// `true` for a right to left paragraph
    pub direction: CharacterDirection,
    /// Embedding level of every character in the paragraph
    pub levels: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UnderlineProperties {
    pub color: Option<Color>,
    pub height: Option<f32>,
    pub dashed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnderlinedCharacterRun {
    pub character_run: CharacterRun,
    pub properties: UnderlineProperties,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnderlinedGlyphRun {
    pub glyph_run: GlyphRun,
    pub properties: UnderlineProperties,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrikethroughCharacterRun {
    pub character_run: CharacterRun,
    pub color: Option<Color>,
    pub height: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrikethroughGlyphRun {
    pub glyph_run: GlyphRun,
    pub color: Option<Color>,
    pub height: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterSpacingCharacterRun {
    pub character_run: CharacterRun,
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterSpacingGlyphRun {
    pub glyph_run: GlyphRun,
    pub value: f32,
}

impl_has_character_run!(
    ScriptRun,
    FontDescriptionRun,
    FontRun,
    ColorRun,
    ParagraphRun,
    BidirectionalParagraphInfoRun,
    UnderlinedCharacterRun,
    StrikethroughCharacterRun,
    CharacterSpacingCharacterRun,
);

/// Shaped glyph and its metrics
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphInfo {
    pub font_id: FontId,
    /// Glyph index inside the font
    pub index: u32,
    pub width: f32,
    pub height: f32,
    pub x_bearing: f32,
    pub y_bearing: f32,
    pub advance: f32,
    pub scale_factor: f32,
}

/// Minimal laid-out line record
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineRun {
    pub glyph_run: GlyphRun,
    pub character_run: CharacterRun,
    pub width: f32,
    pub ascender: f32,
    pub descender: f32,
}
