//! Legacy paragraph/word layout
//!
//! Text is kept as a paragraph → word → character tree carrying natural
//! sizes. The tree can be edited in place (split and merge of paragraphs and
//! words) and relaid out with one of the overflow policies in [`relayout`].

pub mod character;
pub mod paragraph;
pub mod relayout;
pub mod word;

pub use character::{
    CharacterLayoutInfo, CharacterMetrics, FixedMetrics, FontClientMetrics, LayoutMetrics,
    StyledText, TextStyle,
};
pub use paragraph::{
    create_paragraph_info, create_text_info, merge_paragraph, split_paragraph,
    ParagraphLayoutInfo, TextInfoIndices, TextLayoutInfo,
};
pub use relayout::{
    relayout, relayout_for_shrink_to_fit, ExceedPolicy, HorizontalAlignment, LayoutParameters,
    LineJustification, LineLayoutInfo, OverflowPolicy, RelayoutData, VerticalAlignment,
};
pub use word::{create_word_text_info, merge_word, split_in_words, split_word, WordLayoutInfo, WordType};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Size = Size::new(0.0, 0.0);

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Appends `other` horizontally: widths add up, the height is the max
    #[inline]
    pub fn grow(&mut self, other: Size) {
        self.width += other.width;
        self.height = self.height.max(other.height);
    }

    #[inline]
    pub fn scaled(self, factor: f32) -> Size {
        Size::new(self.width * factor, self.height * factor)
    }
}
