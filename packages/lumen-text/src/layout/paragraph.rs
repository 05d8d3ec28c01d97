//! Paragraph layout info
//!
//! A paragraph ends with its new paragraph character, if any. Splitting a
//! paragraph at a (word, character) position splits the word found there;
//! merging is the inverse and rejoins two plain words meeting at the seam.

use super::character::{LayoutMetrics, StyledText, TextStyle};
use super::word::{create_word_text_info, merge_word, split_in_words, split_word, WordLayoutInfo, WordType};
use super::Size;
use crate::scripts::is_new_paragraph;

/// Position inside the layout tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextInfoIndices {
    pub paragraph_index: usize,
    pub word_index: usize,
    pub character_index: usize,
}

impl TextInfoIndices {
    pub const fn new(paragraph_index: usize, word_index: usize, character_index: usize) -> Self {
        Self {
            paragraph_index,
            word_index,
            character_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParagraphLayoutInfo {
    pub size: Size,
    pub ascender: f32,
    pub line_height_offset: f32,
    pub number_of_characters: usize,
    pub words: Vec<WordLayoutInfo>,
}

impl ParagraphLayoutInfo {
    pub fn text(&self) -> String {
        self.words.iter().map(WordLayoutInfo::text).collect()
    }

    pub fn ends_with_paragraph_separator(&self) -> bool {
        self.words
            .last()
            .is_some_and(|word| word.word_type == WordType::ParagraphSeparator)
    }

    /// Recomputes the aggregates from the words and applies the line height
    /// offset
    pub fn update_layout_info(&mut self, line_height_offset: f32) {
        self.size = Size::ZERO;
        self.ascender = 0.0;
        self.number_of_characters = 0;
        for word in &self.words {
            self.size.grow(word.size);
            self.ascender = self.ascender.max(word.ascender);
            self.number_of_characters += word.number_of_characters();
        }
        self.size.height += line_height_offset;
        self.line_height_offset = line_height_offset;
    }

    pub fn remove_words(&mut self, word_index: usize, count: usize, line_height_offset: f32) {
        self.words.drain(word_index..word_index + count);
        self.update_layout_info(line_height_offset);
    }

    fn push_word(&mut self, word: WordLayoutInfo) {
        self.ascender = self.ascender.max(word.ascender);
        self.number_of_characters += word.number_of_characters();
        self.size.grow(word.size);
        self.words.push(word);
    }
}

/// Whole text laid out as paragraphs
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextLayoutInfo {
    pub size: Size,
    pub max_word_width: f32,
    pub number_of_characters: usize,
    pub paragraphs: Vec<ParagraphLayoutInfo>,
}

impl TextLayoutInfo {
    pub fn text(&self) -> String {
        self.paragraphs.iter().map(ParagraphLayoutInfo::text).collect()
    }

    pub fn update_layout_info(&mut self) {
        self.size = Size::ZERO;
        self.number_of_characters = 0;
        self.max_word_width = 0.0;
        for paragraph in &self.paragraphs {
            self.size.width = self.size.width.max(paragraph.size.width);
            self.size.height += paragraph.size.height;
            self.number_of_characters += paragraph.number_of_characters;
            for word in &paragraph.words {
                self.max_word_width = self.max_word_width.max(word.size.width);
            }
        }
    }
}

fn flatten(text: &[StyledText]) -> Vec<(char, &TextStyle)> {
    text.iter()
        .flat_map(|span| span.text.chars().map(move |c| (c, &span.style)))
        .collect()
}

fn paragraph_from_characters(
    characters: &[(char, &TextStyle)],
    metrics: &dyn LayoutMetrics,
) -> (ParagraphLayoutInfo, f32) {
    let mut paragraph = ParagraphLayoutInfo::default();
    let mut max_word_width: f32 = 0.0;

    for word in split_in_words(characters) {
        let layout = create_word_text_info(&word, metrics);
        max_word_width = max_word_width.max(layout.size.width);
        paragraph.push_word(layout);
    }

    (paragraph, max_word_width)
}

/// Builds the layout info of one paragraph. Returns the paragraph and the
/// width of its widest word.
pub fn create_paragraph_info(
    paragraph: &[StyledText],
    metrics: &dyn LayoutMetrics,
) -> (ParagraphLayoutInfo, f32) {
    paragraph_from_characters(&flatten(paragraph), metrics)
}

/// Builds the layout info of a whole text, one paragraph per new paragraph
/// character
pub fn create_text_info(
    text: &[StyledText],
    line_height_offset: f32,
    metrics: &dyn LayoutMetrics,
) -> TextLayoutInfo {
    let characters = flatten(text);
    let mut layout = TextLayoutInfo::default();

    for paragraph_characters in characters.split_inclusive(|(c, _)| is_new_paragraph(*c)) {
        let (mut paragraph, _) = paragraph_from_characters(paragraph_characters, metrics);
        paragraph.size.height += line_height_offset;
        paragraph.line_height_offset = line_height_offset;
        layout.paragraphs.push(paragraph);
    }

    layout.update_layout_info();
    log::debug!(
        "text layout: {} paragraphs, {} characters, max word width {}",
        layout.paragraphs.len(),
        layout.number_of_characters,
        layout.max_word_width
    );
    layout
}

/// Splits `first` at `indices` and returns the second half. Both halves
/// get their aggregates recomputed with `line_height_offset`.
pub fn split_paragraph(
    indices: TextInfoIndices,
    line_height_offset: f32,
    first: &mut ParagraphLayoutInfo,
) -> ParagraphLayoutInfo {
    if indices.word_index == 0 && indices.character_index == 0 {
        return std::mem::take(first);
    }

    if let Some(last_word) = first.words.last() {
        if indices.word_index == first.words.len() - 1
            && indices.character_index == last_word.number_of_characters()
        {
            return ParagraphLayoutInfo::default();
        }
    }

    let mut last = ParagraphLayoutInfo::default();

    let split_at = &mut first.words[indices.word_index];
    let last_part = split_word(indices.character_index, split_at);
    let first_part_empty = split_at.is_empty();

    if !last_part.is_empty() {
        last.words.push(last_part);
    }
    last.words.extend(first.words.drain(indices.word_index + 1..));
    last.update_layout_info(line_height_offset);

    if first_part_empty {
        first.words.truncate(indices.word_index);
    }
    first.update_layout_info(line_height_offset);

    last
}

/// Appends `last` to `first`.
///
/// # Panics
///
/// Panics when `first` ends with a new paragraph character.
pub fn merge_paragraph(first: &mut ParagraphLayoutInfo, last: &ParagraphLayoutInfo) {
    if last.words.is_empty() {
        return;
    }
    if first.words.is_empty() {
        *first = last.clone();
        return;
    }

    assert!(
        !first.ends_with_paragraph_separator(),
        "a paragraph ending with a new paragraph character can't be merged"
    );

    let mut skip = 0;
    if let (Some(last_word), Some(first_word)) = (first.words.last_mut(), last.words.first()) {
        if last_word.word_type == WordType::NoSeparator
            && first_word.word_type == WordType::NoSeparator
        {
            merge_word(last_word, first_word);
            skip = 1;
        }
    }

    first.words.extend(last.words[skip..].iter().cloned());
    first.size.grow(last.size);
    first.ascender = first.ascender.max(last.ascender);
    first.line_height_offset = first.line_height_offset.max(last.line_height_offset);
    first.number_of_characters += last.number_of_characters;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::character::FixedMetrics;

    const METRICS: FixedMetrics = FixedMetrics {
        advance: 3.0,
        height: 12.0,
        ascender: 9.0,
    };

    fn paragraph(text: &str) -> ParagraphLayoutInfo {
        create_paragraph_info(&[StyledText::plain(text)], &METRICS).0
    }

    #[test]
    fn paragraph_aggregates_words() {
        let (info, max_word_width) =
            create_paragraph_info(&[StyledText::plain("ab cde\n")], &METRICS);
        assert_eq!(info.words.len(), 4);
        assert_eq!(info.number_of_characters, 7);
        assert_eq!(info.size, Size::new(18.0, 12.0));
        assert_eq!(max_word_width, 9.0);
        assert!(info.ends_with_paragraph_separator());
    }

    #[test]
    fn split_inside_word() {
        let mut first = paragraph("hello big world");
        let last = split_paragraph(TextInfoIndices::new(0, 2, 1), 0.0, &mut first);
        assert_eq!(first.text(), "hello b");
        assert_eq!(last.text(), "ig world");
        assert_eq!(first.number_of_characters, 7);
        assert_eq!(last.number_of_characters, 8);
    }

    #[test]
    fn split_at_start_moves_everything() {
        let mut first = paragraph("abc def");
        let last = split_paragraph(TextInfoIndices::new(0, 0, 0), 0.0, &mut first);
        assert!(first.words.is_empty());
        assert_eq!(last.text(), "abc def");
    }

    #[test]
    fn split_at_end_leaves_last_empty() {
        let mut first = paragraph("abc def");
        let last = split_paragraph(TextInfoIndices::new(0, 2, 3), 0.0, &mut first);
        assert_eq!(first.text(), "abc def");
        assert!(last.words.is_empty());
    }

    #[test]
    fn line_height_offset_applies_to_both_halves() {
        let mut first = paragraph("abc def");
        let last = split_paragraph(TextInfoIndices::new(0, 1, 0), 2.0, &mut first);
        assert_eq!(first.size.height, 14.0);
        assert_eq!(last.size.height, 14.0);
    }

    #[test]
    #[should_panic]
    fn merging_after_separator_panics() {
        let mut first = paragraph("abc\n");
        merge_paragraph(&mut first, &paragraph("def"));
    }

    #[test]
    fn text_info_splits_paragraphs() {
        let layout = create_text_info(&[StyledText::plain("one\ntwo three")], 1.0, &METRICS);
        assert_eq!(layout.paragraphs.len(), 2);
        assert_eq!(layout.number_of_characters, 13);
        assert_eq!(layout.max_word_width, 15.0);
        assert_eq!(layout.size.height, 26.0);
    }
}
