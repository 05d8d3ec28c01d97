//! Word layout info

use super::character::{CharacterLayoutInfo, LayoutMetrics, TextStyle};
use super::Size;
use crate::scripts::{is_new_paragraph, is_white_space};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WordType {
    #[default]
    NoSeparator,
    /// White space
    WordSeparator,
    /// New paragraph character
    ParagraphSeparator,
}

impl WordType {
    pub fn of(character: char) -> Self {
        if is_new_paragraph(character) {
            WordType::ParagraphSeparator
        } else if is_white_space(character) {
            WordType::WordSeparator
        } else {
            WordType::NoSeparator
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WordLayoutInfo {
    pub size: Size,
    pub ascender: f32,
    pub word_type: WordType,
    pub characters: Vec<CharacterLayoutInfo>,
}

impl WordLayoutInfo {
    #[inline]
    pub fn number_of_characters(&self) -> usize {
        self.characters.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn text(&self) -> String {
        self.characters.iter().map(|c| c.character).collect()
    }

    /// Recomputes size and ascender from the characters
    pub fn update_layout_info(&mut self) {
        self.size = Size::ZERO;
        self.ascender = 0.0;
        for character in &self.characters {
            self.size.grow(character.size);
            self.ascender = self.ascender.max(character.ascender);
        }
    }

    pub fn remove_characters(&mut self, position: usize, count: usize) {
        if count == 0 {
            return;
        }
        self.characters.drain(position..position + count);
        self.update_layout_info();
    }
}

/// Splits styled characters into words. Every white space and every new
/// paragraph character is a word of its own.
pub fn split_in_words<'a>(text: &[(char, &'a TextStyle)]) -> Vec<Vec<(char, &'a TextStyle)>> {
    let mut words = Vec::new();
    let mut word = Vec::new();

    for &(character, style) in text {
        if WordType::of(character) == WordType::NoSeparator {
            word.push((character, style));
            continue;
        }
        if !word.is_empty() {
            words.push(std::mem::take(&mut word));
        }
        words.push(vec![(character, style)]);
    }
    if !word.is_empty() {
        words.push(word);
    }

    words
}

pub fn create_word_text_info(
    word: &[(char, &TextStyle)],
    metrics: &dyn LayoutMetrics,
) -> WordLayoutInfo {
    let mut info = WordLayoutInfo::default();
    for &(character, style) in word {
        let layout = CharacterLayoutInfo::new(character, style, metrics);
        info.size.grow(layout.size);
        info.ascender = info.ascender.max(layout.ascender);
        info.word_type = WordType::of(character);
        info.characters.push(layout);
    }
    info
}

/// Moves the characters from `position` on into a new word
pub fn split_word(position: usize, first: &mut WordLayoutInfo) -> WordLayoutInfo {
    if position == 0 {
        return std::mem::take(first);
    }
    if position == first.characters.len() {
        return WordLayoutInfo::default();
    }

    let mut last = WordLayoutInfo {
        word_type: first.word_type,
        characters: first.characters.split_off(position),
        ..Default::default()
    };
    first.update_layout_info();
    last.update_layout_info();
    last
}

/// Appends `last` to `first`.
///
/// # Panics
///
/// Panics when either word is a separator.
pub fn merge_word(first: &mut WordLayoutInfo, last: &WordLayoutInfo) {
    if last.characters.is_empty() {
        return;
    }
    if first.characters.is_empty() {
        *first = last.clone();
        return;
    }

    assert!(
        first.word_type == WordType::NoSeparator && last.word_type == WordType::NoSeparator,
        "white spaces and new paragraph characters can't be merged with other words"
    );

    first.characters.extend(last.characters.iter().cloned());
    first.size.grow(last.size);
    first.ascender = first.ascender.max(last.ascender);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::character::FixedMetrics;

    const METRICS: FixedMetrics = FixedMetrics {
        advance: 4.0,
        height: 10.0,
        ascender: 8.0,
    };

    fn word(text: &str) -> WordLayoutInfo {
        let style = TextStyle::default();
        let characters: Vec<_> = text.chars().map(|c| (c, &style)).collect();
        create_word_text_info(&characters, &METRICS)
    }

    #[test]
    fn separators_are_single_character_words() {
        let style = TextStyle::default();
        let characters: Vec<_> = "ab  c\n".chars().map(|c| (c, &style)).collect();
        let words: Vec<String> = split_in_words(&characters)
            .iter()
            .map(|w| w.iter().map(|(c, _)| *c).collect())
            .collect();
        assert_eq!(words, vec!["ab", " ", " ", "c", "\n"]);
    }

    #[test]
    fn split_then_merge_restores_word() {
        let original = word("hello");
        let mut first = original.clone();
        let last = split_word(2, &mut first);

        assert_eq!(first.text(), "he");
        assert_eq!(last.text(), "llo");
        assert_eq!(first.size.width, 8.0);

        merge_word(&mut first, &last);
        assert_eq!(first, original);
    }

    #[test]
    fn split_edges_move_whole_word() {
        let mut first = word("abc");
        let last = split_word(0, &mut first);
        assert!(first.is_empty());
        assert_eq!(last.text(), "abc");

        let mut first = word("abc");
        let last = split_word(3, &mut first);
        assert_eq!(first.text(), "abc");
        assert!(last.is_empty());
    }

    #[test]
    #[should_panic]
    fn merging_white_space_panics() {
        let mut first = word("a");
        merge_word(&mut first, &word(" "));
    }
}
