//! Hyphenation dictionaries

use ahash::AHashMap;
use smallvec::SmallVec;

/// Source of hyphenation points for a single word
pub trait Hyphenator {
    /// One flag per character, `true` when the word may break after it
    fn word_hyphens(&self, word: &[char]) -> Vec<bool>;
}

/// Hyphenator that never hyphenates
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHyphenation;

impl Hyphenator for NoHyphenation {
    fn word_hyphens(&self, word: &[char]) -> Vec<bool> {
        vec![false; word.len()]
    }
}

/// Exact-match dictionary of hyphenated words, case insensitive
#[derive(Debug, Clone, Default)]
pub struct DictionaryHyphenator {
    words: AHashMap<String, SmallVec<[usize; 4]>>,
}

impl DictionaryHyphenator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a word written with `-` at its hyphenation points, e.g. `hy-phen-ation`
    pub fn insert(&mut self, pattern: &str) {
        let mut word = String::with_capacity(pattern.len());
        let mut points = SmallVec::new();
        let mut length = 0usize;

        for ch in pattern.chars() {
            if ch == '-' {
                if length > 0 {
                    points.push(length - 1);
                }
            } else {
                word.extend(ch.to_lowercase());
                length += 1;
            }
        }

        self.words.insert(word, points);
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Hyphenator for DictionaryHyphenator {
    fn word_hyphens(&self, word: &[char]) -> Vec<bool> {
        let mut hyphens = vec![false; word.len()];
        let key: String = word.iter().flat_map(|c| c.to_lowercase()).collect();

        if let Some(points) = self.words.get(&key) {
            for &point in points {
                if point + 1 < word.len() {
                    hyphens[point] = true;
                }
            }
        }
        hyphens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_points() {
        let mut dictionary = DictionaryHyphenator::new();
        dictionary.insert("Hy-phen-ation");
        let word: Vec<char> = "HYPHENATION".chars().collect();
        let hyphens = dictionary.word_hyphens(&word);
        let points: Vec<usize> = hyphens
            .iter()
            .enumerate()
            .filter_map(|(i, h)| h.then_some(i))
            .collect();
        assert_eq!(points, vec![1, 5]);
    }

    #[test]
    fn unknown_word_has_no_points() {
        let dictionary = DictionaryHyphenator::new();
        let word: Vec<char> = "word".chars().collect();
        assert!(dictionary.word_hyphens(&word).iter().all(|h| !h));
        assert!(NoHyphenation.word_hyphens(&word).iter().all(|h| !h));
    }
}
