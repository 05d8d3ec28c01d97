//! Line break segmentation
//!
//! Break opportunities follow UAX #14 via `unicode-linebreak`. The value
//! stored for a character describes the opportunity *after* it, so the last
//! character of every paragraph carries `MustBreak`.

use unicode_linebreak::{linebreaks, BreakOpportunity};

use crate::hyphenation::Hyphenator;
use crate::types::{CharacterIndex, LineBreakInfo};

/// Computes the break info of `[start_index, start_index + count)` and
/// splices it into `line_break_info` without touching other entries
pub fn set_line_break_info(
    text: &[char],
    start_index: CharacterIndex,
    count: usize,
    line_break_info: &mut Vec<LineBreakInfo>,
) {
    if count == 0 {
        return;
    }

    let range = &text[start_index..start_index + count];
    let segment: String = range.iter().collect();

    // byte offset at which each character ends
    let mut ends = Vec::with_capacity(count);
    let mut offset = 0;
    for ch in range {
        offset += ch.len_utf8();
        ends.push(offset);
    }

    let mut new_info = vec![LineBreakInfo::NoBreak; count];
    for (position, opportunity) in linebreaks(&segment) {
        if let Ok(character) = ends.binary_search(&position) {
            new_info[character] = match opportunity {
                BreakOpportunity::Mandatory => LineBreakInfo::MustBreak,
                BreakOpportunity::Allowed => LineBreakInfo::AllowBreak,
            };
        }
    }

    let at = start_index.min(line_break_info.len());
    line_break_info.splice(at..at, new_info);
}

/// Marks the hyphenation opportunities of every word in the range
pub fn set_hyphenation_info(
    text: &[char],
    start_index: CharacterIndex,
    count: usize,
    hyphenator: &dyn Hyphenator,
    line_break_info: &mut [LineBreakInfo],
) {
    let end = (start_index + count).min(line_break_info.len());
    let mut index = start_index;

    while index < end {
        let mut word_end = index;
        while word_end < end
            && !matches!(
                line_break_info[word_end],
                LineBreakInfo::AllowBreak | LineBreakInfo::MustBreak
            )
        {
            word_end += 1;
        }

        // the last character has no break after it, keep it inside the word
        if word_end + 1 == end {
            word_end += 1;
        }

        let hyphens = hyphenator.word_hyphens(&text[index..word_end]);
        for (offset, hyphen) in hyphens.iter().enumerate().take(word_end - index) {
            if *hyphen {
                line_break_info[index + offset] = LineBreakInfo::HyphenationBreak;
            }
        }

        index = word_end + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hyphenation::DictionaryHyphenator;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn spaces_allow_and_newlines_force_breaks() {
        let text = chars("ab cd\nef");
        let mut info = Vec::new();
        set_line_break_info(&text, 0, text.len(), &mut info);

        use LineBreakInfo::*;
        assert_eq!(
            info,
            vec![NoBreak, NoBreak, AllowBreak, NoBreak, NoBreak, MustBreak, NoBreak, MustBreak]
        );
    }

    #[test]
    fn range_update_leaves_other_entries() {
        let text = chars("ab\ncd\n");
        let mut info = vec![LineBreakInfo::NoBreak, LineBreakInfo::NoBreak, LineBreakInfo::MustBreak];
        set_line_break_info(&text, 3, 3, &mut info);
        assert_eq!(info.len(), 6);
        assert_eq!(info[2], LineBreakInfo::MustBreak);
        assert_eq!(info[5], LineBreakInfo::MustBreak);
    }

    #[test]
    fn dictionary_words_get_hyphenation_breaks() {
        let text = chars("hyphen word");
        let mut info = Vec::new();
        set_line_break_info(&text, 0, text.len(), &mut info);

        let mut hyphenator = DictionaryHyphenator::new();
        hyphenator.insert("hy-phen");
        set_hyphenation_info(&text, 0, text.len(), &hyphenator, &mut info);

        assert_eq!(info[1], LineBreakInfo::HyphenationBreak);
        assert_eq!(info[6], LineBreakInfo::AllowBreak);
    }
}
