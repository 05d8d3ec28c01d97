//! Logical text model: characters and character-indexed runs

use crate::types::{
    BidirectionalParagraphInfoRun, CharacterDirection, CharacterIndex, CharacterRun,
    CharacterSpacingCharacterRun, ColorRun, FontDescriptionRun, FontRun, HasCharacterRun,
    LineBreakInfo, ParagraphRun, ScriptRun, StrikethroughCharacterRun, UnderlinedCharacterRun,
};

#[derive(Debug, Clone, Default)]
pub struct LogicalModel {
    pub text: Vec<char>,
    pub line_break_info: Vec<LineBreakInfo>,
    pub script_runs: Vec<ScriptRun>,
    pub font_description_runs: Vec<FontDescriptionRun>,
    pub font_runs: Vec<FontRun>,
    pub bidirectional_paragraph_info: Vec<BidirectionalParagraphInfoRun>,
    pub character_directions: Vec<CharacterDirection>,
    pub paragraph_info: Vec<ParagraphRun>,
    pub color_runs: Vec<ColorRun>,
    pub background_color_runs: Vec<ColorRun>,
    pub underlined_character_runs: Vec<UnderlinedCharacterRun>,
    pub strikethrough_character_runs: Vec<StrikethroughCharacterRun>,
    pub character_spacing_character_runs: Vec<CharacterSpacingCharacterRun>,
}

impl LogicalModel {
    #[inline]
    pub fn number_of_characters(&self) -> usize {
        self.text.len()
    }

    /// Indices of the paragraphs intersecting `[index, index + count)`
    pub fn find_paragraphs(&self, index: CharacterIndex, count: usize) -> Vec<usize> {
        if count == 0 {
            return Vec::new();
        }
        let last = index + count - 1;
        self.paragraph_info
            .iter()
            .enumerate()
            .filter(|(_, paragraph)| paragraph.character_run.overlaps_inclusive(index, last))
            .map(|(i, _)| i)
            .collect()
    }

    /// Builds the paragraphs of `[start_index, start_index + count)` from
    /// the line break info and splices them into the paragraph list
    pub fn create_paragraph_info(&mut self, start_index: CharacterIndex, count: usize) {
        if count == 0 {
            return;
        }
        let end = (start_index + count).min(self.line_break_info.len());

        let mut new_paragraphs = Vec::new();
        let mut paragraph_start = start_index;
        for index in start_index..end {
            if self.line_break_info[index] == LineBreakInfo::MustBreak {
                new_paragraphs.push(ParagraphRun {
                    character_run: CharacterRun::new(paragraph_start, index + 1 - paragraph_start),
                });
                paragraph_start = index + 1;
            }
        }
        if paragraph_start < end {
            new_paragraphs.push(ParagraphRun {
                character_run: CharacterRun::new(paragraph_start, end - paragraph_start),
            });
        }

        insert_runs(&mut self.paragraph_info, new_paragraphs, start_index, count);
    }

    /// Script of the character at `index`, if scripts were computed
    pub fn script_at(&self, index: CharacterIndex) -> Option<&ScriptRun> {
        run_at(&self.script_runs, index)
    }

    pub fn font_at(&self, index: CharacterIndex) -> Option<&FontRun> {
        run_at(&self.font_runs, index)
    }
}

/// Binary search for the run containing `index` in an ordered run list
pub fn run_at<T: HasCharacterRun>(runs: &[T], index: CharacterIndex) -> Option<&T> {
    let position = runs.partition_point(|run| run.character_run().end() <= index);
    runs.get(position)
        .filter(|run| run.character_run().contains(index))
}

/// Removes the runs intersecting the inclusive range `[start, last]` and
/// shifts the runs after it down by the number of removed characters
pub fn clear_character_runs<T: HasCharacterRun>(
    start: CharacterIndex,
    last: CharacterIndex,
    runs: &mut Vec<T>,
) {
    let mut start_remove = runs.len();
    for (index, run) in runs.iter().enumerate() {
        let character_run = run.character_run();
        if character_run.overlaps_inclusive(start, last) || character_run.character_index > last {
            start_remove = index;
            break;
        }
    }

    let mut end_remove = start_remove;
    for run in &runs[start_remove..] {
        if run.character_run().overlaps_inclusive(start, last) {
            end_remove += 1;
        } else {
            break;
        }
    }

    let removed = 1 + last - start;
    for run in &mut runs[end_remove..] {
        run.character_run_mut().character_index -= removed;
    }

    runs.drain(start_remove..end_remove);
}

/// Inserts `new_runs` where `start_index` belongs and shifts every run
/// starting at or after it by `number_of_characters`
pub fn insert_runs<T: HasCharacterRun>(
    runs: &mut Vec<T>,
    new_runs: Vec<T>,
    start_index: CharacterIndex,
    number_of_characters: usize,
) {
    let position = runs.partition_point(|run| run.character_run().character_index < start_index);
    for run in &mut runs[position..] {
        run.character_run_mut().character_index += number_of_characters;
    }
    runs.splice(position..position, new_runs);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs(spans: &[(usize, usize)]) -> Vec<CharacterRun> {
        spans.iter().map(|&(s, n)| CharacterRun::new(s, n)).collect()
    }

    #[test]
    fn clear_removes_overlapping_and_shifts_tail() {
        let mut list = runs(&[(0, 3), (3, 4), (7, 2), (9, 5)]);
        clear_character_runs(3, 8, &mut list);
        assert_eq!(list, runs(&[(0, 3), (3, 5)]));
    }

    #[test]
    fn clear_before_all_runs_only_shifts() {
        let mut list = runs(&[(5, 2)]);
        clear_character_runs(0, 1, &mut list);
        assert_eq!(list, runs(&[(3, 2)]));
    }

    #[test]
    fn insert_shifts_following_runs() {
        let mut list = runs(&[(0, 3), (3, 5)]);
        insert_runs(&mut list, runs(&[(3, 2)]), 3, 2);
        assert_eq!(list, runs(&[(0, 3), (3, 2), (5, 5)]));
    }

    #[test]
    fn run_lookup() {
        let list = runs(&[(0, 3), (3, 5)]);
        assert_eq!(run_at(&list, 4), Some(&CharacterRun::new(3, 5)));
        assert_eq!(run_at(&list, 8), None);
    }

    #[test]
    fn paragraphs_follow_must_breaks() {
        let mut model = LogicalModel {
            text: "ab\ncd".chars().collect(),
            line_break_info: vec![
                LineBreakInfo::NoBreak,
                LineBreakInfo::NoBreak,
                LineBreakInfo::MustBreak,
                LineBreakInfo::NoBreak,
                LineBreakInfo::MustBreak,
            ],
            ..Default::default()
        };
        model.create_paragraph_info(0, 5);
        let spans: Vec<_> = model.paragraph_info.iter().map(|p| p.character_run).collect();
        assert_eq!(spans, runs(&[(0, 3), (3, 2)]));
        assert_eq!(model.find_paragraphs(2, 2), vec![0, 1]);
    }
}
