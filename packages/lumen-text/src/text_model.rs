//! Text model state, dirty-range bookkeeping and model data clearing

use crate::config::TextConfig;
use crate::error::{TextError, TextResult};
use crate::logical_model::{clear_character_runs, LogicalModel};
use crate::model_updater::OperationsMask;
use crate::preedit::PreeditState;
use crate::scripts::is_new_paragraph;
use crate::types::{CharacterIndex, FontDescription, GlyphIndex};
use crate::visual_model::VisualModel;

/// Dirty range of the current update cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextUpdateInfo {
    /// First character modified by the pending edit
    pub character_index: CharacterIndex,
    pub number_of_characters_to_remove: usize,
    pub number_of_characters_to_add: usize,
    /// Number of characters when the model was last updated
    pub previous_number_of_characters: usize,
    /// First character of the first paragraph to update
    pub paragraph_character_index: CharacterIndex,
    pub requested_number_of_characters: usize,
    pub start_glyph_index: GlyphIndex,
    pub start_line_index: usize,
    pub estimated_number_of_lines: usize,
    pub clear_all: bool,
    pub full_relayout_needed: bool,
    pub is_last_character_new_paragraph: bool,
}

impl TextUpdateInfo {
    /// Resets the per-edit fields, keeping the character count of the model
    pub fn clear(&mut self) {
        self.character_index = 0;
        self.number_of_characters_to_remove = 0;
        self.number_of_characters_to_add = 0;
        self.paragraph_character_index = 0;
        self.requested_number_of_characters = 0;
        self.start_glyph_index = 0;
        self.start_line_index = 0;
        self.estimated_number_of_lines = 0;
        self.clear_all = false;
        self.full_relayout_needed = false;
        self.is_last_character_new_paragraph = false;
    }

    #[inline]
    fn has_pending_edit(&self) -> bool {
        self.number_of_characters_to_add != 0
            || self.number_of_characters_to_remove != 0
            || self.clear_all
    }
}

/// Default font of the control, or of its placeholder text
#[derive(Debug, Clone, PartialEq)]
pub struct FontDefaults {
    pub description: FontDescription,
    /// Point size in points
    pub default_point_size: f32,
    /// Point size chosen by text fitting, in points
    pub fit_point_size: f32,
    /// Whether `default_point_size` was set explicitly
    pub size_defined: bool,
}

impl Default for FontDefaults {
    fn default() -> Self {
        Self {
            description: FontDescription::default(),
            default_point_size: 12.0,
            fit_point_size: 12.0,
            size_defined: false,
        }
    }
}

/// Logical and visual model plus the state the model updater consumes
#[derive(Debug, Clone, Default)]
pub struct TextModel {
    pub logical: LogicalModel,
    pub visual: VisualModel,
    pub update_info: TextUpdateInfo,
    pub operations_pending: OperationsMask,
    pub config: TextConfig,
    pub font_defaults: Option<FontDefaults>,
    pub placeholder_font: Option<FontDefaults>,
    pub showing_placeholder: bool,
    pub text_fit_enabled: bool,
    pub preedit: PreeditState,
}

impl TextModel {
    pub fn new(config: TextConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    #[inline]
    pub fn number_of_characters(&self) -> usize {
        self.logical.text.len()
    }

    pub fn text(&self) -> String {
        self.logical.text.iter().collect()
    }

    /// Replaces the whole text
    pub fn set_text(&mut self, text: &str) {
        let previous = self.logical.text.len();
        self.logical.text = text.chars().collect();
        self.request_full_update();
        self.update_info.number_of_characters_to_remove = previous;
        log::debug!("set text: {} -> {} characters", previous, self.logical.text.len());
    }

    /// Inserts `text` before the character at `index`
    pub fn insert_text(&mut self, index: CharacterIndex, text: &str) -> TextResult<()> {
        let length = self.logical.text.len();
        if index > length {
            return Err(TextError::InvalidRange {
                start: index,
                end: index,
                length,
            });
        }

        let inserted: Vec<char> = text.chars().collect();
        if inserted.is_empty() {
            return Ok(());
        }
        let count = inserted.len();

        if self.update_info.has_pending_edit() {
            self.logical.text.splice(index..index, inserted);
            self.request_full_update();
            return Ok(());
        }

        self.update_info.is_last_character_new_paragraph =
            self.logical.text.last().is_some_and(|c| is_new_paragraph(*c));
        self.logical.text.splice(index..index, inserted);
        self.update_info.character_index = index;
        self.update_info.number_of_characters_to_add = count;
        self.operations_pending = OperationsMask::ALL_OPERATIONS;
        Ok(())
    }

    /// Removes `count` characters starting at `index`
    pub fn remove_text(&mut self, index: CharacterIndex, count: usize) -> TextResult<()> {
        let length = self.logical.text.len();
        if index + count > length {
            return Err(TextError::InvalidRange {
                start: index,
                end: index + count,
                length,
            });
        }
        if count == 0 {
            return Ok(());
        }

        if self.update_info.has_pending_edit() {
            self.logical.text.drain(index..index + count);
            self.request_full_update();
            return Ok(());
        }

        self.update_info.is_last_character_new_paragraph =
            self.logical.text.last().is_some_and(|c| is_new_paragraph(*c));
        self.logical.text.drain(index..index + count);
        self.update_info.character_index = index;
        self.update_info.number_of_characters_to_remove = count;
        self.operations_pending = OperationsMask::ALL_OPERATIONS;
        Ok(())
    }

    /// Schedules recomputation of the whole model
    pub fn request_full_update(&mut self) {
        let info = &mut self.update_info;
        info.character_index = 0;
        info.number_of_characters_to_remove = info.previous_number_of_characters;
        info.number_of_characters_to_add = self.logical.text.len();
        info.clear_all = true;
        info.full_relayout_needed = true;
        info.is_last_character_new_paragraph = false;
        self.operations_pending = OperationsMask::ALL_OPERATIONS;
    }

    /// Resolves the pending edit into the paragraph-aligned range to
    /// recompute. Returns the number of characters of the affected
    /// paragraphs in the previous text.
    pub fn calculate_text_update_indices(&mut self) -> usize {
        let info = &mut self.update_info;
        info.paragraph_character_index = 0;
        info.start_glyph_index = 0;
        info.start_line_index = 0;

        let paragraphs = &self.logical.paragraph_info;
        let number_of_paragraphs = paragraphs.len();
        if number_of_paragraphs == 0 {
            info.requested_number_of_characters = info
                .number_of_characters_to_add
                .saturating_sub(info.number_of_characters_to_remove);
            return 0;
        }

        let to_update = if info.character_index >= info.previous_number_of_characters {
            if info.is_last_character_new_paragraph {
                info.paragraph_character_index = info.previous_number_of_characters;
                info.requested_number_of_characters = info
                    .number_of_characters_to_add
                    .saturating_sub(info.number_of_characters_to_remove);
                info.start_glyph_index = self.visual.glyphs.len();
                info.start_line_index = self.visual.lines.len().saturating_sub(1);
                return 0;
            }
            vec![number_of_paragraphs - 1]
        } else {
            let count = if info.full_relayout_needed {
                info.previous_number_of_characters
            } else {
                info.number_of_characters_to_remove.max(1)
            };
            self.logical.find_paragraphs(info.character_index, count)
        };

        let mut number_of_characters = 0;
        if let (Some(&first), Some(&last)) = (to_update.first(), to_update.last()) {
            info.paragraph_character_index = paragraphs[first].character_run.character_index;

            let last_paragraph = paragraphs[last].character_run;
            let separator_removed = info.number_of_characters_to_remove > 0
                && last + 1 < number_of_paragraphs
                && last_paragraph.end()
                    == info.character_index + info.number_of_characters_to_remove;

            let end = if separator_removed {
                // merges with the following paragraph
                paragraphs[last + 1].character_run.end()
            } else {
                last_paragraph.end()
            };
            number_of_characters = end - info.paragraph_character_index;
        }

        info.requested_number_of_characters = (number_of_characters
            + info.number_of_characters_to_add)
            .saturating_sub(info.number_of_characters_to_remove);
        info.start_glyph_index = self
            .visual
            .characters_to_glyph
            .get(info.paragraph_character_index)
            .copied()
            .unwrap_or(self.visual.glyphs.len());

        number_of_characters
    }

    /// Removes the model data of the inclusive character range
    /// `[start_index, end_index]` for the given operations
    pub fn clear_model_data(
        &mut self,
        start_index: CharacterIndex,
        end_index: CharacterIndex,
        operations: OperationsMask,
    ) {
        let info = &self.update_info;
        if info.clear_all
            || (start_index == 0 && info.previous_number_of_characters == end_index + 1)
        {
            self.clear_full_model_data(operations);
        } else {
            self.clear_character_model_data(start_index, end_index, operations);
            self.clear_glyph_model_data(start_index, end_index, operations);
        }

        self.update_info.estimated_number_of_lines = self
            .visual
            .lines
            .len()
            .max(self.logical.paragraph_info.len());
    }

    fn clear_full_model_data(&mut self, operations: OperationsMask) {
        let logical = &mut self.logical;
        let visual = &mut self.visual;

        if operations.contains(OperationsMask::GET_LINE_BREAKS) {
            logical.line_break_info.clear();
            logical.paragraph_info.clear();
        }
        if operations.contains(OperationsMask::GET_SCRIPTS) {
            logical.script_runs.clear();
        }
        if operations.contains(OperationsMask::VALIDATE_FONTS) {
            logical.font_runs.clear();
        }
        if !logical.bidirectional_paragraph_info.is_empty()
            && operations.contains(OperationsMask::BIDI_INFO)
        {
            logical.bidirectional_paragraph_info.clear();
            logical.character_directions.clear();
        }
        if operations.contains(OperationsMask::SHAPE_TEXT) {
            visual.glyphs.clear();
            visual.glyphs_to_characters.clear();
            visual.characters_to_glyph.clear();
            visual.characters_per_glyph.clear();
            visual.glyphs_per_character.clear();
            visual.glyph_positions.clear();
        }
        if operations.contains(OperationsMask::COLOR) {
            visual.color_indices.clear();
            visual.background_color_indices.clear();
        }
    }

    fn clear_character_model_data(
        &mut self,
        start_index: CharacterIndex,
        end_index: CharacterIndex,
        operations: OperationsMask,
    ) {
        let logical = &mut self.logical;
        let end_plus_one = end_index + 1;

        if operations.contains(OperationsMask::GET_LINE_BREAKS) {
            erase_range(&mut logical.line_break_info, start_index, end_plus_one);
            clear_character_runs(start_index, end_index, &mut logical.paragraph_info);
        }
        if operations.contains(OperationsMask::GET_SCRIPTS) {
            clear_character_runs(start_index, end_index, &mut logical.script_runs);
        }
        if operations.contains(OperationsMask::VALIDATE_FONTS) {
            clear_character_runs(start_index, end_index, &mut logical.font_runs);
        }
        if !logical.bidirectional_paragraph_info.is_empty()
            && operations.contains(OperationsMask::BIDI_INFO)
        {
            clear_character_runs(
                start_index,
                end_index,
                &mut logical.bidirectional_paragraph_info,
            );
            erase_range(&mut logical.character_directions, start_index, end_plus_one);
        }
    }

    fn clear_glyph_model_data(
        &mut self,
        start_index: CharacterIndex,
        end_index: CharacterIndex,
        operations: OperationsMask,
    ) {
        let visual = &mut self.visual;
        let start_glyph = self.update_info.start_glyph_index;

        // glyph tables were never built for this range
        if end_index >= visual.characters_to_glyph.len()
            || end_index >= visual.glyphs_per_character.len()
        {
            return;
        }

        let end_plus_one = end_index + 1;
        let characters_removed = end_plus_one - start_index;
        let end_glyph_plus_one =
            visual.characters_to_glyph[end_index] + visual.glyphs_per_character[end_index];
        let glyphs_removed = end_glyph_plus_one.saturating_sub(start_glyph);

        if operations.contains(OperationsMask::SHAPE_TEXT) {
            for glyph in &mut visual.characters_to_glyph[end_plus_one..] {
                *glyph -= glyphs_removed;
            }
            erase_range(&mut visual.characters_to_glyph, start_index, end_plus_one);
            erase_range(&mut visual.glyphs_per_character, start_index, end_plus_one);

            erase_range(&mut visual.glyphs, start_glyph, end_glyph_plus_one);

            let tail = end_glyph_plus_one.min(visual.glyphs_to_characters.len());
            for character in &mut visual.glyphs_to_characters[tail..] {
                *character -= characters_removed;
            }
            erase_range(
                &mut visual.glyphs_to_characters,
                start_glyph,
                end_glyph_plus_one,
            );
            erase_range(
                &mut visual.characters_per_glyph,
                start_glyph,
                end_glyph_plus_one,
            );
            if !visual.glyph_positions.is_empty() {
                erase_range(&mut visual.glyph_positions, start_glyph, end_glyph_plus_one);
            }
        }

        if operations.contains(OperationsMask::COLOR) {
            if !visual.color_indices.is_empty() {
                erase_range(&mut visual.color_indices, start_glyph, end_glyph_plus_one);
            }
            if !visual.background_color_indices.is_empty() {
                erase_range(
                    &mut visual.background_color_indices,
                    start_glyph,
                    end_glyph_plus_one,
                );
            }
        }
    }
}

/// `Vec::drain` clamped to the vector's length
fn erase_range<T>(items: &mut Vec<T>, start: usize, end: usize) {
    let end = end.min(items.len());
    if start < end {
        items.drain(start..end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CharacterRun, ParagraphRun};

    fn paragraphs(spans: &[(usize, usize)]) -> Vec<ParagraphRun> {
        spans
            .iter()
            .map(|&(s, n)| ParagraphRun {
                character_run: CharacterRun::new(s, n),
            })
            .collect()
    }

    #[test]
    fn no_paragraphs_requests_added_characters() {
        let mut model = TextModel::default();
        model.set_text("abc");
        let paragraph_characters = model.calculate_text_update_indices();
        assert_eq!(paragraph_characters, 0);
        assert_eq!(model.update_info.requested_number_of_characters, 3);
    }

    #[test]
    fn edit_inside_paragraph_requests_whole_paragraph() {
        let mut model = TextModel::default();
        model.logical.text = "ab\ncd\nef".chars().collect();
        model.logical.paragraph_info = paragraphs(&[(0, 3), (3, 3), (6, 2)]);
        model.visual.characters_to_glyph = (0..8).collect();
        model.update_info.previous_number_of_characters = 8;

        model.insert_text(4, "xy").unwrap();
        let paragraph_characters = model.calculate_text_update_indices();

        assert_eq!(paragraph_characters, 3);
        assert_eq!(model.update_info.paragraph_character_index, 3);
        assert_eq!(model.update_info.requested_number_of_characters, 5);
        assert_eq!(model.update_info.start_glyph_index, 3);
    }

    #[test]
    fn removing_separator_merges_next_paragraph() {
        let mut model = TextModel::default();
        model.logical.text = "ab\ncd".chars().collect();
        model.logical.paragraph_info = paragraphs(&[(0, 3), (3, 2)]);
        model.visual.characters_to_glyph = (0..5).collect();
        model.update_info.previous_number_of_characters = 5;

        model.remove_text(2, 1).unwrap();
        let paragraph_characters = model.calculate_text_update_indices();

        assert_eq!(paragraph_characters, 5);
        assert_eq!(model.update_info.requested_number_of_characters, 4);
    }

    #[test]
    fn append_after_trailing_newline_starts_new_paragraph() {
        let mut model = TextModel::default();
        model.logical.text = "ab\n".chars().collect();
        model.logical.paragraph_info = paragraphs(&[(0, 3)]);
        model.visual.glyphs = vec![Default::default(); 3];
        model.update_info.previous_number_of_characters = 3;

        model.insert_text(3, "cd").unwrap();
        let paragraph_characters = model.calculate_text_update_indices();

        assert_eq!(paragraph_characters, 0);
        assert_eq!(model.update_info.paragraph_character_index, 3);
        assert_eq!(model.update_info.requested_number_of_characters, 2);
        assert_eq!(model.update_info.start_glyph_index, 3);
    }

    #[test]
    fn out_of_range_edits_are_rejected() {
        let mut model = TextModel::default();
        model.set_text("ab");
        assert!(matches!(
            model.insert_text(5, "x"),
            Err(TextError::InvalidRange { start: 5, .. })
        ));
        assert!(model.remove_text(1, 4).is_err());
    }
}
