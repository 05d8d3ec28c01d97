//! Model updater
//!
//! Brings the logical and visual models in line with the text after an
//! edit. Only the paragraphs touched by the edit are recomputed: stale data
//! of the dirty range is cleared, then every requested stage regenerates its
//! tables for that range and splices them in, in a fixed order.

use bitflags::bitflags;

use crate::bidi::{get_characters_direction, get_mirrored_text, set_bidirectional_info};
use crate::color_segmentation::set_color_segmentation_info;
use crate::config::DEFAULT_POINT_SIZE;
use crate::fonts::{validate_fonts, BasicFontClient, FontClient};
use crate::hyphenation::{Hyphenator, NoHyphenation};
use crate::preedit::apply_preedit_styles;
use crate::scripts::set_scripts;
use crate::segmentation::{set_hyphenation_info, set_line_break_info};
use crate::shaper::{shape_text, ClusterShaper, ShapedGlyphs, Shaper};
use crate::text_model::{FontDefaults, TextModel};
use crate::types::{
    CharacterRun, CharacterSpacingGlyphRun, FontDescription, GlyphIndex, GlyphRun,
    PointSize26Dot6, StrikethroughGlyphRun, UnderlinedGlyphRun,
};
use crate::visual_model::VisualModel;

bitflags! {
    /// Stages of the model update
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OperationsMask: u32 {
        const GET_SCRIPTS = 1 << 0;
        const VALIDATE_FONTS = 1 << 1;
        const GET_LINE_BREAKS = 1 << 2;
        const BIDI_INFO = 1 << 3;
        const SHAPE_TEXT = 1 << 4;
        const GET_GLYPH_METRICS = 1 << 5;
        const COLOR = 1 << 6;
        const ALL_OPERATIONS = Self::GET_SCRIPTS.bits()
            | Self::VALIDATE_FONTS.bits()
            | Self::GET_LINE_BREAKS.bits()
            | Self::BIDI_INFO.bits()
            | Self::SHAPE_TEXT.bits()
            | Self::GET_GLYPH_METRICS.bits()
            | Self::COLOR.bits();
    }
}

/// Runs the update stages with injected font, shaping and hyphenation services
pub struct ModelUpdater {
    font_client: Box<dyn FontClient>,
    shaper: Box<dyn Shaper>,
    hyphenator: Box<dyn Hyphenator>,
}

impl Default for ModelUpdater {
    fn default() -> Self {
        Self::new(
            Box::new(BasicFontClient::default()),
            Box::new(ClusterShaper),
            Box::new(NoHyphenation),
        )
    }
}

impl ModelUpdater {
    pub fn new(
        font_client: Box<dyn FontClient>,
        shaper: Box<dyn Shaper>,
        hyphenator: Box<dyn Hyphenator>,
    ) -> Self {
        Self {
            font_client,
            shaper,
            hyphenator,
        }
    }

    pub fn font_client(&self) -> &dyn FontClient {
        self.font_client.as_ref()
    }

    /// Runs the pending stages selected by `required`. Returns whether any
    /// stage ran.
    pub fn update(&mut self, model: &mut TextModel, required: OperationsMask) -> bool {
        let operations = model.operations_pending & required;
        if operations.is_empty() {
            return false;
        }

        let number_of_characters = model.number_of_characters();
        let paragraph_characters = model.calculate_text_update_indices();

        let info = &model.update_info;
        if info.paragraph_character_index > number_of_characters
            || info.requested_number_of_characters > number_of_characters
        {
            if number_of_characters == 0 {
                model.update_info.clear();
                model.update_info.clear_all = true;
            } else {
                log::error!(
                    "invalid update indices: paragraph_character_index {}, requested {}, \
                     characters {}, character_index {}, to_remove {}, to_add {}, previous {}, \
                     start_glyph {}, start_line {}, estimated_lines {}, clear_all {}, \
                     full_relayout {}, last_new_paragraph {}, text {:?}",
                    info.paragraph_character_index,
                    info.requested_number_of_characters,
                    number_of_characters,
                    info.character_index,
                    info.number_of_characters_to_remove,
                    info.number_of_characters_to_add,
                    info.previous_number_of_characters,
                    info.start_glyph_index,
                    info.start_line_index,
                    info.estimated_number_of_lines,
                    info.clear_all,
                    info.full_relayout_needed,
                    info.is_last_character_new_paragraph,
                    model.text(),
                );
                return false;
            }
        }

        let start_index = model.update_info.paragraph_character_index;
        let requested = model.update_info.requested_number_of_characters;

        if model.update_info.clear_all || paragraph_characters != 0 {
            let end_index = start_index + paragraph_characters.saturating_sub(1);
            model.clear_model_data(start_index, end_index, operations);
        }
        model.update_info.clear_all = false;

        log::debug!(
            "updating {:?} for {} characters from {}",
            operations,
            requested,
            start_index
        );

        let mut updated = false;

        if operations.contains(OperationsMask::GET_LINE_BREAKS) {
            let logical = &mut model.logical;
            set_line_break_info(
                &logical.text,
                start_index,
                requested,
                &mut logical.line_break_info,
            );
            if model.config.line_wrap_mode.needs_hyphenation() {
                set_hyphenation_info(
                    &logical.text,
                    start_index,
                    requested,
                    self.hyphenator.as_ref(),
                    &mut logical.line_break_info,
                );
            }
            logical.create_paragraph_info(start_index, requested);
            updated = true;
        }

        if operations.contains(OperationsMask::GET_SCRIPTS) {
            let logical = &mut model.logical;
            set_scripts(&logical.text, start_index, requested, &mut logical.script_runs);
            updated = true;
        }

        if operations.contains(OperationsMask::VALIDATE_FONTS) {
            let default_description = self.default_description(model);
            let default_point_size = self.default_point_size(model);
            let logical = &mut model.logical;
            validate_fonts(
                self.font_client.as_ref(),
                &logical.text,
                &logical.script_runs,
                &logical.font_description_runs,
                &default_description,
                default_point_size,
                start_index,
                requested,
                &mut logical.font_runs,
            );
            updated = true;
        }

        let mut mirrored_text = None;
        if operations.contains(OperationsMask::BIDI_INFO) {
            let match_system = model.config.match_system_language_direction();
            let layout_direction = model.config.layout_direction;
            let logical = &mut model.logical;
            set_bidirectional_info(
                &logical.text,
                &logical.script_runs,
                &logical.line_break_info,
                start_index,
                requested,
                &mut logical.bidirectional_paragraph_info,
                match_system,
                layout_direction,
            );

            if logical.bidirectional_paragraph_info.is_empty() {
                logical.character_directions.clear();
            } else {
                get_characters_direction(
                    &logical.bidirectional_paragraph_info,
                    number_of_characters,
                    start_index,
                    requested,
                    &mut logical.character_directions,
                );
                mirrored_text = get_mirrored_text(
                    &logical.text,
                    &logical.character_directions,
                    &logical.bidirectional_paragraph_info,
                    start_index,
                    requested,
                );
            }
            updated = true;
        }

        let start_glyph = model.update_info.start_glyph_index;
        let mut new_paragraph_glyphs: Vec<GlyphIndex> = Vec::new();
        let mut number_of_new_glyphs = 0;

        if operations.contains(OperationsMask::SHAPE_TEXT) {
            let logical = &model.logical;
            let visual = &mut model.visual;
            let text = mirrored_text.as_deref().unwrap_or(logical.text.as_slice());

            number_of_new_glyphs = shape_text(
                self.shaper.as_ref(),
                self.font_client.as_ref(),
                text,
                &logical.line_break_info,
                &logical.script_runs,
                &logical.font_runs,
                start_index,
                start_glyph,
                requested,
                ShapedGlyphs {
                    glyphs: &mut visual.glyphs,
                    glyphs_to_characters: &mut visual.glyphs_to_characters,
                    characters_per_glyph: &mut visual.characters_per_glyph,
                    new_paragraph_glyphs: &mut new_paragraph_glyphs,
                },
            );

            visual.create_glyphs_per_character_table(start_index, start_glyph, requested);
            visual.create_character_to_glyph_table(start_index, start_glyph, requested);
            updated = true;
        }

        if operations.contains(OperationsMask::GET_GLYPH_METRICS) {
            let glyphs = &mut model.visual.glyphs;
            let end_glyph = (start_glyph + number_of_new_glyphs).min(glyphs.len());
            if start_glyph < end_glyph {
                for glyph in &mut glyphs[start_glyph..end_glyph] {
                    self.font_client.glyph_metrics(glyph);
                }
            }

            for &index in &new_paragraph_glyphs {
                if let Some(glyph) = glyphs.get_mut(index) {
                    glyph.x_bearing = 0.0;
                    glyph.width = 0.0;
                    glyph.advance = 0.0;
                }
            }
            updated = true;
        }

        let preedit_styled =
            model.preedit.active && !model.visual.characters_to_glyph.is_empty();
        if preedit_styled {
            apply_preedit_styles(&mut model.preedit, &mut model.logical, &mut model.visual);
            updated = true;
        }

        if operations.contains(OperationsMask::COLOR) {
            let logical = &model.logical;
            let visual = &mut model.visual;
            set_color_segmentation_info(
                &logical.color_runs,
                &visual.characters_to_glyph,
                &visual.glyphs_per_character,
                start_index,
                start_glyph,
                requested,
                &mut visual.colors,
                &mut visual.color_indices,
            );
            set_color_segmentation_info(
                &logical.background_color_runs,
                &visual.characters_to_glyph,
                &visual.glyphs_per_character,
                start_index,
                start_glyph,
                requested,
                &mut visual.background_colors,
                &mut visual.background_color_indices,
            );
            updated = true;
        }

        if operations.contains(OperationsMask::SHAPE_TEXT) && !preedit_styled {
            copy_runs_to_visual_model(model);
            updated = true;
        }

        model.operations_pending.remove(operations);
        if model.operations_pending.is_empty() {
            model.update_info.clear();
        }

        model.update_info.estimated_number_of_lines = model
            .visual
            .lines
            .len()
            .max(model.logical.paragraph_info.len());
        model.update_info.previous_number_of_characters = number_of_characters;

        updated
    }

    fn default_description(&self, model: &TextModel) -> FontDescription {
        match self.active_font_defaults(model) {
            Some(defaults) => defaults.description.clone(),
            None => FontDescription {
                family: model.config.default_font_family.clone(),
                ..Default::default()
            },
        }
    }

    fn active_font_defaults<'m>(&self, model: &'m TextModel) -> Option<&'m FontDefaults> {
        if model.showing_placeholder {
            if let Some(placeholder) = &model.placeholder_font {
                return Some(placeholder);
            }
        }
        model.font_defaults.as_ref()
    }

    /// Default point size in 26.6 units
    fn default_point_size(&self, model: &TextModel) -> PointSize26Dot6 {
        let scale = model.config.font_size_scale;
        let points_per_unit = self.font_client.points_per_unit() as f32;

        if model.showing_placeholder {
            if let Some(placeholder) = model.placeholder_font.as_ref().filter(|f| f.size_defined) {
                return (placeholder.default_point_size * scale * points_per_unit)
                    as PointSize26Dot6;
            }
        }

        match &model.font_defaults {
            Some(defaults) if model.text_fit_enabled => {
                (defaults.fit_point_size * points_per_unit) as PointSize26Dot6
            }
            Some(defaults) => {
                (defaults.default_point_size * scale * points_per_unit) as PointSize26Dot6
            }
            None => (DEFAULT_POINT_SIZE as f32 * scale) as PointSize26Dot6,
        }
    }
}

/// Glyph run covering every glyph of `run`, `None` when the run is empty or
/// outside the shaped characters
fn glyph_run_for(visual: &VisualModel, run: CharacterRun) -> Option<GlyphRun> {
    if run.number_of_characters == 0 || run.end() > visual.characters_to_glyph.len() {
        return None;
    }
    Some(GlyphRun {
        glyph_index: visual.characters_to_glyph[run.character_index],
        number_of_glyphs: visual.number_of_glyphs_for(run.character_index, run.number_of_characters),
    })
}

fn copy_runs_to_visual_model(model: &mut TextModel) {
    let logical = &model.logical;
    if logical.underlined_character_runs.is_empty()
        && logical.strikethrough_character_runs.is_empty()
        && logical.character_spacing_character_runs.is_empty()
    {
        return;
    }

    let visual = &mut model.visual;

    let underlines: Vec<_> = logical
        .underlined_character_runs
        .iter()
        .filter_map(|run| {
            glyph_run_for(visual, run.character_run).map(|glyph_run| UnderlinedGlyphRun {
                glyph_run,
                properties: run.properties,
            })
        })
        .collect();
    let strikethroughs: Vec<_> = logical
        .strikethrough_character_runs
        .iter()
        .filter_map(|run| {
            glyph_run_for(visual, run.character_run).map(|glyph_run| StrikethroughGlyphRun {
                glyph_run,
                color: run.color,
                height: run.height,
            })
        })
        .collect();
    let spacings: Vec<_> = logical
        .character_spacing_character_runs
        .iter()
        .filter_map(|run| {
            glyph_run_for(visual, run.character_run).map(|glyph_run| CharacterSpacingGlyphRun {
                glyph_run,
                value: run.value,
            })
        })
        .collect();

    visual.underline_runs = underlines;
    visual.strikethrough_runs = strikethroughs;
    visual.character_spacing_runs = spacings;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnderlinedCharacterRun;

    #[test]
    fn nothing_pending_is_a_no_op() {
        let mut updater = ModelUpdater::default();
        let mut model = TextModel::default();
        assert!(!updater.update(&mut model, OperationsMask::ALL_OPERATIONS));
    }

    #[test]
    fn full_update_builds_every_table() {
        let mut updater = ModelUpdater::default();
        let mut model = TextModel::default();
        model.set_text("hello world\nbye");

        assert!(updater.update(&mut model, OperationsMask::ALL_OPERATIONS));

        let n = model.number_of_characters();
        assert_eq!(model.logical.line_break_info.len(), n);
        assert_eq!(model.logical.paragraph_info.len(), 2);
        assert_eq!(model.visual.glyphs.len(), n);
        assert_eq!(model.visual.characters_to_glyph.len(), n);
        assert_eq!(model.update_info.previous_number_of_characters, n);
        assert!(model.operations_pending.is_empty());
        // the paragraph separator takes no room
        assert_eq!(model.visual.glyphs[11].advance, 0.0);
        assert!(model.visual.glyphs[0].advance > 0.0);
    }

    #[test]
    fn partial_operations_stay_pending() {
        let mut updater = ModelUpdater::default();
        let mut model = TextModel::default();
        model.set_text("abc");

        assert!(updater.update(&mut model, OperationsMask::GET_LINE_BREAKS));
        assert_eq!(
            model.operations_pending,
            OperationsMask::ALL_OPERATIONS - OperationsMask::GET_LINE_BREAKS
        );
        assert!(!updater.update(&mut model, OperationsMask::GET_LINE_BREAKS));
    }

    #[test]
    fn default_point_size_follows_font_defaults() {
        let updater = ModelUpdater::default();
        let mut model = TextModel::default();
        assert_eq!(updater.default_point_size(&model), DEFAULT_POINT_SIZE);

        model.config.font_size_scale = 2.0;
        model.font_defaults = Some(FontDefaults {
            default_point_size: 10.0,
            fit_point_size: 7.0,
            ..Default::default()
        });
        assert_eq!(updater.default_point_size(&model), 1280);

        model.text_fit_enabled = true;
        assert_eq!(updater.default_point_size(&model), 448);
    }

    #[test]
    fn underline_runs_are_copied_to_glyphs() {
        let mut updater = ModelUpdater::default();
        let mut model = TextModel::default();
        model.set_text("abcdef");
        model.logical.underlined_character_runs.push(UnderlinedCharacterRun {
            character_run: CharacterRun::new(2, 3),
            properties: Default::default(),
        });

        updater.update(&mut model, OperationsMask::ALL_OPERATIONS);

        assert_eq!(model.visual.underline_runs.len(), 1);
        assert_eq!(model.visual.underline_runs[0].glyph_run.glyph_index, 2);
        assert_eq!(model.visual.underline_runs[0].glyph_run.number_of_glyphs, 3);
    }
}
