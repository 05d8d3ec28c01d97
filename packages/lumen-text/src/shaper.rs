//! Glyph shaping
//!
//! The range is cut into segments sharing one font, one script and one
//! paragraph. Each segment goes through a [`Shaper`]; the produced glyphs are
//! inserted at the start glyph without touching glyphs outside the range.

use unicode_script::Script;
use unicode_segmentation::UnicodeSegmentation;

use crate::fonts::FontClient;
use crate::logical_model::run_at;
use crate::scripts::is_new_paragraph;
use crate::types::{
    CharacterIndex, FontId, FontRun, GlyphIndex, GlyphInfo, LineBreakInfo, ScriptRun,
};

/// Converts one font/script segment into glyphs
pub trait Shaper {
    /// Appends glyphs for `segment` and, per glyph, the number of characters
    /// it covers. Extra glyphs of a cluster cover zero characters.
    fn shape_segment(
        &self,
        font_client: &dyn FontClient,
        segment: &[char],
        font_id: FontId,
        script: Script,
        glyphs: &mut Vec<GlyphInfo>,
        characters_per_glyph: &mut Vec<usize>,
    );
}

/// One glyph per extended grapheme cluster
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterShaper;

impl Shaper for ClusterShaper {
    fn shape_segment(
        &self,
        font_client: &dyn FontClient,
        segment: &[char],
        font_id: FontId,
        _script: Script,
        glyphs: &mut Vec<GlyphInfo>,
        characters_per_glyph: &mut Vec<usize>,
    ) {
        let source: String = segment.iter().collect();
        for cluster in source.graphemes(true) {
            let mut characters = cluster.chars();
            let Some(first) = characters.next() else {
                continue;
            };
            glyphs.push(GlyphInfo {
                font_id,
                index: font_client.glyph_index(font_id, first),
                scale_factor: 1.0,
                ..Default::default()
            });
            characters_per_glyph.push(1 + characters.count());
        }
    }
}

/// Output tables of [`shape_text`]
pub struct ShapedGlyphs<'a> {
    pub glyphs: &'a mut Vec<GlyphInfo>,
    pub glyphs_to_characters: &'a mut Vec<CharacterIndex>,
    pub characters_per_glyph: &'a mut Vec<usize>,
    /// Glyphs of paragraph separators, their advance is cleared by the metrics pass
    pub new_paragraph_glyphs: &'a mut Vec<GlyphIndex>,
}

/// Shapes `[start_index, start_index + count)` and inserts the glyphs at
/// `start_glyph`. Glyphs after the insertion point have their character
/// index shifted by `count`.
#[allow(clippy::too_many_arguments)]
pub fn shape_text(
    shaper: &dyn Shaper,
    font_client: &dyn FontClient,
    text: &[char],
    line_break_info: &[LineBreakInfo],
    scripts: &[ScriptRun],
    fonts: &[FontRun],
    start_index: CharacterIndex,
    start_glyph: GlyphIndex,
    count: usize,
    output: ShapedGlyphs<'_>,
) -> usize {
    if count == 0 {
        return 0;
    }

    let end = start_index + count;
    let mut new_glyphs = Vec::with_capacity(count);
    let mut new_characters_per_glyph = Vec::with_capacity(count);
    let mut new_glyphs_to_characters = Vec::with_capacity(count);

    let mut index = start_index;
    while index < end {
        let font = run_at(fonts, index);
        let script = run_at(scripts, index);

        let mut segment_end = end;
        if let Some(run) = font {
            segment_end = segment_end.min(run.character_run.end());
        }
        if let Some(run) = script {
            segment_end = segment_end.min(run.character_run.end());
        }
        if let Some(offset) = line_break_info[index..segment_end]
            .iter()
            .position(|info| *info == LineBreakInfo::MustBreak)
        {
            segment_end = index + offset + 1;
        }

        let first_new_glyph = new_glyphs.len();
        shaper.shape_segment(
            font_client,
            &text[index..segment_end],
            font.map(|run| run.font_id).unwrap_or_default(),
            script.map(|run| run.script).unwrap_or(Script::Latin),
            &mut new_glyphs,
            &mut new_characters_per_glyph,
        );

        let mut character = index;
        for &characters in &new_characters_per_glyph[first_new_glyph..] {
            new_glyphs_to_characters.push(character);
            character += characters;
        }

        let last_character = segment_end - 1;
        if is_new_paragraph(text[last_character])
            && line_break_info[last_character] == LineBreakInfo::MustBreak
            && new_glyphs.len() > first_new_glyph
        {
            output
                .new_paragraph_glyphs
                .push(start_glyph + new_glyphs.len() - 1);
        }

        index = segment_end;
    }

    let at = start_glyph.min(output.glyphs.len());
    for entry in &mut output.glyphs_to_characters[at..] {
        *entry += count;
    }

    let added = new_glyphs.len();
    output.glyphs.splice(at..at, new_glyphs);
    output
        .glyphs_to_characters
        .splice(at..at, new_glyphs_to_characters);
    output
        .characters_per_glyph
        .splice(at..at, new_characters_per_glyph);

    log::debug!("shaped {count} characters into {added} glyphs at glyph {at}");
    added
}
