//! Visual text model: glyphs and glyph-indexed tables

use crate::types::{
    CharacterIndex, CharacterSpacingGlyphRun, Color, ColorIndex, GlyphIndex, GlyphInfo, LineRun,
    StrikethroughGlyphRun, UnderlinedGlyphRun,
};

#[derive(Debug, Clone)]
pub struct VisualModel {
    pub glyphs: Vec<GlyphInfo>,
    pub glyphs_to_characters: Vec<CharacterIndex>,
    pub characters_per_glyph: Vec<usize>,
    pub characters_to_glyph: Vec<GlyphIndex>,
    pub glyphs_per_character: Vec<usize>,
    pub glyph_positions: Vec<(f32, f32)>,
    pub lines: Vec<LineRun>,
    /// Per glyph index into `colors`, 0 selects the text color
    pub color_indices: Vec<ColorIndex>,
    pub colors: Vec<Color>,
    /// Per glyph index into `background_colors`, 0 means no background
    pub background_color_indices: Vec<ColorIndex>,
    pub background_colors: Vec<Color>,
    pub underline_runs: Vec<UnderlinedGlyphRun>,
    pub strikethrough_runs: Vec<StrikethroughGlyphRun>,
    pub character_spacing_runs: Vec<CharacterSpacingGlyphRun>,
    pub text_color: Color,
    pub background_color: Color,
}

impl Default for VisualModel {
    fn default() -> Self {
        Self {
            glyphs: Vec::new(),
            glyphs_to_characters: Vec::new(),
            characters_per_glyph: Vec::new(),
            characters_to_glyph: Vec::new(),
            glyphs_per_character: Vec::new(),
            glyph_positions: Vec::new(),
            lines: Vec::new(),
            color_indices: Vec::new(),
            colors: Vec::new(),
            background_color_indices: Vec::new(),
            background_colors: Vec::new(),
            underline_runs: Vec::new(),
            strikethrough_runs: Vec::new(),
            character_spacing_runs: Vec::new(),
            text_color: Color::BLACK,
            background_color: Color::TRANSPARENT,
        }
    }
}

impl VisualModel {
    #[inline]
    pub fn number_of_glyphs(&self) -> usize {
        self.glyphs.len()
    }

    /// Fills the glyphs-per-character table for `count` characters starting
    /// at `start_index`, whose glyphs start at `start_glyph`.
    ///
    /// The first character of a cluster receives the cluster's glyph count,
    /// the remaining characters of the cluster receive zero.
    pub fn create_glyphs_per_character_table(
        &mut self,
        start_index: CharacterIndex,
        start_glyph: GlyphIndex,
        count: usize,
    ) {
        if count == 0 {
            return;
        }

        let total_glyphs = self.characters_per_glyph.len();
        let mut table = Vec::with_capacity(count);
        let mut traversed = 0;
        let mut glyph = start_glyph;

        while traversed < count && glyph < total_glyphs {
            let characters = self.characters_per_glyph[glyph];
            let mut number_of_glyphs = 1;
            while glyph + number_of_glyphs < total_glyphs
                && self.characters_per_glyph[glyph + number_of_glyphs] == 0
            {
                number_of_glyphs += 1;
            }

            if characters > 0 {
                table.push(number_of_glyphs);
                table.extend(std::iter::repeat(0).take(characters - 1));
                traversed += characters;
            }
            glyph += number_of_glyphs;
        }

        let at = start_index.min(self.glyphs_per_character.len());
        self.glyphs_per_character.splice(at..at, table);
    }

    /// Fills the character-to-glyph table for the range and shifts the
    /// entries of the following characters by the number of new glyphs
    pub fn create_character_to_glyph_table(
        &mut self,
        start_index: CharacterIndex,
        start_glyph: GlyphIndex,
        count: usize,
    ) {
        if count == 0 {
            return;
        }

        let total_glyphs = self.characters_per_glyph.len();
        let mut table = Vec::with_capacity(count);
        let mut traversed = 0;
        let mut glyph = start_glyph;

        while traversed < count && glyph < total_glyphs {
            let characters = self.characters_per_glyph[glyph];
            table.extend(std::iter::repeat(glyph).take(characters));
            traversed += characters;
            glyph += 1;
        }
        while glyph < total_glyphs && self.characters_per_glyph[glyph] == 0 {
            glyph += 1;
        }

        let inserted_glyphs = glyph - start_glyph;
        let at = start_index.min(self.characters_to_glyph.len());
        for entry in &mut self.characters_to_glyph[at..] {
            *entry += inserted_glyphs;
        }
        self.characters_to_glyph.splice(at..at, table);
    }

    /// Total number of glyphs shaped for the characters in `[start, start + count)`
    pub fn number_of_glyphs_for(&self, start: CharacterIndex, count: usize) -> usize {
        self.glyphs_per_character
            .iter()
            .skip(start)
            .take(count)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_handle_clusters() {
        let mut model = VisualModel {
            // glyph 1 covers two characters, glyph 3 is an extra glyph of character 3
            characters_per_glyph: vec![1, 2, 1, 0],
            ..Default::default()
        };
        model.create_glyphs_per_character_table(0, 0, 4);
        model.create_character_to_glyph_table(0, 0, 4);
        assert_eq!(model.glyphs_per_character, vec![1, 1, 0, 2]);
        assert_eq!(model.characters_to_glyph, vec![0, 1, 1, 2]);
    }

    #[test]
    fn character_to_glyph_shifts_following_entries() {
        let mut model = VisualModel {
            characters_per_glyph: vec![1, 1, 1],
            characters_to_glyph: vec![0, 1],
            ..Default::default()
        };
        // one new glyph for one new character at the front
        model.create_character_to_glyph_table(0, 0, 1);
        assert_eq!(model.characters_to_glyph, vec![0, 1, 2]);
    }
}
