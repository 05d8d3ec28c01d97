//! Maps character color runs onto glyph color indices

use crate::types::{CharacterIndex, Color, ColorIndex, ColorRun, GlyphIndex};

/// 1-based index of `color` in the palette, appending it when missing.
/// Index 0 is reserved for "no run color".
pub fn find_color(colors: &mut Vec<Color>, color: Color) -> ColorIndex {
    if let Some(position) = colors.iter().position(|c| *c == color) {
        return (position + 1) as ColorIndex;
    }
    colors.push(color);
    colors.len() as ColorIndex
}

/// Computes the color index of every glyph shaped for
/// `[start_character, start_character + count)` and inserts them at
/// `start_glyph`
#[allow(clippy::too_many_arguments)]
pub fn set_color_segmentation_info(
    color_runs: &[ColorRun],
    characters_to_glyph: &[GlyphIndex],
    glyphs_per_character: &[usize],
    start_character: CharacterIndex,
    start_glyph: GlyphIndex,
    count: usize,
    colors: &mut Vec<Color>,
    color_indices: &mut Vec<ColorIndex>,
) {
    if characters_to_glyph.is_empty() || count == 0 {
        return;
    }

    let end = (start_character + count).min(characters_to_glyph.len());
    let number_of_new_glyphs: usize = glyphs_per_character
        .iter()
        .skip(start_character)
        .take(end.saturating_sub(start_character))
        .sum();

    let mut new_indices: Vec<ColorIndex> = vec![0; number_of_new_glyphs];

    for run in color_runs {
        let first = run.character_run.character_index.max(start_character);
        let last = run.character_run.end().min(end);
        if first >= last {
            continue;
        }

        let color_index = find_color(colors, run.color);
        for character in first..last {
            let glyph = characters_to_glyph[character];
            let glyphs = glyphs_per_character.get(character).copied().unwrap_or(0);
            for g in glyph..glyph + glyphs {
                if let Some(slot) = g.checked_sub(start_glyph).and_then(|i| new_indices.get_mut(i)) {
                    *slot = color_index;
                }
            }
        }
    }

    if color_indices.len() < start_glyph {
        color_indices.resize(start_glyph, 0);
    }
    color_indices.splice(start_glyph..start_glyph, new_indices);
}
