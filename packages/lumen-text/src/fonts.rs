//! Font client interface and font validation
//!
//! Validation guarantees every character of the updated range ends up
//! covered by a font run. Per-run descriptions override the default
//! description field by field; characters a font cannot render fall back
//! to a font whose coverage includes their script.

use std::sync::atomic::{AtomicU32, Ordering};

use ahash::AHashMap;
use parking_lot::RwLock;
use smallvec::SmallVec;
use unicode_script::{Script, UnicodeScript};

use crate::config::POINTS_PER_UNIT;
use crate::error::{TextError, TextResult};
use crate::logical_model::{insert_runs, run_at};
use crate::types::{
    CharacterIndex, CharacterRun, FontDescription, FontDescriptionRun, FontId, FontRun,
    GlyphInfo, PointSize26Dot6, ScriptRun,
};

/// Font lookup and metrics service used by the model updater
pub trait FontClient {
    /// Number of 26.6 units in one point
    fn points_per_unit(&self) -> u32 {
        POINTS_PER_UNIT
    }

    fn find_font(
        &self,
        description: &FontDescription,
        point_size: PointSize26Dot6,
    ) -> TextResult<FontId>;

    /// A font able to render `character`, if any
    fn find_fallback_font(
        &self,
        character: char,
        description: &FontDescription,
        point_size: PointSize26Dot6,
    ) -> Option<FontId>;

    fn is_character_supported(&self, font_id: FontId, character: char) -> bool;

    fn glyph_index(&self, font_id: FontId, character: char) -> u32;

    /// Fills width, height, bearings and advance of a shaped glyph
    fn glyph_metrics(&self, glyph: &mut GlyphInfo);
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FontKey {
    family: String,
    weight: u16,
    italic: bool,
    point_size: PointSize26Dot6,
}

#[derive(Debug, Clone)]
struct FontData {
    point_size: PointSize26Dot6,
    coverage: Option<SmallVec<[Script; 4]>>,
}

/// In-memory font client with script-based coverage and synthetic metrics
#[derive(Debug)]
pub struct BasicFontClient {
    /// Family name (lowercase) to script coverage, `None` covers everything
    families: RwLock<AHashMap<String, Option<SmallVec<[Script; 4]>>>>,
    family_order: RwLock<Vec<String>>,
    lookup: RwLock<AHashMap<FontKey, FontId>>,
    fonts: RwLock<Vec<FontData>>,
    next_id: AtomicU32,
    default_family: String,
}

impl BasicFontClient {
    /// Creates a client whose default family covers every script
    pub fn new(default_family: &str) -> Self {
        let client = Self {
            families: RwLock::new(AHashMap::new()),
            family_order: RwLock::new(Vec::new()),
            lookup: RwLock::new(AHashMap::new()),
            fonts: RwLock::new(Vec::new()),
            next_id: AtomicU32::new(1),
            default_family: default_family.to_lowercase(),
        };
        client.register_family(default_family, None);
        client
    }

    /// Registers a family, `scripts = None` means full coverage
    pub fn register_family(&self, family: &str, scripts: Option<&[Script]>) {
        let name = family.to_lowercase();
        let coverage = scripts.map(|s| s.iter().copied().collect());
        if self.families.write().insert(name.clone(), coverage).is_none() {
            self.family_order.write().push(name);
        }
    }

    pub fn number_of_fonts(&self) -> usize {
        self.fonts.read().len()
    }

    fn font_data(&self, font_id: FontId) -> Option<FontData> {
        let index = font_id.checked_sub(1)? as usize;
        self.fonts.read().get(index).cloned()
    }

    fn family_name(&self, description: &FontDescription) -> String {
        if description.family.is_empty() {
            self.default_family.clone()
        } else {
            description.family.to_lowercase()
        }
    }

    fn font_for_key(&self, key: FontKey) -> TextResult<FontId> {
        if let Some(id) = self.lookup.read().get(&key) {
            return Ok(*id);
        }

        let coverage = self
            .families
            .read()
            .get(&key.family)
            .cloned()
            .ok_or_else(|| TextError::FontNotFound(key.family.clone()))?;

        let mut lookup = self.lookup.write();
        if let Some(id) = lookup.get(&key) {
            return Ok(*id);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.fonts.write().push(FontData {
            point_size: key.point_size,
            coverage,
        });
        log::debug!("new font {} for '{}' at {}", id, key.family, key.point_size);
        lookup.insert(key, id);
        Ok(id)
    }
}

impl Default for BasicFontClient {
    fn default() -> Self {
        Self::new("sans")
    }
}

fn covers(coverage: &Option<SmallVec<[Script; 4]>>, character: char) -> bool {
    match coverage {
        None => true,
        Some(scripts) => {
            let script = character.script();
            matches!(script, Script::Common | Script::Inherited) || scripts.contains(&script)
        }
    }
}

impl FontClient for BasicFontClient {
    fn find_font(
        &self,
        description: &FontDescription,
        point_size: PointSize26Dot6,
    ) -> TextResult<FontId> {
        self.font_for_key(FontKey {
            family: self.family_name(description),
            weight: description.weight,
            italic: description.italic,
            point_size,
        })
    }

    fn find_fallback_font(
        &self,
        character: char,
        description: &FontDescription,
        point_size: PointSize26Dot6,
    ) -> Option<FontId> {
        let family = {
            let families = self.families.read();
            self.family_order
                .read()
                .iter()
                .find(|name| families.get(*name).is_some_and(|c| covers(c, character)))
                .cloned()?
        };
        self.font_for_key(FontKey {
            family,
            weight: description.weight,
            italic: description.italic,
            point_size,
        })
        .ok()
    }

    fn is_character_supported(&self, font_id: FontId, character: char) -> bool {
        self.font_data(font_id)
            .is_some_and(|font| covers(&font.coverage, character))
    }

    fn glyph_index(&self, font_id: FontId, character: char) -> u32 {
        if self.is_character_supported(font_id, character) {
            character as u32
        } else {
            0
        }
    }

    fn glyph_metrics(&self, glyph: &mut GlyphInfo) {
        let Some(font) = self.font_data(glyph.font_id) else {
            return;
        };
        let pixels = font.point_size as f32 / POINTS_PER_UNIT as f32;
        glyph.width = pixels * 0.6;
        glyph.advance = pixels * 0.6;
        glyph.height = pixels * 1.2;
        glyph.x_bearing = 0.0;
        glyph.y_bearing = pixels * 0.8;
        glyph.scale_factor = 1.0;
    }
}

/// Validates the fonts of `[start_index, start_index + count)` and splices
/// the resulting runs into `font_runs`
#[allow(clippy::too_many_arguments)]
pub fn validate_fonts(
    font_client: &dyn FontClient,
    text: &[char],
    scripts: &[ScriptRun],
    font_description_runs: &[FontDescriptionRun],
    default_description: &FontDescription,
    default_point_size: PointSize26Dot6,
    start_index: CharacterIndex,
    count: usize,
    font_runs: &mut Vec<FontRun>,
) {
    if count == 0 {
        return;
    }

    let points_per_unit = font_client.points_per_unit() as f32;
    let mut cache: AHashMap<(FontDescription, PointSize26Dot6), Option<FontId>> = AHashMap::new();
    let mut new_runs: Vec<FontRun> = Vec::new();

    for index in start_index..start_index + count {
        let character = text[index];

        let mut description = default_description.clone();
        let mut point_size = default_point_size;
        for run in font_description_runs
            .iter()
            .filter(|run| run.character_run.contains(index))
        {
            if let Some(family) = &run.family {
                description.family.clone_from(family);
            }
            if let Some(weight) = run.weight {
                description.weight = weight;
            }
            if let Some(italic) = run.italic {
                description.italic = italic;
            }
            if let Some(size) = run.size {
                point_size = (size * points_per_unit) as PointSize26Dot6;
            }
        }

        let font = *cache
            .entry((description.clone(), point_size))
            .or_insert_with(|| match font_client.find_font(&description, point_size) {
                Ok(id) => Some(id),
                Err(err) => {
                    log::warn!("{err}, using the default font");
                    font_client.find_font(default_description, point_size).ok()
                }
            });

        let font_id = match font {
            Some(id) if font_client.is_character_supported(id, character) => id,
            other => font_client
                .find_fallback_font(character, &description, point_size)
                .or(other)
                .unwrap_or_default(),
        };

        let script_starts_here = run_at(scripts, index)
            .is_some_and(|run| run.character_run.character_index == index);

        match new_runs.last_mut() {
            Some(last) if last.font_id == font_id && !script_starts_here => {
                last.character_run.number_of_characters += 1;
            }
            _ => new_runs.push(FontRun {
                character_run: CharacterRun::new(index, 1),
                font_id,
            }),
        }
    }

    insert_runs(font_runs, new_runs, start_index, count);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripts::set_scripts;

    #[test]
    fn same_description_reuses_font() {
        let client = BasicFontClient::default();
        let description = FontDescription::default();
        let a = client.find_font(&description, 768).unwrap();
        let b = client.find_font(&description, 768).unwrap();
        let c = client.find_font(&description, 1024).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(client.number_of_fonts(), 2);
    }

    #[test]
    fn unknown_family_is_an_error() {
        let client = BasicFontClient::default();
        let description = FontDescription {
            family: "missing".into(),
            ..Default::default()
        };
        assert!(matches!(
            client.find_font(&description, 768),
            Err(TextError::FontNotFound(_))
        ));
    }

    #[test]
    fn unsupported_characters_fall_back() {
        let client = BasicFontClient::new("latin");
        client.register_family("latin", Some(&[Script::Latin]));
        client.register_family("hebrew", Some(&[Script::Hebrew]));

        let text: Vec<char> = "ab \u{05D0}".chars().collect();
        let mut scripts = Vec::new();
        set_scripts(&text, 0, text.len(), &mut scripts);

        let mut runs = Vec::new();
        validate_fonts(
            &client,
            &text,
            &scripts,
            &[],
            &FontDescription::default(),
            768,
            0,
            text.len(),
            &mut runs,
        );

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].character_run, CharacterRun::new(0, 3));
        assert_eq!(runs[1].character_run, CharacterRun::new(3, 1));
        assert!(client.is_character_supported(runs[1].font_id, '\u{05D0}'));
    }

    #[test]
    fn description_runs_override_point_size() {
        let client = BasicFontClient::default();
        let text: Vec<char> = "abcd".chars().collect();
        let overrides = [FontDescriptionRun {
            character_run: CharacterRun::new(2, 2),
            family: None,
            weight: None,
            italic: None,
            size: Some(20.0),
        }];
        let mut runs = Vec::new();
        validate_fonts(
            &client,
            &text,
            &[],
            &overrides,
            &FontDescription::default(),
            768,
            0,
            4,
            &mut runs,
        );
        assert_eq!(runs.len(), 2);
        assert_ne!(runs[0].font_id, runs[1].font_id);
    }
}
