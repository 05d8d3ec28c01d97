//! Input method pre-edit decoration
//!
//! Pre-edit attributes are relative to the composition string, which starts
//! at `cursor_position - preedit_length` in the text.

use crate::logical_model::LogicalModel;
use crate::types::{CharacterRun, Color, ColorRun, GlyphRun, UnderlineProperties, UnderlinedGlyphRun};
use crate::visual_model::VisualModel;

const BRIGHTNESS_THRESHOLD: f32 = 0.179;

const BACKGROUND_SUB4: Color = Color::new(0.58, 0.87, 0.96, 1.0);
const BACKGROUND_SUB5: Color = Color::new(0.83, 0.94, 0.98, 1.0);
const BACKGROUND_SUB6: Color = Color::new(1.0, 0.5, 0.5, 1.0);
const BACKGROUND_SUB7: Color = Color::new(1.0, 0.8, 0.8, 1.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreeditStyle {
    #[default]
    None,
    Underline,
    Reverse,
    Highlight,
    CustomPlatformStyle1,
    CustomPlatformStyle2,
    CustomPlatformStyle3,
    CustomPlatformStyle4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreeditAttribute {
    pub style: PreeditStyle,
    pub start_index: usize,
    pub end_index: usize,
}

/// Composition state supplied by the input method
#[derive(Debug, Clone, Default)]
pub struct PreeditState {
    pub active: bool,
    pub cursor_position: usize,
    pub preedit_length: usize,
    pub attributes: Vec<PreeditAttribute>,
    /// Background of the hosting control, `None` when no control is attached
    pub control_background_color: Option<Color>,
}

impl PreeditState {
    /// Number of committed characters before the composition string
    #[inline]
    pub fn number_of_commit(&self) -> usize {
        self.cursor_position.saturating_sub(self.preedit_length)
    }
}

/// Synthesizes color, background and underline runs for the pre-edit
/// attributes. The attributes are consumed.
pub fn apply_preedit_styles(
    state: &mut PreeditState,
    logical: &mut LogicalModel,
    visual: &mut VisualModel,
) {
    let commit = state.number_of_commit();

    for attribute in state.attributes.drain(..) {
        let index = attribute.start_index + commit;
        let count = attribute.end_index.saturating_sub(attribute.start_index);
        let character_run = CharacterRun::new(index, count);
        let underline = UnderlinedGlyphRun {
            glyph_run: GlyphRun {
                glyph_index: index,
                number_of_glyphs: count,
            },
            properties: UnderlineProperties::default(),
        };

        log::debug!(
            "preedit style {:?} at {} ({} chars)",
            attribute.style,
            index,
            count
        );

        match attribute.style {
            PreeditStyle::Underline => visual.underline_runs.push(underline),
            PreeditStyle::Reverse => {
                let text_color = visual.text_color;
                logical.background_color_runs.push(ColorRun {
                    character_run,
                    color: text_color,
                });

                let mut background = visual.background_color;
                if background.a == 0.0 {
                    if let Some(control_background) = state.control_background_color {
                        background = control_background;
                        if background.a == 0.0 {
                            background = if text_color.luminance() > BRIGHTNESS_THRESHOLD {
                                Color::BLACK
                            } else {
                                Color::WHITE
                            };
                        }
                    }
                }
                logical.color_runs.push(ColorRun {
                    character_run,
                    color: background,
                });
            }
            PreeditStyle::Highlight => logical.background_color_runs.push(ColorRun {
                character_run,
                color: Color::LIGHT_BLUE,
            }),
            PreeditStyle::CustomPlatformStyle1
            | PreeditStyle::CustomPlatformStyle2
            | PreeditStyle::CustomPlatformStyle3
            | PreeditStyle::CustomPlatformStyle4 => {
                let color = match attribute.style {
                    PreeditStyle::CustomPlatformStyle1 => BACKGROUND_SUB4,
                    PreeditStyle::CustomPlatformStyle2 => BACKGROUND_SUB5,
                    PreeditStyle::CustomPlatformStyle3 => BACKGROUND_SUB6,
                    _ => BACKGROUND_SUB7,
                };
                logical
                    .background_color_runs
                    .push(ColorRun { character_run, color });
                visual.underline_runs.push(underline);
            }
            PreeditStyle::None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(style: PreeditStyle, control: Option<Color>) -> PreeditState {
        PreeditState {
            active: true,
            cursor_position: 5,
            preedit_length: 3,
            attributes: vec![PreeditAttribute {
                style,
                start_index: 1,
                end_index: 3,
            }],
            control_background_color: control,
        }
    }

    #[test]
    fn underline_uses_commit_adjusted_index() {
        let mut logical = LogicalModel::default();
        let mut visual = VisualModel::default();
        let mut preedit = state(PreeditStyle::Underline, None);
        apply_preedit_styles(&mut preedit, &mut logical, &mut visual);

        assert_eq!(visual.underline_runs.len(), 1);
        assert_eq!(visual.underline_runs[0].glyph_run.glyph_index, 3);
        assert_eq!(visual.underline_runs[0].glyph_run.number_of_glyphs, 2);
        assert!(preedit.attributes.is_empty());
    }

    #[test]
    fn reverse_picks_contrast_color_from_luminance() {
        let mut logical = LogicalModel::default();
        let mut visual = VisualModel {
            text_color: Color::WHITE,
            ..Default::default()
        };
        let mut preedit = state(PreeditStyle::Reverse, Some(Color::TRANSPARENT));
        apply_preedit_styles(&mut preedit, &mut logical, &mut visual);

        assert_eq!(logical.background_color_runs[0].color, Color::WHITE);
        assert_eq!(logical.color_runs[0].color, Color::BLACK);
    }

    #[test]
    fn platform_style_adds_background_and_underline() {
        let mut logical = LogicalModel::default();
        let mut visual = VisualModel::default();
        let mut preedit = state(PreeditStyle::CustomPlatformStyle3, None);
        apply_preedit_styles(&mut preedit, &mut logical, &mut visual);

        assert_eq!(logical.background_color_runs[0].color, BACKGROUND_SUB6);
        assert_eq!(visual.underline_runs.len(), 1);
    }
}
