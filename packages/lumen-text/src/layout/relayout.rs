//! Relayout of the paragraph/word tree
//!
//! Characters are positioned one by one. A character starts a new line when
//! it opens a paragraph, is the very first character, or opens a word that
//! does not fit in what remains of the line. [`OverflowPolicy`] decides the
//! extra rules. Positions are bottom-left based: the y of a line is the sum
//! of the heights of every line up to and including it.

use serde::{Deserialize, Serialize};

use super::paragraph::{ParagraphLayoutInfo, TextInfoIndices, TextLayoutInfo};
use super::word::WordType;
use super::Size;

const MIN_RATIO: f32 = 0.90;
const MAX_RATIO: f32 = 1.00;
const MAX_ITERATIONS: usize = 8;
const UNDERSHOOT_WEIGHT: f32 = 0.4;
const OVERSHOOT_WEIGHT: f32 = 0.6;
/// Smallest shrink factor ever returned
const MIN_SHRINK_FACTOR: f32 = f32::EPSILON;

const LINE_LENGTH_EPSILON: f32 = 0.001;

/// Rule applied when a character does not fit in the current line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Words are never split, a word wider than the view overflows
    Original,
    /// A character that does not fit starts a new line, even mid-word
    SplitWhenExceed,
    /// Sizes are multiplied by the shrink factor before the fit test
    ShrinkWidthWhenExceed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExceedPolicy {
    #[default]
    Original,
    Split,
    /// Shrinks so the widest word fits the view width
    ShrinkWidth,
    /// Shrinks so the whole text fits the view
    ShrinkToFit,
}

impl ExceedPolicy {
    pub fn overflow_policy(self) -> OverflowPolicy {
        match self {
            ExceedPolicy::Original | ExceedPolicy::ShrinkToFit => OverflowPolicy::Original,
            ExceedPolicy::Split => OverflowPolicy::SplitWhenExceed,
            ExceedPolicy::ShrinkWidth => OverflowPolicy::ShrinkWidthWhenExceed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalWrapType {
    WrapByCharacter,
    WrapByWord,
    /// Wraps by word, words wider than the view wrap by character
    WrapByWordAndSplit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VerticalAlignment {
    #[default]
    Top,
    Center,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineJustification {
    #[default]
    Left,
    Center,
    Right,
    Justified,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParameters {
    pub exceed_policy: ExceedPolicy,
    pub horizontal_alignment: HorizontalAlignment,
    pub vertical_alignment: VerticalAlignment,
    pub line_justification: LineJustification,
    /// Extra space added below every line
    pub line_height_offset: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineLayoutInfo {
    /// Index of the first character of the line in the whole text
    pub character_global_index: usize,
    pub size: Size,
    pub ascender: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineJustificationInfo {
    pub indices: TextInfoIndices,
    pub line_length: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SubLineLayoutInfo {
    pub line_length: f32,
    pub max_char_height: f32,
    pub max_ascender: f32,
}

/// Placed character, in text order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CharacterLayoutEntry {
    pub size: Size,
    pub position: (f32, f32),
    pub is_new_paragraph: bool,
    pub descender: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelayoutData {
    pub view_size: Size,
    pub shrink_factor: f32,
    /// Bounding size of the laid out text
    pub text_size: Size,
    pub lines: Vec<LineLayoutInfo>,
    pub justification_info: Vec<LineJustificationInfo>,
    pub characters: Vec<CharacterLayoutEntry>,
}

impl RelayoutData {
    pub fn new(view_size: Size) -> Self {
        Self {
            view_size,
            shrink_factor: 1.0,
            ..Default::default()
        }
    }
}

/// Running length of a line being measured
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineLength {
    /// The last added width did not fit
    pub found: bool,
    pub length: f32,
    /// Width of the white spaces ending the line so far
    pub end_white_space: f32,
}

/// Adds `width` to the line unless it overflows `parent_width`, in which case
/// the line is closed and its trailing white space trimmed
pub fn calculate_line_length(
    is_white_space: bool,
    width: f32,
    parent_width: f32,
    line: &mut LineLength,
) {
    if line.length + width > parent_width {
        line.found = true;
        line.length -= line.end_white_space;
    } else {
        line.length += width;
        if is_white_space {
            line.end_white_space += width;
        } else {
            line.end_white_space = 0.0;
        }
    }
}

/// Measures the line starting at `indices` inside `paragraph`
pub fn calculate_sub_line_layout(
    parent_width: f32,
    indices: TextInfoIndices,
    paragraph: &ParagraphLayoutInfo,
    wrap: HorizontalWrapType,
    shrink_factor: f32,
) -> SubLineLayoutInfo {
    let mut info = SubLineLayoutInfo::default();
    let mut line = LineLength::default();
    let mut character_index = indices.character_index;
    let mut is_first_character = true;

    for word in paragraph.words.iter().skip(indices.word_index) {
        if line.found {
            break;
        }

        let shrunk_word_width = word.size.width * shrink_factor;
        let is_white_space = word.word_type == WordType::WordSeparator;
        let split_by_character = match wrap {
            HorizontalWrapType::WrapByCharacter => true,
            HorizontalWrapType::WrapByWord => false,
            HorizontalWrapType::WrapByWordAndSplit => shrunk_word_width > parent_width,
        };

        if split_by_character {
            for character in word.characters.iter().skip(character_index) {
                if line.found {
                    break;
                }
                calculate_line_length(
                    is_white_space,
                    character.size.width * shrink_factor,
                    parent_width,
                    &mut line,
                );
                if !line.found || is_first_character {
                    info.max_char_height = info.max_char_height.max(character.size.height);
                    info.max_ascender = info.max_ascender.max(character.ascender);
                }
                is_first_character = false;
            }
            character_index = 0;
        } else {
            calculate_line_length(is_white_space, shrunk_word_width, parent_width, &mut line);
            if !line.found || is_first_character {
                info.max_char_height = info.max_char_height.max(word.size.height);
                info.max_ascender = info.max_ascender.max(word.ascender);
            }
            is_first_character = false;
        }
    }

    info.line_length = line.length;
    info.max_char_height *= shrink_factor;
    info.max_ascender *= shrink_factor;
    info
}

pub fn calculate_x_offset(alignment: HorizontalAlignment, parent_width: f32, text_width: f32) -> f32 {
    match alignment {
        HorizontalAlignment::Left => 0.0,
        HorizontalAlignment::Center => 0.5 * (parent_width - text_width),
        HorizontalAlignment::Right => parent_width - text_width,
    }
}

pub fn calculate_y_offset(alignment: VerticalAlignment, parent_height: f32, text_height: f32) -> f32 {
    match alignment {
        VerticalAlignment::Top => 0.0,
        VerticalAlignment::Center => 0.5 * (parent_height - text_height),
        VerticalAlignment::Bottom => parent_height - text_height,
    }
}

pub fn calculate_justification_offset(
    justification: LineJustification,
    text_width: f32,
    line_length: f32,
) -> f32 {
    match justification {
        LineJustification::Left | LineJustification::Justified => 0.0,
        LineJustification::Center => 0.5 * (text_width - line_length),
        LineJustification::Right => text_width - line_length,
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct RelayoutParameters {
    position_offset: (f32, f32),
    word_size: Size,
    character_size: Size,
    indices: TextInfoIndices,
    character_global_index: usize,
    is_first_character: bool,
    is_first_character_of_word: bool,
    is_new_line: bool,
    is_white_space: bool,
    is_new_line_character: bool,
}

/// Position of the current character. Records a line when the character
/// starts one.
fn calculate_position(
    policy: OverflowPolicy,
    parameters: &RelayoutParameters,
    layout: &LayoutParameters,
    paragraph: &ParagraphLayoutInfo,
    data: &mut RelayoutData,
) -> (f32, f32) {
    let word_offset = if parameters.is_first_character {
        0.0
    } else {
        parameters.position_offset.0
    };
    let previous_y = if parameters.is_first_character {
        0.0
    } else {
        parameters.position_offset.1
    };
    let shrink_factor = match policy {
        OverflowPolicy::ShrinkWidthWhenExceed => data.shrink_factor,
        _ => 1.0,
    };
    let view_width = data.view_size.width;
    let word_width = parameters.word_size.width * shrink_factor;

    let starts_line = parameters.is_new_line
        || parameters.is_first_character
        || (parameters.is_first_character_of_word && word_offset + word_width > view_width)
        || (policy == OverflowPolicy::SplitWhenExceed
            && word_offset + parameters.character_size.width > view_width);

    if !starts_line {
        return (word_offset, previous_y);
    }

    // white space is never moved to the next line, it hangs on the edge
    if !parameters.is_new_line && (parameters.is_white_space || parameters.is_new_line_character) {
        return (
            view_width - parameters.word_size.width,
            parameters.position_offset.1,
        );
    }

    let wrap = match policy {
        OverflowPolicy::SplitWhenExceed => HorizontalWrapType::WrapByWordAndSplit,
        _ => HorizontalWrapType::WrapByWord,
    };
    let mut sub_line =
        calculate_sub_line_layout(view_width, parameters.indices, paragraph, wrap, shrink_factor);

    if policy == OverflowPolicy::Original && sub_line.line_length < LINE_LENGTH_EPSILON {
        // a single word wider than the view
        if let Some(word) = paragraph.words.get(parameters.indices.word_index) {
            sub_line.line_length = word.size.width;
        }
    }

    data.justification_info.push(LineJustificationInfo {
        indices: parameters.indices,
        line_length: sub_line.line_length,
    });
    data.lines.push(LineLayoutInfo {
        character_global_index: parameters.character_global_index,
        size: Size::new(sub_line.line_length, sub_line.max_char_height),
        ascender: sub_line.max_ascender,
    });

    (
        0.0,
        previous_y + sub_line.max_char_height + layout.line_height_offset * shrink_factor,
    )
}

/// Lays out the text for the shrink-to-fit policy with `shrink_factor`.
/// Returns the height of the laid out text.
pub fn calculate_positions_for_shrink_when_exceed(
    text: &mut TextLayoutInfo,
    layout: &LayoutParameters,
    shrink_factor: f32,
    data: &mut RelayoutData,
) -> f32 {
    let parent_width = data.view_size.width;
    data.lines.clear();
    data.justification_info.clear();

    let mut new_text_height = 0.0;
    let mut is_first_character = true;
    let mut previous_size = Size::ZERO;
    let mut previous_position = (0.0f32, 0.0f32);
    let mut is_last_character_new_line = false;
    let mut last_character_height = 0.0;
    let mut character_global_index = 0;

    for paragraph_index in 0..text.paragraphs.len() {
        let mut is_new_line = true;

        for word_index in 0..text.paragraphs[paragraph_index].words.len() {
            let (word_width, word_type, number_of_characters) = {
                let word = &text.paragraphs[paragraph_index].words[word_index];
                (word.size.width, word.word_type, word.number_of_characters())
            };
            let word_offset = previous_position.0 + previous_size.width;
            let mut is_first_character_of_word = true;
            is_last_character_new_line = word_type == WordType::ParagraphSeparator;

            for character_index in 0..number_of_characters {
                let indices = TextInfoIndices::new(paragraph_index, word_index, character_index);
                let character =
                    &text.paragraphs[paragraph_index].words[word_index].characters[character_index];
                let character_size = character.size;
                let character_ascender = character.ascender;
                last_character_height = character_size.height * shrink_factor;

                let previous_y = if is_first_character {
                    0.0
                } else {
                    previous_position.1
                };

                let position = if is_new_line
                    || is_first_character
                    || (is_first_character_of_word
                        && word_offset + word_width * shrink_factor > parent_width)
                {
                    is_first_character = false;

                    let sub_line = calculate_sub_line_layout(
                        parent_width,
                        indices,
                        &text.paragraphs[paragraph_index],
                        HorizontalWrapType::WrapByWord,
                        shrink_factor,
                    );
                    let line_height =
                        sub_line.max_char_height + layout.line_height_offset * shrink_factor;
                    new_text_height += line_height;

                    data.lines.push(LineLayoutInfo {
                        character_global_index,
                        size: Size::new(sub_line.line_length, sub_line.max_char_height),
                        ascender: sub_line.max_ascender,
                    });
                    data.justification_info.push(LineJustificationInfo {
                        indices,
                        line_length: sub_line.line_length,
                    });

                    (0.0, previous_y + line_height)
                } else {
                    (previous_position.0 + previous_size.width, previous_position.1)
                };

                let bearing_offset = data.lines.last().map_or(0.0, |line| {
                    (line.size.height - line.ascender)
                        - (character_size.height - character_ascender) * shrink_factor
                });

                previous_size = character_size.scaled(shrink_factor);
                previous_position = position;

                let character = &mut text.paragraphs[paragraph_index].words[word_index].characters
                    [character_index];
                character.position = (position.0, position.1 - bearing_offset);

                is_first_character_of_word = false;
                is_new_line = false;
                character_global_index += 1;
            }
        }
    }

    if is_last_character_new_line {
        new_text_height += last_character_height + layout.line_height_offset * shrink_factor;
    }

    new_text_height
}

/// Finds the shrink factor fitting the text in the view. The factor first
/// makes the widest word fit, then is refined while the text height is
/// outside `[0.90, 1.00]` of the view height.
pub fn relayout_for_shrink_to_fit(
    text: &mut TextLayoutInfo,
    layout: &LayoutParameters,
    data: &mut RelayoutData,
) -> f32 {
    let view = data.view_size;
    let mut shrink_factor = if text.max_word_width > view.width && view.width > 0.0 {
        view.width / text.max_word_width
    } else {
        1.0
    };

    let mut new_text_height =
        calculate_positions_for_shrink_when_exceed(text, layout, shrink_factor, data);

    if view.height <= 0.0 {
        log::debug!("shrink to fit: view {}x{} has no height", view.width, view.height);
        return shrink_factor;
    }

    if new_text_height > view.height {
        let mut ratio = new_text_height / view.height;
        let mut max_scale_factor = shrink_factor;
        let mut min_scale_factor = shrink_factor * (view.height / new_text_height);

        let mut iterations = 0;
        while (ratio < MIN_RATIO || ratio > MAX_RATIO) && iterations < MAX_ITERATIONS {
            let weight = if ratio < 1.0 {
                UNDERSHOOT_WEIGHT
            } else {
                OVERSHOOT_WEIGHT
            };
            shrink_factor = min_scale_factor + weight * (max_scale_factor - min_scale_factor);

            new_text_height =
                calculate_positions_for_shrink_when_exceed(text, layout, shrink_factor, data);
            ratio = new_text_height / view.height;
            if ratio < 1.0 {
                min_scale_factor = shrink_factor;
            } else {
                max_scale_factor = shrink_factor;
            }
            iterations += 1;
        }

        if ratio > MAX_RATIO {
            shrink_factor = min_scale_factor.max(MIN_SHRINK_FACTOR);
            new_text_height =
                calculate_positions_for_shrink_when_exceed(text, layout, shrink_factor, data);
        }

        log::debug!(
            "shrink to fit: factor {shrink_factor} after {iterations} iterations, height {new_text_height}"
        );
    }

    shrink_factor
}

/// Positions every character of `text` inside a view of `view_size`
pub fn relayout(text: &mut TextLayoutInfo, view_size: Size, layout: &LayoutParameters) -> RelayoutData {
    let mut data = RelayoutData::new(view_size);
    calculate_size_and_position(text, layout, &mut data);
    update_alignment(text, layout, &mut data);
    data
}

fn calculate_size_and_position(
    text: &mut TextLayoutInfo,
    layout: &LayoutParameters,
    data: &mut RelayoutData,
) {
    data.characters.clear();
    data.lines.clear();
    data.justification_info.clear();
    data.text_size = Size::ZERO;

    data.shrink_factor = match layout.exceed_policy {
        ExceedPolicy::ShrinkToFit => relayout_for_shrink_to_fit(text, layout, data),
        ExceedPolicy::ShrinkWidth
            if text.max_word_width > data.view_size.width && data.view_size.width > 0.0 =>
        {
            data.view_size.width / text.max_word_width
        }
        _ => 1.0,
    };
    let shrink_factor = data.shrink_factor;
    let policy = layout.exceed_policy.overflow_policy();
    let positioned = layout.exceed_policy != ExceedPolicy::ShrinkToFit;

    let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
    let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);

    let mut parameters = RelayoutParameters {
        is_first_character: true,
        ..Default::default()
    };

    for paragraph_index in 0..text.paragraphs.len() {
        parameters.is_new_line = true;
        parameters.indices.paragraph_index = paragraph_index;

        for word_index in 0..text.paragraphs[paragraph_index].words.len() {
            let word = &text.paragraphs[paragraph_index].words[word_index];
            parameters.indices.word_index = word_index;
            parameters.is_white_space = word.word_type == WordType::WordSeparator;
            parameters.is_new_line_character = word.word_type == WordType::ParagraphSeparator;
            parameters.is_first_character_of_word = true;
            parameters.word_size = word.size;
            let number_of_characters = word.number_of_characters();

            for character_index in 0..number_of_characters {
                parameters.indices.character_index = character_index;
                parameters.character_size =
                    text.paragraphs[paragraph_index].words[word_index].characters[character_index]
                        .size;

                if positioned {
                    let position = calculate_position(
                        policy,
                        &parameters,
                        layout,
                        &text.paragraphs[paragraph_index],
                        data,
                    );
                    let advance = parameters.character_size.width
                        * if policy == OverflowPolicy::ShrinkWidthWhenExceed {
                            shrink_factor
                        } else {
                            1.0
                        };
                    parameters.position_offset = (position.0 + advance, position.1);

                    let character = &mut text.paragraphs[paragraph_index].words[word_index]
                        .characters[character_index];
                    character.position = position;

                    // align glyphs on the line's baseline
                    if let Some(line) = data.lines.last() {
                        character.position.1 -= (line.size.height - line.ascender)
                            - (character.size.height - character.ascender) * shrink_factor;
                    }
                }

                let character =
                    &text.paragraphs[paragraph_index].words[word_index].characters[character_index];
                min_x = min_x.min(character.position.0);
                max_x = max_x.max(character.position.0 + character.size.width * shrink_factor);
                min_y = min_y.min(character.position.1 - character.size.height * shrink_factor);
                max_y = max_y.max(character.position.1);

                data.characters.push(CharacterLayoutEntry {
                    size: Size::new(character.advance, character.size.height).scaled(shrink_factor),
                    position: character.position,
                    is_new_paragraph: parameters.is_new_line_character,
                    descender: character.size.height - character.ascender,
                });

                parameters.character_global_index += 1;
                parameters.is_first_character = false;
                parameters.is_first_character_of_word = false;
                parameters.is_new_line = false;
            }
        }
    }

    if !data.characters.is_empty() {
        data.text_size = Size::new(max_x - min_x, max_y - min_y);
    }

    // room for the empty line after a trailing new paragraph character
    if let Some(last) = text.paragraphs.last() {
        if last.ends_with_paragraph_separator() {
            let height = last
                .words
                .last()
                .map_or(0.0, |word| word.size.height);
            data.text_size.height += height * shrink_factor;
        }
    }
}

fn update_alignment(text: &mut TextLayoutInfo, layout: &LayoutParameters, data: &mut RelayoutData) {
    let horizontal_offset = calculate_x_offset(
        layout.horizontal_alignment,
        data.view_size.width,
        data.text_size.width,
    );
    let vertical_offset = calculate_y_offset(
        layout.vertical_alignment,
        data.view_size.height,
        data.text_size.height,
    );

    let mut justification_index = 0;
    let mut table_index = 0;
    let mut justification_offset = 0.0;

    for (paragraph_index, paragraph) in text.paragraphs.iter_mut().enumerate() {
        for (word_index, word) in paragraph.words.iter_mut().enumerate() {
            for (character_index, character) in word.characters.iter_mut().enumerate() {
                let indices = TextInfoIndices::new(paragraph_index, word_index, character_index);
                if let Some(info) = data.justification_info.get(justification_index) {
                    if info.indices == indices {
                        justification_offset = calculate_justification_offset(
                            layout.line_justification,
                            data.text_size.width,
                            info.line_length,
                        );
                        justification_index += 1;
                    }
                }

                character.offset = (horizontal_offset + justification_offset, vertical_offset);
                if let Some(entry) = data.characters.get_mut(table_index) {
                    entry.position.0 = character.position.0 + character.offset.0;
                    entry.position.1 = character.position.1 + character.offset.1;
                }
                table_index += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::character::{FixedMetrics, StyledText};
    use crate::layout::paragraph::create_text_info;

    const METRICS: FixedMetrics = FixedMetrics {
        advance: 10.0,
        height: 10.0,
        ascender: 8.0,
    };

    fn layout(text: &str, view: Size, exceed_policy: ExceedPolicy) -> (TextLayoutInfo, RelayoutData) {
        let mut info = create_text_info(&[StyledText::plain(text)], 0.0, &METRICS);
        let parameters = LayoutParameters {
            exceed_policy,
            ..Default::default()
        };
        let data = relayout(&mut info, view, &parameters);
        (info, data)
    }

    #[test]
    fn single_line_when_text_fits() {
        let (_, data) = layout("ab cd", Size::new(100.0, 50.0), ExceedPolicy::Original);
        assert_eq!(data.lines.len(), 1);
        assert_eq!(data.characters[0].position, (0.0, 10.0));
        assert_eq!(data.characters[1].position, (10.0, 10.0));
        assert_eq!(data.text_size, Size::new(50.0, 10.0));
    }

    #[test]
    fn words_wrap_to_next_line() {
        let (_, data) = layout("ab cd", Size::new(35.0, 50.0), ExceedPolicy::Original);
        assert_eq!(data.lines.len(), 2);
        assert_eq!(data.lines[0].size.width, 20.0);
        assert_eq!(data.lines[1].character_global_index, 3);
        assert_eq!(data.characters[3].position, (0.0, 20.0));
        assert_eq!(data.characters[4].position, (10.0, 20.0));
    }

    #[test]
    fn split_policy_breaks_long_words() {
        let (_, data) = layout("abcdef", Size::new(25.0, 50.0), ExceedPolicy::Split);
        assert_eq!(data.lines.len(), 3);
        assert_eq!(data.characters[2].position, (0.0, 20.0));
    }

    #[test]
    fn shrink_width_fits_widest_word() {
        let (_, data) = layout("abcdef", Size::new(30.0, 50.0), ExceedPolicy::ShrinkWidth);
        assert_eq!(data.shrink_factor, 0.5);
        assert_eq!(data.lines.len(), 1);
        assert_eq!(data.text_size.width, 30.0);
    }

    #[test]
    fn shrink_to_fit_keeps_text_inside_view() {
        let (_, data) = layout("a\nb\nc\nd", Size::new(100.0, 20.0), ExceedPolicy::ShrinkToFit);
        assert!(data.shrink_factor > 0.0 && data.shrink_factor <= 1.0);
        assert!((data.shrink_factor - 0.5).abs() < 1e-4);
        assert_eq!(data.lines.len(), 4);
        assert!(data.text_size.height <= 20.0 + 1e-3);
    }

    #[test]
    fn center_alignment_offsets_characters() {
        let mut info = create_text_info(&[StyledText::plain("ab")], 0.0, &METRICS);
        let parameters = LayoutParameters {
            horizontal_alignment: HorizontalAlignment::Center,
            vertical_alignment: VerticalAlignment::Bottom,
            ..Default::default()
        };
        let data = relayout(&mut info, Size::new(100.0, 50.0), &parameters);
        assert_eq!(data.characters[0].position, (40.0, 50.0));
        assert_eq!(info.paragraphs[0].words[0].characters[1].offset, (40.0, 40.0));
    }

    #[test]
    fn line_length_trims_trailing_white_space() {
        let mut line = LineLength::default();
        calculate_line_length(false, 4.0, 10.0, &mut line);
        calculate_line_length(true, 2.0, 10.0, &mut line);
        assert_eq!(line.length, 6.0);
        assert!(!line.found);

        calculate_line_length(false, 5.0, 10.0, &mut line);
        assert!(line.found);
        assert_eq!(line.length, 4.0);
    }

    #[test]
    fn offsets_follow_alignment() {
        assert_eq!(calculate_x_offset(HorizontalAlignment::Center, 100.0, 40.0), 30.0);
        assert_eq!(calculate_x_offset(HorizontalAlignment::Right, 100.0, 40.0), 60.0);
        assert_eq!(calculate_y_offset(VerticalAlignment::Bottom, 50.0, 20.0), 30.0);
        assert_eq!(
            calculate_justification_offset(LineJustification::Right, 40.0, 25.0),
            15.0
        );
        assert_eq!(
            calculate_justification_offset(LineJustification::Justified, 40.0, 25.0),
            0.0
        );
    }
}
