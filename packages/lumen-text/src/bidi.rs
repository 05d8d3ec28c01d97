//! Bidirectional paragraph analysis and character mirroring
//!
//! Paragraph runs are only created for paragraphs that need them, so purely
//! left to right text produces no runs and skips the direction and mirroring
//! passes entirely.

use unicode_bidi::{BidiInfo, Level};

use crate::types::{
    BidirectionalParagraphInfoRun, CharacterDirection, CharacterIndex, CharacterRun,
    LayoutDirection, LineBreakInfo, ScriptRun,
};

/// Bidi_Mirroring_Glyph pairs. Brackets follow BidiBrackets.txt, the rest
/// are the mathematical and punctuation pairs that mirror one to one.
const MIRROR_PAIRS: &[(char, char)] = &[
    ('(', ')'), ('<', '>'), ('[', ']'), ('{', '}'),
    ('\u{00AB}', '\u{00BB}'), ('\u{0F3A}', '\u{0F3B}'), ('\u{0F3C}', '\u{0F3D}'), ('\u{169B}', '\u{169C}'),
    ('\u{2039}', '\u{203A}'), ('\u{2045}', '\u{2046}'), ('\u{207D}', '\u{207E}'), ('\u{208D}', '\u{208E}'),
    ('\u{2208}', '\u{220B}'), ('\u{2209}', '\u{220C}'), ('\u{220A}', '\u{220D}'), ('\u{2215}', '\u{29F5}'),
    ('\u{223C}', '\u{223D}'), ('\u{2243}', '\u{22CD}'), ('\u{2252}', '\u{2253}'), ('\u{2254}', '\u{2255}'),
    ('\u{2264}', '\u{2265}'), ('\u{2266}', '\u{2267}'), ('\u{2268}', '\u{2269}'), ('\u{226A}', '\u{226B}'),
    ('\u{226E}', '\u{226F}'), ('\u{2270}', '\u{2271}'), ('\u{2272}', '\u{2273}'), ('\u{2274}', '\u{2275}'),
    ('\u{2276}', '\u{2277}'), ('\u{2278}', '\u{2279}'), ('\u{227A}', '\u{227B}'), ('\u{227C}', '\u{227D}'),
    ('\u{227E}', '\u{227F}'), ('\u{2280}', '\u{2281}'), ('\u{2282}', '\u{2283}'), ('\u{2284}', '\u{2285}'),
    ('\u{2286}', '\u{2287}'), ('\u{2288}', '\u{2289}'), ('\u{228A}', '\u{228B}'), ('\u{228F}', '\u{2290}'),
    ('\u{2291}', '\u{2292}'), ('\u{22B0}', '\u{22B1}'), ('\u{22B2}', '\u{22B3}'), ('\u{22B4}', '\u{22B5}'),
    ('\u{22B6}', '\u{22B7}'), ('\u{22C9}', '\u{22CA}'), ('\u{22CB}', '\u{22CC}'), ('\u{22D0}', '\u{22D1}'),
    ('\u{22D6}', '\u{22D7}'), ('\u{22D8}', '\u{22D9}'), ('\u{22DA}', '\u{22DB}'), ('\u{22DC}', '\u{22DD}'),
    ('\u{22DE}', '\u{22DF}'), ('\u{22E0}', '\u{22E1}'), ('\u{22E2}', '\u{22E3}'), ('\u{22E4}', '\u{22E5}'),
    ('\u{22E6}', '\u{22E7}'), ('\u{22E8}', '\u{22E9}'), ('\u{22EA}', '\u{22EB}'), ('\u{22EC}', '\u{22ED}'),
    ('\u{22F0}', '\u{22F1}'), ('\u{2308}', '\u{2309}'), ('\u{230A}', '\u{230B}'), ('\u{2329}', '\u{232A}'),
    ('\u{2768}', '\u{2769}'), ('\u{276A}', '\u{276B}'), ('\u{276C}', '\u{276D}'), ('\u{276E}', '\u{276F}'),
    ('\u{2770}', '\u{2771}'), ('\u{2772}', '\u{2773}'), ('\u{2774}', '\u{2775}'), ('\u{27C3}', '\u{27C4}'),
    ('\u{27C5}', '\u{27C6}'), ('\u{27C8}', '\u{27C9}'), ('\u{27D5}', '\u{27D6}'), ('\u{27E2}', '\u{27E3}'),
    ('\u{27E4}', '\u{27E5}'), ('\u{27E6}', '\u{27E7}'), ('\u{27E8}', '\u{27E9}'), ('\u{27EA}', '\u{27EB}'),
    ('\u{27EC}', '\u{27ED}'), ('\u{27EE}', '\u{27EF}'), ('\u{2983}', '\u{2984}'), ('\u{2985}', '\u{2986}'),
    ('\u{2987}', '\u{2988}'), ('\u{2989}', '\u{298A}'), ('\u{298B}', '\u{298C}'), ('\u{298D}', '\u{2990}'),
    ('\u{298F}', '\u{298E}'), ('\u{2991}', '\u{2992}'), ('\u{2993}', '\u{2994}'), ('\u{2995}', '\u{2996}'),
    ('\u{2997}', '\u{2998}'), ('\u{29C0}', '\u{29C1}'), ('\u{29C4}', '\u{29C5}'), ('\u{29CF}', '\u{29D0}'),
    ('\u{29D1}', '\u{29D2}'), ('\u{29D4}', '\u{29D5}'), ('\u{29D8}', '\u{29D9}'), ('\u{29DA}', '\u{29DB}'),
    ('\u{29E8}', '\u{29E9}'), ('\u{29F8}', '\u{29F9}'), ('\u{29FC}', '\u{29FD}'), ('\u{2A2B}', '\u{2A2C}'),
    ('\u{2A2D}', '\u{2A2E}'), ('\u{2A34}', '\u{2A35}'), ('\u{2A3C}', '\u{2A3D}'), ('\u{2A79}', '\u{2A7A}'),
    ('\u{2A7D}', '\u{2A7E}'), ('\u{2A7F}', '\u{2A80}'), ('\u{2A81}', '\u{2A82}'), ('\u{2A83}', '\u{2A84}'),
    ('\u{2A8B}', '\u{2A8C}'), ('\u{2A91}', '\u{2A92}'), ('\u{2A93}', '\u{2A94}'), ('\u{2A95}', '\u{2A96}'),
    ('\u{2A97}', '\u{2A98}'), ('\u{2A99}', '\u{2A9A}'), ('\u{2A9B}', '\u{2A9C}'), ('\u{2AA1}', '\u{2AA2}'),
    ('\u{2AA6}', '\u{2AA7}'), ('\u{2AA8}', '\u{2AA9}'), ('\u{2AAA}', '\u{2AAB}'), ('\u{2AAC}', '\u{2AAD}'),
    ('\u{2AAF}', '\u{2AB0}'), ('\u{2AB3}', '\u{2AB4}'), ('\u{2ABB}', '\u{2ABC}'), ('\u{2ABD}', '\u{2ABE}'),
    ('\u{2ABF}', '\u{2AC0}'), ('\u{2AC1}', '\u{2AC2}'), ('\u{2AC3}', '\u{2AC4}'), ('\u{2AC5}', '\u{2AC6}'),
    ('\u{2ACD}', '\u{2ACE}'), ('\u{2ACF}', '\u{2AD0}'), ('\u{2AD1}', '\u{2AD2}'), ('\u{2AD3}', '\u{2AD4}'),
    ('\u{2AD5}', '\u{2AD6}'), ('\u{2AF7}', '\u{2AF8}'), ('\u{2AF9}', '\u{2AFA}'), ('\u{2E02}', '\u{2E03}'),
    ('\u{2E04}', '\u{2E05}'), ('\u{2E09}', '\u{2E0A}'), ('\u{2E0C}', '\u{2E0D}'), ('\u{2E1C}', '\u{2E1D}'),
    ('\u{2E20}', '\u{2E21}'), ('\u{2E22}', '\u{2E23}'), ('\u{2E24}', '\u{2E25}'), ('\u{2E26}', '\u{2E27}'),
    ('\u{2E28}', '\u{2E29}'), ('\u{2E55}', '\u{2E56}'), ('\u{2E57}', '\u{2E58}'), ('\u{2E59}', '\u{2E5A}'),
    ('\u{2E5B}', '\u{2E5C}'), ('\u{3008}', '\u{3009}'), ('\u{300A}', '\u{300B}'), ('\u{300C}', '\u{300D}'),
    ('\u{300E}', '\u{300F}'), ('\u{3010}', '\u{3011}'), ('\u{3014}', '\u{3015}'), ('\u{3016}', '\u{3017}'),
    ('\u{3018}', '\u{3019}'), ('\u{301A}', '\u{301B}'), ('\u{FE59}', '\u{FE5A}'), ('\u{FE5B}', '\u{FE5C}'),
    ('\u{FE5D}', '\u{FE5E}'), ('\u{FE64}', '\u{FE65}'), ('\u{FF08}', '\u{FF09}'), ('\u{FF1C}', '\u{FF1E}'),
    ('\u{FF3B}', '\u{FF3D}'), ('\u{FF5B}', '\u{FF5D}'), ('\u{FF5F}', '\u{FF60}'), ('\u{FF62}', '\u{FF63}'),
];

/// Mirror image of `ch` if it has one
pub fn mirror_character(ch: char) -> Option<char> {
    MIRROR_PAIRS.iter().find_map(|&(open, close)| {
        if ch == open {
            Some(close)
        } else if ch == close {
            Some(open)
        } else {
            None
        }
    })
}

/// Computes the bidirectional info of every paragraph in
/// `[start_index, start_index + count)` that contains a right to left script,
/// or of every paragraph when the system direction is right to left.
/// Runs after the range are shifted by `count`.
#[allow(clippy::too_many_arguments)]
pub fn set_bidirectional_info(
    text: &[char],
    scripts: &[ScriptRun],
    line_break_info: &[LineBreakInfo],
    start_index: CharacterIndex,
    count: usize,
    bidirectional_info: &mut Vec<BidirectionalParagraphInfoRun>,
    match_system_language_direction: bool,
    layout_direction: LayoutDirection,
) {
    let mut insert_at = bidirectional_info
        .iter()
        .position(|run| start_index < run.character_run.end())
        .unwrap_or(bidirectional_info.len());

    // shift first so inserted runs are not moved
    for run in &mut bidirectional_info[insert_at..] {
        run.character_run.character_index += count;
    }

    let system_rtl =
        match_system_language_direction && layout_direction == LayoutDirection::RightToLeft;
    let default_level = match_system_language_direction.then(|| match layout_direction {
        LayoutDirection::RightToLeft => Level::rtl(),
        LayoutDirection::LeftToRight => Level::ltr(),
    });

    let end = (start_index + count).min(text.len()).min(line_break_info.len());
    let mut paragraph_start = start_index;
    for index in start_index..end {
        let closes_paragraph = line_break_info[index] == LineBreakInfo::MustBreak || index + 1 == end;
        if !closes_paragraph {
            continue;
        }

        let paragraph = CharacterRun::new(paragraph_start, index + 1 - paragraph_start);
        paragraph_start = index + 1;

        let has_rtl_script = scripts.iter().any(|run| {
            run.is_right_to_left
                && run
                    .character_run
                    .overlaps_inclusive(paragraph.character_index, paragraph.end() - 1)
        });
        if !(has_rtl_script || system_rtl) {
            continue;
        }

        let run = create_paragraph_run(text, paragraph, default_level);
        log::debug!(
            "bidi paragraph at {} ({} chars), rtl: {}",
            paragraph.character_index,
            paragraph.number_of_characters,
            run.direction
        );
        bidirectional_info.insert(insert_at, run);
        insert_at += 1;
    }
}

fn create_paragraph_run(
    text: &[char],
    paragraph: CharacterRun,
    default_level: Option<Level>,
) -> BidirectionalParagraphInfoRun {
    let source: String = text[paragraph.character_index..paragraph.end()]
        .iter()
        .collect();
    let info = BidiInfo::new(&source, default_level);

    let levels = source
        .char_indices()
        .map(|(byte, _)| info.levels[byte].number())
        .collect();
    let direction = info
        .paragraphs
        .first()
        .map(|p| p.level.is_rtl())
        .unwrap_or(false);

    BidirectionalParagraphInfoRun {
        character_run: paragraph,
        direction,
        levels,
    }
}

/// Per character directions of the range, characters outside any
/// bidirectional paragraph are left to right
pub fn get_characters_direction(
    bidirectional_info: &[BidirectionalParagraphInfoRun],
    total_number_of_characters: usize,
    start_index: CharacterIndex,
    count: usize,
    directions: &mut Vec<CharacterDirection>,
) {
    let mut new_directions = vec![false; count];
    for run in bidirectional_info {
        let paragraph = run.character_run;
        if paragraph.end() <= start_index {
            continue;
        }
        if start_index + count <= paragraph.character_index {
            break;
        }
        for (offset, level) in run.levels.iter().enumerate() {
            let index = paragraph.character_index + offset;
            if index >= start_index && index < start_index + count {
                new_directions[index - start_index] = level % 2 == 1;
            }
        }
    }

    directions.resize(total_number_of_characters.saturating_sub(count), false);
    let at = start_index.min(directions.len());
    directions.splice(at..at, new_directions);
}

/// Mirrors the right to left characters of the bidirectional paragraphs in
/// the range. Returns `None` when nothing changed.
pub fn get_mirrored_text(
    text: &[char],
    directions: &[CharacterDirection],
    bidirectional_info: &[BidirectionalParagraphInfoRun],
    start_index: CharacterIndex,
    count: usize,
) -> Option<Vec<char>> {
    let mut mirrored = text.to_vec();
    let mut has_mirrored = false;
    let last = start_index + count;

    for run in bidirectional_info {
        let paragraph = run.character_run;
        if paragraph.end() <= start_index {
            continue;
        }
        if last <= paragraph.character_index {
            break;
        }

        for index in paragraph.character_index..paragraph.end().min(mirrored.len()) {
            if !directions.get(index).copied().unwrap_or(false) {
                continue;
            }
            if let Some(mirror) = mirror_character(mirrored[index]) {
                mirrored[index] = mirror;
                has_mirrored = true;
            }
        }
    }

    has_mirrored.then_some(mirrored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripts::set_scripts;
    use crate::segmentation::set_line_break_info;

    struct Analysed {
        text: Vec<char>,
        scripts: Vec<ScriptRun>,
        breaks: Vec<LineBreakInfo>,
    }

    fn analyse(text: &str) -> Analysed {
        let text: Vec<char> = text.chars().collect();
        let mut scripts = Vec::new();
        let mut breaks = Vec::new();
        set_scripts(&text, 0, text.len(), &mut scripts);
        set_line_break_info(&text, 0, text.len(), &mut breaks);
        Analysed { text, scripts, breaks }
    }

    #[test]
    fn left_to_right_text_has_no_runs() {
        let a = analyse("hello (world)");
        let mut runs = Vec::new();
        set_bidirectional_info(
            &a.text, &a.scripts, &a.breaks, 0, a.text.len(), &mut runs, false, LayoutDirection::LeftToRight,
        );
        assert!(runs.is_empty());
    }

    #[test]
    fn only_rtl_paragraph_gets_a_run() {
        let a = analyse("abc\n\u{05D0}(\u{05D1})");
        let mut runs = Vec::new();
        set_bidirectional_info(
            &a.text, &a.scripts, &a.breaks, 0, a.text.len(), &mut runs, false, LayoutDirection::LeftToRight,
        );
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].character_run, CharacterRun::new(4, 4));
        assert!(runs[0].direction);

        let mut directions = Vec::new();
        get_characters_direction(&runs, a.text.len(), 0, a.text.len(), &mut directions);
        assert_eq!(directions.len(), a.text.len());
        assert!(!directions[0]);
        assert!(directions[4]);

        let mirrored = get_mirrored_text(&a.text, &directions, &runs, 0, a.text.len())
            .expect("brackets inside rtl paragraph are mirrored");
        assert_eq!(mirrored[5], ')');
        assert_eq!(mirrored[7], '(');
        assert_eq!(mirrored[0..4], a.text[0..4]);
    }

    #[test]
    fn system_rtl_layout_creates_runs_for_latin() {
        let a = analyse("abc");
        let mut runs = Vec::new();
        set_bidirectional_info(
            &a.text, &a.scripts, &a.breaks, 0, a.text.len(), &mut runs, true, LayoutDirection::RightToLeft,
        );
        assert_eq!(runs.len(), 1);
        assert!(runs[0].direction);
        assert_eq!(runs[0].levels, vec![2, 2, 2]);
    }

    #[test]
    fn mirror_pairs_are_symmetric() {
        for &(open, close) in MIRROR_PAIRS {
            assert_eq!(mirror_character(open), Some(close));
            assert_eq!(mirror_character(close), Some(open));
        }
        assert_eq!(mirror_character('a'), None);
    }

    #[test]
    fn mirrors_less_common_brackets() {
        assert_eq!(mirror_character('\u{2045}'), Some('\u{2046}'));
        assert_eq!(mirror_character('\u{27E7}'), Some('\u{27E6}'));
        assert_eq!(mirror_character('\u{2990}'), Some('\u{298D}'));
        assert_eq!(mirror_character('\u{FF62}'), Some('\u{FF63}'));
        assert_eq!(mirror_character('\u{2A7D}'), Some('\u{2A7E}'));
        assert_eq!(mirror_character('\u{221E}'), None);
    }
}
