//! Script run segmentation
//!
//! Characters valid for many scripts (white space, punctuation, combining
//! marks) join a neighbouring run: the previous one when both sides share
//! a direction, otherwise the one matching the paragraph's first script.

use unicode_script::{Script, UnicodeScript};

use crate::logical_model::insert_runs;
use crate::types::{CharacterIndex, CharacterRun, ScriptRun};

/// Scripts written right to left
#[inline]
pub fn is_right_to_left_script(script: Script) -> bool {
    matches!(
        script,
        Script::Arabic | Script::Hebrew | Script::Syriac | Script::Thaana | Script::Nko
    )
}

#[inline]
fn is_common_script(script: Script) -> bool {
    matches!(script, Script::Common | Script::Inherited | Script::Unknown)
}

/// Paragraph separators
#[inline]
pub fn is_new_paragraph(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{0085}' | '\u{2029}')
}

#[inline]
pub fn is_white_space(ch: char) -> bool {
    ch.is_whitespace()
}

fn script_run(start: CharacterIndex, length: usize, script: Option<Script>) -> ScriptRun {
    let script = script.unwrap_or(Script::Latin);
    ScriptRun {
        character_run: CharacterRun::new(start, length),
        script,
        is_right_to_left: is_right_to_left_script(script),
    }
}

/// Computes the script runs of `[start_index, start_index + count)` and
/// splices them into `scripts`, shifting the runs that follow
pub fn set_scripts(
    text: &[char],
    start_index: CharacterIndex,
    count: usize,
    scripts: &mut Vec<ScriptRun>,
) {
    if count == 0 {
        return;
    }

    let mut new_runs = Vec::new();
    let mut run_start = start_index;
    let mut run_length = 0usize;
    let mut run_script: Option<Script> = None;

    let mut first_script_pending = true;
    let mut paragraph_is_rtl = false;
    let mut pending_common = 0usize;

    for &ch in &text[start_index..start_index + count] {
        let script = ch.script();

        if is_common_script(script) {
            pending_common += 1;

            if is_new_paragraph(ch) {
                // trailing common characters close the paragraph's last run
                first_script_pending = true;
                run_length += pending_common;
                new_runs.push(script_run(run_start, run_length, run_script));

                run_start += run_length;
                run_length = 0;
                run_script = None;
                pending_common = 0;
            }
            continue;
        }

        if first_script_pending {
            paragraph_is_rtl = is_right_to_left_script(script);
            first_script_pending = false;
        }

        if Some(script) != run_script {
            if let Some(current) = run_script {
                let current_rtl = is_right_to_left_script(current);
                if paragraph_is_rtl == current_rtl || current_rtl == is_right_to_left_script(script)
                {
                    run_length += pending_common;
                    pending_common = 0;
                }
            }

            if run_length != 0 {
                new_runs.push(script_run(run_start, run_length, run_script));
            }

            run_start += run_length;
            run_length = pending_common + 1;
            run_script = Some(script);
            pending_common = 0;
        } else {
            run_length += pending_common + 1;
            pending_common = 0;
        }
    }

    run_length += pending_common;
    if run_length != 0 {
        new_runs.push(script_run(run_start, run_length, run_script));
    }

    insert_runs(scripts, new_runs, start_index, count);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs_of(text: &str) -> Vec<(usize, usize, Script)> {
        let chars: Vec<char> = text.chars().collect();
        let mut scripts = Vec::new();
        set_scripts(&chars, 0, chars.len(), &mut scripts);
        scripts
            .iter()
            .map(|r| (r.character_run.character_index, r.character_run.number_of_characters, r.script))
            .collect()
    }

    #[test]
    fn white_space_joins_same_direction_run() {
        assert_eq!(
            runs_of("abc \u{05D0}\u{05D1}"),
            vec![(0, 4, Script::Latin), (4, 2, Script::Hebrew)]
        );
    }

    #[test]
    fn rtl_paragraph_keeps_space_with_first_direction() {
        // space between Latin and a following Hebrew word in an RTL paragraph
        assert_eq!(
            runs_of("\u{05D0} ab \u{05D1}"),
            vec![(0, 2, Script::Hebrew), (2, 2, Script::Latin), (4, 2, Script::Hebrew)]
        );
    }

    #[test]
    fn only_common_characters_default_to_latin() {
        assert_eq!(runs_of("  \n"), vec![(0, 3, Script::Latin)]);
    }

    #[test]
    fn paragraphs_close_runs() {
        assert_eq!(
            runs_of("ab\ncd"),
            vec![(0, 3, Script::Latin), (3, 2, Script::Latin)]
        );
    }
}
