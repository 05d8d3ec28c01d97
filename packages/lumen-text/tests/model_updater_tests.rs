use lumen_text::{ModelUpdater, OperationsMask, TextConfig, TextModel};

fn updated_model(text: &str) -> TextModel {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut model = TextModel::new(TextConfig::default());
    model.set_text(text);
    let mut updater = ModelUpdater::default();
    assert!(updater.update(&mut model, OperationsMask::ALL_OPERATIONS));
    model
}

fn assert_same_tables(incremental: &TextModel, full: &TextModel) {
    assert_eq!(incremental.text(), full.text());

    let (a, b) = (&incremental.logical, &full.logical);
    assert_eq!(a.line_break_info, b.line_break_info);
    assert_eq!(a.paragraph_info, b.paragraph_info);
    assert_eq!(a.script_runs, b.script_runs);
    assert_eq!(a.font_runs, b.font_runs);

    let (a, b) = (&incremental.visual, &full.visual);
    assert_eq!(a.glyphs, b.glyphs);
    assert_eq!(a.glyphs_to_characters, b.glyphs_to_characters);
    assert_eq!(a.characters_per_glyph, b.characters_per_glyph);
    assert_eq!(a.characters_to_glyph, b.characters_to_glyph);
    assert_eq!(a.glyphs_per_character, b.glyphs_per_character);
}

#[cfg(test)]
mod model_updater_tests {
    use super::*;

    #[test]
    fn second_update_does_nothing() {
        let mut model = updated_model("first paragraph\nsecond");
        let mut updater = ModelUpdater::default();
        assert!(!updater.update(&mut model, OperationsMask::ALL_OPERATIONS));
        assert!(model.operations_pending.is_empty());
        assert_eq!(model.update_info.previous_number_of_characters, 22);
    }

    #[test]
    fn insertion_matches_full_rebuild() {
        let mut model = updated_model("hello world\nbye");
        model.insert_text(6, "big ").unwrap();

        let mut updater = ModelUpdater::default();
        assert!(updater.update(&mut model, OperationsMask::ALL_OPERATIONS));

        let full = updated_model("hello big world\nbye");
        assert_same_tables(&model, &full);
        assert_eq!(model.logical.paragraph_info.len(), 2);
    }

    #[test]
    fn removing_new_paragraph_merges_paragraphs() {
        let mut model = updated_model("hello world\nbye");
        model.remove_text(11, 1).unwrap();

        let mut updater = ModelUpdater::default();
        assert!(updater.update(&mut model, OperationsMask::ALL_OPERATIONS));

        let full = updated_model("hello worldbye");
        assert_same_tables(&model, &full);
        assert_eq!(model.logical.paragraph_info.len(), 1);
    }

    #[test]
    fn edit_in_last_paragraph_matches_full_rebuild() {
        let mut model = updated_model("one\ntwo\nthree");
        model.insert_text(13, "!").unwrap();

        let mut updater = ModelUpdater::default();
        assert!(updater.update(&mut model, OperationsMask::ALL_OPERATIONS));

        let full = updated_model("one\ntwo\nthree!");
        assert_same_tables(&model, &full);
    }

    #[test]
    fn every_character_has_glyphs_after_update() {
        let model = updated_model("abc\ndef ghi");
        let visual = &model.visual;
        assert_eq!(visual.characters_to_glyph.len(), model.number_of_characters());
        assert_eq!(visual.glyphs_to_characters.len(), visual.glyphs.len());
        let total: usize = visual.glyphs_per_character.iter().sum();
        assert_eq!(total, visual.glyphs.len());
    }
}
