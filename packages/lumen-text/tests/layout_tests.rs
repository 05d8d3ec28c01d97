use lumen_text::layout::{
    create_text_info, merge_paragraph, relayout, split_paragraph, ExceedPolicy, FixedMetrics,
    LayoutParameters, RelayoutData, Size, StyledText, TextInfoIndices, TextLayoutInfo,
};

const METRICS: FixedMetrics = FixedMetrics {
    advance: 8.0,
    height: 16.0,
    ascender: 12.0,
};

fn text_info(text: &str) -> TextLayoutInfo {
    create_text_info(&[StyledText::plain(text)], 0.0, &METRICS)
}

fn shrink_to_fit(text: &str, view: Size) -> RelayoutData {
    let mut info = text_info(text);
    let parameters = LayoutParameters {
        exceed_policy: ExceedPolicy::ShrinkToFit,
        ..Default::default()
    };
    relayout(&mut info, view, &parameters)
}

#[cfg(test)]
mod layout_tests {
    use super::*;

    #[test]
    fn split_then_merge_restores_paragraph() {
        let original = text_info("the quick brown fox");
        let mut first = original.paragraphs[0].clone();

        let last = split_paragraph(TextInfoIndices::new(0, 4, 2), 0.0, &mut first);
        assert_eq!(first.text(), "the quick br");
        assert_eq!(last.text(), "own fox");

        merge_paragraph(&mut first, &last);
        assert_eq!(first.text(), original.paragraphs[0].text());
        assert_eq!(first.size, original.paragraphs[0].size);
        assert_eq!(first.number_of_characters, original.paragraphs[0].number_of_characters);
        assert_eq!(first.words.len(), original.paragraphs[0].words.len());
    }

    #[test]
    fn split_then_merge_restores_paragraph_at_every_position() {
        let original = text_info("the quick  brown fox\njumps over\n");
        for paragraph in &original.paragraphs {
            for (word_index, word) in paragraph.words.iter().enumerate() {
                for character_index in 0..=word.number_of_characters() {
                    let indices = TextInfoIndices::new(0, word_index, character_index);
                    let mut first = paragraph.clone();
                    let last = split_paragraph(indices, 0.0, &mut first);
                    assert_eq!(
                        first.number_of_characters + last.number_of_characters,
                        paragraph.number_of_characters
                    );

                    merge_paragraph(&mut first, &last);
                    assert_eq!(&first, paragraph, "split at {indices:?}");
                }
            }
        }
    }

    #[test]
    fn relayout_places_every_character() {
        let mut info = text_info("one two three\nfour");
        let data = relayout(&mut info, Size::new(60.0, 200.0), &LayoutParameters::default());
        assert_eq!(data.characters.len(), info.number_of_characters);
        assert!(data.lines.len() >= 3);
        assert!(data.text_size.width <= 60.0);
    }

    #[test]
    fn shrink_to_fit_stays_inside_view() {
        let mut info = text_info("alpha beta gamma delta epsilon zeta eta theta");
        let view = Size::new(80.0, 40.0);
        let parameters = LayoutParameters {
            exceed_policy: ExceedPolicy::ShrinkToFit,
            ..Default::default()
        };
        let data = relayout(&mut info, view, &parameters);
        assert!(data.shrink_factor > 0.0 && data.shrink_factor <= 1.0);
        assert!(data.text_size.height <= view.height * 1.0001);
    }

    #[test]
    fn shrink_factor_stays_in_unit_interval() {
        let text = "alpha beta gamma delta epsilon";
        for view in [
            Size::new(100.0, 0.0),
            Size::new(0.0, 50.0),
            Size::new(0.0, 0.0),
            Size::new(1.0, 1.0),
            Size::new(100.0, 1.0),
        ] {
            let data = shrink_to_fit(text, view);
            assert!(
                data.shrink_factor > 0.0 && data.shrink_factor <= 1.0,
                "factor {} for view {view:?}",
                data.shrink_factor
            );
        }
    }

    #[test]
    fn shrink_to_fit_settles_when_no_factor_lands_in_range() {
        // one line is at most 12 high, two lines at least 23: nothing
        // lands in [18, 20] so the search runs out of iterations
        let view = Size::new(100.0, 20.0);
        let data = shrink_to_fit("aaaaa aaaaa aaaaa", view);
        assert!(data.shrink_factor > 0.0 && data.shrink_factor < 1.0);
        assert_eq!(data.lines.len(), 1);
        assert!(data.text_size.height <= view.height);
    }
}
