// End-to-end checks of the public annotation API over realistic clinical text

use notemark::{
    KeywordTable, MultiPatternAnnotator, PatternSet, SectionAnnotator, SectionBreak,
    SectionCandidate, Segment, TagGrammar, TextBlock, PALETTE,
};

#[path = "integration/mod.rs"]
mod test_utils;
use test_utils::{assert_golden_file, strip_wire_tags};

const NOTE: &str = "\
Patient reports chest pain radiating to left arm.
Denies fever, chills. No shortness of breath.
# Assessment
Chest pain, likely musculoskeletal. Fever absent.
# Plan
Follow up in 2 weeks for chest pain.
";

fn features() -> PatternSet {
    PatternSet::from_specs(
        KeywordTable::default(),
        [
            ("chest_pain", r"(?i)\bchest pain\b"),
            ("fever", r"(?i)\bfever\b"),
            ("chest", r"(?i)chest"),
            ("radiating", r"(?i)pain radiating"),
            ("denies_fever", r"(?i)denies fever"),
            ("broken", r"("),
        ],
    )
}

#[test]
fn test_markup_preserves_note_text() {
    let patterns = features();
    let annotator = MultiPatternAnnotator::with_default_grammar(&patterns);
    let markup = annotator.run(NOTE);
    assert_ne!(markup, NOTE);
    assert_eq!(strip_wire_tags(&markup), NOTE);
}

#[test]
fn test_tags_balance_on_every_prefix() {
    let patterns = features();
    let annotator = MultiPatternAnnotator::new(&patterns, TagGrammar::new("<", ">"));
    let markup = annotator.run(NOTE);

    let mut depth = 0i32;
    for c in markup.chars() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                assert!(depth >= 0, "close before open in {markup}");
            }
            _ => {}
        }
    }
    assert_eq!(depth, 0);
}

#[test]
fn test_feature_golden_markup() {
    let patterns = features();
    let annotator = MultiPatternAnnotator::new(&patterns, TagGrammar::new("[{name}|", "]"));
    let expected = "\
Patient reports [chest_pain|[chest|chest] pain] radiating to left arm.
[denies_fever|Denies [fever|fever]], chills. No shortness of breath.
# Assessment
[chest_pain|[chest|Chest] pain], likely musculoskeletal. [fever|Fever] absent.
# Plan
Follow up in 2 weeks for [chest_pain|[chest|chest] pain].
";
    assert_golden_file(&annotator.run(NOTE), expected, "feature markup");
}

#[test]
fn test_invalid_pattern_does_not_break_others() {
    let patterns = features();
    assert!(!patterns.get(5).unwrap().is_valid());

    let annotator = MultiPatternAnnotator::with_default_grammar(&patterns);
    let legend = annotator.legend();
    assert_eq!(legend.len(), 6);
    assert_eq!(legend[5].color, PALETTE[5]);
    assert!(!legend[5].valid);
    assert_eq!(annotator.count_matches(NOTE)[1], 2);
}

#[test]
fn test_annotate_block_and_sections_compose() {
    let section_break = SectionBreak::default();
    let candidates = vec![
        SectionCandidate::new("Assessment", true, "assessment"),
        SectionCandidate::new("Plan", true, ""),
    ];
    let sections =
        SectionAnnotator::new(&section_break, &candidates, TagGrammar::new("<{color}>", "</>"));
    let marked = sections.annotate(NOTE);
    assert!(marked.contains("\n\n<blue># Assessment</>\n\n"));
    assert!(marked.contains("\n\n<orange># Plan</>\n\n"));

    let patterns = PatternSet::from_expressions([r"(?i)\bfever\b"]);
    let annotator = MultiPatternAnnotator::new(&patterns, TagGrammar::new("<f>", "</f>"));
    let block = TextBlock::new(vec![
        Segment::new("Denies fever.", "header"),
        Segment::new("Fever absent.", "\n# Assessment\n"),
    ]);
    let out = annotator.annotate(&block);
    assert_eq!(out.segments[0].text, "Denies <f>fever</f>.");
    assert_eq!(out.segments[1].text, "<f>Fever</f> absent.");
    assert_eq!(out.segments[1].section, "\n# Assessment\n");
}

#[test]
fn test_multibyte_text_is_sliced_on_char_boundaries() {
    let patterns = PatternSet::from_expressions(["douleur thoracique", "thoracique à gauche"]);
    let annotator = MultiPatternAnnotator::new(&patterns, TagGrammar::new("<", ">"));
    let text = "Patiente: douleur thoracique à gauche — café";
    assert_eq!(
        annotator.run(text),
        "Patiente: <douleur thoracique> à gauche — café"
    );
}
