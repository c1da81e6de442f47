// WHY: Feature highlighting for one note runs every configured pattern and hands
// the union of their matches to the merge core

use std::collections::BTreeMap;
use tracing::debug;

use crate::markup::{InlineWriter, TagGrammar, TagStyle};
use crate::merge::{self, Match};
use crate::palette::{self, LegendEntry};
use crate::pattern::PatternSet;
use crate::text::TextBlock;

/// Highlights matches of a pattern set with per-pattern colors.
///
/// Borrows the caller's pattern set for its lifetime and holds no other state,
/// so one annotator can serve many notes from many threads.
pub struct MultiPatternAnnotator<'p> {
    patterns: &'p PatternSet,
    grammar: TagGrammar,
    /// Indexed by configured slot, including invalid slots
    styles: Vec<TagStyle>,
}

impl<'p> MultiPatternAnnotator<'p> {
    pub fn new(patterns: &'p PatternSet, grammar: TagGrammar) -> Self {
        let styles = patterns
            .iter()
            .enumerate()
            .map(|(slot, pattern)| TagStyle::new(palette::color_for(slot), pattern.name()))
            .collect();
        Self {
            patterns,
            grammar,
            styles,
        }
    }

    pub fn with_default_grammar(patterns: &'p PatternSet) -> Self {
        Self::new(patterns, TagGrammar::default())
    }

    /// All non-empty matches in discovery order: slot order first, then position
    pub fn discover(&self, text: &str) -> Vec<Match> {
        self.patterns
            .valid()
            .flat_map(|(slot, pattern)| {
                pattern
                    .find_spans(text)
                    .map(move |(start, end)| Match::new(start, end, slot))
            })
            .collect()
    }

    /// Markup for a single text
    pub fn run(&self, text: &str) -> String {
        let matches = self.discover(text);
        debug!("Discovered {} matches over {} bytes", matches.len(), text.len());
        let writer = InlineWriter::new(&self.grammar, &self.styles);
        merge::merge(text, &matches, &writer)
    }

    /// Markup for each text in order
    pub fn run_all<S: AsRef<str>>(&self, texts: &[S]) -> Vec<String> {
        texts.iter().map(|text| self.run(text.as_ref())).collect()
    }

    /// Markup applied segment by segment; section tags are carried over
    pub fn annotate(&self, block: &TextBlock) -> TextBlock {
        block.map_text(|text| self.run(text))
    }

    /// Match count per configured slot; invalid slots count zero
    pub fn count_matches(&self, text: &str) -> Vec<usize> {
        let mut counts = vec![0; self.patterns.len()];
        for (slot, pattern) in self.patterns.valid() {
            counts[slot] = pattern.find_spans(text).count();
        }
        counts
    }

    /// Legend rows for every configured slot
    pub fn legend(&self) -> Vec<LegendEntry> {
        self.patterns
            .iter()
            .enumerate()
            .map(|(slot, pattern)| LegendEntry {
                name: pattern.name().to_string(),
                pattern: pattern.raw().to_string(),
                color: palette::color_for(slot),
                valid: pattern.is_valid(),
            })
            .collect()
    }

    /// Pattern text to color, as the note browser looks colors up
    pub fn color_map(&self) -> BTreeMap<String, &'static str> {
        palette::color_map(self.patterns.iter().map(|p| p.raw()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::PALETTE;
    use crate::text::Segment;

    const TEXT: &str = "quick brown fox jumped over the lazy dog";

    fn spans(expressions: &[&str]) -> PatternSet {
        PatternSet::from_expressions(expressions.iter().copied())
    }

    #[test]
    fn test_single_word_match() {
        let patterns = spans(&[r"\bquick\b"]);
        let annotator = MultiPatternAnnotator::with_default_grammar(&patterns);
        assert_eq!(
            annotator.run(TEXT),
            ":rgb:#f77189:rgb::phrase:quick:phrase::blob:quick:blob: brown fox jumped over the lazy dog"
        );
    }

    #[test]
    fn test_overlap_match_nests_wider_later_pattern_outside() {
        let patterns = spans(&[r"\bquick\b", "quick brown"]);
        let annotator = MultiPatternAnnotator::new(&patterns, TagGrammar::new("<SPAN>", "</SPAN>"));
        assert_eq!(
            annotator.run(TEXT),
            "<SPAN><SPAN>quick</SPAN> brown</SPAN> fox jumped over the lazy dog"
        );
    }

    #[test]
    fn test_later_narrow_pattern_nests_inside_earlier_wide_one() {
        let patterns = spans(&["quick brown", r"\bquick\b"]);
        let annotator = MultiPatternAnnotator::new(&patterns, TagGrammar::new("<{name}>", "</>"));
        assert_eq!(
            annotator.run(TEXT),
            "<quickbrown><quick>quick</> brown</> fox jumped over the lazy dog"
        );
    }

    #[test]
    fn test_boundary_match() {
        let patterns = spans(&["lazy dog", r"\bdog\b", "over the lazy"]);
        let annotator = MultiPatternAnnotator::new(&patterns, TagGrammar::new("<{name}>", "</>"));
        // "lazy dog" crosses the end of "over the lazy" and is dropped; "dog" opens
        // only after "over the lazy" has closed
        assert_eq!(
            annotator.run(TEXT),
            "quick brown fox jumped <overthelazy>over the lazy</> <dog>dog</>"
        );
    }

    #[test]
    fn test_colors_follow_configured_slots_not_matches() {
        let patterns = spans(&["absent", "(bad", r"\bfox\b"]);
        let annotator = MultiPatternAnnotator::new(&patterns, TagGrammar::new("[{color}]", "[/]"));
        assert_eq!(
            annotator.run(TEXT),
            format!("quick brown [{}]fox[/] jumped over the lazy dog", PALETTE[2])
        );
    }

    #[test]
    fn test_earlier_pattern_wins_identical_span() {
        let patterns = spans(&["brown", r"\bbrown\b"]);
        let annotator = MultiPatternAnnotator::new(&patterns, TagGrammar::new("<{name}>", "</>"));
        assert_eq!(annotator.run(TEXT), "quick <brown>brown</> fox jumped over the lazy dog");
    }

    #[test]
    fn test_moved_slot_takes_new_color_and_priority() {
        let grammar = || TagGrammar::new("<{name} {color}>", "</>");
        let mut patterns = PatternSet::from_specs(
            Default::default(),
            [("plain", "brown"), ("word", r"\bbrown\b")],
        );
        {
            let annotator = MultiPatternAnnotator::new(&patterns, grammar());
            assert_eq!(
                annotator.run(TEXT),
                format!("quick <plain {}>brown</> fox jumped over the lazy dog", PALETTE[0])
            );
        }

        patterns.move_to(1, 0).unwrap();
        let annotator = MultiPatternAnnotator::new(&patterns, grammar());
        assert_eq!(
            annotator.run(TEXT),
            format!("quick <word {}>brown</> fox jumped over the lazy dog", PALETTE[0])
        );
        assert_eq!(annotator.legend()[1].name, "plain");
        assert_eq!(annotator.legend()[1].color, PALETTE[1]);
    }

    #[test]
    fn test_no_patterns_returns_text() {
        let patterns = PatternSet::default();
        let annotator = MultiPatternAnnotator::with_default_grammar(&patterns);
        assert_eq!(annotator.run(TEXT), TEXT);
        assert!(annotator.legend().is_empty());
    }

    #[test]
    fn test_annotate_block_segment_by_segment() {
        let patterns = spans(&["pain"]);
        let annotator = MultiPatternAnnotator::new(&patterns, TagGrammar::new("<b>", "</b>"));
        let block = TextBlock::new(vec![
            Segment::new("chest pain", "header"),
            Segment::new("no pain today", "\n# Plan\n"),
            Segment::new("", "\n# Empty\n"),
        ]);
        let marked = annotator.annotate(&block);
        assert_eq!(marked.segments[0].text, "chest <b>pain</b>");
        assert_eq!(marked.segments[1].text, "no <b>pain</b> today");
        assert_eq!(marked.segments[1].section, "\n# Plan\n");
        assert_eq!(marked.segments[2].text, "");
    }

    #[test]
    fn test_run_all_keeps_colors_stable_across_texts() {
        let patterns = spans(&[r"\bfever\b", r"\bcough\b"]);
        let annotator = MultiPatternAnnotator::new(&patterns, TagGrammar::new("<{color}>", "</>"));
        let texts = ["cough only", "fever and cough", ""];
        let out = annotator.run_all(&texts);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], format!("<{}>cough</> only", PALETTE[1]));
        assert_eq!(
            out[1],
            format!("<{}>fever</> and <{}>cough</>", PALETTE[0], PALETTE[1])
        );
        assert_eq!(out[2], "");
    }

    #[test]
    fn test_legend_and_counts() {
        let patterns = PatternSet::from_specs(
            Default::default(),
            [("animal", r"\b(fox|dog)\b"), ("", "(bad"), ("", "o")],
        );
        let annotator = MultiPatternAnnotator::with_default_grammar(&patterns);

        assert_eq!(annotator.count_matches(TEXT), vec![2, 0, 4]);

        let legend = annotator.legend();
        assert_eq!(legend.len(), 3);
        assert_eq!(legend[0].name, "animal");
        assert_eq!(legend[1].color, PALETTE[1]);
        assert!(!legend[1].valid);
        assert_eq!(annotator.color_map()["o"], PALETTE[2]);
    }
}
