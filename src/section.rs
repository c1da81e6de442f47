// WHY: Section-break highlighting reuses the merge core but colors each boundary by
// how the configured section-name patterns treat it, not by which pattern matched

use serde::Serialize;
use tracing::{debug, warn};

use crate::markup::{SectionWriter, TagGrammar, TagStyle};
use crate::merge::{self, Match};
use crate::pattern::{self, Pattern};
use crate::text::HEADER_SECTION;

/// Markdown-style heading on its own line
pub const DEFAULT_BREAK_EXPRESSION: &str = r"\n#+ [^\n]*\n";

/// Label used when no section-name pattern matches a boundary
pub const UNMATCHED_LABEL: &str = "block expression";

/// The pattern whose matches split a note into sections, plus the tag given to
/// text before the first break. Always holds a compiled expression.
#[derive(Debug, Clone)]
pub struct SectionBreak {
    pattern: Pattern,
    header: String,
}

impl SectionBreak {
    pub fn new(raw: &str, header: impl Into<String>) -> pattern::Result<Self> {
        Ok(Self {
            pattern: Pattern::try_new("", raw)?,
            header: header.into(),
        })
    }

    /// Try a new break expression. On failure the previous expression stays
    /// active. Returns validity and the active expression text.
    pub fn set_expression(&mut self, raw: &str) -> (bool, &str) {
        match Pattern::try_new("", raw) {
            Ok(pattern) => {
                self.pattern = pattern;
                (true, self.expression())
            }
            Err(e) => {
                warn!("Keeping section break {:?}: {}", self.expression(), e);
                (false, self.expression())
            }
        }
    }

    pub fn expression(&self) -> &str {
        self.pattern.raw()
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn find_spans<'t>(&'t self, text: &'t str) -> impl Iterator<Item = (usize, usize)> + 't {
        self.pattern.find_spans(text)
    }
}

impl Default for SectionBreak {
    fn default() -> Self {
        let pattern = Pattern::new("", DEFAULT_BREAK_EXPRESSION);
        debug_assert!(pattern.is_valid());
        Self {
            pattern,
            header: HEADER_SECTION.to_string(),
        }
    }
}

/// A section-name pattern tested against each boundary's text
#[derive(Debug, Clone)]
pub struct SectionCandidate {
    pub pattern: Pattern,
    pub enabled: bool,
    /// Feature name; empty means the section uses the default name
    pub name: String,
}

impl SectionCandidate {
    pub fn new(raw: &str, enabled: bool, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            pattern: Pattern::new(&name, raw),
            enabled,
            name,
        }
    }
}

/// How the candidate list treats one boundary
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SectionClass {
    /// No candidate matched
    Unmatched,
    /// Matched a disabled candidate
    Unused,
    /// Matched an enabled candidate with no name
    UsedDefault,
    /// Matched an enabled, named candidate
    UsedNamed,
}

impl SectionClass {
    pub fn color(self) -> &'static str {
        match self {
            SectionClass::Unmatched | SectionClass::UsedDefault => "orange",
            SectionClass::Unused => "red",
            SectionClass::UsedNamed => "blue",
        }
    }
}

/// Classify boundary text. Every candidate is tested in order and the last one
/// that matches decides, so later, more specific names override earlier ones.
/// Returns the class and the label to render (the deciding candidate's expression).
pub fn classify<'c>(boundary: &str, candidates: &'c [SectionCandidate]) -> (SectionClass, &'c str) {
    candidates
        .iter()
        .rev()
        .find(|candidate| candidate.pattern.is_match(boundary))
        .map(|candidate| {
            let class = if !candidate.enabled {
                SectionClass::Unused
            } else if candidate.name.is_empty() {
                SectionClass::UsedDefault
            } else {
                SectionClass::UsedNamed
            };
            (class, candidate.pattern.raw())
        })
        .unwrap_or((SectionClass::Unmatched, UNMATCHED_LABEL))
}

/// One highlighted section boundary
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SectionBoundary {
    pub start: usize,
    pub end: usize,
    pub class: SectionClass,
    pub label: String,
}

/// Highlights section boundaries in paragraph-oriented markup
pub struct SectionAnnotator<'a> {
    section_break: &'a SectionBreak,
    candidates: &'a [SectionCandidate],
    grammar: TagGrammar,
}

impl<'a> SectionAnnotator<'a> {
    pub fn new(
        section_break: &'a SectionBreak,
        candidates: &'a [SectionCandidate],
        grammar: TagGrammar,
    ) -> Self {
        Self {
            section_break,
            candidates,
            grammar,
        }
    }

    pub fn with_default_grammar(
        section_break: &'a SectionBreak,
        candidates: &'a [SectionCandidate],
    ) -> Self {
        Self::new(section_break, candidates, TagGrammar::default())
    }

    /// Every boundary in `text` with its classification
    pub fn boundaries(&self, text: &str) -> Vec<SectionBoundary> {
        self.section_break
            .find_spans(text)
            .map(|(start, end)| {
                let (class, label) = classify(&text[start..end], self.candidates);
                SectionBoundary {
                    start,
                    end,
                    class,
                    label: label.to_string(),
                }
            })
            .collect()
    }

    /// Paragraph markup of `text` with each boundary wrapped and colored
    pub fn annotate(&self, text: &str) -> String {
        let boundaries = self.boundaries(text);
        debug!("Found {} section boundaries", boundaries.len());

        let matches: Vec<Match> = boundaries
            .iter()
            .enumerate()
            .map(|(key, b)| Match::new(b.start, b.end, key))
            .collect();
        let styles: Vec<TagStyle> = boundaries
            .iter()
            .map(|b| TagStyle::new(b.class.color(), b.label.as_str()))
            .collect();

        let writer = SectionWriter::new(&self.grammar, &styles);
        merge::merge(text, &matches, &writer)
    }

    /// Markup for each text in order
    pub fn run<S: AsRef<str>>(&self, texts: &[S]) -> Vec<String> {
        texts.iter().map(|text| self.annotate(text.as_ref())).collect()
    }
}
