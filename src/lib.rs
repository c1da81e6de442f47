pub mod annotator;
pub mod batch;
pub mod config;
pub mod discovery;
pub mod markup;
pub mod merge;
pub mod palette;
pub mod pattern;
pub mod reader;
pub mod section;
pub mod text;

// Re-export main types for convenient access
pub use annotator::MultiPatternAnnotator;
pub use markup::{TagGrammar, TagStyle};
pub use merge::{linearize, merge, render, MarkerEvent, MarkupWriter, Match};
pub use palette::{color_for, LegendEntry, PALETTE};
pub use pattern::{default_feature_name, KeywordTable, Pattern, PatternError, PatternSet};
pub use section::{SectionAnnotator, SectionBreak, SectionCandidate, SectionClass};
pub use text::{Segment, TextBlock};
