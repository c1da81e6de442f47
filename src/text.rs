// WHY: Notes arrive already split into sections/sentences by upstream splitters;
// annotation only reads them and produces new blocks

use serde::{Deserialize, Serialize};

/// Section tag given to text that precedes the first section break
pub const HEADER_SECTION: &str = "header";

/// One piece of a note with the section it belongs to
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub section: String,
}

impl Segment {
    pub fn new(text: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            section: section.into(),
        }
    }
}

/// A note as an ordered list of tagged segments
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBlock {
    pub segments: Vec<Segment>,
}

impl TextBlock {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Whole note as a single header segment
    pub fn single(text: impl Into<String>) -> Self {
        Self::new(vec![Segment::new(text, HEADER_SECTION)])
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|s| s.text.as_str())
    }

    /// New block with each segment's text replaced and its section tag kept
    pub fn map_text<F>(&self, mut f: F) -> TextBlock
    where
        F: FnMut(&str) -> String,
    {
        TextBlock::new(
            self.segments
                .iter()
                .map(|s| Segment::new(f(&s.text), s.section.clone()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_text_keeps_sections() {
        let block = TextBlock::new(vec![
            Segment::new("Pain in chest.", HEADER_SECTION),
            Segment::new("No fever.", "\n# Assessment\n"),
        ]);
        let upper = block.map_text(|t| t.to_uppercase());
        assert_eq!(upper.len(), 2);
        assert_eq!(upper.segments[0].text, "PAIN IN CHEST.");
        assert_eq!(upper.segments[1].section, "\n# Assessment\n");
        assert_eq!(block.segments[0].text, "Pain in chest.");
    }

    #[test]
    fn test_serde_shape() {
        let block = TextBlock::single("note");
        let json = serde_json::to_string(&block).unwrap();
        assert_eq!(json, r#"{"segments":[{"text":"note","section":"header"}]}"#);
        let back: TextBlock = serde_json::from_str(&json).unwrap();
        assert_eq!(back, block);
    }
}
