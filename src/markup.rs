// WHY: The tag vocabulary is a wire contract with the note renderer; emit policies
// sit on top of it so the merge core never decides how a tag looks

use serde::{Deserialize, Serialize};

use crate::merge::{Match, MarkupWriter};

/// Placeholder replaced by a color in an open-tag template
pub const COLOR_PLACEHOLDER: &str = "{color}";
/// Placeholder replaced by a phrase name in an open-tag template
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Open/close token grammar understood by the renderer.
///
/// The default grammar is
/// `:rgb:{color}:rgb::phrase:{name}:phrase::blob:` ... `:blob:`:
/// a start-color token, a name token, a terminator token, and one universal
/// close token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TagGrammar {
    pub open: String,
    pub close: String,
}

impl TagGrammar {
    pub const DEFAULT_OPEN: &'static str = ":rgb:{color}:rgb::phrase:{name}:phrase::blob:";
    pub const DEFAULT_CLOSE: &'static str = ":blob:";

    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// Render the open tag, substituting placeholders in a single left-to-right scan
    /// so a name containing `{color}` is emitted literally
    pub fn open_tag(&self, color: &str, name: &str) -> String {
        let mut out = String::with_capacity(self.open.len() + color.len() + name.len());
        let mut rest = self.open.as_str();
        while let Some(pos) = rest.find('{') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if tail.starts_with(COLOR_PLACEHOLDER) {
                out.push_str(color);
                rest = &tail[COLOR_PLACEHOLDER.len()..];
            } else if tail.starts_with(NAME_PLACEHOLDER) {
                out.push_str(name);
                rest = &tail[NAME_PLACEHOLDER.len()..];
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }

    pub fn close_tag(&self) -> &str {
        &self.close
    }
}

impl Default for TagGrammar {
    fn default() -> Self {
        Self::new(Self::DEFAULT_OPEN, Self::DEFAULT_CLOSE)
    }
}

/// Color and label rendered into the open tag of every match carrying this style's key
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TagStyle {
    pub color: String,
    pub label: String,
}

impl TagStyle {
    pub fn new(color: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            label: label.into(),
        }
    }
}

/// Inline span policy: tags wrap matched text with nothing added around them
pub struct InlineWriter<'a> {
    grammar: &'a TagGrammar,
    styles: &'a [TagStyle],
}

impl<'a> InlineWriter<'a> {
    /// `styles` is indexed by `Match::key`
    pub fn new(grammar: &'a TagGrammar, styles: &'a [TagStyle]) -> Self {
        Self { grammar, styles }
    }
}

impl MarkupWriter for InlineWriter<'_> {
    fn open(&self, out: &mut String, m: &Match) {
        let style = &self.styles[m.key];
        out.push_str(&self.grammar.open_tag(&style.color, &style.label));
    }

    fn close(&self, out: &mut String, _m: &Match) {
        out.push_str(self.grammar.close_tag());
    }
}

/// Paragraph policy used for section boundaries: open tags are preceded and close
/// tags followed by a blank line, and the run of text that ends at a close tag
/// has its newlines removed
pub struct SectionWriter<'a> {
    grammar: &'a TagGrammar,
    styles: &'a [TagStyle],
}

impl<'a> SectionWriter<'a> {
    pub const PARAGRAPH_BREAK: &'static str = "\n\n";

    pub fn new(grammar: &'a TagGrammar, styles: &'a [TagStyle]) -> Self {
        Self { grammar, styles }
    }
}

impl MarkupWriter for SectionWriter<'_> {
    fn closing_run(&self, out: &mut String, run: &str) {
        out.extend(run.chars().filter(|&c| c != '\n'));
    }

    fn open(&self, out: &mut String, m: &Match) {
        let style = &self.styles[m.key];
        out.push_str(Self::PARAGRAPH_BREAK);
        out.push_str(&self.grammar.open_tag(&style.color, &style.label));
    }

    fn close(&self, out: &mut String, _m: &Match) {
        out.push_str(self.grammar.close_tag());
        out.push_str(Self::PARAGRAPH_BREAK);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grammar_wire_format() {
        let grammar = TagGrammar::default();
        assert_eq!(
            grammar.open_tag("#f77189", "quick"),
            ":rgb:#f77189:rgb::phrase:quick:phrase::blob:"
        );
        assert_eq!(grammar.close_tag(), ":blob:");
    }

    #[test]
    fn test_placeholders_are_not_rescanned() {
        let grammar = TagGrammar::new("<span data-c=\"{color}\" title=\"{name}\">", "</span>");
        assert_eq!(
            grammar.open_tag("red", "{color}"),
            "<span data-c=\"red\" title=\"{color}\">"
        );
    }

    #[test]
    fn test_literal_braces_survive() {
        let grammar = TagGrammar::new("{{x}} {name}", "");
        assert_eq!(grammar.open_tag("c", "n"), "{{x}} n");
    }

    #[test]
    fn test_section_writer_strips_newlines_only_in_closing_run() {
        let grammar = TagGrammar::new("<{color}>", "</>");
        let styles = vec![TagStyle::new("blue", "x")];
        let writer = SectionWriter::new(&grammar, &styles);
        let m = Match::new(0, 3, 0);

        let mut out = String::new();
        writer.text_run(&mut out, "a\nb");
        writer.open(&mut out, &m);
        writer.closing_run(&mut out, "\nc\n");
        writer.close(&mut out, &m);
        assert_eq!(out, "a\nb\n\n<blue>c</>\n\n");
    }
}
