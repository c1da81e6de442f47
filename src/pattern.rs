// WHY: Users edit pattern lists interactively, so one bad expression must only
// flag itself invalid while the rest of the set keeps matching

use regex_automata::meta::Regex;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::palette;

pub type Result<T> = std::result::Result<T, PatternError>;

/// Errors raised while configuring patterns
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The expression (after keyword substitution) did not compile
    #[error("pattern `{pattern}` failed to compile: {message}")]
    Compile { pattern: String, message: String },

    /// An edit addressed a slot that does not exist
    #[error("pattern index {index} out of range for {len} patterns")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Derive a feature name from an expression's literal text: escape sequences
/// (a backslash and the character after it) are dropped, then every non-word
/// character. `\bquick brown\b` becomes `quickbrown`.
pub fn default_feature_name(expr: &str) -> String {
    let mut name = String::with_capacity(expr.len());
    let mut chars = expr.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
            continue;
        }
        if is_word_char(c) {
            name.push(c);
        }
    }
    name
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Keyword usable as `#name` inside feature expressions
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    pub name: String,
    pub regex: String,
    /// Name is a single word and unique within the table
    pub name_valid: bool,
    pub regex_valid: bool,
}

/// Ordered keyword list with validity resolved up front
#[derive(Debug, Clone, Default)]
pub struct KeywordTable {
    keywords: Vec<Keyword>,
    lookup: HashMap<String, usize>,
}

impl KeywordTable {
    pub fn new<I, N, R>(entries: I) -> Self
    where
        I: IntoIterator<Item = (N, R)>,
        N: Into<String>,
        R: Into<String>,
    {
        let raw: Vec<(String, String)> = entries
            .into_iter()
            .map(|(name, regex)| (name.into(), regex.into()))
            .collect();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for (name, _) in &raw {
            *counts.entry(name.as_str()).or_default() += 1;
        }

        let keywords: Vec<Keyword> = raw
            .iter()
            .map(|(name, regex)| Keyword {
                name: name.clone(),
                regex: regex.clone(),
                name_valid: !name.is_empty()
                    && name.chars().all(is_word_char)
                    && counts.get(name.as_str()) == Some(&1),
                regex_valid: Regex::new(regex).is_ok(),
            })
            .collect();

        let lookup = keywords
            .iter()
            .enumerate()
            .map(|(index, keyword)| (keyword.name.clone(), index))
            .collect();

        Self { keywords, lookup }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keyword> {
        self.keywords.iter()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Keyword> {
        self.keywords.get(index)
    }

    /// Owned `(name, regex)` pairs in table order
    fn entries(&self) -> Vec<(String, String)> {
        self.keywords
            .iter()
            .map(|k| (k.name.clone(), k.regex.clone()))
            .collect()
    }

    // Edits rebuild the whole table: a rename can create or clear a duplicate anywhere

    /// Insert before `index`, or append when `index` is past the end
    pub fn insert(&mut self, index: usize, name: &str, regex: &str) {
        let mut entries = self.entries();
        entries.insert(index.min(entries.len()), (name.to_string(), regex.to_string()));
        *self = Self::new(entries);
    }

    pub fn edit(&mut self, index: usize, name: &str, regex: &str) -> Result<()> {
        let mut entries = self.entries();
        let len = entries.len();
        let slot = entries
            .get_mut(index)
            .ok_or(PatternError::IndexOutOfRange { index, len })?;
        *slot = (name.to_string(), regex.to_string());
        *self = Self::new(entries);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Keyword> {
        let len = self.keywords.len();
        if index >= len {
            return Err(PatternError::IndexOutOfRange { index, len });
        }
        let mut entries = self.entries();
        entries.remove(index);
        let removed = self.keywords.remove(index);
        *self = Self::new(entries);
        Ok(removed)
    }

    /// Move the keyword at `index` to `new_index` (clamped to the last slot)
    pub fn move_to(&mut self, index: usize, new_index: usize) -> Result<usize> {
        let mut entries = self.entries();
        let target = move_clamped(&mut entries, index, new_index)?;
        *self = Self::new(entries);
        Ok(target)
    }

    /// Regex text for `name` if it may be substituted
    fn replacement(&self, name: &str) -> Option<&str> {
        self.lookup
            .get(name)
            .map(|&index| &self.keywords[index])
            .filter(|keyword| keyword.name_valid)
            .map(|keyword| keyword.regex.as_str())
    }

    /// Replace every unescaped `#name` whose keyword exists and has a valid name.
    /// Text separated by an escaped backslash (`\\`) is scanned independently so
    /// `\\#name` still substitutes while `\#name` does not.
    pub fn expand(&self, expr: &str) -> String {
        if self.keywords.is_empty() {
            return expr.to_string();
        }
        expr.split(r"\\")
            .map(|part| self.expand_part(part))
            .collect::<Vec<_>>()
            .join(r"\\")
    }

    fn expand_part(&self, part: &str) -> String {
        let mut out = String::with_capacity(part.len());
        let mut last = 0;
        let mut prev: Option<char> = None;
        let mut iter = part.char_indices().peekable();

        while let Some((pos, c)) = iter.next() {
            if c == '#' && prev != Some('\\') {
                let name_start = pos + c.len_utf8();
                let mut name_end = name_start;
                while let Some(&(next_pos, next)) = iter.peek() {
                    if !is_word_char(next) {
                        break;
                    }
                    name_end = next_pos + next.len_utf8();
                    iter.next();
                }
                if name_end > name_start {
                    if let Some(regex) = self.replacement(&part[name_start..name_end]) {
                        out.push_str(&part[last..pos]);
                        out.push_str(regex);
                        last = name_end;
                    }
                    prev = part[..name_end].chars().next_back();
                    continue;
                }
            }
            prev = Some(c);
        }

        out.push_str(&part[last..]);
        out
    }
}

/// Expression given to a freshly inserted slot; it only matches empty spans, so it
/// never highlights anything until edited
pub const PLACEHOLDER_EXPRESSION: &str = r"\b\b";

/// Name given to a freshly inserted keyword
pub const PLACEHOLDER_KEYWORD: &str = "New";

/// Move `items[index]` to `new_index`, clamping the target to the last position.
/// Returns where the item landed.
fn move_clamped<T>(items: &mut Vec<T>, index: usize, new_index: usize) -> Result<usize> {
    let len = items.len();
    if index >= len {
        return Err(PatternError::IndexOutOfRange { index, len });
    }
    let target = new_index.min(len - 1);
    let item = items.remove(index);
    items.insert(target, item);
    Ok(target)
}

/// One configured feature expression.
///
/// Invalid patterns are kept (so positions and colors stay stable) but hold no
/// compiled regex and never match.
#[derive(Debug, Clone)]
pub struct Pattern {
    name: String,
    raw: String,
    expanded: String,
    regex: Option<Regex>,
    error: Option<PatternError>,
}

impl Pattern {
    /// Compile `raw` with no keyword table. An empty `name` is derived from `raw`.
    pub fn new(name: &str, raw: &str) -> Self {
        Self::with_keywords(name, raw, &KeywordTable::default())
    }

    pub fn with_keywords(name: &str, raw: &str, keywords: &KeywordTable) -> Self {
        let name = if name.is_empty() {
            default_feature_name(raw)
        } else {
            name.to_string()
        };
        let expanded = keywords.expand(raw);

        let (regex, error) = match Regex::new(&expanded) {
            Ok(regex) => (Some(regex), None),
            Err(e) => {
                warn!("Pattern {:?} ({}) is invalid: {}", name, expanded, e);
                let error = PatternError::Compile {
                    pattern: expanded.clone(),
                    message: e.to_string(),
                };
                (None, Some(error))
            }
        };

        Self {
            name,
            raw: raw.to_string(),
            expanded,
            regex,
            error,
        }
    }

    /// Strict constructor for callers that want compile failures as errors
    pub fn try_new(name: &str, raw: &str) -> Result<Self> {
        let pattern = Self::new(name, raw);
        if let Some(error) = pattern.error.clone() {
            return Err(error);
        }
        Ok(pattern)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Expression as the user typed it
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Expression after keyword substitution; this is what gets compiled
    pub fn expanded(&self) -> &str {
        &self.expanded
    }

    pub fn is_valid(&self) -> bool {
        self.regex.is_some()
    }

    pub fn error(&self) -> Option<&PatternError> {
        self.error.as_ref()
    }

    /// Non-overlapping, non-empty match spans in `text`; nothing for invalid patterns
    pub fn find_spans<'t>(&'t self, text: &'t str) -> impl Iterator<Item = (usize, usize)> + 't {
        self.regex
            .iter()
            .flat_map(move |regex| regex.find_iter(text))
            .filter(|m| !m.is_empty())
            .map(|m| (m.start(), m.end()))
    }

    /// Whether the pattern matches anywhere in `text`
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|regex| regex.is_match(text))
    }
}

/// Editing-UI view of one pattern slot
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FeatureDescriptor {
    pub name: String,
    pub raw_regex: String,
    pub regex: String,
    pub is_valid: bool,
}

/// Ordered feature configuration. Slot order is the priority order on overlap
/// and the key for palette colors.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    keywords: KeywordTable,
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn new(keywords: KeywordTable) -> Self {
        Self {
            keywords,
            patterns: Vec::new(),
        }
    }

    /// Build from `(name, raw)` pairs; empty names are derived from the expression
    pub fn from_specs<I, N, R>(keywords: KeywordTable, specs: I) -> Self
    where
        I: IntoIterator<Item = (N, R)>,
        N: AsRef<str>,
        R: AsRef<str>,
    {
        let mut set = Self::new(keywords);
        for (name, raw) in specs {
            set.push(name.as_ref(), raw.as_ref());
        }
        set
    }

    /// Unnamed patterns compiled without keywords, in order
    pub fn from_expressions<I, R>(expressions: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<str>,
    {
        Self::from_specs(
            KeywordTable::default(),
            expressions.into_iter().map(|raw| (String::new(), raw)),
        )
    }

    pub fn push(&mut self, name: &str, raw: &str) -> &Pattern {
        let pattern = Pattern::with_keywords(name, raw, &self.keywords);
        debug!("Registered pattern {} at slot {}", pattern.name(), self.patterns.len());
        self.patterns.push(pattern);
        &self.patterns[self.patterns.len() - 1]
    }

    /// Insert a slot before `index`, or append when `index` is past the end. Later
    /// slots shift down and take the next palette color.
    pub fn insert(&mut self, index: usize, name: &str, raw: &str) -> &Pattern {
        let index = index.min(self.patterns.len());
        let pattern = Pattern::with_keywords(name, raw, &self.keywords);
        debug!("Inserted pattern {} at slot {}", pattern.name(), index);
        self.patterns.insert(index, pattern);
        &self.patterns[index]
    }

    /// Insert an unnamed placeholder slot to be edited later
    pub fn insert_placeholder(&mut self, index: usize) -> &Pattern {
        self.insert(index, "", PLACEHOLDER_EXPRESSION)
    }

    /// Move the slot at `index` to `new_index` (clamped to the last slot). The
    /// moved pattern takes the color and overlap priority of its new slot.
    pub fn move_to(&mut self, index: usize, new_index: usize) -> Result<usize> {
        let target = move_clamped(&mut self.patterns, index, new_index)?;
        debug!("Moved pattern from slot {} to {}", index, target);
        Ok(target)
    }

    /// Replace the slot at `index`, recompiling it
    pub fn edit(&mut self, index: usize, name: &str, raw: &str) -> Result<&Pattern> {
        let len = self.patterns.len();
        let slot = self
            .patterns
            .get_mut(index)
            .ok_or(PatternError::IndexOutOfRange { index, len })?;
        *slot = Pattern::with_keywords(name, raw, &self.keywords);
        Ok(&*slot)
    }

    pub fn remove(&mut self, index: usize) -> Result<Pattern> {
        let len = self.patterns.len();
        if index >= len {
            return Err(PatternError::IndexOutOfRange { index, len });
        }
        Ok(self.patterns.remove(index))
    }

    /// Swap the keyword table and recompile every slot against it
    pub fn set_keywords(&mut self, keywords: KeywordTable) {
        self.keywords = keywords;
        self.recompile();
    }

    fn recompile(&mut self) {
        for slot in &mut self.patterns {
            *slot = Pattern::with_keywords(slot.name(), slot.raw(), &self.keywords);
        }
    }

    /// Insert a keyword (appending past the end) and recompile every slot
    pub fn insert_keyword(&mut self, index: usize, name: &str, regex: &str) {
        self.keywords.insert(index, name, regex);
        self.recompile();
    }

    pub fn edit_keyword(&mut self, index: usize, name: &str, regex: &str) -> Result<()> {
        self.keywords.edit(index, name, regex)?;
        self.recompile();
        Ok(())
    }

    pub fn remove_keyword(&mut self, index: usize) -> Result<Keyword> {
        let removed = self.keywords.remove(index)?;
        self.recompile();
        Ok(removed)
    }

    pub fn move_keyword(&mut self, index: usize, new_index: usize) -> Result<usize> {
        let target = self.keywords.move_to(index, new_index)?;
        self.recompile();
        Ok(target)
    }

    pub fn keywords(&self) -> &KeywordTable {
        &self.keywords
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Pattern> {
        self.patterns.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    /// Compiled patterns with their configured slot index
    pub fn valid(&self) -> impl Iterator<Item = (usize, &Pattern)> {
        self.patterns.iter().enumerate().filter(|(_, p)| p.is_valid())
    }

    pub fn names_valid(&self) -> Vec<&str> {
        self.valid().map(|(_, p)| p.name()).collect()
    }

    pub fn descriptors(&self) -> Vec<FeatureDescriptor> {
        self.patterns
            .iter()
            .map(|p| FeatureDescriptor {
                name: p.name().to_string(),
                raw_regex: p.raw().to_string(),
                regex: if p.is_valid() { p.expanded().to_string() } else { String::new() },
                is_valid: p.is_valid(),
            })
            .collect()
    }

    /// Color for the slot at `index`
    pub fn color(&self, index: usize) -> &'static str {
        palette::color_for(index)
    }
}
