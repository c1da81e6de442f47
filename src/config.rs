// WHY: Feature and section configuration arrive as JSON files edited by hand or by
// the browser UI; typed structs with serde defaults replace free-form key maps

use anyhow::{Context, Result};
use serde::de::{Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::info;

use crate::markup::TagGrammar;
use crate::pattern::{KeywordTable, PatternSet};
use crate::section::{SectionBreak, SectionCandidate, DEFAULT_BREAK_EXPRESSION};
use crate::text::HEADER_SECTION;

/// Keyword substitutable as `#name`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KeywordSpec {
    pub name: String,
    pub regex: String,
}

/// One feature expression; an empty name is derived from `expr`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExpressionSpec {
    #[serde(default)]
    pub name: String,
    pub expr: String,
}

/// Keywords may be written as a list of `{"name", "regex"}` objects or as one
/// `{"name": "regex"}` object; both keep file order
fn keywords_from_list_or_map<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<KeywordSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    struct KeywordsVisitor;

    impl<'de> Visitor<'de> for KeywordsVisitor {
        type Value = Vec<KeywordSpec>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a list of {name, regex} objects or a map of name to regex")
        }

        fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut keywords = Vec::new();
            while let Some(keyword) = seq.next_element::<KeywordSpec>()? {
                keywords.push(keyword);
            }
            Ok(keywords)
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut keywords = Vec::new();
            while let Some((name, regex)) = map.next_entry::<String, String>()? {
                keywords.push(KeywordSpec { name, regex });
            }
            Ok(keywords)
        }
    }

    deserializer.deserialize_any(KeywordsVisitor)
}

/// Feature file: `{"keywords": [...], "expressions": [...]}`
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureConfig {
    #[serde(default, deserialize_with = "keywords_from_list_or_map")]
    pub keywords: Vec<KeywordSpec>,
    #[serde(default)]
    pub expressions: Vec<ExpressionSpec>,
}

impl FeatureConfig {
    pub fn keyword_table(&self) -> KeywordTable {
        KeywordTable::new(self.keywords.iter().map(|k| (k.name.as_str(), k.regex.as_str())))
    }

    /// Snapshot of an edited pattern set, ready for `save_json`
    pub fn from_pattern_set(patterns: &PatternSet) -> Self {
        Self {
            keywords: patterns
                .keywords()
                .iter()
                .map(|k| KeywordSpec {
                    name: k.name.clone(),
                    regex: k.regex.clone(),
                })
                .collect(),
            expressions: patterns
                .iter()
                .map(|p| ExpressionSpec {
                    name: p.name().to_string(),
                    expr: p.raw().to_string(),
                })
                .collect(),
        }
    }

    /// Compile every expression in file order; invalid ones stay as flagged slots
    pub fn pattern_set(&self) -> PatternSet {
        PatternSet::from_specs(
            self.keyword_table(),
            self.expressions.iter().map(|e| (e.name.as_str(), e.expr.as_str())),
        )
    }
}

fn default_split_expr() -> String {
    DEFAULT_BREAK_EXPRESSION.to_string()
}

fn default_header() -> String {
    HEADER_SECTION.to_string()
}

fn default_used() -> bool {
    true
}

/// One candidate section-name pattern
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SectionSpec {
    #[serde(default)]
    pub name: String,
    pub expr: String,
    #[serde(default = "default_used")]
    pub used: bool,
}

/// Section file: break expression, header tag, candidate section names
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SectionConfig {
    #[serde(default = "default_split_expr")]
    pub split_expr: String,
    #[serde(default = "default_header")]
    pub header: String,
    #[serde(default)]
    pub sections: Vec<SectionSpec>,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            split_expr: default_split_expr(),
            header: default_header(),
            sections: Vec::new(),
        }
    }
}

impl SectionConfig {
    /// The break expression must compile; a bad one is a configuration error
    pub fn section_break(&self) -> Result<SectionBreak> {
        SectionBreak::new(&self.split_expr, self.header.clone())
            .with_context(|| format!("Invalid section break expression: {}", self.split_expr))
    }

    pub fn candidates(&self) -> Vec<SectionCandidate> {
        self.sections
            .iter()
            .map(|s| SectionCandidate::new(&s.expr, s.used, s.name.clone()))
            .collect()
    }
}

/// Tag grammar override; both fields default to the renderer's wire grammar
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AnnotatorOptions {
    #[serde(default = "default_open_tag")]
    pub open_tag: String,
    #[serde(default = "default_close_tag")]
    pub close_tag: String,
}

fn default_open_tag() -> String {
    TagGrammar::DEFAULT_OPEN.to_string()
}

fn default_close_tag() -> String {
    TagGrammar::DEFAULT_CLOSE.to_string()
}

impl Default for AnnotatorOptions {
    fn default() -> Self {
        Self {
            open_tag: default_open_tag(),
            close_tag: default_close_tag(),
        }
    }
}

impl AnnotatorOptions {
    pub fn grammar(&self) -> TagGrammar {
        TagGrammar::new(self.open_tag.clone(), self.close_tag.clone())
    }
}

/// Load any JSON configuration file
pub fn load_json<T, P>(path: P) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let parsed = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    info!("Loaded configuration from {}", path.display());
    Ok(parsed)
}

/// Write a configuration file as pretty JSON
pub fn save_json<T, P>(value: &T, path: P) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    Ok(())
}
