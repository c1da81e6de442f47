// WHY: Colors must stay stable per pattern across notes and segments so a legend
// built once can be reused for every rendered block

use serde::Serialize;
use std::collections::BTreeMap;

/// Fixed husl palette of equal intensity, assigned by registration order
pub const PALETTE: [&str; 10] = [
    "#f77189", "#dc8932", "#ae9d31", "#77ab31", "#33b07a",
    "#36ada4", "#38a9c5", "#6e9bf4", "#cc7af4", "#f565cc",
];

/// Color for the pattern registered at `index`, wrapping past the palette length
pub fn color_for(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// One legend row: a configured pattern and the color its matches render with
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LegendEntry {
    pub name: String,
    pub pattern: String,
    pub color: &'static str,
    /// Invalid patterns keep their slot (and color) but never match
    pub valid: bool,
}

/// Map pattern text to color for every configured pattern, keyed the way
/// the front end looks colors up
pub fn color_map<'a, I>(patterns: I) -> BTreeMap<String, &'static str>
where
    I: IntoIterator<Item = &'a str>,
{
    patterns
        .into_iter()
        .enumerate()
        .map(|(index, pattern)| (pattern.to_string(), color_for(index)))
        .collect()
}
