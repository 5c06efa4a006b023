// src/matching/normalize.rs - Canonical forms of ingredient, strength, dosage form and route
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static LIST_DECORATION: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[\[\]'"]"#).unwrap());
static MG_PERIOD: Lazy<Regex> = Lazy::new(|| Regex::new(r"MG\.+").unwrap());
static TRAILING_UNIT_PERIOD: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Z])\.+$").unwrap());
static STRENGTH_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[|;,]+\s*").unwrap());
static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Z0-9]+").unwrap());

/// Collapses whitespace runs to a single space and trims.
pub fn squish(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Join key for candidate generation. Keys compare by exact equality.
pub fn ingredient_key(ingredient: &str) -> String {
    squish(ingredient).to_uppercase()
}

/// Canonical single strength: "10 mg." and "['10MG']" both become "10MG".
///
/// Unit suffixes are preserved, so "10MCG" never equals "10MG".
pub fn normalize_strength(value: &str) -> String {
    let text = value.to_uppercase().replace(',', "");
    let text = LIST_DECORATION.replace_all(&text, "");
    let text = WHITESPACE.replace_all(&text, "");
    let text = MG_PERIOD.replace_all(&text, "MG");
    TRAILING_UNIT_PERIOD.replace(&text, "$1").into_owned()
}

/// Splits a multi-strength declaration into normalized tokens.
/// Empty parts are dropped, so an empty declaration yields an empty list.
pub fn tokenize_strength_list(value: &str) -> Vec<String> {
    let cleaned = LIST_DECORATION.replace_all(value, "");
    STRENGTH_SEPARATORS
        .split(&cleaned)
        .map(normalize_strength)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Token list for dosage form and route fields, deduplicated in first-seen order.
pub fn normalize_tokens(value: &str) -> Vec<String> {
    let text = value.to_uppercase();
    let text = LIST_DECORATION.replace_all(&text, "");
    let text = NON_ALPHANUMERIC.replace_all(&text, " ");

    let mut seen = HashSet::new();
    text.split_whitespace()
        .filter(|token| seen.insert(*token))
        .map(|token| token.to_string())
        .collect()
}

/// True iff the two lists share a token. Empty lists never overlap.
pub fn has_overlap(left: &[String], right: &[String]) -> bool {
    if left.is_empty() || right.is_empty() {
        return false;
    }
    let right_set: HashSet<&str> = right.iter().map(String::as_str).collect();
    left.iter().any(|token| right_set.contains(token.as_str()))
}
