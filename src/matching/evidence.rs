// src/matching/evidence.rs - Locates the bioequivalence statement in approval-letter text
//
// Patterns are tried in priority order and the first hit wins. Each pattern is
// applied to one paragraph at a time, so a match may span soft line breaks but
// never a blank line.

use anyhow::{Context, Result};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::matching::normalize::squish;
use crate::utils::validation_config::ValidationPolicy;

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n").unwrap());

const SENTENCE_END: &str = r"(?:\.\s|\.\z|\z)";

const EITHER_OFFICE: &str = r"(?:The\s+)?(?:Office|Division)\s+of\s+Bioequivalence";

const EQUIVALENCE_PHRASE: &str =
    r"bioequivalent\s+and\s+therapeutically\s+equivalent\s+to\s+the\s+reference\s+listed\s+drug";

/// One step of the extraction cascade.
pub trait BioequivalenceMatcher: Send + Sync {
    fn name(&self) -> &str;

    /// Raw span of the first match within a single paragraph.
    fn find<'t>(&self, paragraph: &'t str) -> Option<&'t str>;
}

pub struct RegexMatcher {
    name: String,
    regex: Regex,
}

impl RegexMatcher {
    pub fn new(name: &str, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .with_context(|| format!("Invalid evidence pattern '{}': {}", name, pattern))?;
        Ok(Self {
            name: name.to_string(),
            regex,
        })
    }
}

impl BioequivalenceMatcher for RegexMatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn find<'t>(&self, paragraph: &'t str) -> Option<&'t str> {
        self.regex.find(paragraph).map(|m| m.as_str())
    }
}

/// Alternation over the configured company suffixes, e.g. `\bInc\.|\bLLC\b`.
fn suffix_alternation(suffixes: &[String]) -> String {
    suffixes
        .iter()
        .map(|suffix| suffix.trim())
        .filter(|suffix| !suffix.is_empty())
        .map(|suffix| {
            let starts_word = suffix.chars().next().map_or(false, |c| c.is_alphanumeric());
            let ends_word = suffix.chars().last().map_or(false, |c| c.is_alphanumeric());
            format!(
                "{}{}{}",
                if starts_word { r"\b" } else { "" },
                regex::escape(suffix),
                if ends_word { r"\b" } else { "" }
            )
        })
        .collect::<Vec<_>>()
        .join("|")
}

pub struct EvidenceExtractor {
    matchers: Vec<Box<dyn BioequivalenceMatcher>>,
}

impl EvidenceExtractor {
    /// Standard cascade: office with company suffix, division with company
    /// suffix, the office's "has determined" sentence, any sentence naming the
    /// office and a bioequivalence finding, then the direct "bioequivalent and
    /// therapeutically equivalent" phrase.
    pub fn new(policy: &ValidationPolicy) -> Result<Self> {
        let suffixes = suffix_alternation(&policy.company_suffixes);
        let matchers: Vec<Box<dyn BioequivalenceMatcher>> = vec![
            Box::new(RegexMatcher::new(
                "office_with_company",
                &format!(r"(?is)(?:The\s+)?Office\s+of\s+Bioequivalence.*?(?:{})", suffixes),
            )?),
            Box::new(RegexMatcher::new(
                "division_with_company",
                &format!(r"(?is)(?:The\s+)?Division\s+of\s+Bioequivalence.*?(?:{})", suffixes),
            )?),
            Box::new(RegexMatcher::new(
                "determination_statement",
                &format!(r"(?is){}\s+has\s+determined.*?{}", EITHER_OFFICE, SENTENCE_END),
            )?),
            // Office named in the same sentence as the equivalence finding; bare
            // mentions and headers never match
            Box::new(RegexMatcher::new(
                "bioequivalence_statement",
                &format!(
                    r"(?is){}[^.]*?\bbioequivalent\b.*?{}",
                    EITHER_OFFICE, SENTENCE_END
                ),
            )?),
            Box::new(RegexMatcher::new(
                "therapeutic_equivalence_phrase",
                &format!(r"(?is)[^.]*{}.*?{}", EQUIVALENCE_PHRASE, SENTENCE_END),
            )?),
        ];
        Ok(Self { matchers })
    }

    pub fn with_matchers(matchers: Vec<Box<dyn BioequivalenceMatcher>>) -> Self {
        Self { matchers }
    }

    pub fn matcher_names(&self) -> Vec<&str> {
        self.matchers.iter().map(|m| m.name()).collect()
    }

    /// Whitespace-collapsed statement from the first matcher that finds one.
    pub fn extract(&self, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let paragraphs: Vec<&str> = PARAGRAPH_BREAK.split(&text).collect();

        for matcher in &self.matchers {
            for paragraph in &paragraphs {
                if let Some(span) = matcher.find(paragraph) {
                    let sentence = squish(span);
                    if sentence.is_empty() {
                        continue;
                    }
                    debug!("Evidence matched by '{}': {}", matcher.name(), sentence);
                    return Some(sentence);
                }
            }
        }
        None
    }
}
