// src/matching/company.rs - Company-name evidence check for criteria-passing pairs
use log::{debug, warn};

use crate::models::matching::ValidationStatus;
use crate::utils::validation_config::ValidationPolicy;

/// Why a pair received its status; used for logging and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionBasis {
    /// Similarity reached the acceptance threshold.
    Confirmed,
    /// Evidence available and similarity below the rejection threshold.
    Contradicted,
    /// Evidence available but similarity between the two thresholds.
    Marginal,
    NoReferenceText,
    NoCompanies,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompanyDecision {
    pub status: ValidationStatus,
    /// Set only when the pair is validated.
    pub matched_company: Option<String>,
    pub similarity: f64,
    pub basis: DecisionBasis,
}

/// Per-word containment score of `company` within `reference_text`.
///
/// Only words strictly longer than `min_word_len` are scored. A company name
/// with no such word scores 1.0 when contained whole, else 0.0.
pub fn text_similarity(company: &str, reference_text: &str, min_word_len: usize) -> f64 {
    if company.trim().is_empty() || reference_text.trim().is_empty() {
        return 0.0;
    }
    let company_upper = company.to_uppercase();
    let text_upper = reference_text.to_uppercase();

    let words: Vec<&str> = company_upper
        .split_whitespace()
        .filter(|word| word.chars().count() > min_word_len)
        .collect();

    if words.is_empty() {
        return if text_upper.contains(company_upper.trim()) {
            1.0
        } else {
            0.0
        };
    }

    let matched = words.iter().filter(|word| text_upper.contains(*word)).count();
    matched as f64 / words.len() as f64
}

/// Highest-scoring company name. Ties keep the first company listed.
pub fn best_company_match<'c>(
    companies: &'c [String],
    reference_text: &str,
    min_word_len: usize,
) -> (Option<&'c str>, f64) {
    let mut best: (Option<&str>, f64) = (None, 0.0);
    for company in companies.iter().filter(|c| !c.trim().is_empty()) {
        let score = text_similarity(company, reference_text, min_word_len);
        if best.0.is_none() || score > best.1 {
            best = (Some(company.as_str()), score);
        }
    }
    best
}

/// Three-tier decision. Without evidence a pair is never rejected.
pub fn classify(
    similarity: f64,
    evidence_available: bool,
    policy: &ValidationPolicy,
) -> ValidationStatus {
    if similarity >= policy.accept_threshold {
        ValidationStatus::Validated
    } else if evidence_available && similarity < policy.reject_threshold {
        ValidationStatus::Rejected
    } else {
        ValidationStatus::Unknown
    }
}

pub fn validate_pair(
    companies: &[String],
    reference_text: Option<&str>,
    policy: &ValidationPolicy,
) -> CompanyDecision {
    let text = reference_text.filter(|t| !t.trim().is_empty());
    let has_companies = companies.iter().any(|c| !c.trim().is_empty());

    let (best_company, similarity) = match text {
        Some(text) => best_company_match(companies, text, policy.min_significant_word_len),
        None => (None, 0.0),
    };

    let evidence_available = text.is_some() && has_companies;
    let status = classify(similarity, evidence_available, policy);

    let basis = match status {
        ValidationStatus::Validated => DecisionBasis::Confirmed,
        ValidationStatus::Rejected => DecisionBasis::Contradicted,
        ValidationStatus::Unknown if text.is_none() => DecisionBasis::NoReferenceText,
        ValidationStatus::Unknown if !has_companies => DecisionBasis::NoCompanies,
        ValidationStatus::Unknown => DecisionBasis::Marginal,
    };

    CompanyDecision {
        status,
        matched_company: if status == ValidationStatus::Validated {
            best_company.map(|c| c.to_string())
        } else {
            None
        },
        similarity,
        basis,
    }
}

/// Logs one decision at the level matching its outcome.
pub fn log_decision(
    brand_application: &str,
    generic_application: &str,
    decision: &CompanyDecision,
) {
    match decision.basis {
        DecisionBasis::Confirmed => debug!(
            "✓ Validated: {} - {} (company: {}, similarity: {:.2})",
            brand_application,
            generic_application,
            decision.matched_company.as_deref().unwrap_or("?"),
            decision.similarity
        ),
        DecisionBasis::Contradicted => warn!(
            "✗ Rejected: {} - {} (low company similarity: {:.2})",
            brand_application, generic_application, decision.similarity
        ),
        DecisionBasis::Marginal => debug!(
            "? Keeping: {} - {} (marginal similarity: {:.2})",
            brand_application, generic_application, decision.similarity
        ),
        DecisionBasis::NoReferenceText => debug!(
            "? Keeping: {} - {} (no reference text available)",
            brand_application, generic_application
        ),
        DecisionBasis::NoCompanies => debug!(
            "? Keeping: {} - {} (no brand company data)",
            brand_application, generic_application
        ),
    }
}
