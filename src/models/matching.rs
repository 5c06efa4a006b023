// src/models/matching.rs

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::models::applications::ApprovalDate;
use crate::models::stats_models::PipelineStats;

/// Outcome of the three compatibility predicates for one candidate pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CriteriaFlags {
    pub dosage_form: bool,
    pub route: bool,
    pub strength: bool,
}

impl CriteriaFlags {
    pub fn all_pass(&self) -> bool {
        self.dosage_form && self.route && self.strength
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValidationStatus {
    Validated,
    Rejected,
    Unknown,
}

impl ValidationStatus {
    /// Rejected is the only status that removes a pair from the result set.
    pub fn is_retained(&self) -> bool {
        !matches!(self, ValidationStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Validated => "Validated",
            ValidationStatus::Rejected => "Rejected",
            ValidationStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pair that passed all three criteria and the chronological filter,
/// annotated with the company-match decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedMatch {
    pub brand_application: String,
    pub brand_ingredient: String,
    pub brand_approval_date: Option<ApprovalDate>,
    pub generic_application: String,
    pub generic_applicant: String,
    pub generic_strength: String,
    pub generic_approval_date: Option<ApprovalDate>,
    pub generic_te_code: Option<String>,
    pub dosage_form_compatible: bool,
    pub route_compatible: bool,
    pub strength_compatible: bool,
    pub matched_company: Option<String>,
    pub similarity: f64,
    pub status: ValidationStatus,
    pub reference_text: Option<String>,
}

impl ValidatedMatch {
    pub fn is_retained(&self) -> bool {
        self.status.is_retained()
    }

    pub fn generic_date(&self) -> Option<NaiveDate> {
        self.generic_approval_date.and_then(|d| d.as_date())
    }

    pub fn brand_date(&self) -> Option<NaiveDate> {
        self.brand_approval_date.and_then(|d| d.as_date())
    }
}

/// Real-world exclusivity for one brand application with at least one retained match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonopolyRecord {
    pub brand_application: String,
    pub ingredient: String,
    pub primary_company: Option<String>,
    pub brand_approval_date: Option<ApprovalDate>,
    pub earliest_generic_application: Option<String>,
    pub earliest_generic_date: Option<NaiveDate>,
    pub actual_exclusivity_years: Option<f64>,
    pub granted_exclusivity_years: Option<f64>,
    pub actual_shorter_than_granted: Option<bool>,
    pub retained_match_count: usize,
    /// Retained generic applications, dated ones ascending first, then undated.
    #[serde(serialize_with = "serialize_joined")]
    pub matched_generics: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnmatchedReason {
    /// No generic record shares the ingredient key.
    NoCandidates,
    /// Same-ingredient generics exist but none passed all three criteria.
    CriteriaNotMet,
    /// Every criteria-passing generic predates the brand approval.
    ChronologicallyExcluded,
    /// Every surviving pair was rejected on company evidence.
    RejectedByEvidence,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedBrand {
    pub brand_application: String,
    pub ingredient: String,
    pub brand_approval_date: Option<ApprovalDate>,
    pub reason: UnmatchedReason,
    pub candidate_count: usize,
}

/// Evidence outcome for one distinct generic application looked up during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionStatus {
    pub generic_application: String,
    /// The evidence source returned a non-empty letter.
    pub letter_found: bool,
    /// A bioequivalence statement was found in that letter.
    pub statement_extracted: bool,
}

impl ExtractionStatus {
    /// Letter present but no statement in it, usually a layout the cascade misses.
    pub fn statement_missing(&self) -> bool {
        self.letter_found && !self.statement_extracted
    }
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub retained: Vec<ValidatedMatch>,
    pub rejected: Vec<ValidatedMatch>,
    pub monopoly: Vec<MonopolyRecord>,
    pub unmatched: Vec<UnmatchedBrand>,
    /// One entry per looked-up generic, ordered by application number.
    pub extraction_status: Vec<ExtractionStatus>,
    pub stats: PipelineStats,
}

fn serialize_joined<S: Serializer>(values: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&values.join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rejected_is_dropped() {
        assert!(ValidationStatus::Validated.is_retained());
        assert!(ValidationStatus::Unknown.is_retained());
        assert!(!ValidationStatus::Rejected.is_retained());
    }

    #[test]
    fn test_criteria_all_pass() {
        let mut flags = CriteriaFlags {
            dosage_form: true,
            route: true,
            strength: true,
        };
        assert!(flags.all_pass());
        flags.route = false;
        assert!(!flags.all_pass());
    }

    #[test]
    fn test_matched_generics_serialize_joined() {
        let record = MonopolyRecord {
            brand_application: "020357".to_string(),
            ingredient: "METFORMIN HYDROCHLORIDE".to_string(),
            primary_company: None,
            brand_approval_date: None,
            earliest_generic_application: None,
            earliest_generic_date: None,
            actual_exclusivity_years: None,
            granted_exclusivity_years: None,
            actual_shorter_than_granted: None,
            retained_match_count: 2,
            matched_generics: vec!["075965".to_string(), "076010".to_string()],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["matched_generics"], "075965 | 076010");
    }
}
