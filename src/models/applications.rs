// src/models/applications.rs

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::utils::constants::APPROVED_BEFORE_CUTOFF;

/// Approval date as published in the source tables.
///
/// Historical records predate systematic tracking and carry a sentinel
/// instead of a calendar date. The sentinel is never treated as a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApprovalDate {
    On(NaiveDate),
    PriorToCutoff,
}

impl ApprovalDate {
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            ApprovalDate::On(date) => Some(*date),
            ApprovalDate::PriorToCutoff => None,
        }
    }

    pub fn year(&self) -> Option<i32> {
        self.as_date().map(|d| d.year())
    }
}

impl fmt::Display for ApprovalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalDate::On(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            ApprovalDate::PriorToCutoff => write!(f, "{}", APPROVED_BEFORE_CUTOFF),
        }
    }
}

impl Serialize for ApprovalDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Calendar date of an optional approval, `None` for missing dates and the sentinel.
pub fn calendar_date(date: Option<&ApprovalDate>) -> Option<NaiveDate> {
    date.and_then(ApprovalDate::as_date)
}

/// Brand (reference) application.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrandApplication {
    pub application_number: String,
    pub ingredient: String,
    /// Strength declaration as published; may list several variants
    /// ("10 MG | 20 MG", "['10MG', '20MG']") or concatenate them.
    pub strength: String,
    pub dosage_form: String,
    pub route: String,
    pub approval_date: Option<ApprovalDate>,
    pub exclusivity_years: Option<f64>,
    /// Every applicant name seen for this application (parent, subsidiary, renames).
    pub companies: Vec<String>,
    pub trade_name: Option<String>,
}

impl BrandApplication {
    pub fn primary_company(&self) -> Option<&str> {
        self.companies
            .iter()
            .map(|c| c.as_str())
            .find(|c| !c.trim().is_empty())
    }

    /// Adds a company name unless an identical (case-insensitive) one is already known.
    pub fn add_company(&mut self, company: &str) {
        let company = company.trim();
        if company.is_empty() {
            return;
        }
        if !self
            .companies
            .iter()
            .any(|known| known.eq_ignore_ascii_case(company))
        {
            self.companies.push(company.to_string());
        }
    }
}

/// Generic (abbreviated) application product.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenericApplication {
    pub application_number: String,
    pub ingredient: String,
    pub strength: String,
    pub dosage_form: String,
    pub route: String,
    pub approval_date: Option<ApprovalDate>,
    pub applicant: String,
    /// Therapeutic-equivalence code. Informational only, never a match criterion.
    pub te_code: Option<String>,
    pub trade_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approval_date_display_and_calendar() {
        let date = ApprovalDate::On(NaiveDate::from_ymd_opt(2004, 3, 9).unwrap());
        assert_eq!(date.to_string(), "2004-03-09");
        assert_eq!(date.year(), Some(2004));

        let sentinel = ApprovalDate::PriorToCutoff;
        assert_eq!(sentinel.to_string(), APPROVED_BEFORE_CUTOFF);
        assert_eq!(sentinel.as_date(), None);
        assert_eq!(calendar_date(Some(&sentinel)), None);
        assert_eq!(calendar_date(None), None);
    }

    #[test]
    fn test_approval_date_serializes_as_string() {
        let date = ApprovalDate::On(NaiveDate::from_ymd_opt(1999, 12, 1).unwrap());
        assert_eq!(serde_json::to_string(&date).unwrap(), "\"1999-12-01\"");
        assert_eq!(
            serde_json::to_string(&ApprovalDate::PriorToCutoff).unwrap(),
            format!("\"{}\"", APPROVED_BEFORE_CUTOFF)
        );
    }

    #[test]
    fn test_add_company_dedupes_case_insensitively() {
        let mut brand = BrandApplication::default();
        brand.add_company("Pfizer Inc");
        brand.add_company("PFIZER INC");
        brand.add_company("  ");
        brand.add_company("Pfizer Laboratories Div Pfizer Inc");
        assert_eq!(brand.companies.len(), 2);
        assert_eq!(brand.primary_company(), Some("Pfizer Inc"));
    }
}
