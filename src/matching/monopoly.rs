// src/matching/monopoly.rs - Actual exclusivity per brand from its retained generic matches
use chrono::NaiveDate;
use std::collections::HashSet;

use crate::models::applications::{calendar_date, BrandApplication};
use crate::models::matching::{MonopolyRecord, UnmatchedBrand, UnmatchedReason, ValidatedMatch};
use crate::utils::constants::DAYS_PER_YEAR;

/// How far one brand's pairs got through the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrandFunnel {
    pub candidates: usize,
    pub criteria_passed: usize,
    pub chronology_passed: usize,
    pub retained: usize,
}

impl BrandFunnel {
    /// Stage that removed the brand's last pair, or `None` when a match survived.
    pub fn unmatched_reason(&self) -> Option<UnmatchedReason> {
        if self.retained > 0 {
            None
        } else if self.candidates == 0 {
            Some(UnmatchedReason::NoCandidates)
        } else if self.criteria_passed == 0 {
            Some(UnmatchedReason::CriteriaNotMet)
        } else if self.chronology_passed == 0 {
            Some(UnmatchedReason::ChronologicallyExcluded)
        } else {
            Some(UnmatchedReason::RejectedByEvidence)
        }
    }
}

pub fn years_between(from: NaiveDate, to: NaiveDate) -> f64 {
    (to - from).num_days() as f64 / DAYS_PER_YEAR
}

/// Builds the record for one brand with at least one retained match.
///
/// Only generics approved strictly after the brand count as the first
/// competitor; a missing brand date leaves the interval fields empty.
pub fn monopoly_record(brand: &BrandApplication, retained: &[&ValidatedMatch]) -> MonopolyRecord {
    let brand_date = calendar_date(brand.approval_date.as_ref());

    let earliest = brand_date.and_then(|brand_date| {
        retained
            .iter()
            .filter_map(|m| m.generic_date().map(|d| (d, m.generic_application.as_str())))
            .filter(|(d, _)| *d > brand_date)
            .min()
    });

    let actual_years = match (brand_date, earliest) {
        (Some(brand_date), Some((generic_date, _))) => {
            Some(years_between(brand_date, generic_date))
        }
        _ => None,
    };
    let granted_years = brand.exclusivity_years;
    let shorter = match (actual_years, granted_years) {
        (Some(actual), Some(granted)) => Some(actual < granted),
        _ => None,
    };

    let mut ordered: Vec<(Option<NaiveDate>, &str)> = retained
        .iter()
        .map(|m| (m.generic_date(), m.generic_application.as_str()))
        .collect();
    // Dated ascending first, undated last
    ordered.sort_by(|a, b| match (a.0, b.0) {
        (Some(x), Some(y)) => x.cmp(&y).then(a.1.cmp(b.1)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.1.cmp(b.1),
    });
    let mut seen = HashSet::new();
    let matched_generics = ordered
        .into_iter()
        .filter(|(_, app)| seen.insert(*app))
        .map(|(_, app)| app.to_string())
        .collect();

    MonopolyRecord {
        brand_application: brand.application_number.clone(),
        ingredient: brand.ingredient.clone(),
        primary_company: brand.primary_company().map(|c| c.to_string()),
        brand_approval_date: brand.approval_date,
        earliest_generic_application: earliest.map(|(_, app)| app.to_string()),
        earliest_generic_date: earliest.map(|(d, _)| d),
        actual_exclusivity_years: actual_years,
        granted_exclusivity_years: granted_years,
        actual_shorter_than_granted: shorter,
        retained_match_count: retained.len(),
        matched_generics,
    }
}

/// One record per brand with a retained match, every other brand reported as unmatched.
///
/// `retained_by_brand` and `funnels` are indexed like `brands`.
pub fn calculate_monopoly(
    brands: &[BrandApplication],
    retained_by_brand: &[Vec<&ValidatedMatch>],
    funnels: &[BrandFunnel],
) -> (Vec<MonopolyRecord>, Vec<UnmatchedBrand>) {
    let mut records = Vec::new();
    let mut unmatched = Vec::new();

    for (idx, brand) in brands.iter().enumerate() {
        let retained = retained_by_brand.get(idx).map(Vec::as_slice).unwrap_or(&[]);
        let funnel = funnels.get(idx).copied().unwrap_or_default();

        if !retained.is_empty() {
            records.push(monopoly_record(brand, retained));
            continue;
        }
        let reason = funnel.unmatched_reason().unwrap_or(UnmatchedReason::NoCandidates);
        unmatched.push(UnmatchedBrand {
            brand_application: brand.application_number.clone(),
            ingredient: brand.ingredient.clone(),
            brand_approval_date: brand.approval_date,
            reason,
            candidate_count: funnel.candidates,
        });
    }

    (records, unmatched)
}
