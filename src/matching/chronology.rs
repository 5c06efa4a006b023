// src/matching/chronology.rs - Removes pairs whose generic predates the brand
use log::info;

use crate::matching::candidates::{PreparedBrand, PreparedGeneric};
use crate::models::applications::{calendar_date, ApprovalDate};

/// False only when both calendar dates are known and the generic is strictly earlier.
/// Missing dates and the pre-cutoff marker never eliminate a pair.
pub fn is_chronologically_possible(
    brand_date: Option<&ApprovalDate>,
    generic_date: Option<&ApprovalDate>,
) -> bool {
    match (calendar_date(brand_date), calendar_date(generic_date)) {
        (Some(brand), Some(generic)) => generic >= brand,
        _ => true,
    }
}

/// Splits criteria-passing pairs into (kept, eliminated).
pub fn filter_chronological(
    pairs: Vec<(usize, usize)>,
    brands: &[PreparedBrand<'_>],
    generics: &[PreparedGeneric<'_>],
) -> (Vec<(usize, usize)>, Vec<(usize, usize)>) {
    let mut kept = Vec::with_capacity(pairs.len());
    let mut eliminated = Vec::new();

    for (b, g) in pairs {
        let brand = brands[b].record;
        let generic = generics[g].record;
        let possible = is_chronologically_possible(
            brand.approval_date.as_ref(),
            generic.approval_date.as_ref(),
        );
        if possible {
            kept.push((b, g));
        } else {
            info!(
                "📅 Eliminated {} -> {}: generic approved {} before brand approval {}",
                brand.application_number,
                generic.application_number,
                generic
                    .approval_date
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                brand
                    .approval_date
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
            );
            eliminated.push((b, g));
        }
    }

    (kept, eliminated)
}
