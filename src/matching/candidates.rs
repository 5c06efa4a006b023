// src/matching/candidates.rs - Ingredient-keyed candidate pair generation
use std::collections::BTreeMap;

use crate::matching::normalize::{
    ingredient_key, normalize_strength, normalize_tokens, tokenize_strength_list,
};
use crate::models::applications::{BrandApplication, GenericApplication};

/// Brand record with its normalization-derived fields attached.
#[derive(Debug, Clone)]
pub struct PreparedBrand<'a> {
    pub record: &'a BrandApplication,
    pub ingredient_key: String,
    pub strength_norm: String,
    pub strength_tokens: Vec<String>,
    pub dosage_form_tokens: Vec<String>,
    pub route_tokens: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PreparedGeneric<'a> {
    pub record: &'a GenericApplication,
    pub ingredient_key: String,
    pub strength_norm: String,
    pub dosage_form_tokens: Vec<String>,
    pub route_tokens: Vec<String>,
}

impl<'a> PreparedBrand<'a> {
    pub fn new(record: &'a BrandApplication) -> Self {
        Self {
            record,
            ingredient_key: ingredient_key(&record.ingredient),
            strength_norm: normalize_strength(&record.strength),
            strength_tokens: tokenize_strength_list(&record.strength),
            dosage_form_tokens: normalize_tokens(&record.dosage_form),
            route_tokens: normalize_tokens(&record.route),
        }
    }
}

impl<'a> PreparedGeneric<'a> {
    pub fn new(record: &'a GenericApplication) -> Self {
        Self {
            record,
            ingredient_key: ingredient_key(&record.ingredient),
            strength_norm: normalize_strength(&record.strength),
            dosage_form_tokens: normalize_tokens(&record.dosage_form),
            route_tokens: normalize_tokens(&record.route),
        }
    }
}

pub fn prepare_brands(brands: &[BrandApplication]) -> Vec<PreparedBrand<'_>> {
    brands.iter().map(PreparedBrand::new).collect()
}

pub fn prepare_generics(generics: &[GenericApplication]) -> Vec<PreparedGeneric<'_>> {
    generics.iter().map(PreparedGeneric::new).collect()
}

/// Result of grouping both record sets by ingredient key.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    /// (brand index, generic index) pairs, ordered by ingredient key then input order.
    pub pairs: Vec<(usize, usize)>,
    /// Ingredient groups that produced at least one pair.
    pub ingredient_groups: usize,
}

/// Emits every same-ingredient (brand, generic) pair.
///
/// Records are grouped by key first, so the work is the sum of the per-group
/// cross products. Records with an empty key never join.
pub fn generate_candidate_pairs(
    brands: &[PreparedBrand<'_>],
    generics: &[PreparedGeneric<'_>],
) -> CandidateSet {
    let mut groups: BTreeMap<&str, (Vec<usize>, Vec<usize>)> = BTreeMap::new();

    for (idx, brand) in brands.iter().enumerate() {
        if brand.ingredient_key.is_empty() {
            continue;
        }
        groups
            .entry(brand.ingredient_key.as_str())
            .or_default()
            .0
            .push(idx);
    }
    for (idx, generic) in generics.iter().enumerate() {
        if generic.ingredient_key.is_empty() {
            continue;
        }
        // Generics only matter for keys some brand already claimed
        if let Some(group) = groups.get_mut(generic.ingredient_key.as_str()) {
            group.1.push(idx);
        }
    }

    let mut set = CandidateSet::default();
    for (brand_indices, generic_indices) in groups.values() {
        if generic_indices.is_empty() {
            continue;
        }
        set.ingredient_groups += 1;
        for &b in brand_indices {
            for &g in generic_indices {
                set.pairs.push((b, g));
            }
        }
    }
    set
}
