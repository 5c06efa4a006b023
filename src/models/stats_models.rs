// src/models/stats_models.rs

use chrono::NaiveDateTime;
use serde::Serialize;

/// Wall-clock seconds spent in each pipeline stage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageTimings {
    pub normalization_time: f64,
    pub candidate_generation_time: f64,
    pub criteria_time: f64,
    pub chronology_time: f64,
    pub validation_time: f64,
    pub monopoly_time: f64,
    pub total_processing_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub run_id: String,
    pub run_timestamp: NaiveDateTime,
    pub total_brands: usize,
    pub total_generics: usize,
    pub brands_without_ingredient: usize,
    pub generics_without_ingredient: usize,
    pub ingredient_groups: usize,
    pub candidate_pairs: usize,
    pub dosage_form_passed: usize,
    pub route_passed: usize,
    pub strength_passed: usize,
    pub criteria_passed: usize,
    pub chronologically_excluded: usize,
    pub evidence_available: usize,
    pub evidence_missing: usize,
    /// Distinct generic applications the evidence source was asked for
    pub generics_looked_up: usize,
    pub letters_found: usize,
    pub statements_extracted: usize,
    pub validated: usize,
    pub unknown: usize,
    pub rejected: usize,
    pub monopoly_records: usize,
    pub intervals_computed: usize,
    pub shorter_than_granted: usize,
    pub unmatched_brands: usize,
    pub timings: StageTimings,
}

impl PipelineStats {
    pub fn new(run_id: String, run_timestamp: NaiveDateTime) -> Self {
        Self {
            run_id,
            run_timestamp,
            total_brands: 0,
            total_generics: 0,
            brands_without_ingredient: 0,
            generics_without_ingredient: 0,
            ingredient_groups: 0,
            candidate_pairs: 0,
            dosage_form_passed: 0,
            route_passed: 0,
            strength_passed: 0,
            criteria_passed: 0,
            chronologically_excluded: 0,
            evidence_available: 0,
            evidence_missing: 0,
            generics_looked_up: 0,
            letters_found: 0,
            statements_extracted: 0,
            validated: 0,
            unknown: 0,
            rejected: 0,
            monopoly_records: 0,
            intervals_computed: 0,
            shorter_than_granted: 0,
            unmatched_brands: 0,
            timings: StageTimings::default(),
        }
    }

    pub fn retained(&self) -> usize {
        self.validated + self.unknown
    }

    /// Generics whose letter was found but yielded no statement.
    pub fn statements_missing(&self) -> usize {
        self.letters_found - self.statements_extracted
    }
}
