// src/matching/manager.rs - Runs normalization, candidate generation, criteria, chronology,
// company validation and the monopoly calculation as one batch
use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::MultiProgress;
use log::info;
use std::collections::BTreeMap;
use std::time::Instant;
use uuid::Uuid;

use crate::matching::candidates::{generate_candidate_pairs, prepare_brands, prepare_generics};
use crate::matching::chronology::filter_chronological;
use crate::matching::company::{log_decision, validate_pair};
use crate::matching::criteria::CandidatePair;
use crate::matching::evidence::EvidenceExtractor;
use crate::matching::monopoly::{calculate_monopoly, BrandFunnel};
use crate::models::applications::{BrandApplication, GenericApplication};
use crate::models::matching::{
    ExtractionStatus, PipelineOutput, ValidatedMatch, ValidationStatus,
};
use crate::models::stats_models::PipelineStats;
use crate::sources::evidence_source::EvidenceSource;
use crate::utils::progress_bars::logging::{
    log_pipeline_completion, log_pipeline_start, PipelineStage, StageLogger,
};
use crate::utils::progress_bars::progress_config::stage_progress_bar;
use crate::utils::validation_config::ValidationPolicy;

const CRITERIA_BAR_TEMPLATE: &str =
    "  📏 [{elapsed_precise}] {bar:30.cyan/red} {pos}/{len} pairs evaluated {msg}";
const VALIDATION_BAR_TEMPLATE: &str =
    "  🧪 [{elapsed_precise}] {bar:30.cyan/red} {pos}/{len} pairs validated {msg}";
const PROGRESS_UPDATE_EVERY: usize = 500;

/// Matches brands to generics and derives actual exclusivity.
///
/// The evidence source is queried at most once per distinct generic
/// application number, and each lookup is reported in
/// `PipelineOutput::extraction_status`. Identical inputs give identical outputs apart from
/// the run id, timestamp and timings.
pub fn run_matching_pipeline(
    brands: &[BrandApplication],
    generics: &[GenericApplication],
    evidence: &dyn EvidenceSource,
    policy: &ValidationPolicy,
    multi_progress: Option<&MultiProgress>,
) -> Result<PipelineOutput> {
    let pipeline_start = Instant::now();
    policy.validate().context("Invalid validation policy")?;
    let extractor = EvidenceExtractor::new(policy)?;

    let run_id = Uuid::new_v4().to_string();
    let mut stats = PipelineStats::new(run_id.clone(), Utc::now().naive_utc());
    stats.total_brands = brands.len();
    stats.total_generics = generics.len();
    log_pipeline_start(&run_id, brands.len(), generics.len(), &evidence.describe());

    // Normalize
    let stage_start = Instant::now();
    let logger = StageLogger::new(PipelineStage::Normalize);
    logger.log_start("ingredient, strength, dosage form and route fields");
    let prepared_brands = prepare_brands(brands);
    let prepared_generics = prepare_generics(generics);
    stats.brands_without_ingredient = prepared_brands
        .iter()
        .filter(|b| b.ingredient_key.is_empty())
        .count();
    stats.generics_without_ingredient = prepared_generics
        .iter()
        .filter(|g| g.ingredient_key.is_empty())
        .count();
    logger.log_data_loaded(prepared_brands.len(), "brand");
    logger.log_data_loaded(prepared_generics.len(), "generic");
    logger.log_data_quality_issue(
        "brand records without ingredient",
        stats.brands_without_ingredient,
    );
    logger.log_data_quality_issue(
        "generic records without ingredient",
        stats.generics_without_ingredient,
    );
    stats.timings.normalization_time = stage_start.elapsed().as_secs_f64();

    // Candidate generation
    let stage_start = Instant::now();
    let logger = StageLogger::new(PipelineStage::Candidates);
    logger.log_start("grouping by ingredient key");
    let candidates = generate_candidate_pairs(&prepared_brands, &prepared_generics);
    stats.ingredient_groups = candidates.ingredient_groups;
    stats.candidate_pairs = candidates.pairs.len();
    logger.log_phase(
        "Grouped",
        Some(&format!(
            "{} ingredient groups, {} same-ingredient pairs",
            candidates.ingredient_groups,
            candidates.pairs.len()
        )),
    );
    if candidates.pairs.is_empty() && !brands.is_empty() {
        logger.log_warning("No brand shares an ingredient with any generic");
    }
    stats.timings.candidate_generation_time = stage_start.elapsed().as_secs_f64();

    let mut funnels = vec![BrandFunnel::default(); brands.len()];

    // Criteria
    let stage_start = Instant::now();
    let logger = StageLogger::new(PipelineStage::Criteria);
    logger.log_start("dosage form, route and strength compatibility");
    let criteria_pb = stage_progress_bar(
        multi_progress,
        candidates.pairs.len() as u64,
        CRITERIA_BAR_TEMPLATE,
    );
    let mut passing = Vec::new();
    for (i, &(b, g)) in candidates.pairs.iter().enumerate() {
        let flags = CandidatePair::new(&prepared_brands[b], &prepared_generics[g]).evaluate();
        funnels[b].candidates += 1;
        if flags.dosage_form {
            stats.dosage_form_passed += 1;
        }
        if flags.route {
            stats.route_passed += 1;
        }
        if flags.strength {
            stats.strength_passed += 1;
        }
        if flags.all_pass() {
            funnels[b].criteria_passed += 1;
            passing.push((b, g));
        }
        criteria_pb.inc(1);
        if (i + 1) % PROGRESS_UPDATE_EVERY == 0 {
            criteria_pb.set_message(format!("({} passing)", passing.len()));
        }
    }
    criteria_pb.finish_with_message(format!("({} passing)", passing.len()));
    stats.criteria_passed = passing.len();
    logger.log_stage_result(candidates.pairs.len(), passing.len(), "Pairs passing all criteria");
    stats.timings.criteria_time = stage_start.elapsed().as_secs_f64();

    // Chronology
    let stage_start = Instant::now();
    let logger = StageLogger::new(PipelineStage::Chronology);
    logger.log_start("generic approval must not predate brand approval");
    let criteria_count = passing.len();
    let (chronological, eliminated) =
        filter_chronological(passing, &prepared_brands, &prepared_generics);
    for &(b, _) in &chronological {
        funnels[b].chronology_passed += 1;
    }
    stats.chronologically_excluded = eliminated.len();
    logger.log_stage_result(criteria_count, chronological.len(), "Chronologically possible pairs");
    stats.timings.chronology_time = stage_start.elapsed().as_secs_f64();

    // Company validation
    let stage_start = Instant::now();
    let logger = StageLogger::new(PipelineStage::Validation);
    logger.log_start("company names against approval-letter evidence");
    let validation_pb = stage_progress_bar(
        multi_progress,
        chronological.len() as u64,
        VALIDATION_BAR_TEMPLATE,
    );
    // Keyed by generic application number: (letter found, extracted statement)
    let mut reference_cache: BTreeMap<&str, (bool, Option<String>)> = BTreeMap::new();
    let mut retained: Vec<(usize, ValidatedMatch)> = Vec::new();
    let mut rejected: Vec<ValidatedMatch> = Vec::new();

    for (i, &(b, g)) in chronological.iter().enumerate() {
        let brand = prepared_brands[b].record;
        let generic = prepared_generics[g].record;

        let (_, reference_text) = reference_cache
            .entry(generic.application_number.as_str())
            .or_insert_with(|| {
                let letter = evidence.lookup(&generic.application_number);
                let text = letter.as_deref().and_then(|raw| extractor.extract(raw));
                match (&letter, &text) {
                    (None, _) => logger.log_debug(&format!(
                        "No letter for generic {}",
                        generic.application_number
                    )),
                    (Some(_), None) => logger.log_warning(&format!(
                        "Letter for generic {} has no bioequivalence statement",
                        generic.application_number
                    )),
                    (Some(_), Some(_)) => {}
                }
                (letter.is_some(), text)
            })
            .clone();

        if reference_text.is_some() {
            stats.evidence_available += 1;
        } else {
            stats.evidence_missing += 1;
        }

        let decision = validate_pair(&brand.companies, reference_text.as_deref(), policy);
        log_decision(&brand.application_number, &generic.application_number, &decision);

        match decision.status {
            ValidationStatus::Validated => stats.validated += 1,
            ValidationStatus::Unknown => stats.unknown += 1,
            ValidationStatus::Rejected => stats.rejected += 1,
        }

        let validated = ValidatedMatch {
            brand_application: brand.application_number.clone(),
            brand_ingredient: brand.ingredient.clone(),
            brand_approval_date: brand.approval_date,
            generic_application: generic.application_number.clone(),
            generic_applicant: generic.applicant.clone(),
            generic_strength: generic.strength.clone(),
            generic_approval_date: generic.approval_date,
            generic_te_code: generic.te_code.clone(),
            dosage_form_compatible: true,
            route_compatible: true,
            strength_compatible: true,
            matched_company: decision.matched_company,
            similarity: decision.similarity,
            status: decision.status,
            reference_text,
        };

        if validated.is_retained() {
            funnels[b].retained += 1;
            retained.push((b, validated));
        } else {
            rejected.push(validated);
        }

        validation_pb.inc(1);
        if (i + 1) % PROGRESS_UPDATE_EVERY == 0 {
            validation_pb.set_message(format!(
                "({} retained, {} rejected)",
                retained.len(),
                rejected.len()
            ));
        }
    }
    validation_pb.finish_with_message(format!(
        "({} retained, {} rejected)",
        retained.len(),
        rejected.len()
    ));
    let extraction_status: Vec<ExtractionStatus> = reference_cache
        .into_iter()
        .map(|(app, (letter_found, text))| ExtractionStatus {
            generic_application: app.to_string(),
            letter_found,
            statement_extracted: text.is_some(),
        })
        .collect();
    stats.generics_looked_up = extraction_status.len();
    stats.letters_found = extraction_status.iter().filter(|s| s.letter_found).count();
    stats.statements_extracted = extraction_status
        .iter()
        .filter(|s| s.statement_extracted)
        .count();
    logger.log_phase(
        "Evidence",
        Some(&format!(
            "{} distinct generics looked up, {} letters found, {} statements extracted",
            stats.generics_looked_up, stats.letters_found, stats.statements_extracted
        )),
    );
    logger.log_data_quality_issue("letters without a statement", stats.statements_missing());
    logger.log_stage_result(chronological.len(), retained.len(), "Retained pairs");
    stats.timings.validation_time = stage_start.elapsed().as_secs_f64();

    retained.sort_by(|a, b| {
        a.1.brand_application
            .cmp(&b.1.brand_application)
            .then_with(|| a.1.generic_application.cmp(&b.1.generic_application))
    });
    rejected.sort_by(|a, b| {
        a.brand_application
            .cmp(&b.brand_application)
            .then_with(|| a.generic_application.cmp(&b.generic_application))
    });

    // Monopoly interval
    let stage_start = Instant::now();
    let logger = StageLogger::new(PipelineStage::Monopoly);
    logger.log_start("earliest later generic per brand");
    let mut retained_by_brand: Vec<Vec<&ValidatedMatch>> = vec![Vec::new(); brands.len()];
    for (b, m) in &retained {
        retained_by_brand[*b].push(m);
    }
    let (monopoly, unmatched) = calculate_monopoly(brands, &retained_by_brand, &funnels);
    stats.monopoly_records = monopoly.len();
    stats.intervals_computed = monopoly
        .iter()
        .filter(|r| r.actual_exclusivity_years.is_some())
        .count();
    stats.shorter_than_granted = monopoly
        .iter()
        .filter(|r| r.actual_shorter_than_granted == Some(true))
        .count();
    stats.unmatched_brands = unmatched.len();
    logger.log_stage_result(brands.len(), monopoly.len(), "Brands with a retained match");
    if !unmatched.is_empty() {
        info!("⏳ {} brand applications have no retained match", unmatched.len());
    }
    stats.timings.monopoly_time = stage_start.elapsed().as_secs_f64();

    let retained: Vec<ValidatedMatch> = retained.into_iter().map(|(_, m)| m).collect();

    stats.timings.total_processing_time = pipeline_start.elapsed().as_secs_f64();
    log_pipeline_completion(&stats, pipeline_start.elapsed());

    Ok(PipelineOutput {
        retained,
        rejected,
        monopoly,
        unmatched,
        extraction_status,
        stats,
    })
}
