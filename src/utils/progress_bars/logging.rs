// src/utils/progress_bars/logging.rs - Logging helpers for pipeline stages
use log::{debug, error, info, warn};
use std::time::{Duration, Instant};

use crate::models::stats_models::PipelineStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Loading,
    Normalize,
    Candidates,
    Criteria,
    Chronology,
    Validation,
    Monopoly,
    Retrieval,
}

impl PipelineStage {
    fn label(&self) -> (&'static str, &'static str) {
        match self {
            PipelineStage::Loading => ("LOADING", "📥"),
            PipelineStage::Normalize => ("NORMALIZE", "🧹"),
            PipelineStage::Candidates => ("CANDIDATES", "🔗"),
            PipelineStage::Criteria => ("CRITERIA", "📏"),
            PipelineStage::Chronology => ("CHRONOLOGY", "📅"),
            PipelineStage::Validation => ("VALIDATION", "🧪"),
            PipelineStage::Monopoly => ("MONOPOLY", "⏳"),
            PipelineStage::Retrieval => ("RETRIEVAL", "🌐"),
        }
    }
}

#[derive(Clone)]
pub struct StageLogger {
    stage_name: &'static str,
    stage_emoji: &'static str,
    start_time: Instant,
}

impl StageLogger {
    pub fn new(stage: PipelineStage) -> Self {
        let (stage_name, stage_emoji) = stage.label();
        Self {
            stage_name,
            stage_emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, detail: &str) {
        info!(
            "[{}] {} 🚀 Starting {} ({})",
            self.stage_name,
            self.stage_emoji,
            self.stage_name.to_lowercase(),
            detail
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        let msg = if let Some(details) = details {
            format!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.stage_name, self.stage_emoji, phase, details, elapsed.as_secs_f32()
            )
        } else {
            format!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.stage_name, self.stage_emoji, phase, elapsed.as_secs_f32()
            )
        };
        info!("{}", msg);
    }

    pub fn log_data_loaded(&self, count: usize, data_type: &str) {
        info!(
            "[{}] {} 📊 Loaded {} {} records",
            self.stage_name, self.stage_emoji, count, data_type
        );
    }

    pub fn log_data_quality_issue(&self, issue_type: &str, count: usize) {
        if count > 0 {
            warn!(
                "[{}] {} ⚠️  Data quality: {} instances of {}",
                self.stage_name, self.stage_emoji, count, issue_type
            );
        }
    }

    pub fn log_stage_result(&self, input: usize, output: usize, what: &str) {
        let percent_kept = if input > 0 {
            (output as f64 / input as f64) * 100.0
        } else {
            0.0
        };
        info!(
            "[{}] {} 🎯 {}: {} in → {} out ({:.1}% kept) in {:.2?}",
            self.stage_name,
            self.stage_emoji,
            what,
            input,
            output,
            percent_kept,
            self.start_time.elapsed()
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!("[{}] {} ⚠️  {}", self.stage_name, self.stage_emoji, message);
    }

    pub fn log_error(&self, message: &str) {
        error!("[{}] {} ❌ {}", self.stage_name, self.stage_emoji, message);
    }

    pub fn log_debug(&self, message: &str) {
        debug!("[{}] {} {}", self.stage_name, self.stage_emoji, message);
    }

    pub fn get_elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

// Pipeline-level logging functions
pub fn log_pipeline_start(run_id: &str, brands: usize, generics: usize, evidence_source: &str) {
    info!("🚀 ===== BRAND/GENERIC MATCHING PIPELINE STARTING =====");
    info!("📅 Pipeline Run ID: {}", run_id);
    info!("⚙️  Input:");
    info!("   • {} brand applications", brands);
    info!("   • {} generic application products", generics);
    info!("   • Evidence source: {}", evidence_source);
    info!(
        "🎯 Stages: Normalize 🧹, Candidates 🔗, Criteria 📏, Chronology 📅, \
         Validation 🧪, Monopoly ⏳"
    );
    info!("======================================================");
}

pub fn log_pipeline_completion(stats: &PipelineStats, duration: Duration) {
    info!("🎉 ===== BRAND/GENERIC MATCHING PIPELINE COMPLETED =====");
    info!("📅 Pipeline Run ID: {}", stats.run_id);
    info!("⏱️  Total Duration: {:.2?}", duration);
    info!("📈 Funnel:");
    info!(
        "  🔗 {} candidate pairs from {} ingredient groups",
        stats.candidate_pairs, stats.ingredient_groups
    );
    info!(
        "  📏 dosage form ok: {}, route ok: {}, strength ok: {}, all three: {}",
        stats.dosage_form_passed, stats.route_passed, stats.strength_passed, stats.criteria_passed
    );
    info!(
        "  📅 {} pairs eliminated as chronologically impossible",
        stats.chronologically_excluded
    );
    info!(
        "  🧪 evidence available for {} pairs, missing for {}",
        stats.evidence_available, stats.evidence_missing
    );
    info!(
        "  📄 {} generics looked up: {} letters found, {} statements extracted, \
         {} letters without a statement",
        stats.generics_looked_up,
        stats.letters_found,
        stats.statements_extracted,
        stats.statements_missing()
    );
    info!(
        "  🧪 {} validated, {} unknown (retained), {} rejected",
        stats.validated, stats.unknown, stats.rejected
    );
    info!(
        "  ⏳ {} monopoly records ({} with computed interval, {} shorter than granted), \
         {} unmatched brands",
        stats.monopoly_records,
        stats.intervals_computed,
        stats.shorter_than_granted,
        stats.unmatched_brands
    );
    info!("======================================================");
}
