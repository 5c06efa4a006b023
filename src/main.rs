use anyhow::{Context, Result};
use clap::Parser;
use exclusivity_lib::matching::manager::run_matching_pipeline;
use exclusivity_lib::sources::evidence_source::{
    DirectoryEvidence, EvidenceSource, JsonEvidence, NoEvidence,
};
use exclusivity_lib::sources::output::{write_pipeline_output, OutputFormat};
use exclusivity_lib::sources::records::{load_brands, load_generics};
use exclusivity_lib::utils::env::load_env;
use exclusivity_lib::utils::get_memory_usage;
use exclusivity_lib::utils::progress_bars::progress_config::{bar_style, ProgressConfig};
use exclusivity_lib::utils::validation_config::ValidationPolicy;
use indicatif::ProgressBar;
use log::{info, warn};
use std::path::PathBuf;
use std::time::Instant;

/// Match brand applications to their generic competitors and measure actual exclusivity
#[derive(Parser, Debug)]
#[command(name = "exclusivity", version)]
struct Args {
    /// Brand application table (.csv or .json)
    #[arg(long)]
    brands: PathBuf,

    /// Generic application product table (.csv or .json)
    #[arg(long)]
    generics: PathBuf,

    /// Directory of extracted approval-letter text files named <application>.txt
    #[arg(long, conflicts_with = "evidence_json")]
    evidence_dir: Option<PathBuf>,

    /// JSON object mapping generic application numbers to letter text
    #[arg(long)]
    evidence_json: Option<PathBuf>,

    /// Directory for result files
    #[arg(long, default_value = "output")]
    out_dir: PathBuf,

    /// Result file format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

fn main() -> Result<()> {
    load_env();
    env_logger::init();
    info!("Starting brand/generic exclusivity matching pipeline");
    let args = Args::parse();

    let policy = ValidationPolicy::from_env();
    policy.validate().context("Invalid validation policy")?;
    policy.log_config();

    let progress_config = ProgressConfig::from_env();
    info!(
        "Progress tracking: enabled={}, stage bars={}",
        progress_config.enabled, progress_config.stage_bars
    );
    let multi_progress = progress_config.create_multi_progress();

    let main_pb = multi_progress.as_ref().map(|mp| {
        let pb = mp.add(ProgressBar::new(3));
        pb.set_style(bar_style(
            "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
        ));
        pb.set_message("Loading records...");
        pb
    });

    let start_time = Instant::now();

    // Phase 1: load inputs; any structural problem stops the run here
    info!("Phase 1: Loading input tables and evidence");
    let phase1_start = Instant::now();
    let brands = load_brands(&args.brands)
        .with_context(|| format!("Failed to load brands from {}", args.brands.display()))?;
    let generics = load_generics(&args.generics)
        .with_context(|| format!("Failed to load generics from {}", args.generics.display()))?;
    let evidence: Box<dyn EvidenceSource> = match (&args.evidence_dir, &args.evidence_json) {
        (Some(dir), _) => Box::new(DirectoryEvidence::new(dir)?),
        (None, Some(path)) => Box::new(JsonEvidence::from_path(path)?),
        (None, None) => {
            warn!("No evidence source given: every pair will be kept as Unknown");
            Box::new(NoEvidence)
        }
    };
    let phase1_duration = phase1_start.elapsed();
    if let Some(pb) = &main_pb {
        pb.inc(1);
        pb.set_message("Matching...");
    }

    // Phase 2: matching and validation
    info!("Phase 2: Matching and validation");
    let phase2_start = Instant::now();
    let output = run_matching_pipeline(
        &brands,
        &generics,
        evidence.as_ref(),
        &policy,
        progress_config.stage_target(multi_progress.as_ref()),
    )?;
    let phase2_duration = phase2_start.elapsed();
    if let Some(pb) = &main_pb {
        pb.inc(1);
        pb.set_message("Writing results...");
    }

    // Phase 3: results
    info!("Phase 3: Writing results to {}", args.out_dir.display());
    let phase3_start = Instant::now();
    let written = write_pipeline_output(&args.out_dir, &output, args.format)?;
    let phase3_duration = phase3_start.elapsed();
    if let Some(pb) = &main_pb {
        pb.inc(1);
        pb.finish_with_message("Pipeline complete");
    }

    let total_time = start_time.elapsed();
    let stats = &output.stats;
    info!("=== Pipeline Summary ===");
    info!("Run ID: {}", stats.run_id);
    info!("Brand applications: {}", stats.total_brands);
    info!("Generic products: {}", stats.total_generics);
    info!("Candidate pairs: {}", stats.candidate_pairs);
    info!(
        "Retained matches: {} ({} validated, {} unknown)",
        stats.retained(),
        stats.validated,
        stats.unknown
    );
    info!("Rejected matches: {}", stats.rejected);
    info!(
        "Letters: {} found, {} with a statement, {} generics without a letter",
        stats.letters_found,
        stats.statements_extracted,
        stats.generics_looked_up - stats.letters_found
    );
    info!(
        "Monopoly records: {} ({} shorter than granted)",
        stats.monopoly_records, stats.shorter_than_granted
    );
    info!("Unmatched brands: {}", stats.unmatched_brands);
    info!("=== Timing Breakdown ===");
    info!("Phase 1 (Loading): {:.2?}", phase1_duration);
    info!("Phase 2 (Matching): {:.2?}", phase2_duration);
    info!("Phase 3 (Writing): {:.2?}", phase3_duration);
    info!("Total execution time: {:.2?}", total_time);
    info!("Files written: {}", written.len());

    if progress_config.should_show_memory() {
        info!("Final memory usage: {} MB", get_memory_usage());
    }

    Ok(())
}
