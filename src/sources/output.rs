// src/sources/output.rs - Writes the result collections and run statistics
use anyhow::{Context, Result};
use log::info;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::models::matching::{
    ExtractionStatus, MonopolyRecord, PipelineOutput, UnmatchedBrand, ValidatedMatch,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

/// Header row for a record type written as CSV, in field declaration order.
pub trait CsvColumns {
    const COLUMNS: &'static [&'static str];
}

impl CsvColumns for ValidatedMatch {
    const COLUMNS: &'static [&'static str] = &[
        "brand_application",
        "brand_ingredient",
        "brand_approval_date",
        "generic_application",
        "generic_applicant",
        "generic_strength",
        "generic_approval_date",
        "generic_te_code",
        "dosage_form_compatible",
        "route_compatible",
        "strength_compatible",
        "matched_company",
        "similarity",
        "status",
        "reference_text",
    ];
}

impl CsvColumns for MonopolyRecord {
    const COLUMNS: &'static [&'static str] = &[
        "brand_application",
        "ingredient",
        "primary_company",
        "brand_approval_date",
        "earliest_generic_application",
        "earliest_generic_date",
        "actual_exclusivity_years",
        "granted_exclusivity_years",
        "actual_shorter_than_granted",
        "retained_match_count",
        "matched_generics",
    ];
}

impl CsvColumns for UnmatchedBrand {
    const COLUMNS: &'static [&'static str] = &[
        "brand_application",
        "ingredient",
        "brand_approval_date",
        "reason",
        "candidate_count",
    ];
}

impl CsvColumns for ExtractionStatus {
    const COLUMNS: &'static [&'static str] =
        &["generic_application", "letter_found", "statement_extracted"];
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to write JSON to {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

/// Writes the header row even when `records` is empty.
pub fn write_csv<T: Serialize + CsvColumns>(path: &Path, records: &[T]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer
        .write_record(T::COLUMNS)
        .with_context(|| format!("Failed to write CSV header to {}", path.display()))?;
    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("Failed to write CSV row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

fn write_records<T: Serialize + CsvColumns>(
    out_dir: &Path,
    name: &str,
    records: &[T],
    format: OutputFormat,
) -> Result<PathBuf> {
    let path = out_dir.join(format!("{}.{}", name, format.extension()));
    match format {
        OutputFormat::Json => write_json(&path, records)?,
        OutputFormat::Csv => write_csv(&path, records)?,
    }
    info!("💾 Wrote {} records to {}", records.len(), path.display());
    Ok(path)
}

/// Writes retained, rejected, monopoly, unmatched and extraction-status
/// collections plus `run_stats.json`.
pub fn write_pipeline_output(
    out_dir: &Path,
    output: &PipelineOutput,
    format: OutputFormat,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    let mut written = vec![
        write_records(out_dir, "retained_matches", &output.retained, format)?,
        write_records(out_dir, "rejected_matches", &output.rejected, format)?,
        write_records(out_dir, "monopoly_records", &output.monopoly, format)?,
        write_records(out_dir, "unmatched_brands", &output.unmatched, format)?,
        write_records(out_dir, "extraction_status", &output.extraction_status, format)?,
    ];

    let stats_path = out_dir.join("run_stats.json");
    write_json(&stats_path, &output.stats)?;
    written.push(stats_path);
    Ok(written)
}
