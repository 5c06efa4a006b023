// src/sources/records.rs - Loads brand and generic tables from CSV or JSON and cleans their fields
use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::matching::normalize::squish;
use crate::models::applications::{ApprovalDate, BrandApplication, GenericApplication};
use crate::utils::constants::{APPROVED_BEFORE_CUTOFF, SPREADSHEET_EPOCH, SPREADSHEET_SERIAL_RANGE};
use crate::utils::progress_bars::logging::{PipelineStage, StageLogger};

const APPLICATION_NUMBER: &[&str] = &["application_number", "appl_no"];
const INGREDIENT: &[&str] = &["ingredient", "api", "active_ingredient"];
const STRENGTH: &[&str] = &["strength"];
const DOSAGE_FORM: &[&str] = &["dosage_form", "df"];
const ROUTE: &[&str] = &["route"];
const FORM_ROUTE: &[&str] = &["df;route", "dosage_form_route"];
const APPROVAL_DATE: &[&str] = &["approval_date"];
const EXCLUSIVITY_YEARS: &[&str] = &["exclusivity_years", "mmt_years"];
const BRAND_COMPANIES: &[&str] = &["companies", "applicant", "applicants"];
const GENERIC_APPLICANT: &[&str] = &["applicant"];
const TE_CODE: &[&str] = &["te_code"];
const TRADE_NAME: &[&str] = &["trade_name"];

static LIST_DECORATION: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[\[\]'"]"#).unwrap());
static COMPANY_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[|;]\s*").unwrap());
static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})(?:[T ].*)?$").unwrap());
static NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)?$").unwrap());

/// One input row, keyed by lowercased header.
pub type RawRow = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("csv") => Ok(InputFormat::Csv),
            Some("json") => Ok(InputFormat::Json),
            _ => bail!(
                "Unsupported input file {}: expected a .csv or .json extension",
                path.display()
            ),
        }
    }
}

/// A loaded table: its column names and rows.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub columns: HashSet<String>,
    pub rows: Vec<RawRow>,
}

fn header_key(header: &str) -> String {
    header.trim().to_lowercase()
}

pub fn read_csv_table(content: &str) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header row")?
        .iter()
        .map(header_key)
        .collect();

    let mut rows = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record =
            result.with_context(|| format!("CSV parse error at data row {}", row_idx + 1))?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.clone(), value.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(RawTable {
        columns: headers.into_iter().collect(),
        rows,
    })
}

fn json_field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(json_field_text).collect();
            Some(parts.join(" | "))
        }
        Value::Object(_) => None,
    }
}

pub fn read_json_table(content: &str) -> Result<RawTable> {
    let value: Value = serde_json::from_str(content).context("Input is not valid JSON")?;
    let items = match value {
        Value::Array(items) => items,
        _ => bail!("JSON input must be an array of objects"),
    };

    let mut table = RawTable::default();
    for (idx, item) in items.into_iter().enumerate() {
        let object = match item {
            Value::Object(object) => object,
            other => bail!("JSON record {} is not an object: {}", idx, other),
        };
        let mut row = RawRow::new();
        for (key, value) in object {
            let key = header_key(&key);
            table.columns.insert(key.clone());
            if let Some(text) = json_field_text(&value) {
                row.insert(key, text);
            }
        }
        table.rows.push(row);
    }
    Ok(table)
}

pub fn read_table(path: &Path) -> Result<RawTable> {
    let format = InputFormat::from_path(path)?;
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;
    let table = match format {
        InputFormat::Csv => read_csv_table(&content),
        InputFormat::Json => read_json_table(&content),
    }
    .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(table)
}

fn require_column(table: &RawTable, aliases: &[&str], table_name: &str) -> Result<()> {
    if table.rows.is_empty() && table.columns.is_empty() {
        return Ok(());
    }
    if !aliases.iter().any(|alias| table.columns.contains(*alias)) {
        bail!(
            "{} table has no application number column (expected one of {:?})",
            table_name,
            aliases
        );
    }
    Ok(())
}

/// First non-blank value among the aliases, whitespace-squished.
fn field(row: &RawRow, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|alias| row.get(*alias))
        .map(|value| squish(value))
        .find(|value| !value.is_empty())
}

/// "['TABLET']" becomes "TABLET".
pub fn normalize_listish(value: &str) -> String {
    squish(&LIST_DECORATION.replace_all(value, "")).to_uppercase()
}

/// Dosage form and route, falling back to a combined "DF;Route" column.
fn form_and_route(row: &RawRow) -> (String, String) {
    let dosage_form = field(row, DOSAGE_FORM);
    let route = field(row, ROUTE);
    if dosage_form.is_none() && route.is_none() {
        if let Some(combined) = field(row, FORM_ROUTE) {
            let mut parts = combined.splitn(2, ';');
            let form = parts.next().map(normalize_listish).unwrap_or_default();
            let route = parts.next().map(normalize_listish).unwrap_or_default();
            return (form, route);
        }
    }
    (
        dosage_form.map(|v| normalize_listish(&v)).unwrap_or_default(),
        route.map(|v| normalize_listish(&v)).unwrap_or_default(),
    )
}

/// Parses the approval date formats found in the source tables.
///
/// Unrecognized values yield `None`; the pre-1982 marker yields
/// `ApprovalDate::PriorToCutoff`.
pub fn parse_approval_date(raw: &str) -> Option<ApprovalDate> {
    let text = squish(raw);
    if text.is_empty() {
        return None;
    }
    if text.eq_ignore_ascii_case(APPROVED_BEFORE_CUTOFF) {
        return Some(ApprovalDate::PriorToCutoff);
    }
    if let Some(caps) = ISO_DATE.captures(&text) {
        return NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d")
            .ok()
            .map(ApprovalDate::On);
    }
    for format in ["%m/%d/%Y", "%b %d, %Y", "%B %d, %Y", "%b %d %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&text, format) {
            return Some(ApprovalDate::On(date));
        }
    }
    if NUMERIC.is_match(&text) {
        if let Ok(serial) = text.parse::<f64>() {
            let (min, max) = SPREADSHEET_SERIAL_RANGE;
            if (min..=max).contains(&serial) {
                let (y, m, d) = SPREADSHEET_EPOCH;
                return NaiveDate::from_ymd_opt(y, m, d)
                    .map(|epoch| epoch + Duration::days(serial.trunc() as i64))
                    .map(ApprovalDate::On);
            }
        }
    }
    debug!("Unrecognized approval date '{}'", text);
    None
}

fn parse_years(raw: &str) -> Option<f64> {
    squish(raw).parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn split_companies(raw: &str) -> Vec<String> {
    COMPANY_SEPARATOR
        .split(raw)
        .map(squish)
        .filter(|c| !c.is_empty())
        .collect()
}

/// Unions the strength parts of `extra` into `existing`, keeping first-seen order.
fn merge_strength(existing: &str, extra: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    for part in [existing, extra]
        .into_iter()
        .flat_map(|s| s.split('|'))
        .map(squish)
        .filter(|p| !p.is_empty())
    {
        if !parts.iter().any(|known| known.eq_ignore_ascii_case(&part)) {
            parts.push(part);
        }
    }
    parts.join(" | ")
}

#[derive(Debug, Default)]
struct LoadIssues {
    missing_id: usize,
    unparsed_dates: usize,
    missing_ingredient: usize,
}

impl LoadIssues {
    fn report(&self, logger: &StageLogger) {
        logger.log_data_quality_issue("rows without application number (skipped)", self.missing_id);
        logger.log_data_quality_issue("unparseable approval dates", self.unparsed_dates);
        logger.log_data_quality_issue("rows without ingredient", self.missing_ingredient);
    }

    fn date(&mut self, row: &RawRow) -> Option<ApprovalDate> {
        let raw = field(row, APPROVAL_DATE)?;
        let parsed = parse_approval_date(&raw);
        if parsed.is_none() {
            self.unparsed_dates += 1;
        }
        parsed
    }
}

/// Builds brand records, merging rows that share an application number.
pub fn brands_from_table(table: &RawTable) -> Result<Vec<BrandApplication>> {
    require_column(table, APPLICATION_NUMBER, "Brand")?;
    let logger = StageLogger::new(PipelineStage::Loading);
    let mut issues = LoadIssues::default();
    let mut brands: Vec<BrandApplication> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (row_idx, row) in table.rows.iter().enumerate() {
        let Some(application_number) = field(row, APPLICATION_NUMBER) else {
            warn!("Skipping brand row {}: no application number", row_idx + 1);
            issues.missing_id += 1;
            continue;
        };
        let ingredient = field(row, INGREDIENT).unwrap_or_default().to_uppercase();
        let strength = field(row, STRENGTH).unwrap_or_default().to_uppercase();
        let (dosage_form, route) = form_and_route(row);
        let approval_date = issues.date(row);
        let exclusivity_years = field(row, EXCLUSIVITY_YEARS).and_then(|v| parse_years(&v));
        let companies = field(row, BRAND_COMPANIES)
            .map(|v| split_companies(&v))
            .unwrap_or_default();
        let trade_name = field(row, TRADE_NAME);

        match index.get(&application_number) {
            Some(&idx) => {
                let brand = &mut brands[idx];
                if brand.ingredient.is_empty() {
                    brand.ingredient = ingredient;
                }
                brand.strength = merge_strength(&brand.strength, &strength);
                if brand.dosage_form.is_empty() {
                    brand.dosage_form = dosage_form;
                }
                if brand.route.is_empty() {
                    brand.route = route;
                }
                if brand.approval_date.is_none() {
                    brand.approval_date = approval_date;
                }
                if brand.exclusivity_years.is_none() {
                    brand.exclusivity_years = exclusivity_years;
                }
                if brand.trade_name.is_none() {
                    brand.trade_name = trade_name;
                }
                for company in &companies {
                    brand.add_company(company);
                }
            }
            None => {
                let mut brand = BrandApplication {
                    application_number: application_number.clone(),
                    ingredient,
                    strength: merge_strength("", &strength),
                    dosage_form,
                    route,
                    approval_date,
                    exclusivity_years,
                    companies: Vec::new(),
                    trade_name,
                };
                for company in &companies {
                    brand.add_company(company);
                }
                index.insert(application_number, brands.len());
                brands.push(brand);
            }
        }
    }

    issues.missing_ingredient = brands.iter().filter(|b| b.ingredient.is_empty()).count();
    issues.report(&logger);
    debug!(
        "Merged {} brand rows into {} applications",
        table.rows.len(),
        brands.len()
    );
    Ok(brands)
}

/// Builds generic records, one per product row.
pub fn generics_from_table(table: &RawTable) -> Result<Vec<GenericApplication>> {
    require_column(table, APPLICATION_NUMBER, "Generic")?;
    let logger = StageLogger::new(PipelineStage::Loading);
    let mut issues = LoadIssues::default();
    let mut generics = Vec::with_capacity(table.rows.len());

    for (row_idx, row) in table.rows.iter().enumerate() {
        let Some(application_number) = field(row, APPLICATION_NUMBER) else {
            warn!("Skipping generic row {}: no application number", row_idx + 1);
            issues.missing_id += 1;
            continue;
        };
        let (dosage_form, route) = form_and_route(row);
        let generic = GenericApplication {
            application_number,
            ingredient: field(row, INGREDIENT).unwrap_or_default().to_uppercase(),
            strength: field(row, STRENGTH).unwrap_or_default().to_uppercase(),
            dosage_form,
            route,
            approval_date: issues.date(row),
            applicant: field(row, GENERIC_APPLICANT).unwrap_or_default(),
            te_code: field(row, TE_CODE).map(|v| v.to_uppercase()),
            trade_name: field(row, TRADE_NAME),
        };
        if generic.ingredient.is_empty() {
            issues.missing_ingredient += 1;
        }
        generics.push(generic);
    }

    issues.report(&logger);
    Ok(generics)
}

pub fn load_brands(path: &Path) -> Result<Vec<BrandApplication>> {
    let logger = StageLogger::new(PipelineStage::Loading);
    let table = read_table(path)?;
    let brands = brands_from_table(&table)
        .with_context(|| format!("Invalid brand table {}", path.display()))?;
    logger.log_data_loaded(brands.len(), "brand application");
    Ok(brands)
}

pub fn load_generics(path: &Path) -> Result<Vec<GenericApplication>> {
    let logger = StageLogger::new(PipelineStage::Loading);
    let table = read_table(path)?;
    let generics = generics_from_table(&table)
        .with_context(|| format!("Invalid generic table {}", path.display()))?;
    logger.log_data_loaded(generics.len(), "generic product");
    Ok(generics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Option<ApprovalDate> {
        Some(ApprovalDate::On(NaiveDate::from_ymd_opt(y, m, d).unwrap()))
    }

    #[test]
    fn test_parse_approval_date_formats() {
        assert_eq!(parse_approval_date("2004-03-09"), date(2004, 3, 9));
        assert_eq!(parse_approval_date("2004-03-09 00:00:00"), date(2004, 3, 9));
        assert_eq!(parse_approval_date("2004-03-09T00:00:00Z"), date(2004, 3, 9));
        assert_eq!(parse_approval_date("03/09/2004"), date(2004, 3, 9));
        assert_eq!(parse_approval_date("Mar 9, 2004"), date(2004, 3, 9));
        assert_eq!(parse_approval_date("March 9, 2004"), date(2004, 3, 9));
        assert_eq!(parse_approval_date("38055"), date(2004, 3, 9));
        assert_eq!(parse_approval_date("38055.0"), date(2004, 3, 9));
        assert_eq!(
            parse_approval_date(" Approved Prior to Jan 1, 1982 "),
            Some(ApprovalDate::PriorToCutoff)
        );
        assert_eq!(parse_approval_date(""), None);
        assert_eq!(parse_approval_date("unknown"), None);
        assert_eq!(parse_approval_date("2004-13-45"), None);
    }

    #[test]
    fn test_normalize_listish_and_companies() {
        assert_eq!(normalize_listish("['tablet,  film coated']"), "TABLET, FILM COATED");
        assert_eq!(
            split_companies("Pfizer Inc | Pfizer Laboratories Div Pfizer Inc; Parke Davis"),
            vec!["Pfizer Inc", "Pfizer Laboratories Div Pfizer Inc", "Parke Davis"]
        );
        assert!(split_companies(" | ").is_empty());
    }

    #[test]
    fn test_csv_brand_rows_are_merged() {
        let csv = "Appl_No,API,Strength,DF,Route,Approval_Date,MMT_Years,Applicant\n\
                   020702,atorvastatin calcium,10MG,['TABLET'],ORAL,1996-12-17,5,Pfizer Inc\n\
                   020702,atorvastatin calcium,20MG,['TABLET'],ORAL,1996-12-17,5,\
                   Parke Davis Div Warner Lambert Co\n\
                   ,orphan row,1MG,TABLET,ORAL,,,\n";
        let table = read_csv_table(csv).unwrap();
        let brands = brands_from_table(&table).unwrap();

        assert_eq!(brands.len(), 1);
        let brand = &brands[0];
        assert_eq!(brand.application_number, "020702");
        assert_eq!(brand.ingredient, "ATORVASTATIN CALCIUM");
        assert_eq!(brand.strength, "10MG | 20MG");
        assert_eq!(brand.dosage_form, "TABLET");
        assert_eq!(brand.approval_date, date(1996, 12, 17));
        assert_eq!(brand.exclusivity_years, Some(5.0));
        assert_eq!(
            brand.companies,
            vec!["Pfizer Inc", "Parke Davis Div Warner Lambert Co"]
        );
    }

    #[test]
    fn test_csv_generic_combined_form_route() {
        let csv = "Appl_No,Ingredient,Strength,DF;Route,Approval_Date,Applicant,TE_Code\n\
                   076477,ATORVASTATIN CALCIUM,EQ 10MG BASE,TABLET;ORAL,\"Nov 30, 2011\",\
                   RANBAXY,ab\n";
        let generics = generics_from_table(&read_csv_table(csv).unwrap()).unwrap();
        assert_eq!(generics.len(), 1);
        let generic = &generics[0];
        assert_eq!(generic.dosage_form, "TABLET");
        assert_eq!(generic.route, "ORAL");
        assert_eq!(generic.approval_date, date(2011, 11, 30));
        assert_eq!(generic.applicant, "RANBAXY");
        assert_eq!(generic.te_code.as_deref(), Some("AB"));
    }

    #[test]
    fn test_missing_id_column_is_fatal() {
        let table = read_csv_table("Ingredient,Strength\nASPIRIN,81MG\n").unwrap();
        assert!(brands_from_table(&table).is_err());
        assert!(generics_from_table(&table).is_err());
    }

    #[test]
    fn test_json_table_with_strength_array() {
        let json = r#"[
            {"application_number": "021436", "ingredient": "Aripiprazole",
             "strength": ["2MG", "5MG"], "dosage_form": "TABLET", "route": "ORAL",
             "approval_date": "2002-11-15", "exclusivity_years": 7.5,
             "companies": ["Otsuka America Pharmaceutical Inc", "Bristol-Myers Squibb"]}
        ]"#;
        let brands = brands_from_table(&read_json_table(json).unwrap()).unwrap();
        assert_eq!(brands.len(), 1);
        assert_eq!(brands[0].strength, "2MG | 5MG");
        assert_eq!(brands[0].exclusivity_years, Some(7.5));
        assert_eq!(brands[0].companies.len(), 2);

        assert!(read_json_table(r#"{"not": "an array"}"#).is_err());
    }

    #[test]
    fn test_load_from_file_detects_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generics.json");
        fs::write(
            &path,
            r#"[{"appl_no": "076477", "ingredient": "ATORVASTATIN CALCIUM",
                 "applicant": "RANBAXY"}]"#,
        )
        .unwrap();
        let generics = load_generics(&path).unwrap();
        assert_eq!(generics[0].application_number, "076477");

        let bad = dir.path().join("generics.xlsx");
        fs::write(&bad, "binary").unwrap();
        assert!(load_generics(&bad).is_err());
        assert!(load_generics(&dir.path().join("missing.csv")).is_err());
    }
}
