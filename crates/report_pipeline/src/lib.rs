use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use models::FinancialRecord;

pub mod views;

pub use views::{
    build_metrics_view, build_report, DayRollup, MetricsView, ReportMetadata, TemplateRollup,
    VenueReport,
};

pub struct Config {
    /// A single JSON export, or a directory of JSON batch files.
    pub input: PathBuf,
    pub output_file: PathBuf,
    pub settings_file: Option<PathBuf>,
    pub pretty: bool,
    /// Overrides the resolution instant, mostly for reproducible runs.
    pub at: Option<DateTime<Utc>>,
}

/// Main pipeline function: loads the record export, builds every configured
/// metrics view against one pinned instant and writes the report file.
pub fn run(cfg: Config) -> Result<VenueReport> {
    let settings =
        settings_loader::load_optional_settings(cfg.settings_file.as_ref())?.unwrap_or_default();

    let mut records = load_records(&cfg.input)?;
    // Deterministic report bodies regardless of directory iteration order
    records.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at).then_with(|| a.id.cmp(&b.id)));

    let now = cfg.at.unwrap_or_else(Utc::now);
    let report = build_report(&records, &settings, now);
    write_report(&cfg.output_file, &report, cfg.pretty)?;
    Ok(report)
}

/// Loads financial records from a single JSON file or from every JSON file
/// in a directory. Each file holds either an array of records or a single
/// record. Hidden files and `report.json`/`template.json` are skipped.
pub fn load_records(input: &Path) -> Result<Vec<FinancialRecord>> {
    if input.is_dir() {
        let mut records = Vec::new();
        let entries =
            fs::read_dir(input).with_context(|| format!("Reading input dir: {}", input.display()))?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            if let Some(filename) = path.file_name().and_then(|s| s.to_str()) {
                let name_lower = filename.to_ascii_lowercase();
                if name_lower == "report.json"
                    || name_lower == "template.json"
                    || filename.starts_with('.')
                {
                    continue;
                }
            }
            records.extend(load_record_file(&path)?);
        }
        Ok(records)
    } else {
        load_record_file(input)
    }
}

fn load_record_file(path: &Path) -> Result<Vec<FinancialRecord>> {
    let raw = fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    // batch files are arrays; tolerate a single bare record too
    let records = match serde_json::from_str::<Vec<FinancialRecord>>(&raw) {
        Ok(records) => records,
        Err(_) => {
            let single: FinancialRecord = serde_json::from_str(&raw)
                .with_context(|| format!("Parsing records in {}", path.display()))?;
            vec![single]
        }
    };
    Ok(records)
}

/// Writes the report to a JSON file with optional pretty formatting,
/// creating parent directories as needed.
pub fn write_report(path: &Path, report: &VenueReport, pretty: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating output dir: {}", parent.display()))?;
        }
    }
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    fs::write(path, json).with_context(|| format!("Writing output file: {}", path.display()))?;
    Ok(())
}
