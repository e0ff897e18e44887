use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;

use report_pipeline::{run, Config};

#[derive(Parser, Debug)]
#[command(name = "generate-report", about = "Build the venue metrics report from a records export.")]
struct Args {
    /// Path to a records export file or a directory of JSON batch files
    #[arg(short, long)]
    input: PathBuf,

    /// Output report path
    #[arg(short, long, default_value = "report.json")]
    out: PathBuf,

    /// Optional settings file (venue label, scopes, tolerance)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Pretty-print the report JSON
    #[arg(long, default_value_t = false)]
    pretty: bool,

    /// Pin the resolution instant (RFC 3339); defaults to now
    #[arg(long)]
    at: Option<DateTime<Utc>>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let report = run(Config {
        input: args.input,
        output_file: args.out.clone(),
        settings_file: args.settings,
        pretty: args.pretty,
        at: args.at,
    })?;

    println!(
        "Report for '{}' written to {} ({} records, {} eligible, {} views)",
        report.metadata.venue,
        args.out.display(),
        report.metadata.record_count,
        report.metadata.eligible_count,
        report.views.len()
    );
    for warning in &report.warnings {
        println!("[WARN] {}", warning);
    }
    Ok(())
}
