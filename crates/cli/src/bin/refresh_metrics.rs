use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;

use metrics_cache::CacheFile;
use metrics_engine::{global_rollup, select_records, TimeWindow};
use report_pipeline::load_records;

#[derive(Parser, Debug)]
#[command(
    name = "refresh-metrics",
    about = "Recompute the cached global rollup for every configured scope."
)]
struct Args {
    /// Path to a records export file or a directory of JSON batch files
    #[arg(short, long)]
    input: PathBuf,

    /// Cache file to update; defaults to the settings' cache_path
    #[arg(short, long)]
    cache: Option<PathBuf>,

    /// Optional settings file
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Drop cache entries for scopes no longer configured
    #[arg(long, default_value_t = false)]
    prune: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings =
        settings_loader::load_settings_with_fallback(args.settings.as_ref())?.unwrap_or_default();
    let cache_path = args.cache.unwrap_or_else(|| settings.cache_path.clone());

    let records = load_records(&args.input)?;
    let scopes = settings.global_scopes();
    // one pinned instant for every scope in this run
    let now = Utc::now();

    let mut cache = CacheFile::load(&cache_path)?;
    if args.prune {
        let before = cache.len();
        cache.retain_scopes(&scopes);
        if cache.len() < before {
            println!("Pruned {} stale cache entries", before - cache.len());
        }
    }

    for scope in scopes {
        let window = TimeWindow::resolve_at(scope.time_range, now);
        let selected = select_records(&records, &window, scope.category);
        let rollup = global_rollup(&selected);
        println!(
            "{}: {} games, profit {:.2}",
            scope.cache_key(),
            rollup.total_games,
            rollup.total_profit
        );
        cache.upsert(scope, rollup, now);
    }

    cache
        .save(&cache_path)
        .with_context(|| format!("saving cache to {}", cache_path.display()))?;
    println!("Cache written to {}", cache_path.display());
    Ok(())
}
