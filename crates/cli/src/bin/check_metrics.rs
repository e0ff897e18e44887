use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use metrics_cache::CacheFile;
use metrics_engine::{
    aggregate, aggregate_by_day, global_rollup, reconcile_within, select_records,
    GroupingStrategy, TimeWindow, CURRENCY_EPSILON,
};
use models::{canonical_day, RollupResult, GLOBAL_GROUP_KEY};
use report_pipeline::load_records;

#[derive(Parser, Debug)]
#[command(
    name = "check-metrics",
    about = "Reconcile every cached rollup against a fresh recomputation from the export."
)]
struct Args {
    /// Path to a records export file or a directory of JSON batch files
    #[arg(short, long)]
    input: PathBuf,

    /// Cache file to check; defaults to the settings' cache_path
    #[arg(short, long)]
    cache: Option<PathBuf>,

    /// Optional settings file
    #[arg(short, long)]
    settings: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings =
        settings_loader::load_settings_with_fallback(args.settings.as_ref())?.unwrap_or_default();
    let cache_path = args.cache.unwrap_or_else(|| settings.cache_path.clone());
    let epsilon = settings.currency_epsilon.unwrap_or(CURRENCY_EPSILON);

    let cache = CacheFile::load(&cache_path)?;
    if cache.is_empty() {
        println!("Cache at {} is empty; nothing to check.", cache_path.display());
        return Ok(());
    }

    let records = load_records(&args.input)?;

    let mut failures = 0usize;
    for entry in cache.entries.values() {
        let scope = &entry.scope;
        // Resolve the window at the instant the entry was computed, so a
        // mismatch means the records or the math changed, not the clock.
        let window = TimeWindow::resolve_at(scope.time_range, entry.computed_at);
        let selected = select_records(&records, &window, scope.category);
        let computed = recompute_for_group(&selected, &scope.group_key);

        match reconcile_within(&computed, &entry.result, epsilon) {
            Ok(_) => println!("[OK] {}", scope.cache_key()),
            Err(violation) => {
                failures += 1;
                println!("[FAIL] {}: {}", scope.cache_key(), violation);
            }
        }
    }

    if failures > 0 {
        Err(anyhow!("{} scope(s) failed reconciliation", failures))
    } else {
        println!("All {} cached scopes reconcile.", cache.len());
        Ok(())
    }
}

/// Recomputes the rollup a cache entry claims to hold. `GLOBAL` and the
/// seven day names address their tables directly; anything else is a
/// recurring-template grouping key.
fn recompute_for_group(selected: &[models::FinancialRecord], group_key: &str) -> RollupResult {
    if group_key == GLOBAL_GROUP_KEY {
        return global_rollup(selected);
    }
    if canonical_day(group_key).is_some() {
        return aggregate_by_day(selected)
            .into_iter()
            .find(|(day, _)| day == group_key)
            .map(|(_, rollup)| rollup)
            .unwrap_or_default();
    }
    aggregate(selected, GroupingStrategy::ByRecurringTemplate)
        .remove(group_key)
        .unwrap_or_default()
}
