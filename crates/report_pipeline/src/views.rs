//! Report output shapes and the view assembly on top of the engine.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use metrics_engine::{
    aggregate, aggregate_by_day, audit_records, classification_rollups, global_rollup, is_eligible,
    ranked, select_records, GroupingStrategy, TimeWindow,
};
use models::{
    CategoryKey, ClassificationRollups, FinancialRecord, ReportSettings, RollupResult,
    TimeRangeKey,
};

/// Everything one generation run produces: run metadata, one metrics view
/// per configured scope, and the audit warnings for the record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueReport {
    pub metadata: ReportMetadata,
    pub views: Vec<MetricsView>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub venue: String,
    /// Records loaded from the export, before any filtering.
    pub record_count: usize,
    /// Records with a finished game, across all time.
    pub eligible_count: usize,
}

/// All rollup views for one time range and category selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsView {
    pub time_range: TimeRangeKey,
    pub category: CategoryKey,
    pub global: RollupResult,
    pub breakdown: ClassificationRollups,
    pub templates: Vec<TemplateRollup>,
    pub days: Vec<DayRollup>,
}

/// One recurring schedule's rollup, ranked by profit within its view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRollup {
    pub template_key: String,
    /// Display name, when some record in the selection embedded the
    /// template. Legacy-keyed groups have no template to take a name from.
    pub name: Option<String>,
    pub rollup: RollupResult,
}

/// One weekday row. Days without a recurring game keep their zero rollup
/// and carry a note instead of disappearing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRollup {
    pub day: String,
    pub rollup: RollupResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Builds the full report against one pinned instant. Every configured
/// scope resolves its window from the same `now`, so no two views inside a
/// report can disagree at the window margin.
pub fn build_report(
    records: &[FinancialRecord],
    settings: &ReportSettings,
    now: DateTime<Utc>,
) -> VenueReport {
    let eligible_count = records.iter().filter(|r| is_eligible(r)).count();
    let mut views = Vec::with_capacity(settings.time_ranges.len() * settings.categories.len());
    for range in &settings.time_ranges {
        for category in &settings.categories {
            views.push(build_metrics_view(records, *range, *category, now));
        }
    }
    VenueReport {
        metadata: ReportMetadata {
            generated_at: now,
            venue: settings.venue.clone(),
            record_count: records.len(),
            eligible_count,
        },
        views,
        warnings: audit_records(records),
    }
}

/// Builds the complete set of rollup views for one (range, category) pair.
pub fn build_metrics_view(
    records: &[FinancialRecord],
    time_range: TimeRangeKey,
    category: CategoryKey,
    now: DateTime<Utc>,
) -> MetricsView {
    let window = TimeWindow::resolve_at(time_range, now);
    let selected = select_records(records, &window, category);

    let days = aggregate_by_day(&selected)
        .into_iter()
        .map(|(day, rollup)| {
            let note = (rollup.total_games == 0)
                .then(|| format!("no recurring game on {day}"));
            DayRollup { day, rollup, note }
        })
        .collect();

    MetricsView {
        time_range,
        category,
        global: global_rollup(&selected),
        breakdown: classification_rollups(&selected),
        templates: template_rollups(&selected),
        days,
    }
}

/// Per-template rollups in display order, with names resolved from whatever
/// records embedded their template.
fn template_rollups(records: &[FinancialRecord]) -> Vec<TemplateRollup> {
    let mut names: HashMap<&str, &str> = HashMap::new();
    for record in records {
        if let Some(template) = &record.template {
            names.insert(template.id.as_str(), template.name.as_str());
        }
    }
    ranked(aggregate(records, GroupingStrategy::ByRecurringTemplate))
        .into_iter()
        .map(|(template_key, rollup)| TemplateRollup {
            name: names.get(template_key.as_str()).map(|n| n.to_string()),
            template_key,
            rollup,
        })
        .collect()
}
