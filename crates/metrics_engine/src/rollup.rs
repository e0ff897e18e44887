//! Grouping strategies and rollup accumulation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use models::{
    canonical_day, day_name, Classification, ClassificationRollups, FinancialRecord, RollupResult,
    TrendPoint, GLOBAL_GROUP_KEY, WEEK_DAYS,
};

use crate::classify::classify;

/// How records are partitioned into rollups.
///
/// Each strategy is a pure mapping from a record to a group key. `None`
/// drops the record from this particular grouping, never from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingStrategy {
    /// Every record maps to the single `GLOBAL` key.
    Global,
    /// Records classified recurring, keyed by their canonical schedule
    /// grouping key. Template-referenced and legacy-keyed records both
    /// resolve here, so these groups refine the recurring total exactly.
    ByRecurringTemplate,
    /// Records whose embedded template carries a recognizable weekday name,
    /// keyed by that day. Use [`aggregate_by_day`] for the seven-row table
    /// with quiet days zero-filled.
    ByDayOfWeek,
}

impl GroupingStrategy {
    pub fn group_key(&self, record: &FinancialRecord) -> Option<String> {
        match self {
            GroupingStrategy::Global => Some(GLOBAL_GROUP_KEY.to_string()),
            GroupingStrategy::ByRecurringTemplate => {
                if classify(&record.meta) != Classification::Recurring {
                    return None;
                }
                record
                    .meta
                    .schedule_identity()
                    .map(|identity| identity.grouping_key())
            }
            GroupingStrategy::ByDayOfWeek => record
                .template
                .as_ref()
                .and_then(|template| canonical_day(&template.day_of_week))
                .map(|day| day_name(day).to_string()),
        }
    }
}

/// Calendar month bucket key for trend series, e.g. `2024-06`. Lexicographic
/// order equals chronological order.
pub fn month_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[derive(Debug, Default)]
struct MonthAcc {
    profit: f64,
    games: u64,
}

#[derive(Debug, Default)]
struct RollupAccumulator {
    games: u64,
    entries: u64,
    unique_players: u64,
    prizepool: f64,
    revenue: f64,
    cost: f64,
    profit: f64,
    months: BTreeMap<String, MonthAcc>,
}

impl RollupAccumulator {
    fn add(&mut self, record: &FinancialRecord) {
        self.games += 1;
        self.entries += record.entries;
        self.unique_players += record.unique_players;
        self.prizepool += record.prizepool;
        self.revenue += record.revenue;
        self.cost += record.cost;
        // The stored net profit is what gets summed, even when it disagrees
        // with revenue - cost; the audit surfaces such records.
        self.profit += record.net_profit;

        let month = self.months.entry(month_key(record.occurred_at)).or_default();
        month.profit += record.net_profit;
        month.games += 1;
    }

    fn finalize(self) -> RollupResult {
        let games = self.games as f64;
        let (avg_entries_per_game, avg_profit_per_game) = if self.games > 0 {
            (self.entries as f64 / games, self.profit / games)
        } else {
            (0.0, 0.0)
        };
        let trend = self
            .months
            .into_iter()
            .map(|(month, acc)| TrendPoint {
                month,
                profit: round2(acc.profit),
                games: acc.games,
            })
            .collect();
        RollupResult {
            total_games: self.games,
            total_entries: self.entries,
            total_unique_players: self.unique_players,
            total_prizepool: round2(self.prizepool),
            total_revenue: round2(self.revenue),
            total_cost: round2(self.cost),
            total_profit: round2(self.profit),
            avg_entries_per_game: round2(avg_entries_per_game),
            avg_profit_per_game: round2(avg_profit_per_game),
            trend,
        }
    }
}

/// Partitions records by the strategy's group key and accumulates one rollup
/// per partition. Everything is a sum, so the output does not depend on
/// input order; ordered maps keep iteration deterministic on top of that.
pub fn aggregate(
    records: &[FinancialRecord],
    strategy: GroupingStrategy,
) -> BTreeMap<String, RollupResult> {
    let mut partitions: BTreeMap<String, RollupAccumulator> = BTreeMap::new();
    for record in records {
        if let Some(key) = strategy.group_key(record) {
            partitions.entry(key).or_default().add(record);
        }
    }
    partitions
        .into_iter()
        .map(|(key, acc)| (key, acc.finalize()))
        .collect()
}

/// The single all-records rollup. Zero records aggregate to the zero
/// rollup, not an error.
pub fn global_rollup(records: &[FinancialRecord]) -> RollupResult {
    aggregate(records, GroupingStrategy::Global)
        .remove(GLOBAL_GROUP_KEY)
        .unwrap_or_default()
}

/// One pass over the records, one bucket per classification.
///
/// The classifier is total, so the four buckets partition the input exactly
/// and their sums reproduce the global rollup field for field.
pub fn classification_rollups(records: &[FinancialRecord]) -> ClassificationRollups {
    let mut recurring = RollupAccumulator::default();
    let mut ad_hoc = RollupAccumulator::default();
    let mut series = RollupAccumulator::default();
    let mut unknown = RollupAccumulator::default();
    for record in records {
        match classify(&record.meta) {
            Classification::Recurring => recurring.add(record),
            Classification::AdHoc => ad_hoc.add(record),
            Classification::Series => series.add(record),
            Classification::Unknown => unknown.add(record),
        }
    }
    ClassificationRollups {
        recurring: recurring.finalize(),
        ad_hoc: ad_hoc.finalize(),
        series: series.finalize(),
        unknown: unknown.finalize(),
    }
}

/// The weekday table: seven rows, Monday through Sunday, zero rollups for
/// days no recurring game runs on. Quiet days are reported, never omitted.
pub fn aggregate_by_day(records: &[FinancialRecord]) -> Vec<(String, RollupResult)> {
    let mut by_day = aggregate(records, GroupingStrategy::ByDayOfWeek);
    WEEK_DAYS
        .iter()
        .map(|day| {
            let name = day_name(*day).to_string();
            let rollup = by_day.remove(&name).unwrap_or_default();
            (name, rollup)
        })
        .collect()
}

/// Display ordering for a keyed rollup set: total profit descending, ties
/// broken by group key ascending. Deterministic for any input.
pub fn ranked(rollups: BTreeMap<String, RollupResult>) -> Vec<(String, RollupResult)> {
    let mut entries: Vec<(String, RollupResult)> = rollups.into_iter().collect();
    entries.sort_by(|a, b| {
        b.1.total_profit
            .total_cmp(&a.1.total_profit)
            .then_with(|| a.0.cmp(&b.0))
    });
    entries
}
