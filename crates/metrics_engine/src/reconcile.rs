//! Reconciliation of precomputed rollups against freshly computed ones.

use std::collections::BTreeMap;

use models::{RollupResult, TrendPoint};
use serde::Serialize;
use thiserror::Error;

/// Comparison tolerance for currency sums. Count fields must match exactly.
pub const CURRENCY_EPSILON: f64 = 0.01;

/// One field on which a cached rollup and the rollup recomputed from the
/// same records disagree. Count fields are reported through the same shape,
/// widened to `f64`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDivergence {
    pub field: String,
    pub cached: f64,
    pub computed: f64,
}

/// A cached rollup disagrees with the rollup recomputed from the same
/// records. One of the two paths produced a wrong number, and nothing here
/// can tell which, so the mismatch is surfaced instead of resolved
/// silently.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cached and computed rollups diverge on {}", describe(.divergences))]
pub struct ConsistencyViolation {
    pub divergences: Vec<FieldDivergence>,
}

fn describe(divergences: &[FieldDivergence]) -> String {
    divergences
        .iter()
        .map(|d| format!("{} (cached {}, computed {})", d.field, d.cached, d.computed))
        .collect::<Vec<_>>()
        .join(", ")
}

fn check_count(out: &mut Vec<FieldDivergence>, field: &str, cached: u64, computed: u64) {
    if cached != computed {
        out.push(FieldDivergence {
            field: field.to_string(),
            cached: cached as f64,
            computed: computed as f64,
        });
    }
}

fn check_currency(out: &mut Vec<FieldDivergence>, field: &str, cached: f64, computed: f64, epsilon: f64) {
    if (cached - computed).abs() > epsilon {
        out.push(FieldDivergence {
            field: field.to_string(),
            cached,
            computed,
        });
    }
}

/// Lists every additive field on which the two rollups disagree beyond the
/// tolerance, in a stable order.
///
/// The derived averages are not compared: they follow from the totals and
/// cannot diverge on their own. Trend series are compared over the union of
/// months on either side, a month missing from one side counting as zero.
pub fn diff_rollups(computed: &RollupResult, cached: &RollupResult, epsilon: f64) -> Vec<FieldDivergence> {
    let mut out = Vec::new();
    check_count(&mut out, "totalGames", cached.total_games, computed.total_games);
    check_count(&mut out, "totalEntries", cached.total_entries, computed.total_entries);
    check_count(
        &mut out,
        "totalUniquePlayers",
        cached.total_unique_players,
        computed.total_unique_players,
    );
    check_currency(&mut out, "totalPrizepool", cached.total_prizepool, computed.total_prizepool, epsilon);
    check_currency(&mut out, "totalRevenue", cached.total_revenue, computed.total_revenue, epsilon);
    check_currency(&mut out, "totalCost", cached.total_cost, computed.total_cost, epsilon);
    check_currency(&mut out, "totalProfit", cached.total_profit, computed.total_profit, epsilon);

    let mut months: BTreeMap<&str, [Option<&TrendPoint>; 2]> = BTreeMap::new();
    for point in &cached.trend {
        months.entry(point.month.as_str()).or_default()[0] = Some(point);
    }
    for point in &computed.trend {
        months.entry(point.month.as_str()).or_default()[1] = Some(point);
    }
    for (month, [cached_point, computed_point]) in months {
        let (cached_profit, cached_games) = cached_point.map_or((0.0, 0), |p| (p.profit, p.games));
        let (computed_profit, computed_games) =
            computed_point.map_or((0.0, 0), |p| (p.profit, p.games));
        check_count(&mut out, &format!("trend[{month}].games"), cached_games, computed_games);
        check_currency(
            &mut out,
            &format!("trend[{month}].profit"),
            cached_profit,
            computed_profit,
            epsilon,
        );
    }
    out
}

/// Field-for-field comparison at the default tolerance.
///
/// On agreement the cached rollup is returned as-is; an existing cache
/// entry stays authoritative for display, including any derived fields it
/// carries.
pub fn reconcile(computed: &RollupResult, cached: &RollupResult) -> Result<RollupResult, ConsistencyViolation> {
    reconcile_within(computed, cached, CURRENCY_EPSILON)
}

/// [`reconcile`] with an explicit currency tolerance.
pub fn reconcile_within(
    computed: &RollupResult,
    cached: &RollupResult,
    epsilon: f64,
) -> Result<RollupResult, ConsistencyViolation> {
    let divergences = diff_rollups(computed, cached, epsilon);
    if divergences.is_empty() {
        Ok(cached.clone())
    } else {
        Err(ConsistencyViolation { divergences })
    }
}

/// Cache policy for one scope: an existing entry must agree with the
/// recomputed value and then wins; with no entry the recomputed value
/// stands on its own.
pub fn resolve_authoritative(
    computed: &RollupResult,
    cached: Option<&RollupResult>,
    epsilon: f64,
) -> Result<RollupResult, ConsistencyViolation> {
    match cached {
        Some(cached) => reconcile_within(computed, cached, epsilon),
        None => Ok(computed.clone()),
    }
}
