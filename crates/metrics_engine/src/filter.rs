//! Record eligibility and category filtering.

use models::{CategoryKey, FinancialRecord, GameMeta, GameStatus};

use crate::window::TimeWindow;

/// Whether a record may enter rollups at all.
///
/// Only finished games carry a settled financial outcome, so `FINISHED` is
/// the single eligible status. The unconditional exclusion of unpublished
/// games falls out of the same check: `NOT_PUBLISHED` is never `FINISHED`.
pub fn is_eligible(record: &FinancialRecord) -> bool {
    record.meta.status == GameStatus::Finished
}

/// Whether a game belongs to the selected macro-category.
///
/// The split is on the series axis alone: `SERIES` selects games explicitly
/// flagged as series events, `REGULAR` selects everything else, including
/// games whose series flag is absent. The two are disjoint and together
/// cover any record set.
pub fn category_matches(meta: &GameMeta, key: CategoryKey) -> bool {
    match key {
        CategoryKey::All => true,
        CategoryKey::Series => meta.is_series == Some(true),
        CategoryKey::Regular => meta.is_series != Some(true),
    }
}

/// Narrows a record set to one macro-category.
pub fn filter_by_category(records: &[FinancialRecord], key: CategoryKey) -> Vec<FinancialRecord> {
    records
        .iter()
        .filter(|record| category_matches(&record.meta, key))
        .cloned()
        .collect()
}

/// The one selection pass every rollup view shares: eligibility, then the
/// time window, then the macro-category. Views fed from the same selection
/// can never disagree about which records exist.
pub fn select_records(
    records: &[FinancialRecord],
    window: &TimeWindow,
    category: CategoryKey,
) -> Vec<FinancialRecord> {
    records
        .iter()
        .filter(|record| is_eligible(record))
        .filter(|record| window.contains(record.occurred_at))
        .filter(|record| category_matches(&record.meta, category))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use models::TimeRangeKey;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn record(id: &str, status: GameStatus, occurred_at: &str) -> FinancialRecord {
        FinancialRecord {
            id: id.to_string(),
            game_id: format!("game-{id}"),
            occurred_at: utc(occurred_at),
            entries: 10,
            unique_players: 8,
            prizepool: 1000.0,
            revenue: 150.0,
            cost: 50.0,
            net_profit: 100.0,
            profit_margin: None,
            meta: GameMeta {
                status,
                ..GameMeta::default()
            },
            template: None,
        }
    }

    #[test]
    fn only_finished_games_are_eligible() {
        let statuses = [
            (GameStatus::Finished, true),
            (GameStatus::Running, false),
            (GameStatus::Cancelled, false),
            (GameStatus::NotPublished, false),
            (GameStatus::Scheduled, false),
            (GameStatus::Unknown, false),
        ];
        for (status, eligible) in statuses {
            let record = record("r1", status, "2024-05-01T20:00:00Z");
            assert_eq!(is_eligible(&record), eligible, "status {status:?}");
        }
    }

    #[test]
    fn unpublished_games_never_reach_a_rollup() {
        let window = TimeWindow::resolve_at(TimeRangeKey::All, utc("2024-06-01T00:00:00Z"));
        let records = vec![
            record("r1", GameStatus::Finished, "2024-05-01T20:00:00Z"),
            record("r2", GameStatus::NotPublished, "2024-05-02T20:00:00Z"),
        ];
        let selected = select_records(&records, &window, CategoryKey::All);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "r1");
    }

    #[test]
    fn window_filter_applies_after_eligibility() {
        let window = TimeWindow::resolve_at(TimeRangeKey::OneMonth, utc("2024-06-01T00:00:00Z"));
        let records = vec![
            record("in", GameStatus::Finished, "2024-05-15T20:00:00Z"),
            record("out", GameStatus::Finished, "2024-04-15T20:00:00Z"),
        ];
        let selected = select_records(&records, &window, CategoryKey::All);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "in");
    }

    #[test]
    fn regular_and_series_partition_any_record_set() {
        let mut records = Vec::new();
        for (id, is_series) in [("a", Some(true)), ("b", Some(false)), ("c", None)] {
            let mut r = record(id, GameStatus::Finished, "2024-05-01T20:00:00Z");
            r.meta.is_series = is_series;
            records.push(r);
        }
        let series = filter_by_category(&records, CategoryKey::Series);
        let regular = filter_by_category(&records, CategoryKey::Regular);
        let all = filter_by_category(&records, CategoryKey::All);

        assert_eq!(series.len(), 1);
        assert_eq!(regular.len(), 2);
        assert_eq!(all.len(), records.len());
        for r in &records {
            let in_series = series.iter().any(|s| s.id == r.id);
            let in_regular = regular.iter().any(|s| s.id == r.id);
            assert!(in_series != in_regular, "record {} must be in exactly one", r.id);
        }
    }

    #[test]
    fn unflagged_games_count_as_regular() {
        let r = record("c", GameStatus::Finished, "2024-05-01T20:00:00Z");
        assert!(category_matches(&r.meta, CategoryKey::Regular));
        assert!(!category_matches(&r.meta, CategoryKey::Series));
    }
}
