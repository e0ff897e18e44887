//! Data-quality audit over raw record exports.

use std::collections::HashMap;

use models::{canonical_day, Classification, FinancialRecord, GameStatus};

use crate::classify::classify;

fn has_text(value: Option<&String>) -> bool {
    value.is_some_and(|s| !s.trim().is_empty())
}

/// Scans a record export for data-quality problems worth surfacing next to
/// a report.
///
/// Findings never fail anything: bad records degrade into the unknown
/// buckets during aggregation, and the caller decides whether these lines
/// end up in report warnings, log output or stderr.
pub fn audit_records(records: &[FinancialRecord]) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut seen_games: HashMap<&str, &str> = HashMap::new();

    for record in records {
        if record.meta.status == GameStatus::Unknown {
            warnings.push(format!(
                "record {}: game status missing or unrecognized, excluded from rollups",
                record.id
            ));
        }
        // a series marker or a schedule identity classifies the game on its
        // own, so absent flags only matter when nothing else decides
        if (record.meta.is_series.is_none() || record.meta.is_regular.is_none())
            && classify(&record.meta) == Classification::Unknown
        {
            warnings.push(format!(
                "record {}: series/regular flags incomplete, classification degrades to UNKNOWN",
                record.id
            ));
        }
        if record
            .meta
            .recurring_game_id
            .as_deref()
            .is_some_and(|id| id.trim().is_empty())
        {
            warnings.push(format!(
                "record {}: blank recurringGameId treated as absent",
                record.id
            ));
        }
        if record.meta.is_regular == Some(true)
            && !has_text(record.meta.recurring_game_id.as_ref())
            && has_text(record.meta.legacy_schedule_key.as_ref())
                != has_text(record.meta.legacy_game_type_key.as_ref())
        {
            warnings.push(format!(
                "record {}: legacy schedule identity incomplete, one of legacyScheduleKey/legacyGameTypeKey is missing",
                record.id
            ));
        }
        if let Some(template) = &record.template {
            if canonical_day(&template.day_of_week).is_none() {
                warnings.push(format!(
                    "record {}: template {} has unrecognized dayOfWeek '{}'",
                    record.id, template.id, template.day_of_week
                ));
            }
        }
        let recomputed = record.revenue - record.cost;
        if (record.net_profit - recomputed).abs() > 0.01 {
            warnings.push(format!(
                "record {}: stored netProfit {:.2} differs from revenue - cost {:.2}",
                record.id, record.net_profit, recomputed
            ));
        }
        if !record.game_id.trim().is_empty() {
            if let Some(first) = seen_games.insert(record.game_id.as_str(), record.id.as_str()) {
                warnings.push(format!(
                    "records {} and {} both reference game {}",
                    first, record.id, record.game_id
                ));
            }
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use models::{GameMeta, GameStatus, RecurringGameTemplate};

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn clean_record(id: &str) -> FinancialRecord {
        FinancialRecord {
            id: id.to_string(),
            game_id: format!("game-{id}"),
            occurred_at: utc("2024-03-05T19:00:00Z"),
            entries: 10,
            unique_players: 8,
            prizepool: 1000.0,
            revenue: 150.0,
            cost: 50.0,
            net_profit: 100.0,
            meta: GameMeta {
                status: GameStatus::Finished,
                is_series: Some(false),
                is_regular: Some(false),
                ..GameMeta::default()
            },
            template: None,
            profit_margin: None,
        }
    }

    #[test]
    fn clean_records_produce_no_warnings() {
        let records = vec![clean_record("a"), clean_record("b")];
        assert!(audit_records(&records).is_empty());
    }

    #[test]
    fn unknown_status_and_missing_flags_are_flagged() {
        let mut record = clean_record("a");
        record.meta.status = GameStatus::Unknown;
        record.meta.is_series = None;
        let warnings = audit_records(std::slice::from_ref(&record));
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("status missing or unrecognized"));
        assert!(warnings[1].contains("flags incomplete"));
    }

    #[test]
    fn missing_flags_with_a_template_reference_are_not_flagged() {
        let mut record = clean_record("a");
        record.meta.is_series = None;
        record.meta.is_regular = None;
        record.meta.recurring_game_id = Some("rg-1".to_string());
        assert!(audit_records(std::slice::from_ref(&record)).is_empty());
    }

    #[test]
    fn a_series_game_missing_the_regular_flag_is_not_flagged() {
        let mut record = clean_record("a");
        record.meta.is_series = Some(true);
        record.meta.is_regular = None;
        assert!(audit_records(std::slice::from_ref(&record)).is_empty());
    }

    #[test]
    fn blank_template_reference_is_flagged() {
        let mut record = clean_record("a");
        record.meta.recurring_game_id = Some("   ".to_string());
        let warnings = audit_records(std::slice::from_ref(&record));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("blank recurringGameId"));
    }

    #[test]
    fn half_a_legacy_identity_is_flagged() {
        let mut record = clean_record("a");
        record.meta.is_regular = Some(true);
        record.meta.legacy_schedule_key = Some("sk-9".to_string());
        let warnings = audit_records(std::slice::from_ref(&record));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("legacy schedule identity incomplete"));
    }

    #[test]
    fn complete_legacy_identity_is_not_flagged() {
        let mut record = clean_record("a");
        record.meta.is_regular = Some(true);
        record.meta.legacy_schedule_key = Some("sk-9".to_string());
        record.meta.legacy_game_type_key = Some("gtk-2".to_string());
        assert!(audit_records(std::slice::from_ref(&record)).is_empty());
    }

    #[test]
    fn unrecognized_template_day_is_flagged() {
        let mut record = clean_record("a");
        record.template = Some(RecurringGameTemplate {
            id: "rg-1".to_string(),
            name: "Misconfigured League".to_string(),
            day_of_week: "Tuesdayish".to_string(),
        });
        let warnings = audit_records(std::slice::from_ref(&record));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("unrecognized dayOfWeek 'Tuesdayish'"));
    }

    #[test]
    fn net_profit_mismatch_is_flagged() {
        let mut record = clean_record("a");
        record.net_profit = 90.0;
        let warnings = audit_records(std::slice::from_ref(&record));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("netProfit 90.00"));
        assert!(warnings[0].contains("100.00"));
    }

    #[test]
    fn duplicate_game_references_are_flagged_once_per_extra_record() {
        let mut second = clean_record("b");
        second.game_id = "game-a".to_string();
        let records = vec![clean_record("a"), second];
        let warnings = audit_records(&records);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("records a and b both reference game game-a"));
    }
}
