use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

pub const GLOBAL_GROUP_KEY: &str = "GLOBAL";

// Game lifecycle status

/// Lifecycle status of the game behind a financial record, as exported by the
/// upstream system. Decoding is tolerant: an absent field or an unrecognized
/// string both land on `Unknown`, so one bad record never fails a whole export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Initiating,
    Scheduled,
    Registering,
    Running,
    Cancelled,
    Finished,
    NotInUse,
    NotPublished,
    ClockStopped,
    #[default]
    #[serde(other)]
    Unknown,
}

// Classification (derived, never stored)

/// The four-way category assigned to every record. `Unknown` is a real
/// outcome, not an error: it marks records whose flags are missing or
/// contradict their schedule identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Recurring,
    AdHoc,
    Series,
    Unknown,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Classification::Recurring => "RECURRING",
            Classification::AdHoc => "AD_HOC",
            Classification::Series => "SERIES",
            Classification::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

// Schedule identity

/// How a game is tied to its recurring schedule. The upstream system migrated
/// from legacy key pairs to explicit template references; during the
/// transition both representations exist and must resolve to the same
/// grouping key space. Resolved once per record via
/// [`GameMeta::schedule_identity`]; aggregation code only ever sees the
/// canonical [`grouping_key`](ScheduleIdentity::grouping_key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScheduleIdentity {
    Template {
        recurring_game_id: String,
    },
    Legacy {
        schedule_key: String,
        game_type_key: String,
    },
}

impl ScheduleIdentity {
    /// Canonical grouping key: the template id, or `schedule::gameType` for
    /// legacy records. Both halves of a legacy identity are non-empty, so the
    /// separator cannot collide with a bare key.
    pub fn grouping_key(&self) -> String {
        match self {
            ScheduleIdentity::Template { recurring_game_id } => recurring_game_id.clone(),
            ScheduleIdentity::Legacy {
                schedule_key,
                game_type_key,
            } => format!("{schedule_key}::{game_type_key}"),
        }
    }
}

// Record types

/// Denormalized facts about the game that produced a financial record.
/// `is_series` / `is_regular` are optional on purpose: exports predating the
/// schedule migration omit them, and an absent flag must classify as
/// `Unknown` rather than being guessed at.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMeta {
    #[serde(default)]
    pub status: GameStatus,
    #[serde(default)]
    pub is_series: Option<bool>,
    #[serde(default)]
    pub is_regular: Option<bool>,
    #[serde(default)]
    pub recurring_game_id: Option<String>,
    #[serde(default)]
    pub legacy_schedule_key: Option<String>,
    #[serde(default)]
    pub legacy_game_type_key: Option<String>,
    #[serde(default)]
    pub buy_in: Option<f64>,
    #[serde(default)]
    pub tournament_id: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl GameMeta {
    /// Resolves the schedule identity once. The explicit template reference
    /// wins over the legacy pair when both are present; the legacy pair only
    /// counts when the record is flagged regular and both keys are non-empty.
    /// Blank or whitespace-only strings are treated as absent.
    pub fn schedule_identity(&self) -> Option<ScheduleIdentity> {
        if let Some(id) = non_blank(&self.recurring_game_id) {
            return Some(ScheduleIdentity::Template {
                recurring_game_id: id.to_string(),
            });
        }
        if self.is_regular == Some(true) {
            if let (Some(schedule_key), Some(game_type_key)) = (
                non_blank(&self.legacy_schedule_key),
                non_blank(&self.legacy_game_type_key),
            ) {
                return Some(ScheduleIdentity::Legacy {
                    schedule_key: schedule_key.to_string(),
                    game_type_key: game_type_key.to_string(),
                });
            }
        }
        None
    }
}

/// A named recurring schedule a venue runs, e.g. "Wednesday $50 Turbo".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringGameTemplate {
    pub id: String,
    pub name: String,
    /// One of the seven English day names; matched case-insensitively.
    pub day_of_week: String,
}

/// One completed game's financial outcome, with its game metadata embedded
/// and, when the upstream resolver could supply it, the recurring template.
/// Immutable once produced; the engine never mutates one.
///
/// `net_profit` is the stored upstream value. It usually equals
/// `revenue - cost` but is not guaranteed to, so totals sum the stored
/// number and never re-derive it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialRecord {
    pub id: String,
    pub game_id: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub entries: u64,
    #[serde(default)]
    pub unique_players: u64,
    #[serde(default)]
    pub prizepool: f64,
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub net_profit: f64,
    #[serde(default)]
    pub profit_margin: Option<f64>,
    #[serde(default)]
    pub meta: GameMeta,
    #[serde(default)]
    pub template: Option<RecurringGameTemplate>,
}

// Range and category keys

/// Symbolic time window selector: all time, or the last N whole calendar
/// months counted back from the resolution instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRangeKey {
    #[serde(rename = "ALL")]
    All,
    #[serde(rename = "1")]
    OneMonth,
    #[serde(rename = "3")]
    ThreeMonths,
    #[serde(rename = "6")]
    SixMonths,
    #[serde(rename = "12")]
    TwelveMonths,
}

impl TimeRangeKey {
    /// Number of calendar months to subtract, or `None` for an unbounded
    /// window.
    pub fn months(&self) -> Option<u32> {
        match self {
            TimeRangeKey::All => None,
            TimeRangeKey::OneMonth => Some(1),
            TimeRangeKey::ThreeMonths => Some(3),
            TimeRangeKey::SixMonths => Some(6),
            TimeRangeKey::TwelveMonths => Some(12),
        }
    }
}

impl fmt::Display for TimeRangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeRangeKey::All => "ALL",
            TimeRangeKey::OneMonth => "1",
            TimeRangeKey::ThreeMonths => "3",
            TimeRangeKey::SixMonths => "6",
            TimeRangeKey::TwelveMonths => "12",
        };
        f.write_str(s)
    }
}

impl FromStr for TimeRangeKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(TimeRangeKey::All),
            "1" => Ok(TimeRangeKey::OneMonth),
            "3" => Ok(TimeRangeKey::ThreeMonths),
            "6" => Ok(TimeRangeKey::SixMonths),
            "12" => Ok(TimeRangeKey::TwelveMonths),
            other => Err(format!(
                "unknown time range '{other}', expected ALL, 1, 3, 6 or 12"
            )),
        }
    }
}

/// Macro-category toggle on the series/non-series axis. This is NOT the
/// four-way [`Classification`]: `Regular` here means "not a series game" and
/// keeps ad-hoc, recurring and unknown records alike. The label is known to
/// read as "recurring only" to end users; the semantics below are the ones
/// the venue dashboards have always used, and renaming is a product decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryKey {
    All,
    Regular,
    Series,
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CategoryKey::All => "ALL",
            CategoryKey::Regular => "REGULAR",
            CategoryKey::Series => "SERIES",
        };
        f.write_str(s)
    }
}

impl FromStr for CategoryKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(CategoryKey::All),
            "REGULAR" => Ok(CategoryKey::Regular),
            "SERIES" => Ok(CategoryKey::Series),
            other => Err(format!(
                "unknown category '{other}', expected ALL, REGULAR or SERIES"
            )),
        }
    }
}

// Aggregation scope and rollup outputs

/// Identifies one rollup view: a grouping key (`GLOBAL`, a template grouping
/// key, or a canonical day name) plus the window and category it was computed
/// under. Also the cache key for precomputed rollups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationScope {
    pub group_key: String,
    pub time_range: TimeRangeKey,
    pub category: CategoryKey,
}

impl AggregationScope {
    pub fn new(
        group_key: impl Into<String>,
        time_range: TimeRangeKey,
        category: CategoryKey,
    ) -> Self {
        AggregationScope {
            group_key: group_key.into(),
            time_range,
            category,
        }
    }

    pub fn global(time_range: TimeRangeKey, category: CategoryKey) -> Self {
        Self::new(GLOBAL_GROUP_KEY, time_range, category)
    }

    /// Stable string form used as the key in cache files and log lines.
    pub fn cache_key(&self) -> String {
        format!("{}|{}|{}", self.group_key, self.time_range, self.category)
    }
}

impl fmt::Display for AggregationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

/// One month of a partition's trend, keyed `YYYY-MM` on the UTC calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub month: String,
    pub profit: f64,
    pub games: u64,
}

/// Totals, derived averages and the monthly trend for one aggregation scope.
/// The default value is the correct result for an empty record set: all
/// totals zero, averages zero, empty trend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupResult {
    pub total_games: u64,
    pub total_entries: u64,
    pub total_unique_players: u64,
    pub total_prizepool: f64,
    pub total_revenue: f64,
    pub total_cost: f64,
    pub total_profit: f64,
    pub avg_entries_per_game: f64,
    pub avg_profit_per_game: f64,
    pub trend: Vec<TrendPoint>,
}

/// The four disjoint classification buckets over one filtered record set.
/// Together they cover it exactly, so their totals sum to the global rollup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRollups {
    pub recurring: RollupResult,
    pub ad_hoc: RollupResult,
    pub series: RollupResult,
    pub unknown: RollupResult,
}

// Day-of-week helpers

pub const WEEK_DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Matches one of the seven canonical English day names, case-insensitively
/// and ignoring surrounding whitespace. Abbreviations are not accepted;
/// anything else is a data problem for the caller to report.
pub fn canonical_day(input: &str) -> Option<Weekday> {
    match input.trim().to_ascii_lowercase().as_str() {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Canonical display name for a weekday.
pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

// Report settings

fn default_venue_label() -> String {
    "venue".to_string()
}

fn default_time_ranges() -> Vec<TimeRangeKey> {
    vec![
        TimeRangeKey::All,
        TimeRangeKey::OneMonth,
        TimeRangeKey::ThreeMonths,
        TimeRangeKey::SixMonths,
        TimeRangeKey::TwelveMonths,
    ]
}

fn default_categories() -> Vec<CategoryKey> {
    vec![CategoryKey::All, CategoryKey::Regular, CategoryKey::Series]
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("metrics_cache.json")
}

/// Settings for report generation and the cached-metrics refresh job. Every
/// field has a default so an absent settings file means "the standard
/// dashboard scopes".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    #[serde(default = "default_venue_label")]
    pub venue: String,
    #[serde(default = "default_time_ranges")]
    pub time_ranges: Vec<TimeRangeKey>,
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryKey>,
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    /// Overrides the comparison tolerance for currency fields when checking
    /// cached rollups against recomputed ones.
    #[serde(default)]
    pub currency_epsilon: Option<f64>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            venue: default_venue_label(),
            time_ranges: default_time_ranges(),
            categories: default_categories(),
            cache_path: default_cache_path(),
            currency_epsilon: None,
        }
    }
}

impl ReportSettings {
    /// The global cache scopes this configuration asks to precompute, in
    /// range-major order.
    pub fn global_scopes(&self) -> Vec<AggregationScope> {
        let mut scopes = Vec::with_capacity(self.time_ranges.len() * self.categories.len());
        for range in &self.time_ranges {
            for category in &self.categories {
                scopes.push(AggregationScope::global(*range, *category));
            }
        }
        scopes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_decodes_unknown_strings() {
        let status: GameStatus = serde_json::from_str("\"FINISHED\"").unwrap();
        assert_eq!(status, GameStatus::Finished);

        let status: GameStatus = serde_json::from_str("\"PAUSED_FOR_DINNER\"").unwrap();
        assert_eq!(status, GameStatus::Unknown);
    }

    #[test]
    fn test_meta_defaults_when_fields_absent() {
        let meta: GameMeta = serde_json::from_str("{}").unwrap();
        assert_eq!(meta.status, GameStatus::Unknown);
        assert_eq!(meta.is_series, None);
        assert_eq!(meta.is_regular, None);
        assert!(meta.schedule_identity().is_none());
    }

    #[test]
    fn test_template_identity_wins_over_legacy() {
        let meta = GameMeta {
            is_regular: Some(true),
            recurring_game_id: Some("rg-7".to_string()),
            legacy_schedule_key: Some("wed".to_string()),
            legacy_game_type_key: Some("turbo".to_string()),
            ..GameMeta::default()
        };
        assert_eq!(
            meta.schedule_identity(),
            Some(ScheduleIdentity::Template {
                recurring_game_id: "rg-7".to_string()
            })
        );
    }

    #[test]
    fn test_legacy_identity_requires_both_keys_and_regular_flag() {
        let mut meta = GameMeta {
            is_regular: Some(true),
            legacy_schedule_key: Some("wed".to_string()),
            legacy_game_type_key: Some("turbo".to_string()),
            ..GameMeta::default()
        };
        let identity = meta.schedule_identity().unwrap();
        assert_eq!(identity.grouping_key(), "wed::turbo");

        meta.legacy_game_type_key = None;
        assert!(meta.schedule_identity().is_none());

        meta.legacy_game_type_key = Some("turbo".to_string());
        meta.is_regular = Some(false);
        assert!(meta.schedule_identity().is_none());
    }

    #[test]
    fn test_blank_template_id_treated_as_absent() {
        let meta = GameMeta {
            recurring_game_id: Some("   ".to_string()),
            ..GameMeta::default()
        };
        assert!(meta.schedule_identity().is_none());
    }

    #[test]
    fn test_range_and_category_parse_round_trip() {
        for token in ["ALL", "1", "3", "6", "12"] {
            let key: TimeRangeKey = token.parse().unwrap();
            assert_eq!(key.to_string(), token);
        }
        for token in ["ALL", "REGULAR", "SERIES"] {
            let key: CategoryKey = token.parse().unwrap();
            assert_eq!(key.to_string(), token);
        }
        assert!("2".parse::<TimeRangeKey>().is_err());
        assert!("recurring".parse::<CategoryKey>().is_err());
    }

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!("series".parse::<CategoryKey>(), Ok(CategoryKey::Series));
        assert_eq!(" all ".parse::<TimeRangeKey>(), Ok(TimeRangeKey::All));
    }

    #[test]
    fn test_canonical_day_matching() {
        assert_eq!(canonical_day("Wednesday"), Some(Weekday::Wed));
        assert_eq!(canonical_day("  friday "), Some(Weekday::Fri));
        assert_eq!(canonical_day("SUNDAY"), Some(Weekday::Sun));
        assert_eq!(canonical_day("Wed"), None);
        assert_eq!(canonical_day(""), None);
    }

    #[test]
    fn test_scope_cache_key_is_stable() {
        let scope = AggregationScope::global(TimeRangeKey::ThreeMonths, CategoryKey::Series);
        assert_eq!(scope.cache_key(), "GLOBAL|3|SERIES");
        let scope = AggregationScope::new("rg-1", TimeRangeKey::All, CategoryKey::All);
        assert_eq!(scope.cache_key(), "rg-1|ALL|ALL");
    }

    #[test]
    fn test_settings_defaults_cover_all_dashboard_scopes() {
        let settings = ReportSettings::default();
        assert_eq!(settings.global_scopes().len(), 15);
    }
}
