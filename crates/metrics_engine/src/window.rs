//! Time window resolution.

use chrono::{DateTime, Months, Utc};
use models::TimeRangeKey;

/// A concrete interval resolved from a symbolic [`TimeRangeKey`].
///
/// `from` is `None` for the unbounded all-time window; both ends are
/// inclusive. `to` is the instant the window was resolved at, so two
/// windows resolved at different instants may disagree about records right
/// at the margin. Callers that need several scopes to agree resolve all of
/// them against one pinned instant via [`TimeWindow::resolve_at`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    /// Resolves a range key against the current instant.
    pub fn resolve(key: TimeRangeKey) -> Self {
        Self::resolve_at(key, Utc::now())
    }

    /// Resolves a range key against a caller-pinned instant.
    ///
    /// Bounded keys subtract whole calendar months, clamping end-of-month
    /// days: one month back from May 31 is April 30.
    pub fn resolve_at(key: TimeRangeKey, now: DateTime<Utc>) -> Self {
        let from = key
            .months()
            .and_then(|n| now.checked_sub_months(Months::new(n)));
        TimeWindow { from, to: now }
    }

    /// Whether an instant falls inside the window, boundaries included.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| instant >= from) && instant <= self.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn all_time_has_no_lower_bound() {
        let now = utc("2024-06-15T10:00:00Z");
        let window = TimeWindow::resolve_at(TimeRangeKey::All, now);
        assert_eq!(window.from, None);
        assert_eq!(window.to, now);
        assert!(window.contains(utc("1999-01-01T00:00:00Z")));
    }

    #[test]
    fn bounded_keys_subtract_calendar_months() {
        let now = utc("2024-06-15T10:00:00Z");
        let window = TimeWindow::resolve_at(TimeRangeKey::ThreeMonths, now);
        assert_eq!(window.from, Some(utc("2024-03-15T10:00:00Z")));
        assert_eq!(window.to, now);
    }

    #[test]
    fn month_end_days_clamp() {
        let now = utc("2024-05-31T12:00:00Z");
        let window = TimeWindow::resolve_at(TimeRangeKey::OneMonth, now);
        assert_eq!(window.from, Some(utc("2024-04-30T12:00:00Z")));
    }

    #[test]
    fn boundaries_are_inclusive() {
        let now = utc("2024-06-15T10:00:00Z");
        let window = TimeWindow::resolve_at(TimeRangeKey::SixMonths, now);
        assert!(window.contains(utc("2023-12-15T10:00:00Z")));
        assert!(window.contains(now));
        assert!(!window.contains(utc("2023-12-15T09:59:59Z")));
    }

    #[test]
    fn instants_after_resolution_are_outside() {
        let now = utc("2024-06-15T10:00:00Z");
        let window = TimeWindow::resolve_at(TimeRangeKey::All, now);
        assert!(!window.contains(utc("2024-06-15T10:00:01Z")));
    }

    #[test]
    fn twelve_months_spans_a_full_year() {
        let now = utc("2024-06-15T10:00:00Z");
        let window = TimeWindow::resolve_at(TimeRangeKey::TwelveMonths, now);
        assert_eq!(window.from, Some(utc("2023-06-15T10:00:00Z")));
    }
}
