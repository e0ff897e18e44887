//! Financial metrics aggregation and game classification for venue
//! operations reporting.
//!
//! Everything in this crate is pure computation over an immutable slice of
//! [`models::FinancialRecord`]: classify each game, resolve the requested
//! time window and macro-category, roll the surviving records up into
//! global, per-template and per-day views, and check freshly computed
//! numbers against precomputed ones. No I/O and no shared mutable state;
//! the only clock access is the convenience [`window::TimeWindow::resolve`],
//! and callers that need several views to agree pin one instant through
//! [`window::TimeWindow::resolve_at`].
//!
//! Every view is fed from one shared selection pass ([`filter::select_records`]),
//! so two views computed from the same records and the same scope can never
//! disagree about which games exist.

pub mod audit;
pub mod classify;
pub mod filter;
pub mod reconcile;
pub mod rollup;
pub mod window;

pub use audit::audit_records;
pub use classify::classify;
pub use filter::{category_matches, filter_by_category, is_eligible, select_records};
pub use reconcile::{
    diff_rollups, reconcile, reconcile_within, resolve_authoritative, ConsistencyViolation,
    FieldDivergence, CURRENCY_EPSILON,
};
pub use rollup::{
    aggregate, aggregate_by_day, classification_rollups, global_rollup, month_key, ranked,
    GroupingStrategy,
};
pub use window::TimeWindow;
