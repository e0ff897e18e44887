//! Game classification.

use models::{Classification, GameMeta};

/// Assigns exactly one [`Classification`] to a game's metadata.
///
/// Precedence, first match wins:
///
/// 1. an explicit series flag makes the game a series event, even when it
///    also carries a template reference;
/// 2. a resolvable schedule identity (a template reference, or the
///    migration-era legacy key pair on a regular game) makes it recurring;
/// 3. explicitly neither series nor regular makes it ad-hoc;
/// 4. everything else is unknown: absent flags, or a regular game whose
///    schedule keys never survived the migration.
///
/// Total over all inputs. Records that end up unknown still count in the
/// global totals; they are only absent from the recurring breakdowns.
pub fn classify(meta: &GameMeta) -> Classification {
    if meta.is_series == Some(true) {
        return Classification::Series;
    }
    if meta.schedule_identity().is_some() {
        return Classification::Recurring;
    }
    if meta.is_series == Some(false) && meta.is_regular == Some(false) {
        return Classification::AdHoc;
    }
    Classification::Unknown
}
