//! File-backed store for precomputed rollups.
//!
//! One JSON file holds every precomputed scope, keyed by the scope's cache
//! key (`GLOBAL|3|SERIES`). The refresh job rewrites entries, the API and
//! the checker read them back and reconcile them against freshly computed
//! numbers. The whole file is read or written in one go; there is no
//! incremental update protocol.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use models::{AggregationScope, RollupResult};
use serde::{Deserialize, Serialize};

/// Bumped when the on-disk layout changes shape. A mismatching file is an
/// error rather than a silent reinterpretation; regenerate with the refresh
/// job.
pub const CACHE_FILE_VERSION: u32 = 1;

/// One precomputed rollup with the scope it was computed for and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRollup {
    pub scope: AggregationScope,
    pub result: RollupResult,
    pub computed_at: DateTime<Utc>,
}

/// The whole cache file. Entries are keyed by [`AggregationScope::cache_key`]
/// in an ordered map so the serialized file is stable across rewrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheFile {
    pub version: u32,
    #[serde(default)]
    pub entries: BTreeMap<String, CachedRollup>,
}

impl Default for CacheFile {
    fn default() -> Self {
        CacheFile {
            version: CACHE_FILE_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

impl CacheFile {
    /// Parses a cache file from its JSON text, rejecting unknown layout
    /// versions.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let file: CacheFile = serde_json::from_str(raw).context("Parsing metrics cache JSON")?;
        if file.version != CACHE_FILE_VERSION {
            bail!(
                "metrics cache version {} is not supported (expected {})",
                file.version,
                CACHE_FILE_VERSION
            );
        }
        Ok(file)
    }

    /// Serializes the cache for writing. Pretty-printed; these files get
    /// read by humans during incident triage.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Serializing metrics cache")
    }

    /// Reads the cache at `path`. A missing file is an empty cache, not an
    /// error, so first runs need no setup step.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(CacheFile::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Reading metrics cache: {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("Loading metrics cache: {}", path.display()))
    }

    /// Writes the cache to `path`, creating parent directories as needed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Creating cache directory: {}", parent.display()))?;
            }
        }
        let raw = self.to_json_string()?;
        fs::write(path, raw)
            .with_context(|| format!("Writing metrics cache: {}", path.display()))?;
        Ok(())
    }

    pub fn get(&self, scope: &AggregationScope) -> Option<&CachedRollup> {
        self.entries.get(&scope.cache_key())
    }

    /// Inserts or replaces the entry for `scope`.
    pub fn upsert(&mut self, scope: AggregationScope, result: RollupResult, computed_at: DateTime<Utc>) {
        let key = scope.cache_key();
        self.entries.insert(
            key,
            CachedRollup {
                scope,
                result,
                computed_at,
            },
        );
    }

    /// Removes the entry for `scope`, reporting whether one existed.
    pub fn remove(&mut self, scope: &AggregationScope) -> bool {
        self.entries.remove(&scope.cache_key()).is_some()
    }

    /// Drops every entry. Invalidation rewrites the file as empty rather
    /// than deleting it.
    pub fn remove_all(&mut self) {
        self.entries.clear();
    }

    /// Drops every entry whose scope is not in `scopes`. The refresh job
    /// uses this to prune scopes removed from the settings.
    pub fn retain_scopes(&mut self, scopes: &[AggregationScope]) {
        let keep: Vec<String> = scopes.iter().map(AggregationScope::cache_key).collect();
        self.entries.retain(|key, _| keep.iter().any(|k| k == key));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{CategoryKey, TimeRangeKey};
    use std::path::PathBuf;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn scope(range: TimeRangeKey, category: CategoryKey) -> AggregationScope {
        AggregationScope::global(range, category)
    }

    fn result(profit: f64) -> RollupResult {
        RollupResult {
            total_games: 3,
            total_profit: profit,
            ..RollupResult::default()
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("metrics-cache-{}-{name}", std::process::id()))
    }

    #[test]
    fn missing_file_loads_as_an_empty_cache() {
        let cache = CacheFile::load(temp_path("does-not-exist.json")).unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.version, CACHE_FILE_VERSION);
    }

    #[test]
    fn save_then_load_round_trips() {
        let path = temp_path("round-trip/cache.json");
        let mut cache = CacheFile::default();
        cache.upsert(
            scope(TimeRangeKey::ThreeMonths, CategoryKey::All),
            result(140.0),
            utc("2024-05-01T00:00:00Z"),
        );
        cache.save(&path).unwrap();

        let loaded = CacheFile::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, cache);
        let entry = loaded.get(&scope(TimeRangeKey::ThreeMonths, CategoryKey::All)).unwrap();
        assert_eq!(entry.result.total_profit, 140.0);
    }

    #[test]
    fn entries_are_keyed_by_the_scope_cache_key() {
        let mut cache = CacheFile::default();
        cache.upsert(
            scope(TimeRangeKey::ThreeMonths, CategoryKey::Series),
            result(10.0),
            utc("2024-05-01T00:00:00Z"),
        );
        assert!(cache.entries.contains_key("GLOBAL|3|SERIES"));
    }

    #[test]
    fn upsert_replaces_an_existing_entry() {
        let mut cache = CacheFile::default();
        let s = scope(TimeRangeKey::All, CategoryKey::All);
        cache.upsert(s.clone(), result(10.0), utc("2024-05-01T00:00:00Z"));
        cache.upsert(s.clone(), result(25.0), utc("2024-06-01T00:00:00Z"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&s).unwrap().result.total_profit, 25.0);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let raw = r#"{ "version": 99, "entries": {} }"#;
        let err = CacheFile::from_json_str(raw).unwrap_err();
        assert!(err.to_string().contains("version 99"));
    }

    #[test]
    fn retain_scopes_prunes_everything_else() {
        let mut cache = CacheFile::default();
        cache.upsert(scope(TimeRangeKey::All, CategoryKey::All), result(1.0), utc("2024-05-01T00:00:00Z"));
        cache.upsert(scope(TimeRangeKey::All, CategoryKey::Series), result(2.0), utc("2024-05-01T00:00:00Z"));
        cache.upsert(scope(TimeRangeKey::OneMonth, CategoryKey::All), result(3.0), utc("2024-05-01T00:00:00Z"));

        cache.retain_scopes(&[scope(TimeRangeKey::All, CategoryKey::All)]);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&scope(TimeRangeKey::All, CategoryKey::All)).is_some());
    }

    #[test]
    fn remove_reports_whether_an_entry_existed() {
        let mut cache = CacheFile::default();
        let s = scope(TimeRangeKey::All, CategoryKey::All);
        cache.upsert(s.clone(), result(1.0), utc("2024-05-01T00:00:00Z"));
        assert!(cache.remove(&s));
        assert!(!cache.remove(&s));
    }
}
