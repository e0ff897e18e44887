use async_trait::async_trait;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use metrics_cache::{CacheFile, CachedRollup};
use models::{AggregationScope, FinancialRecord, RollupResult};

use crate::error::{ApiError, Result};

/// Source of financial records. The production impl reads the venue's
/// snapshot export; tests swap in an in-memory one.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_records(&self) -> Result<Vec<FinancialRecord>>;
}

/// Store for precomputed rollups keyed by aggregation scope. Entries come
/// back whole, `computed_at` included, so readers can reconcile against the
/// window the entry was actually computed under; writers supply the instant
/// so one refresh stamps every scope alike.
#[async_trait]
pub trait MetricsCacheRepository: Send + Sync {
    async fn get(&self, scope: &AggregationScope) -> Result<Option<CachedRollup>>;
    async fn put(
        &self,
        scope: AggregationScope,
        result: RollupResult,
        computed_at: DateTime<Utc>,
    ) -> Result<()>;
    async fn invalidate(&self) -> Result<()>;
}

/// File-based record source reading the same snapshot exports the report
/// pipeline consumes (single file or directory of batches). Reloaded on
/// every request; the export is the source of truth, not process memory.
pub struct FileRecordSource {
    records_path: PathBuf,
}

impl FileRecordSource {
    pub fn new<P: AsRef<Path>>(records_path: P) -> Self {
        Self {
            records_path: records_path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl RecordSource for FileRecordSource {
    async fn fetch_records(&self) -> Result<Vec<FinancialRecord>> {
        let path = self.records_path.clone();
        let records = tokio::task::spawn_blocking(move || report_pipeline::load_records(&path))
            .await
            .map_err(|e| ApiError::InternalError(format!("record load task failed: {e}")))??;
        Ok(records)
    }
}

/// File-based cache store wrapping the [`metrics_cache`] file format.
pub struct FileMetricsCache {
    cache_path: PathBuf,
}

impl FileMetricsCache {
    pub fn new<P: AsRef<Path>>(cache_path: P) -> Self {
        Self {
            cache_path: cache_path.as_ref().to_path_buf(),
        }
    }

    async fn load_cache(&self) -> Result<CacheFile> {
        match tokio::fs::read_to_string(&self.cache_path).await {
            Ok(content) => Ok(CacheFile::from_json_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CacheFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_cache(&self, cache: &CacheFile) -> Result<()> {
        if let Some(parent) = self.cache_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let content = cache.to_json_string()?;
        tokio::fs::write(&self.cache_path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl MetricsCacheRepository for FileMetricsCache {
    async fn get(&self, scope: &AggregationScope) -> Result<Option<CachedRollup>> {
        let cache = self.load_cache().await?;
        Ok(cache.get(scope).cloned())
    }

    async fn put(
        &self,
        scope: AggregationScope,
        result: RollupResult,
        computed_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut cache = self.load_cache().await?;
        cache.upsert(scope, result, computed_at);
        self.save_cache(&cache).await
    }

    async fn invalidate(&self) -> Result<()> {
        let mut cache = self.load_cache().await?;
        cache.remove_all();
        self.save_cache(&cache).await
    }
}
