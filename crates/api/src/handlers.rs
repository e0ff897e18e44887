use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use metrics_engine::{
    audit_records, classification_rollups, global_rollup, resolve_authoritative, select_records,
    TimeWindow, CURRENCY_EPSILON,
};
use models::{
    AggregationScope, CategoryKey, ClassificationRollups, ReportSettings, RollupResult,
    TimeRangeKey,
};
use report_pipeline::{build_metrics_view, DayRollup, TemplateRollup};

use crate::error::{ApiError, Result};
use crate::repository::{MetricsCacheRepository, RecordSource};

/// Shared state for all metrics handlers.
#[derive(Clone)]
pub struct AppState {
    pub records: Arc<dyn RecordSource>,
    pub cache: Arc<dyn MetricsCacheRepository>,
    pub settings: Arc<ReportSettings>,
}

impl AppState {
    fn epsilon(&self) -> f64 {
        self.settings.currency_epsilon.unwrap_or(CURRENCY_EPSILON)
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Query parameters shared by the metrics endpoints. Both default to `ALL`.
#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    pub range: Option<String>,
    pub category: Option<String>,
}

impl MetricsQuery {
    fn parse(&self) -> Result<(TimeRangeKey, CategoryKey)> {
        let range = match &self.range {
            Some(raw) => raw.parse::<TimeRangeKey>().map_err(ApiError::BadRequest)?,
            None => TimeRangeKey::All,
        };
        let category = match &self.category {
            Some(raw) => raw.parse::<CategoryKey>().map_err(ApiError::BadRequest)?,
            None => CategoryKey::All,
        };
        Ok((range, category))
    }
}

/// Where the numbers in a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsSource {
    Cache,
    Computed,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    pub scope: AggregationScope,
    pub source: MetricsSource,
    pub global: RollupResult,
    pub breakdown: ClassificationRollups,
}

/// GET /api/metrics?range=&category=
///
/// Global rollup for one scope. A cached entry is authoritative: it is
/// reconciled against the freshly computed rollup and a divergence is a 500
/// carrying the field list, never a silently chosen side. The breakdown
/// comes from the same record selection as the global rollup.
pub async fn get_metrics(
    State(state): State<AppState>,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<MetricsResponse>> {
    let (range, category) = query.parse()?;
    let scope = AggregationScope::global(range, category);

    let records = state.records.fetch_records().await?;
    let cached = state.cache.get(&scope).await?;
    // Resolve the window at the cached entry's own instant; a divergence
    // then means the records or the math changed, not the clock.
    let resolved_at = cached.as_ref().map_or_else(Utc::now, |entry| entry.computed_at);
    let window = TimeWindow::resolve_at(range, resolved_at);
    let selected = select_records(&records, &window, category);
    let computed = global_rollup(&selected);
    let breakdown = classification_rollups(&selected);

    let source = if cached.is_some() {
        MetricsSource::Cache
    } else {
        MetricsSource::Computed
    };
    let global = resolve_authoritative(
        &computed,
        cached.as_ref().map(|entry| &entry.result),
        state.epsilon(),
    )?;

    Ok(Json(MetricsResponse {
        scope,
        source,
        global,
        breakdown,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMetricsResponse {
    pub time_range: TimeRangeKey,
    pub category: CategoryKey,
    pub templates: Vec<TemplateRollup>,
}

/// GET /api/metrics/templates?range=&category=
///
/// Per-template rollups, ranked. Finer-grained than the cached scopes, so
/// always computed on the fly.
pub async fn get_template_metrics(
    State(state): State<AppState>,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<TemplateMetricsResponse>> {
    let (range, category) = query.parse()?;
    let records = state.records.fetch_records().await?;
    let view = build_metrics_view(&records, range, category, Utc::now());
    Ok(Json(TemplateMetricsResponse {
        time_range: range,
        category,
        templates: view.templates,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayMetricsResponse {
    pub time_range: TimeRangeKey,
    pub category: CategoryKey,
    pub days: Vec<DayRollup>,
}

/// GET /api/metrics/days?range=&category=
pub async fn get_day_metrics(
    State(state): State<AppState>,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<DayMetricsResponse>> {
    let (range, category) = query.parse()?;
    let records = state.records.fetch_records().await?;
    let view = build_metrics_view(&records, range, category, Utc::now());
    Ok(Json(DayMetricsResponse {
        time_range: range,
        category,
        days: view.days,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub refreshed: Vec<String>,
    pub refreshed_at: String,
}

/// POST /api/cache/refresh
///
/// Recomputes every configured global scope against one pinned instant and
/// persists the results.
pub async fn refresh_cache(State(state): State<AppState>) -> Result<Json<RefreshResponse>> {
    let records = state.records.fetch_records().await?;
    for finding in audit_records(&records) {
        tracing::warn!("{finding}");
    }
    let now = Utc::now();
    let mut refreshed = Vec::new();
    for scope in state.settings.global_scopes() {
        let window = TimeWindow::resolve_at(scope.time_range, now);
        let selected = select_records(&records, &window, scope.category);
        let rollup = global_rollup(&selected);
        state.cache.put(scope.clone(), rollup, now).await?;
        refreshed.push(scope.cache_key());
    }
    tracing::info!(scopes = refreshed.len(), "metrics cache refreshed");
    Ok(Json(RefreshResponse {
        refreshed,
        refreshed_at: now.to_rfc3339(),
    }))
}

/// POST /api/cache/invalidate
pub async fn invalidate_cache(State(state): State<AppState>) -> Result<Json<Value>> {
    state.cache.invalidate().await?;
    tracing::info!("metrics cache invalidated");
    Ok(Json(json!({ "status": "cache invalidated" })))
}
