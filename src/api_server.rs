// Axum API Server Module
//
// Purpose: JSON API behind the county impact map. The map/widget front end calls
// /api/options once, then /api/impact and /api/boundaries on every input change.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use moka::future::Cache;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::classify::ColorCategory;
use crate::config::DashboardConfig;
use crate::data::ReferenceData;
use crate::pipeline::{ImpactMetric, ImpactPipeline, ImpactQuery, OnsiteInputs, StateFilter};
use crate::units::{PowerUnit, WaterUnit};

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ImpactPipeline>,
    pub cache: Cache<String, serde_json::Value>,
}

impl AppState {
    /// Load reference data from disk and build the state
    pub fn new(config: &DashboardConfig) -> anyhow::Result<Self> {
        tracing::info!("Loading reference data from {}...", config.data_dir.display());
        let data = ReferenceData::load(config)?;
        if data.factors_degraded() {
            tracing::warn!("Serving without emission factors: every footprint will be N/A");
        }
        Ok(Self::from_reference_data(data))
    }

    pub fn from_reference_data(data: ReferenceData) -> Self {
        tracing::info!("Initializing Moka cache...");
        let cache = Cache::builder()
            .max_capacity(1_000)
            .time_to_live(Duration::from_secs(300)) // 5 min TTL
            .build();

        Self {
            pipeline: Arc::new(ImpactPipeline::new(Arc::new(data))),
            cache,
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Select-box contents
        .route("/api/options", get(get_options))

        // Map data
        .route("/api/impact", get(get_impact))
        .route("/api/boundaries", get(get_boundaries))

        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn get_options(State(state): State<AppState>) -> Json<serde_json::Value> {
    let metrics: Vec<serde_json::Value> = ImpactMetric::ALL
        .iter()
        .map(|m| {
            serde_json::json!({
                "key": m.key(),
                "label": m.label(),
                "unit": m.unit(),
            })
        })
        .collect();

    let legend: Vec<serde_json::Value> = [
        ColorCategory::Green,
        ColorCategory::Yellow,
        ColorCategory::Red,
        ColorCategory::Gray,
    ]
    .iter()
    .map(|c| {
        serde_json::json!({
            "category": c.as_str(),
            "code": c.code(),
            "description": c.legend(),
        })
    })
    .collect();

    Json(serde_json::json!({
        "metrics": metrics,
        "power_units": PowerUnit::ALL.iter().map(|u| u.label()).collect::<Vec<_>>(),
        "water_units": WaterUnit::ALL.iter().map(|u| u.label()).collect::<Vec<_>>(),
        "states": state.pipeline.state_options(),
        "legend": legend,
    }))
}

/// Full impact report for one set of inputs
///
/// GET /api/impact?metric=water&power=2.5&power_unit=MW&water=10&water_unit=gpm&state=Texas
async fn get_impact(
    State(state): State<AppState>,
    params: Result<Query<ImpactParams>, QueryRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Query(params) = params?;
    let query = params.into_query(state.pipeline.data())?;
    let cache_key = format!(
        "impact:{}:{}:{}:{}:{}:{}",
        query.metric.key(),
        query.inputs.power_value,
        query.inputs.power_unit,
        query.inputs.water_value,
        query.inputs.water_unit,
        query.state.label()
    );

    if let Some(cached) = state.cache.get(&cache_key).await {
        tracing::debug!("Cache hit: {}", cache_key);
        return Ok(Json(cached));
    }

    // CPU-bound work: run in blocking thread pool
    let pipeline = state.pipeline.clone();
    let report = tokio::task::spawn_blocking(move || pipeline.compute_parallel(&query))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?;

    tracing::info!(
        "{} ({}): {} of {} counties with data",
        report.metric_label,
        report.state,
        report.summary.valid_count,
        report.summary.total_count
    );

    let result = serde_json::to_value(&report)
        .map_err(|e| AppError::Internal(format!("JSON serialization error: {}", e)))?;

    state.cache.insert(cache_key, result.clone()).await;

    Ok(Json(result))
}

/// Boundary features for the current state filter
///
/// GET /api/boundaries?state=Texas
async fn get_boundaries(
    State(state): State<AppState>,
    params: Result<Query<BoundaryParams>, QueryRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Query(params) = params?;
    let filter = parse_state(params.state.as_deref(), state.pipeline.data())?;
    let cache_key = format!("boundaries:{}", filter.label());

    if let Some(cached) = state.cache.get(&cache_key).await {
        return Ok(Json(cached));
    }

    let view = state.pipeline.boundaries(&filter);
    let result = serde_json::to_value(&view)
        .map_err(|e| AppError::Internal(format!("JSON serialization error: {}", e)))?;

    state.cache.insert(cache_key, result.clone()).await;

    Ok(Json(result))
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize, Debug, Default)]
struct ImpactParams {
    metric: Option<String>,
    power: Option<f64>,
    power_unit: Option<String>,
    water: Option<f64>,
    water_unit: Option<String>,
    state: Option<String>,
}

impl ImpactParams {
    fn into_query(self, data: &ReferenceData) -> Result<ImpactQuery, AppError> {
        let metric = match self.metric.as_deref() {
            None => ImpactMetric::default(),
            Some(key) => ImpactMetric::parse(key)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown metric: {}", key)))?,
        };

        let power_value = non_negative("power", self.power.unwrap_or(0.0))?;
        let water_value = non_negative("water", self.water.unwrap_or(0.0))?;

        let defaults = OnsiteInputs::default();
        let inputs = OnsiteInputs {
            power_value,
            power_unit: self.power_unit.unwrap_or(defaults.power_unit),
            water_value,
            water_unit: self.water_unit.unwrap_or(defaults.water_unit),
        };

        Ok(ImpactQuery {
            metric,
            inputs,
            state: parse_state(self.state.as_deref(), data)?,
        })
    }
}

#[derive(Deserialize, Debug)]
struct BoundaryParams {
    state: Option<String>,
}

fn non_negative(name: &str, value: f64) -> Result<f64, AppError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(AppError::BadRequest(format!(
            "'{}' must be a non-negative number, got {}",
            name, value
        )))
    }
}

fn parse_state(raw: Option<&str>, data: &ReferenceData) -> Result<StateFilter, AppError> {
    let filter = StateFilter::parse(raw.unwrap_or(""));
    match &filter {
        StateFilter::State(name) if !data.has_state(name) => {
            Err(AppError::NotFound(format!("Unknown state: {}", name)))
        }
        _ => Ok(filter),
    }
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
