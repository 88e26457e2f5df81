//! HTTP API.
//!
//! | Method | Path                                    | Body / Response           |
//! |--------|-----------------------------------------|---------------------------|
//! | GET    | `/health`                               | `{status, version}`       |
//! | POST   | `/metrics/cumulative-layout-shift`      | trace in, `MetricReport`  |
//! | GET    | `/metrics/cache`                        | `CacheStats`              |
//!
//! Handlers share one cached metric behind an async mutex. The lock covers
//! cache lookups and inserts only; keys are derived and metrics computed
//! outside it.
//!
//! Every failure is answered with an [`ErrorBody`]. Malformed requests get
//! `400` with `INVALID_REQUEST`, or `INVALID_THROTTLING_METHOD` when only the
//! throttling method is unknown.

use crate::input::warn_if_unordered;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shiftscore_core::{
    ArtifactKey, AuditContext, CacheStats, ComputedMetric, CumulativeLayoutShift, Metric,
    MetricComputationData, MetricError, MetricReport, MetricResult, Settings, ThrottlingMethod,
    TraceEvent,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    cls: Arc<Mutex<ComputedMetric<CumulativeLayoutShift>>>,
}

impl AppState {
    /// State with a result cache of `cache_size` entries.
    #[must_use]
    pub fn new(cache_size: usize) -> Self {
        Self {
            cls: Arc::new(Mutex::new(ComputedMetric::with_capacity(
                CumulativeLayoutShift,
                cache_size,
            ))),
        }
    }
}

/// Body of a metric request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeRequest {
    /// Ordered main-thread events.
    pub main_thread_events: Vec<TraceEvent>,
    /// Audit settings; defaults to simulated throttling.
    #[serde(default)]
    pub settings: Settings,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error body returned for failed requests.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// A request or metric failure mapped onto an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// The body is not valid JSON or does not match [`ComputeRequest`].
    InvalidRequest(String),
    Metric(MetricError),
}

impl ApiError {
    /// Stable error code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Metric(err) => err.code(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::Metric(MetricError::InvalidThrottlingMethod(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Metric(MetricError::NoLayoutShift) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Metric(MetricError::CacheKey(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MetricError> for ApiError {
    fn from(err: MetricError) -> Self {
        Self::Metric(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::InvalidRequest(message) => message.clone(),
            Self::Metric(err) => err.to_string(),
        };
        let body = ErrorBody {
            code: self.code().to_string(),
            message,
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Decode a request body.
///
/// An unknown `settings.throttlingMethod` string is reported as
/// [`MetricError::InvalidThrottlingMethod`] rather than a generic shape error.
pub fn parse_request(body: Value) -> Result<ComputeRequest, ApiError> {
    if let Some(method) = body
        .pointer("/settings/throttlingMethod")
        .and_then(Value::as_str)
    {
        method.parse::<ThrottlingMethod>()?;
    }
    serde_json::from_value(body).map_err(|err| ApiError::InvalidRequest(err.to_string()))
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            &format!("/metrics/{}", CumulativeLayoutShift::NAME),
            post(compute_cls),
        )
        .route("/metrics/cache", get(cache_stats))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn compute_cls(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MetricReport>, ApiError> {
    let request = body
        .map_err(ApiError::from)
        .and_then(|Json(body)| parse_request(body))
        .inspect_err(|err| warn!(code = err.code(), "rejected request"))?;

    let data = MetricComputationData::new(request.main_thread_events);
    let context = AuditContext::new(request.settings);
    warn_if_unordered(&data, "request");

    let result = cached_compute(&state, &data, &context)
        .await
        .inspect_err(|err| {
            warn!(code = err.code(), events = data.main_thread_events.len(), "metric failed");
        })?;

    let report = MetricReport::new(
        &CumulativeLayoutShift,
        context.settings.throttling_method,
        &data,
        result,
    );
    info!(timing = report.timing, shifts = report.layout_shift_events, "served metric");
    Ok(Json(report))
}

async fn cached_compute(
    state: &AppState,
    data: &MetricComputationData,
    context: &AuditContext,
) -> Result<MetricResult, MetricError> {
    let key = ArtifactKey::for_request(data, &context.settings)?;
    let cached = state.cls.lock().await.lookup(&key);
    if let Some(cached) = cached {
        return Ok(cached);
    }

    let result = CumulativeLayoutShift.compute(data, context)?;
    state.cls.lock().await.remember(key, result);
    Ok(result)
}

async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cls.lock().await.stats())
}
