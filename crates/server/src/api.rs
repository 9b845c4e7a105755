//! HTTP API: browser form, prediction endpoints, health checks and
//! Prometheus metrics

use crate::page;
use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use classifier_lib::{
    error::{ClassifyError, Stage},
    health::HealthRegistry,
    models::{PredictionResult, RawInputRecord},
    observability::{ClassifierMetrics, StructuredLogger},
    pipeline::ClassificationPipeline,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Shared application state
pub struct AppState {
    pub pipeline: Arc<ClassificationPipeline>,
    pub health_registry: HealthRegistry,
    pub metrics: ClassifierMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        pipeline: Arc<ClassificationPipeline>,
        health_registry: HealthRegistry,
        metrics: ClassifierMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            pipeline,
            health_registry,
            metrics,
            logger,
        }
    }
}

/// Structured error response
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    stage: Option<Stage>,
    field: Option<&'static str>,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            stage: None,
            field: None,
        }
    }
}

impl From<ClassifyError> for ApiError {
    fn from(err: ClassifyError) -> Self {
        let status = if err.is_caller_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.to_string(),
            stage: Some(err.stage()),
            field: err.field(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "stage": self.stage,
            "field": self.field,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

/// JSON prediction response
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub predictions: PredictionResult,
    pub majority: Option<String>,
    pub elapsed_ms: f64,
}

/// Run one request through the pipeline, recording metrics, logs and health
async fn classify(
    state: &AppState,
    raw: &RawInputRecord,
) -> Result<(PredictionResult, f64), ApiError> {
    state.metrics.inc_requests();
    let start = Instant::now();

    match state.pipeline.classify(raw) {
        Ok(result) => {
            let elapsed = start.elapsed();
            state.metrics.observe_request_latency(elapsed.as_secs_f64());
            state.metrics.record_prediction(&result);
            state
                .logger
                .log_prediction(&result, elapsed.as_micros() as u64);

            state.health_registry.record_success().await;

            Ok((result, elapsed.as_secs_f64() * 1000.0))
        }
        Err(err) => {
            state.metrics.record_rejection(&err);
            state.logger.log_rejected(&err);
            if !err.is_caller_error() {
                state.health_registry.record_failure(err.to_string()).await;
            }
            Err(err.into())
        }
    }
}

/// Body that never reached the pipeline; answered like any other validation error
fn malformed_body(state: &AppState, status: StatusCode, reason: String) -> ApiError {
    state.metrics.inc_requests();
    state.metrics.record_rejected_stage(Stage::Validation);
    state.logger.log_malformed_body(status.as_u16(), &reason);
    ApiError {
        status,
        message: reason,
        stage: Some(Stage::Validation),
        field: None,
    }
}

/// Input form
async fn index() -> Html<String> {
    Html(page::render(None, None))
}

/// Form submission, answered with the page and the three predictions
async fn predict_form(
    State(state): State<Arc<AppState>>,
    payload: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Result<Html<String>, ApiError> {
    let Form(fields) =
        payload.map_err(|r| malformed_body(&state, r.status(), r.body_text()))?;
    let raw = RawInputRecord::from(fields);
    let (result, _) = classify(&state, &raw).await?;
    Ok(Html(page::render(Some(&raw), Some(&result))))
}

/// JSON submission; numbers and strings are both accepted
async fn predict_json(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(body) = payload.map_err(|r| malformed_body(&state, r.status(), r.body_text()))?;
    let raw = raw_from_json(body);
    let (predictions, elapsed_ms) = classify(&state, &raw).await?;
    let majority = predictions.majority().map(str::to_string);

    Ok(Json(PredictResponse {
        predictions,
        majority,
        elapsed_ms,
    }))
}

/// Null values count as missing fields
fn raw_from_json(body: Map<String, Value>) -> RawInputRecord {
    let fields: BTreeMap<String, String> = body
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect();
    RawInputRecord::from_fields(fields)
}

/// Health check response - 200 while serving; a degraded predictor shows in the body
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.health_registry.health().await))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::internal(format!("Failed to encode metrics: {}", e)))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict_form))
        .route("/api/v1/predict", post(predict_json))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve(
    addr: &str,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use classifier_lib::error::ValidationError;

    #[test]
    fn test_raw_from_json_stringifies_numbers() {
        let body = json!({"duration": 0, "same_srv_rate": 1.5, "flag": "SF", "service": null});
        let raw = raw_from_json(body.as_object().unwrap().clone());

        assert_eq!(raw.get("duration"), Some("0"));
        assert_eq!(raw.get("same_srv_rate"), Some("1.5"));
        assert_eq!(raw.get("flag"), Some("SF"));
        assert_eq!(raw.get("service"), None);
    }

    #[test]
    fn test_validation_error_maps_to_bad_request() {
        let err: ClassifyError = ValidationError::MissingField { field: "flag" }.into();
        let api: ApiError = err.into();

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.stage, Some(Stage::Validation));
        assert_eq!(api.field, Some("flag"));
    }

    #[test]
    fn test_prediction_error_maps_to_internal() {
        let err = ClassifyError::Prediction {
            model: classifier_lib::models::ModelId::Svm,
            reason: "boom".to_string(),
        };
        let api: ApiError = err.into();

        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.stage, Some(Stage::Prediction));
        assert_eq!(api.field, None);
    }
}
