//! Observability infrastructure for the classifier service
//!
//! Provides:
//! - Prometheus metrics (request latency, predictions by model and label,
//!   rejected requests by stage, loaded artifact info)
//! - Structured JSON logging with tracing

use crate::error::{ClassifyError, Stage};
use crate::models::PredictionResult;
use crate::store::ArtifactSummary;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for request latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ClassifierMetricsInner> = OnceLock::new();

struct ClassifierMetricsInner {
    request_latency_seconds: Histogram,
    requests_total: IntCounter,
    predictions_total: IntCounterVec,
    requests_rejected_total: IntCounterVec,
    schema_columns: IntGauge,
    model_info: GaugeVec,
}

impl ClassifierMetricsInner {
    fn new() -> Self {
        Self {
            request_latency_seconds: register_histogram!(
                "netclass_request_latency_seconds",
                "Time spent assembling, scaling and classifying one request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register request_latency_seconds"),

            requests_total: register_int_counter!(
                "netclass_requests_total",
                "Total number of classification requests received"
            )
            .expect("Failed to register requests_total"),

            predictions_total: register_int_counter_vec!(
                "netclass_predictions_total",
                "Labels predicted, by model",
                &["model", "label"]
            )
            .expect("Failed to register predictions_total"),

            requests_rejected_total: register_int_counter_vec!(
                "netclass_requests_rejected_total",
                "Requests that failed, by pipeline stage",
                &["stage"]
            )
            .expect("Failed to register requests_rejected_total"),

            schema_columns: register_int_gauge!(
                "netclass_schema_columns",
                "Number of columns in the loaded feature schema"
            )
            .expect("Failed to register schema_columns"),

            model_info: register_gauge_vec!(
                "netclass_model_info",
                "Information about the loaded models",
                &["model", "kind", "input"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Classifier metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct ClassifierMetrics {
    _private: (),
}

impl Default for ClassifierMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ClassifierMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ClassifierMetricsInner {
        GLOBAL_METRICS.get_or_init(ClassifierMetricsInner::new)
    }

    pub fn observe_request_latency(&self, duration_secs: f64) {
        self.inner().request_latency_seconds.observe(duration_secs);
    }

    pub fn inc_requests(&self) {
        self.inner().requests_total.inc();
    }

    /// Count one label per model from a successful request
    pub fn record_prediction(&self, result: &PredictionResult) {
        for (model, label) in result.iter() {
            self.inner()
                .predictions_total
                .with_label_values(&[model.as_str(), label])
                .inc();
        }
    }

    pub fn record_rejection(&self, err: &ClassifyError) {
        self.record_rejected_stage(err.stage());
    }

    pub fn record_rejected_stage(&self, stage: Stage) {
        self.inner()
            .requests_rejected_total
            .with_label_values(&[stage.as_str()])
            .inc();
    }

    pub fn set_schema_columns(&self, columns: usize) {
        self.inner().schema_columns.set(columns as i64);
    }

    /// Publish the loaded models, replacing any previous set
    pub fn set_model_info(&self, summaries: &[ArtifactSummary]) {
        self.inner().model_info.reset();
        for summary in summaries {
            let input = match summary.input {
                Some(crate::models::FeatureInput::Scaled) => "scaled",
                Some(crate::models::FeatureInput::Unscaled) => "unscaled",
                None => "none",
            };
            self.inner()
                .model_info
                .with_label_values(&[summary.name.as_str(), summary.kind, input])
                .set(summary.n_features as f64);
        }
    }
}

/// Structured logger for service events
///
/// Consistent field names for startup, predictions and rejections.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, schema_columns: usize, artifacts: &[ArtifactSummary]) {
        for artifact in artifacts {
            info!(
                event = "artifact_loaded",
                service = %self.service,
                name = %artifact.name,
                kind = artifact.kind,
                n_features = artifact.n_features,
                classes = ?artifact.classes,
                "Artifact ready"
            );
        }
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            schema_columns = schema_columns,
            artifacts = artifacts.len(),
            "Classifier service started"
        );
    }

    pub fn log_prediction(&self, result: &PredictionResult, elapsed_us: u64) {
        info!(
            event = "prediction_generated",
            service = %self.service,
            predictions = ?result,
            majority = ?result.majority(),
            elapsed_us = elapsed_us,
            "Generated predictions"
        );
    }

    /// Caller errors log at warn, deployment errors at error
    pub fn log_rejected(&self, err: &ClassifyError) {
        if err.is_caller_error() {
            warn!(
                event = "request_rejected",
                service = %self.service,
                stage = err.stage().as_str(),
                field = ?err.field(),
                error = %err,
                "Rejected invalid request"
            );
        } else {
            error!(
                event = "request_rejected",
                service = %self.service,
                stage = err.stage().as_str(),
                error = %err,
                "Classification failed"
            );
        }
    }

    /// Request body the server could not decode into fields
    pub fn log_malformed_body(&self, status: u16, reason: &str) {
        warn!(
            event = "request_rejected",
            service = %self.service,
            stage = Stage::Validation.as_str(),
            status = status,
            error = %reason,
            "Rejected unreadable request body"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Classifier service shutting down"
        );
    }
}
