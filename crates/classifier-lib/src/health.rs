//! Health and readiness of the classifier service
//!
//! Readiness follows artifact loading. Health follows the prediction path:
//! a failure inside the service (scaling or a model) degrades it until the
//! next request classifies cleanly. Caller errors never touch it.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Serving, but the last request failed inside the service
    Degraded,
}

/// Artifacts the server is answering with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedArtifacts {
    pub schema_columns: usize,
    /// Artifact names, scaler included
    pub names: Vec<String>,
    pub loaded_timestamp: i64,
}

/// Failure history of the prediction path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictorHealth {
    pub consecutive_failures: u64,
    pub total_failures: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure_timestamp: Option<i64>,
}

impl PredictorHealth {
    pub fn status(&self) -> HealthStatus {
        if self.consecutive_failures > 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<LoadedArtifacts>,
    pub predictor: PredictorHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct HealthState {
    artifacts: Option<LoadedArtifacts>,
    predictor: PredictorHealth,
}

/// Health registry shared between the request handlers and the health endpoints
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<HealthState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the artifacts in use; the service is ready from here on
    pub async fn mark_loaded(&self, schema_columns: usize, names: Vec<String>) {
        let mut state = self.state.write().await;
        state.artifacts = Some(LoadedArtifacts {
            schema_columns,
            names,
            loaded_timestamp: chrono::Utc::now().timestamp(),
        });
    }

    /// A request classified cleanly
    pub async fn record_success(&self) {
        // Write lock only when recovering
        if self.state.read().await.predictor.consecutive_failures == 0 {
            return;
        }
        self.state.write().await.predictor.consecutive_failures = 0;
    }

    /// A request failed inside the service
    pub async fn record_failure(&self, error: impl Into<String>) {
        let mut state = self.state.write().await;
        let predictor = &mut state.predictor;
        predictor.consecutive_failures += 1;
        predictor.total_failures += 1;
        predictor.last_error = Some(error.into());
        predictor.last_failure_timestamp = Some(chrono::Utc::now().timestamp());
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        HealthResponse {
            status: state.predictor.status(),
            artifacts: state.artifacts.clone(),
            predictor: state.predictor.clone(),
        }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        if self.state.read().await.artifacts.is_some() {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        } else {
            ReadinessResponse {
                ready: false,
                reason: Some("Artifacts not yet loaded".to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_registry_initial_state() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, HealthStatus::Healthy);
        assert!(health.artifacts.is_none());
        assert_eq!(health.predictor, PredictorHealth::default());
    }

    #[tokio::test]
    async fn test_failure_degrades_and_keeps_error() {
        let registry = HealthRegistry::new();
        registry.record_failure("model `svm` failed").await;
        registry.record_failure("model `svm` failed again").await;

        let health = registry.health().await;
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.predictor.consecutive_failures, 2);
        assert_eq!(health.predictor.total_failures, 2);
        assert_eq!(
            health.predictor.last_error.as_deref(),
            Some("model `svm` failed again")
        );
        assert!(health.predictor.last_failure_timestamp.is_some());
    }

    #[tokio::test]
    async fn test_success_recovers_but_keeps_history() {
        let registry = HealthRegistry::new();
        registry.record_failure("scaling failed").await;
        registry.record_success().await;

        let health = registry.health().await;
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.predictor.consecutive_failures, 0);
        assert_eq!(health.predictor.total_failures, 1);
        assert_eq!(health.predictor.last_error.as_deref(), Some("scaling failed"));
    }

    #[tokio::test]
    async fn test_success_on_healthy_predictor_is_a_no_op() {
        let registry = HealthRegistry::new();
        registry.record_success().await;

        assert_eq!(registry.health().await.predictor, PredictorHealth::default());
    }

    #[tokio::test]
    async fn test_readiness_not_ready_until_loaded() {
        let registry = HealthRegistry::new();
        let readiness = registry.readiness().await;

        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Artifacts not yet loaded"));
    }

    #[tokio::test]
    async fn test_loaded_artifacts_reported() {
        let registry = HealthRegistry::new();
        registry
            .mark_loaded(26, vec!["scaler".to_string(), "svm".to_string()])
            .await;

        assert!(registry.readiness().await.ready);
        let artifacts = registry.health().await.artifacts.unwrap();
        assert_eq!(artifacts.schema_columns, 26);
        assert_eq!(artifacts.names, vec!["scaler", "svm"]);
    }

    #[tokio::test]
    async fn test_readiness_ready_while_degraded() {
        let registry = HealthRegistry::new();
        registry.mark_loaded(26, Vec::new()).await;
        registry.record_failure("failed").await;

        assert!(registry.readiness().await.ready);
        assert_eq!(registry.health().await.status, HealthStatus::Degraded);
    }
}
