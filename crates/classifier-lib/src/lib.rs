//! Classifier library for network connection records
//!
//! This crate provides the core functionality for:
//! - Loading the encoded feature schema and fitted model artifacts
//! - Validating and one-hot encoding raw connection records
//! - Scaling and classifying with logistic regression, random forest and SVM
//! - Health checks and observability

pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod predictor;
pub mod schema;
pub mod store;

pub use error::{ClassifyError, ConsistencyError, Stage, StartupError, ValidationError};
pub use health::{
    HealthRegistry, HealthResponse, HealthStatus, LoadedArtifacts, PredictorHealth,
    ReadinessResponse,
};
pub use models::*;
pub use observability::{ClassifierMetrics, StructuredLogger};
pub use pipeline::ClassificationPipeline;
pub use schema::ColumnSchema;
pub use store::{ArtifactPaths, ArtifactSummary, ModelStore};
