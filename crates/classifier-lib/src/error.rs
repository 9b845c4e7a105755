//! Error types for startup, validation and prediction failures

use crate::models::ModelId;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that prevent the service from becoming ready
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid schema file {path:?}: {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },

    #[error("failed to parse artifact {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("artifact {path:?} has format version {found}, supported version is {supported}")]
    UnsupportedFormat {
        path: PathBuf,
        found: u32,
        supported: u32,
    },

    #[error("artifact {path:?} holds a `{found}` model, expected `{expected}`")]
    KindMismatch {
        path: PathBuf,
        expected: &'static str,
        found: &'static str,
    },

    #[error("checksum mismatch for {path:?}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("invalid artifact {path:?}: {reason}")]
    InvalidArtifact { path: PathBuf, reason: String },

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
}

/// Structural problems with an expected column list
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("no columns listed")]
    Empty,

    #[error("column `{0}` listed more than once")]
    DuplicateColumn(String),
}

/// Schema, scaler and model widths disagree; a deployment error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{component} expects {expected} features, got {actual}")]
pub struct ConsistencyError {
    pub component: String,
    pub expected: usize,
    pub actual: usize,
}

impl ConsistencyError {
    pub fn width(component: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self {
            component: component.into(),
            expected,
            actual,
        }
    }
}

/// Caller supplied a missing or malformed field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("field `{field}` must be {expected}, got {value:?}")]
    InvalidNumber {
        field: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("field `{field}` must not be empty")]
    EmptyCategory { field: &'static str },
}

impl ValidationError {
    /// Name of the offending form field
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::InvalidNumber { field, .. }
            | ValidationError::EmptyCategory { field } => *field,
        }
    }
}

/// Pipeline stage at which a request failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Validation,
    Scaling,
    Prediction,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validation => "validation",
            Stage::Scaling => "scaling",
            Stage::Prediction => "prediction",
        }
    }
}

/// Outcome of a failed classification request
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("scaling failed: {0}")]
    Scaling(#[source] ConsistencyError),

    #[error("model `{model}` failed: {reason}")]
    Prediction { model: ModelId, reason: String },
}

impl ClassifyError {
    pub fn stage(&self) -> Stage {
        match self {
            ClassifyError::Validation(_) => Stage::Validation,
            ClassifyError::Scaling(_) => Stage::Scaling,
            ClassifyError::Prediction { .. } => Stage::Prediction,
        }
    }

    /// Offending form field, for validation failures
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ClassifyError::Validation(e) => Some(e.field()),
            _ => None,
        }
    }

    /// True when the caller, not the deployment, is at fault
    pub fn is_caller_error(&self) -> bool {
        matches!(self, ClassifyError::Validation(_))
    }
}
