//! Fitted feature scalers
//!
//! Parameters are learned at training time and only ever applied here.

use crate::error::ConsistencyError;
use crate::models::{EncodedFeatureRecord, ScaledFeatureVector};
use serde::{Deserialize, Serialize};

/// Standardization: `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub n_features: usize,
    #[serde(default)]
    pub mean: Option<Vec<f64>>,
    #[serde(default)]
    pub scale: Option<Vec<f64>>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self {
            n_features: mean.len(),
            mean: Some(mean),
            scale: Some(scale),
        }
    }

    fn transform_value(&self, idx: usize, x: f64) -> f64 {
        let centered = match &self.mean {
            Some(mean) => x - mean[idx],
            None => x,
        };
        match &self.scale {
            // Zero variance columns were left unscaled at fit time
            Some(scale) if scale[idx] != 0.0 => centered / scale[idx],
            _ => centered,
        }
    }
}

/// Range scaling: `x * scale + min`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub scale: Vec<f64>,
    pub min: Vec<f64>,
}

/// A fitted scaler loaded from an artifact
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureScaler {
    Standard(StandardScaler),
    MinMax(MinMaxScaler),
}

impl FeatureScaler {
    /// Number of columns the scaler was fit on
    pub fn n_features(&self) -> usize {
        match self {
            FeatureScaler::Standard(s) => s.n_features,
            FeatureScaler::MinMax(s) => s.scale.len(),
        }
    }

    /// Check parameter vectors agree on width
    pub fn validate(&self) -> Result<(), String> {
        match self {
            FeatureScaler::Standard(s) => {
                for (name, params) in [("mean", &s.mean), ("scale", &s.scale)] {
                    if let Some(values) = params {
                        if values.len() != s.n_features {
                            return Err(format!(
                                "{} has {} values, n_features is {}",
                                name,
                                values.len(),
                                s.n_features
                            ));
                        }
                    }
                }
                Ok(())
            }
            FeatureScaler::MinMax(s) => {
                if s.min.len() != s.scale.len() {
                    return Err(format!(
                        "min has {} values, scale has {}",
                        s.min.len(),
                        s.scale.len()
                    ));
                }
                Ok(())
            }
        }
    }

    /// Apply the forward transform column by column
    pub fn transform(&self, values: &[f64]) -> Result<Vec<f64>, ConsistencyError> {
        if values.len() != self.n_features() {
            return Err(ConsistencyError::width("scaler", self.n_features(), values.len()));
        }
        let scaled = match self {
            FeatureScaler::Standard(s) => values
                .iter()
                .enumerate()
                .map(|(idx, x)| s.transform_value(idx, *x))
                .collect(),
            FeatureScaler::MinMax(s) => values
                .iter()
                .zip(s.scale.iter().zip(s.min.iter()))
                .map(|(x, (scale, min))| x * scale + min)
                .collect(),
        };
        Ok(scaled)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FeatureScaler::Standard(_) => "standard_scaler",
            FeatureScaler::MinMax(_) => "min_max_scaler",
        }
    }
}

/// Scale a schema-aligned record
pub fn scale(
    record: &EncodedFeatureRecord,
    scaler: &FeatureScaler,
) -> Result<ScaledFeatureVector, ConsistencyError> {
    scaler.transform(record.values()).map(ScaledFeatureVector::new)
}
