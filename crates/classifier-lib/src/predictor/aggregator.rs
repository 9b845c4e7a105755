//! Fans one request out to every served model and collects the labels

use super::Classifier;
use crate::error::ClassifyError;
use crate::models::{
    EncodedFeatureRecord, FeatureInput, ModelId, PredictionResult, ScaledFeatureVector,
};
use std::time::Instant;
use tracing::debug;

/// A loaded model together with the input representation it consumes
pub struct ModelDescriptor {
    pub id: ModelId,
    pub input: FeatureInput,
    pub model: Box<dyn Classifier>,
}

impl ModelDescriptor {
    /// Descriptor declaring the input the model was trained on
    pub fn new(id: ModelId, model: Box<dyn Classifier>) -> Self {
        Self {
            id,
            input: id.required_input(),
            model,
        }
    }
}

impl std::fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("id", &self.id)
            .field("input", &self.input)
            .field("kind", &self.model.kind())
            .field("n_features", &self.model.n_features())
            .finish()
    }
}

/// Run every model on the representation its descriptor declares
///
/// All-or-nothing: the first model failure fails the whole request.
pub fn predict_all(
    encoded: &EncodedFeatureRecord,
    scaled: &ScaledFeatureVector,
    models: &[ModelDescriptor],
) -> Result<PredictionResult, ClassifyError> {
    let mut result = PredictionResult::new();

    for descriptor in models {
        let features = match descriptor.input {
            FeatureInput::Scaled => scaled.values(),
            FeatureInput::Unscaled => encoded.values(),
        };

        let start = Instant::now();
        let label = descriptor
            .model
            .predict(features)
            .map_err(|e| ClassifyError::Prediction {
                model: descriptor.id,
                reason: format!("{:#}", e),
            })?;

        debug!(
            model = %descriptor.id,
            label = %label,
            elapsed_us = start.elapsed().as_micros() as u64,
            "Model prediction completed"
        );
        result.insert(descriptor.id, label);
    }

    Ok(result)
}
