//! ML prediction engine

mod aggregator;
mod features;
mod forest;
mod linear;
mod scaler;
mod svm;

pub use aggregator::{predict_all, ModelDescriptor};
pub use features::FeatureAssembler;
pub use forest::{DecisionTree, RandomForest};
pub use linear::LogisticRegression;
pub use scaler::{scale, FeatureScaler, MinMaxScaler, StandardScaler};
pub use svm::{Kernel, Svm};

use anyhow::{bail, Result};

/// Trait for classifier implementations
pub trait Classifier: Send + Sync {
    /// Predict a single label for one row of features
    fn predict(&self, features: &[f64]) -> Result<String>;

    /// Number of input columns the model was fit on
    fn n_features(&self) -> usize;

    /// Labels the model can emit
    fn classes(&self) -> &[String];

    /// Artifact kind of the model
    fn kind(&self) -> &'static str;
}

fn check_width(expected: usize, features: &[f64]) -> Result<()> {
    if features.len() != expected {
        bail!(
            "model expects {} features, got {}",
            expected,
            features.len()
        );
    }
    Ok(())
}

/// Index of the largest value; the first one wins ties
fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold(0, |best, (idx, v)| if *v > values[best] { idx } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_first_wins_ties() {
        assert_eq!(argmax(&[0.2, 0.5, 0.5]), 1);
        assert_eq!(argmax(&[1.0]), 0);
    }

    #[test]
    fn test_check_width() {
        assert!(check_width(2, &[1.0, 2.0]).is_ok());
        assert!(check_width(3, &[1.0, 2.0]).is_err());
    }
}
