//! Logistic regression inference

use super::{argmax, check_width, Classifier};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Fitted linear classifier
///
/// Binary models carry a single coefficient row whose positive side is
/// `classes[1]`; multiclass models carry one row per class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub classes: Vec<String>,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

impl LogisticRegression {
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.len() < 2 {
            return Err(format!("expected at least 2 classes, got {}", self.classes.len()));
        }
        let expected_rows = if self.classes.len() == 2 { 1 } else { self.classes.len() };
        if self.coef.len() != expected_rows {
            return Err(format!(
                "expected {} coefficient rows for {} classes, got {}",
                expected_rows,
                self.classes.len(),
                self.coef.len()
            ));
        }
        if self.intercept.len() != expected_rows {
            return Err(format!(
                "expected {} intercepts, got {}",
                expected_rows,
                self.intercept.len()
            ));
        }
        let width = self.coef[0].len();
        if width == 0 || self.coef.iter().any(|row| row.len() != width) {
            return Err("coefficient rows must be non-empty and equally wide".to_string());
        }
        Ok(())
    }

    /// Raw decision values, one per coefficient row
    pub fn decision_function(&self, features: &[f64]) -> Vec<f64> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| dot(row, features) + b)
            .collect()
    }

    /// Class probabilities in `classes` order
    pub fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let scores = self.decision_function(features);
        if self.classes.len() == 2 {
            let p = sigmoid(scores[0]);
            return vec![1.0 - p, p];
        }
        softmax(&scores)
    }
}

impl Classifier for LogisticRegression {
    fn predict(&self, features: &[f64]) -> Result<String> {
        check_width(self.n_features(), features)?;
        let scores = self.decision_function(features);
        let idx = if self.classes.len() == 2 {
            usize::from(scores[0] > 0.0)
        } else {
            argmax(&scores)
        };
        Ok(self.classes[idx].clone())
    }

    fn n_features(&self) -> usize {
        self.coef.first().map(Vec::len).unwrap_or(0)
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn kind(&self) -> &'static str {
        "logistic_regression"
    }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_model() -> LogisticRegression {
        LogisticRegression {
            classes: vec!["anomaly".to_string(), "normal".to_string()],
            coef: vec![vec![2.0, -1.0]],
            intercept: vec![0.5],
        }
    }

    #[test]
    fn test_binary_prediction() {
        let model = binary_model();
        assert!(model.validate().is_ok());
        assert_eq!(model.predict(&[1.0, 0.0]).unwrap(), "normal");
        assert_eq!(model.predict(&[-1.0, 1.0]).unwrap(), "anomaly");
    }

    #[test]
    fn test_binary_probabilities_sum_to_one() {
        let model = binary_model();
        let proba = model.predict_proba(&[0.3, 0.2]);
        assert_eq!(proba.len(), 2);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(proba[1] > 0.5);
    }

    #[test]
    fn test_multiclass_argmax() {
        let model = LogisticRegression {
            classes: vec!["dos".into(), "normal".into(), "probe".into()],
            coef: vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, -1.0]],
            intercept: vec![0.0, 0.0, 0.0],
        };
        assert!(model.validate().is_ok());
        assert_eq!(model.predict(&[2.0, 1.0]).unwrap(), "dos");
        assert_eq!(model.predict(&[0.0, 3.0]).unwrap(), "normal");
        assert_eq!(model.predict(&[-2.0, -2.0]).unwrap(), "probe");
    }

    #[test]
    fn test_width_mismatch_fails() {
        let model = binary_model();
        assert!(model.predict(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_validate_rejects_wrong_row_count() {
        let mut model = binary_model();
        model.coef.push(vec![0.0, 0.0]);
        assert!(model.validate().is_err());

        let mut model = binary_model();
        model.classes.truncate(1);
        assert!(model.validate().is_err());
    }
}
