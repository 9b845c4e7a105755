//! Support vector machine inference
//!
//! Evaluates a kernel SVM from its support vectors and dual coefficients.
//! Multiclass models use one-vs-one voting over every class pair.

use super::linear::dot;
use super::{check_width, Classifier};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Kernel function with its fitted parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kernel {
    /// k(x, y) = x·y
    Linear,
    /// k(x, y) = exp(-γ||x-y||²)
    Rbf { gamma: f64 },
    /// k(x, y) = (γ x·y + coef0)^degree
    Poly { gamma: f64, coef0: f64, degree: i32 },
    /// k(x, y) = tanh(γ x·y + coef0)
    Sigmoid { gamma: f64, coef0: f64 },
}

impl Kernel {
    #[inline]
    pub fn apply(&self, x: &[f64], y: &[f64]) -> f64 {
        match *self {
            Kernel::Linear => dot(x, y),
            Kernel::Rbf { gamma } => {
                let sq_dist: f64 = x.iter().zip(y).map(|(a, b)| (a - b) * (a - b)).sum();
                (-gamma * sq_dist).exp()
            }
            Kernel::Poly { gamma, coef0, degree } => (gamma * dot(x, y) + coef0).powi(degree),
            Kernel::Sigmoid { gamma, coef0 } => (gamma * dot(x, y) + coef0).tanh(),
        }
    }
}

/// Fitted kernel SVM classifier
///
/// `support_vectors` are grouped by class with `n_support[c]` vectors for
/// class `c`. `dual_coef` has one row per class but the last, and
/// `intercept` one value per class pair in `(0,1), (0,2), .., (1,2), ..`
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Svm {
    pub classes: Vec<String>,
    pub kernel: Kernel,
    pub support_vectors: Vec<Vec<f64>>,
    pub n_support: Vec<usize>,
    pub dual_coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

impl Svm {
    pub fn validate(&self) -> Result<(), String> {
        let n_classes = self.classes.len();
        if n_classes < 2 {
            return Err(format!("expected at least 2 classes, got {}", n_classes));
        }
        if self.n_support.len() != n_classes {
            return Err(format!(
                "n_support has {} entries for {} classes",
                self.n_support.len(),
                n_classes
            ));
        }
        let n_sv: usize = self.n_support.iter().sum();
        if n_sv == 0 || n_sv != self.support_vectors.len() {
            return Err(format!(
                "n_support sums to {}, found {} support vectors",
                n_sv,
                self.support_vectors.len()
            ));
        }
        let width = self.support_vectors[0].len();
        if width == 0 || self.support_vectors.iter().any(|sv| sv.len() != width) {
            return Err("support vectors must be non-empty and equally wide".to_string());
        }
        if self.dual_coef.len() != n_classes - 1 || self.dual_coef.iter().any(|row| row.len() != n_sv) {
            return Err(format!(
                "dual_coef must be {} rows of {} coefficients",
                n_classes - 1,
                n_sv
            ));
        }
        let n_pairs = n_classes * (n_classes - 1) / 2;
        if self.intercept.len() != n_pairs {
            return Err(format!(
                "expected {} intercepts, got {}",
                n_pairs,
                self.intercept.len()
            ));
        }
        Ok(())
    }

    /// Decision values, one per class pair
    pub fn decision_function(&self, features: &[f64]) -> Vec<f64> {
        let kernel: Vec<f64> = self
            .support_vectors
            .iter()
            .map(|sv| self.kernel.apply(sv, features))
            .collect();

        if self.classes.len() == 2 {
            let sum: f64 = self.dual_coef[0].iter().zip(&kernel).map(|(a, k)| a * k).sum();
            return vec![sum + self.intercept[0]];
        }

        let starts: Vec<usize> = self
            .n_support
            .iter()
            .scan(0, |acc, n| {
                let start = *acc;
                *acc += n;
                Some(start)
            })
            .collect();

        let n_classes = self.classes.len();
        let mut decisions = Vec::with_capacity(self.intercept.len());
        let mut pair = 0;
        for i in 0..n_classes {
            for j in (i + 1)..n_classes {
                let class_i = starts[i]..starts[i] + self.n_support[i];
                let class_j = starts[j]..starts[j] + self.n_support[j];
                let sum_i: f64 = class_i.map(|k| self.dual_coef[j - 1][k] * kernel[k]).sum();
                let sum_j: f64 = class_j.map(|k| self.dual_coef[i][k] * kernel[k]).sum();
                decisions.push(sum_i + sum_j + self.intercept[pair]);
                pair += 1;
            }
        }
        decisions
    }
}

impl Classifier for Svm {
    fn predict(&self, features: &[f64]) -> Result<String> {
        check_width(self.n_features(), features)?;
        let decisions = self.decision_function(features);

        if self.classes.len() == 2 {
            let idx = usize::from(decisions[0] > 0.0);
            return Ok(self.classes[idx].clone());
        }

        let n_classes = self.classes.len();
        let mut votes = vec![0usize; n_classes];
        let mut pair = 0;
        for i in 0..n_classes {
            for j in (i + 1)..n_classes {
                if decisions[pair] > 0.0 {
                    votes[i] += 1;
                } else {
                    votes[j] += 1;
                }
                pair += 1;
            }
        }
        // Ties go to the lowest class index
        let winner = votes
            .iter()
            .enumerate()
            .fold(0, |best, (idx, v)| if *v > votes[best] { idx } else { best });
        Ok(self.classes[winner].clone())
    }

    fn n_features(&self) -> usize {
        self.support_vectors.first().map(Vec::len).unwrap_or(0)
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn kind(&self) -> &'static str {
        "svm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_linear() -> Svm {
        Svm {
            classes: vec!["anomaly".to_string(), "normal".to_string()],
            kernel: Kernel::Linear,
            support_vectors: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            n_support: vec![1, 1],
            dual_coef: vec![vec![-1.0, 1.0]],
            intercept: vec![0.0],
        }
    }

    #[test]
    fn test_binary_linear_prediction() {
        let svm = binary_linear();
        assert!(svm.validate().is_ok());
        assert_eq!(svm.predict(&[0.0, 2.0]).unwrap(), "normal");
        assert_eq!(svm.predict(&[2.0, 0.0]).unwrap(), "anomaly");
    }

    #[test]
    fn test_rbf_kernel() {
        let kernel = Kernel::Rbf { gamma: 0.5 };
        assert!((kernel.apply(&[1.0, 1.0], &[1.0, 1.0]) - 1.0).abs() < 1e-12);
        let expected = (-0.5f64 * 2.0).exp();
        assert!((kernel.apply(&[0.0, 0.0], &[1.0, 1.0]) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_poly_and_sigmoid_kernels() {
        let poly = Kernel::Poly { gamma: 1.0, coef0: 1.0, degree: 2 };
        assert_eq!(poly.apply(&[1.0, 2.0], &[3.0, 4.0]), 144.0);
        let sigmoid = Kernel::Sigmoid { gamma: 1.0, coef0: 0.0 };
        assert_eq!(sigmoid.apply(&[0.0], &[5.0]), 0.0);
    }

    #[test]
    fn test_multiclass_one_vs_one_voting() {
        // One support vector per class; each pair decides by which vector is closer
        let svm = Svm {
            classes: vec!["a".into(), "b".into(), "c".into()],
            kernel: Kernel::Rbf { gamma: 1.0 },
            support_vectors: vec![vec![0.0, 0.0], vec![5.0, 0.0], vec![0.0, 5.0]],
            n_support: vec![1, 1, 1],
            dual_coef: vec![vec![1.0, -1.0, -1.0], vec![1.0, 1.0, -1.0]],
            intercept: vec![0.0, 0.0, 0.0],
        };
        assert!(svm.validate().is_ok());
        assert_eq!(svm.decision_function(&[0.0, 0.0]).len(), 3);
        assert_eq!(svm.predict(&[0.1, 0.1]).unwrap(), "a");
        assert_eq!(svm.predict(&[4.9, 0.0]).unwrap(), "b");
        assert_eq!(svm.predict(&[0.0, 4.9]).unwrap(), "c");
    }

    #[test]
    fn test_validate_rejects_inconsistent_support() {
        let mut svm = binary_linear();
        svm.n_support = vec![2, 1];
        assert!(svm.validate().is_err());

        let mut svm = binary_linear();
        svm.intercept = vec![0.0, 1.0];
        assert!(svm.validate().is_err());
    }

    #[test]
    fn test_kernel_deserializes_tagged() {
        let kernel: Kernel = serde_json::from_str(r#"{"type":"rbf","gamma":0.25}"#).unwrap();
        assert_eq!(kernel, Kernel::Rbf { gamma: 0.25 });
        let kernel: Kernel = serde_json::from_str(r#"{"type":"linear"}"#).unwrap();
        assert_eq!(kernel, Kernel::Linear);
    }
}
