//! Random forest inference
//!
//! Trees are stored as the parallel node arrays exported by the training
//! library. A sample moves to the left child when `x[feature] <= threshold`
//! and stops at a node whose left child is `-1`. Features are rounded to
//! `f32` before the comparison, as the trees were fit on `f32` inputs.

use super::{argmax, check_width, Classifier};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

const LEAF: i64 = -1;

/// A single fitted decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights; only leaves are read
    pub value: Vec<Vec<f64>>,
}

impl DecisionTree {
    fn node_count(&self) -> usize {
        self.children_left.len()
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        let n = self.node_count();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return Err(format!("node arrays disagree on length, expected {}", n));
        }

        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == LEAF {
                if right != LEAF {
                    return Err(format!("node {} has only a right child", node));
                }
                let weights = &self.value[node];
                if weights.len() != n_classes {
                    return Err(format!(
                        "leaf {} has {} class weights, expected {}",
                        node,
                        weights.len(),
                        n_classes
                    ));
                }
                continue;
            }
            // Children always follow their parent, which rules out cycles
            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    return Err(format!("node {} points to invalid child {}", node, child));
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(format!("node {} splits on invalid feature {}", node, feature));
            }
        }
        Ok(())
    }

    /// Leaf class weights reached by a sample
    pub fn leaf_value(&self, features: &[f64]) -> &[f64] {
        let mut node = 0usize;
        while self.children_left[node] != LEAF {
            let x = features[self.feature[node] as usize] as f32 as f64;
            node = if x <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        &self.value[node]
    }
}

/// Fitted tree ensemble classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub classes: Vec<String>,
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.len() < 2 {
            return Err(format!("expected at least 2 classes, got {}", self.classes.len()));
        }
        if self.n_features == 0 {
            return Err("n_features must be positive".to_string());
        }
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .map_err(|e| format!("tree {}: {}", idx, e))?;
        }
        Ok(())
    }

    /// Mean of the per-tree normalized leaf distributions
    pub fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let weights = tree.leaf_value(features);
            let total: f64 = weights.iter().sum();
            if total <= 0.0 {
                continue;
            }
            for (p, w) in proba.iter_mut().zip(weights) {
                *p += w / total;
            }
        }
        let n_trees = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n_trees);
        proba
    }
}

impl Classifier for RandomForest {
    fn predict(&self, features: &[f64]) -> Result<String> {
        check_width(self.n_features, features)?;
        let proba = self.predict_proba(features);
        if proba.iter().all(|p| *p == 0.0) {
            bail!("every tree reached an empty leaf");
        }
        Ok(self.classes[argmax(&proba)].clone())
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn kind(&self) -> &'static str {
        "random_forest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Splits on feature 0 at 0.5: left leaf favours class 0
    fn stump(left: [f64; 2], right: [f64; 2]) -> DecisionTree {
        DecisionTree {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![0, -2, -2],
            threshold: vec![0.5, -2.0, -2.0],
            value: vec![vec![5.0, 5.0], left.to_vec(), right.to_vec()],
        }
    }

    fn forest() -> RandomForest {
        RandomForest {
            classes: vec!["anomaly".to_string(), "normal".to_string()],
            n_features: 2,
            trees: vec![stump([8.0, 2.0], [1.0, 9.0]), stump([6.0, 4.0], [3.0, 7.0])],
        }
    }

    #[test]
    fn test_forest_prediction() {
        let forest = forest();
        assert!(forest.validate().is_ok());
        assert_eq!(forest.predict(&[0.0, 100.0]).unwrap(), "anomaly");
        assert_eq!(forest.predict(&[1.0, 100.0]).unwrap(), "normal");
    }

    #[test]
    fn test_threshold_is_inclusive_left() {
        let forest = forest();
        assert_eq!(forest.predict(&[0.5, 0.0]).unwrap(), "anomaly");
    }

    #[test]
    fn test_features_compared_at_f32_precision() {
        // 2^24 + 1 rounds down to 2^24 in f32
        let tree = DecisionTree {
            threshold: vec![16_777_216.5, -2.0, -2.0],
            ..stump([1.0, 0.0], [0.0, 1.0])
        };
        assert_eq!(tree.leaf_value(&[16_777_217.0]), &[1.0, 0.0]);
        assert_eq!(tree.leaf_value(&[16_777_218.0]), &[0.0, 1.0]);
    }

    #[test]
    fn test_probabilities_are_averaged() {
        let forest = forest();
        let proba = forest.predict_proba(&[0.0, 0.0]);
        assert!((proba[0] - 0.7).abs() < 1e-12);
        assert!((proba[1] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_backward_child() {
        let mut forest = forest();
        forest.trees[0].children_left[0] = 0;
        assert!(forest.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_feature() {
        let mut forest = forest();
        forest.trees[1].feature[0] = 7;
        assert!(forest.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_wrong_leaf_width() {
        let mut forest = forest();
        forest.trees[0].value[1] = vec![1.0];
        assert!(forest.validate().is_err());
    }

    #[test]
    fn test_width_mismatch_fails() {
        assert!(forest().predict(&[0.0]).is_err());
    }
}
