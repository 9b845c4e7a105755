//! Request-time classification pipeline
//!
//! assemble -> scale -> predict_all, over state built once at startup.

use crate::error::{ClassifyError, StartupError};
use crate::models::{PredictionResult, RawInputRecord};
use crate::predictor::{predict_all, scale, FeatureAssembler};
use crate::schema::ColumnSchema;
use crate::store::{ArtifactPaths, ModelStore};
use std::path::Path;
use std::sync::Arc;

/// Immutable schema, category map and models shared by all requests
#[derive(Debug)]
pub struct ClassificationPipeline {
    assembler: FeatureAssembler,
    store: ModelStore,
}

impl ClassificationPipeline {
    /// Combine a schema and model store, rejecting mismatched widths
    pub fn new(schema: ColumnSchema, store: ModelStore) -> Result<Self, StartupError> {
        store.check_consistency(schema.len())?;
        Ok(Self {
            assembler: FeatureAssembler::new(Arc::new(schema)),
            store,
        })
    }

    /// Load the schema file and every artifact, then check consistency
    pub fn load(schema_path: impl AsRef<Path>, paths: &ArtifactPaths) -> Result<Self, StartupError> {
        let schema = ColumnSchema::load(schema_path)?;
        let store = ModelStore::load(paths)?;
        Self::new(schema, store)
    }

    pub fn schema(&self) -> &ColumnSchema {
        self.assembler.schema()
    }

    pub fn assembler(&self) -> &FeatureAssembler {
        &self.assembler
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Classify one request with every served model
    pub fn classify(&self, raw: &RawInputRecord) -> Result<PredictionResult, ClassifyError> {
        let encoded = self.assembler.assemble(raw)?;
        let scaled = scale(&encoded, self.store.scaler()).map_err(ClassifyError::Scaling)?;
        predict_all(&encoded, &scaled, self.store.models())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConsistencyError, Stage};
    use crate::models::ModelId;
    use crate::predictor::{
        DecisionTree, FeatureScaler, Kernel, LogisticRegression, ModelDescriptor, RandomForest,
        StandardScaler, Svm,
    };

    const COLUMNS: [&str; 6] = [
        "duration",
        "src_bytes",
        "logged_in",
        "protocol_type_tcp",
        "service_http",
        "flag_SF",
    ];

    fn classes() -> Vec<String> {
        vec!["anomaly".to_string(), "normal".to_string()]
    }

    fn store(width: usize) -> ModelStore {
        let scaler = FeatureScaler::Standard(StandardScaler::new(vec![0.0; width], vec![1.0; width]));
        let logistic = LogisticRegression {
            classes: classes(),
            coef: vec![vec![1.0; width]],
            intercept: vec![-2.0],
        };
        // Splits on logged_in
        let forest = RandomForest {
            classes: classes(),
            n_features: width,
            trees: vec![DecisionTree {
                children_left: vec![1, -1, -1],
                children_right: vec![2, -1, -1],
                feature: vec![2, -2, -2],
                threshold: vec![0.5, -2.0, -2.0],
                value: vec![vec![3.0, 3.0], vec![3.0, 0.0], vec![0.0, 3.0]],
            }],
        };
        let svm = Svm {
            classes: classes(),
            kernel: Kernel::Linear,
            support_vectors: vec![vec![0.0; width], vec![1.0; width]],
            n_support: vec![1, 1],
            dual_coef: vec![vec![-1.0, 1.0]],
            intercept: vec![-1.0],
        };
        ModelStore::new(
            scaler,
            vec![
                ModelDescriptor::new(ModelId::LogisticRegression, Box::new(logistic)),
                ModelDescriptor::new(ModelId::RandomForest, Box::new(forest)),
                ModelDescriptor::new(ModelId::Svm, Box::new(svm)),
            ],
        )
    }

    fn pipeline() -> ClassificationPipeline {
        let schema = ColumnSchema::from_columns(COLUMNS).unwrap();
        ClassificationPipeline::new(schema, store(COLUMNS.len())).unwrap()
    }

    fn example_input() -> RawInputRecord {
        RawInputRecord::from_fields([
            ("duration", "0"),
            ("src_bytes", "181"),
            ("dst_bytes", "5450"),
            ("logged_in", "1"),
            ("wrong_fragment", "0"),
            ("same_srv_rate", "1.0"),
            ("srv_count", "8"),
            ("protocol_type", "tcp"),
            ("service", "http"),
            ("flag", "SF"),
        ])
    }

    #[test]
    fn test_example_yields_three_labels() {
        let result = pipeline().classify(&example_input()).unwrap();

        let keys: Vec<ModelId> = result.iter().map(|(id, _)| id).collect();
        assert_eq!(
            keys,
            vec![ModelId::LogisticRegression, ModelId::RandomForest, ModelId::Svm]
        );
        assert_eq!(result.get(ModelId::LogisticRegression), Some("normal"));
        assert_eq!(result.get(ModelId::RandomForest), Some("normal"));
        assert_eq!(result.get(ModelId::Svm), Some("normal"));
    }

    #[test]
    fn test_malformed_number_is_validation_failure() {
        let mut raw = example_input();
        raw.insert("duration", "abc");

        let err = pipeline().classify(&raw).unwrap_err();
        assert_eq!(err.stage(), Stage::Validation);
        assert_eq!(err.field(), Some("duration"));
    }

    #[test]
    fn test_missing_field_is_validation_failure() {
        let mut raw = example_input();
        raw.remove("wrong_fragment");

        let err = pipeline().classify(&raw).unwrap_err();
        assert_eq!(err.field(), Some("wrong_fragment"));
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_mismatched_widths_rejected_at_construction() {
        let schema = ColumnSchema::from_columns(COLUMNS).unwrap();
        let err = ClassificationPipeline::new(schema, store(COLUMNS.len() - 1)).unwrap_err();
        match err {
            StartupError::Consistency(ConsistencyError { expected, actual, .. }) => {
                assert_eq!(expected, COLUMNS.len());
                assert_eq!(actual, COLUMNS.len() - 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
