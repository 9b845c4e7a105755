//! Core data models for the connection classifier

use crate::schema::ColumnSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Numeric measurements submitted with every request, in declared order
pub const NUMERIC_FIELDS: [NumericField; 7] = [
    NumericField::Duration,
    NumericField::SrcBytes,
    NumericField::DstBytes,
    NumericField::LoggedIn,
    NumericField::WrongFragment,
    NumericField::SameSrvRate,
    NumericField::SrvCount,
];

/// Categorical labels submitted with every request, in declared order
pub const CATEGORICAL_FIELDS: [CategoricalField; 3] = [
    CategoricalField::ProtocolType,
    CategoricalField::Service,
    CategoricalField::Flag,
];

/// Declared type of a numeric field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    Float,
    Integer,
}

/// A numeric request field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericField {
    Duration,
    SrcBytes,
    DstBytes,
    LoggedIn,
    WrongFragment,
    SameSrvRate,
    SrvCount,
}

impl NumericField {
    pub fn name(&self) -> &'static str {
        match self {
            NumericField::Duration => "duration",
            NumericField::SrcBytes => "src_bytes",
            NumericField::DstBytes => "dst_bytes",
            NumericField::LoggedIn => "logged_in",
            NumericField::WrongFragment => "wrong_fragment",
            NumericField::SameSrvRate => "same_srv_rate",
            NumericField::SrvCount => "srv_count",
        }
    }

    pub fn kind(&self) -> NumericKind {
        match self {
            NumericField::LoggedIn | NumericField::WrongFragment | NumericField::SrvCount => {
                NumericKind::Integer
            }
            _ => NumericKind::Float,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        NUMERIC_FIELDS.iter().copied().find(|f| f.name() == name)
    }
}

/// A categorical request field, one-hot encoded before inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoricalField {
    ProtocolType,
    Service,
    Flag,
}

impl CategoricalField {
    pub fn name(&self) -> &'static str {
        match self {
            CategoricalField::ProtocolType => "protocol_type",
            CategoricalField::Service => "service",
            CategoricalField::Flag => "flag",
        }
    }

    /// Prefix shared by every indicator column of this field
    pub fn column_prefix(&self) -> String {
        format!("{}_", self.name())
    }
}

/// Raw form fields as submitted by the caller, untyped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInputRecord {
    fields: HashMap<String, String>,
}

impl RawInputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.fields.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<HashMap<String, String>> for RawInputRecord {
    fn from(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }
}

/// Validated connection features for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub duration: f64,
    pub src_bytes: f64,
    pub dst_bytes: f64,
    pub logged_in: i64,
    pub wrong_fragment: i64,
    pub same_srv_rate: f64,
    pub srv_count: i64,
    pub protocol_type: String,
    pub service: String,
    pub flag: String,
}

impl ConnectionRecord {
    /// Numeric value of a field as fed to the models
    pub fn numeric(&self, field: NumericField) -> f64 {
        match field {
            NumericField::Duration => self.duration,
            NumericField::SrcBytes => self.src_bytes,
            NumericField::DstBytes => self.dst_bytes,
            NumericField::LoggedIn => self.logged_in as f64,
            NumericField::WrongFragment => self.wrong_fragment as f64,
            NumericField::SameSrvRate => self.same_srv_rate,
            NumericField::SrvCount => self.srv_count as f64,
        }
    }

    pub fn category(&self, field: CategoricalField) -> &str {
        match field {
            CategoricalField::ProtocolType => &self.protocol_type,
            CategoricalField::Service => &self.service,
            CategoricalField::Flag => &self.flag,
        }
    }
}

/// One-hot encoded record aligned to the expected column schema
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatureRecord {
    schema: Arc<ColumnSchema>,
    values: Vec<f64>,
}

impl EncodedFeatureRecord {
    pub(crate) fn new(schema: Arc<ColumnSchema>, values: Vec<f64>) -> Self {
        debug_assert_eq!(schema.len(), values.len());
        Self { schema, values }
    }

    pub fn columns(&self) -> &[String] {
        self.schema.columns()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a named column, `None` if the schema has no such column
    pub fn get(&self, column: &str) -> Option<f64> {
        self.schema.position(column).map(|idx| self.values[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.columns()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

/// Encoded values after the fitted scaler's forward transform
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledFeatureVector {
    values: Vec<f64>,
}

impl ScaledFeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Identifier of one of the three served models
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelId {
    LogisticRegression,
    RandomForest,
    Svm,
}

impl ModelId {
    pub const ALL: [ModelId; 3] = [ModelId::LogisticRegression, ModelId::RandomForest, ModelId::Svm];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::LogisticRegression => "logistic_regression",
            ModelId::RandomForest => "random_forest",
            ModelId::Svm => "svm",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ModelId::LogisticRegression => "Logistic Regression",
            ModelId::RandomForest => "Random Forest",
            ModelId::Svm => "SVM",
        }
    }

    /// Input the model was trained on; tree splits are scale-invariant so the
    /// forest was fit on unscaled features
    pub fn required_input(&self) -> FeatureInput {
        match self {
            ModelId::LogisticRegression | ModelId::Svm => FeatureInput::Scaled,
            ModelId::RandomForest => FeatureInput::Unscaled,
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which representation of the features a model consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureInput {
    Scaled,
    Unscaled,
}

/// Labels predicted by each model for a single request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredictionResult {
    labels: BTreeMap<ModelId, String>,
}

impl PredictionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, model: ModelId, label: impl Into<String>) {
        self.labels.insert(model, label.into());
    }

    pub fn get(&self, model: ModelId) -> Option<&str> {
        self.labels.get(&model).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModelId, &str)> {
        self.labels.iter().map(|(id, label)| (*id, label.as_str()))
    }

    /// Label predicted by a strict majority of models, if any
    pub fn majority(&self) -> Option<&str> {
        let mut votes: BTreeMap<&str, usize> = BTreeMap::new();
        for label in self.labels.values() {
            *votes.entry(label.as_str()).or_default() += 1;
        }
        votes
            .into_iter()
            .find(|(_, count)| count * 2 > self.labels.len())
            .map(|(label, _)| label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_field_lookup() {
        assert_eq!(NumericField::from_name("src_bytes"), Some(NumericField::SrcBytes));
        assert_eq!(NumericField::from_name("protocol_type"), None);
        assert_eq!(NumericField::SrvCount.kind(), NumericKind::Integer);
        assert_eq!(NumericField::SameSrvRate.kind(), NumericKind::Float);
    }

    #[test]
    fn test_prediction_result_serializes_by_model_name() {
        let mut result = PredictionResult::new();
        result.insert(ModelId::Svm, "normal");
        result.insert(ModelId::LogisticRegression, "normal");
        result.insert(ModelId::RandomForest, "anomaly");

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["logistic_regression"], "normal");
        assert_eq!(json["random_forest"], "anomaly");
        assert_eq!(json["svm"], "normal");
    }

    #[test]
    fn test_majority_label() {
        let mut result = PredictionResult::new();
        result.insert(ModelId::LogisticRegression, "anomaly");
        result.insert(ModelId::RandomForest, "normal");
        assert_eq!(result.majority(), None);

        result.insert(ModelId::Svm, "anomaly");
        assert_eq!(result.majority(), Some("anomaly"));
    }

    #[test]
    fn test_required_input_per_model() {
        assert_eq!(ModelId::LogisticRegression.required_input(), FeatureInput::Scaled);
        assert_eq!(ModelId::Svm.required_input(), FeatureInput::Scaled);
        assert_eq!(ModelId::RandomForest.required_input(), FeatureInput::Unscaled);
    }
}
