//! Model store
//!
//! Loads the fitted scaler and the three served models from JSON artifacts
//! once at startup. Everything here is read-only after `load` returns.
//!
//! Artifact layout:
//!
//! ```json
//! { "format_version": 1, "model": { "kind": "random_forest", ... } }
//! ```
//!
//! An optional `<artifact>.sha256` sidecar pins the artifact's digest.

use crate::error::{ConsistencyError, StartupError};
use crate::models::{FeatureInput, ModelId};
use crate::predictor::{
    Classifier, FeatureScaler, LogisticRegression, MinMaxScaler, ModelDescriptor, RandomForest,
    StandardScaler, Svm,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Artifact format version this build reads
pub const FORMAT_VERSION: u32 = 1;

/// File name of the scaler artifact inside a model directory
pub const SCALER_FILE: &str = "scaler.json";

/// Artifact kinds accepted in the scaler slot
const SCALER_KINDS: &str = "standard_scaler or min_max_scaler";

/// Serialized artifact envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub format_version: u32,
    pub model: ArtifactModel,
}

impl Artifact {
    pub fn new(model: ArtifactModel) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            model,
        }
    }
}

/// Parameters of one fitted object, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactModel {
    StandardScaler(StandardScaler),
    MinMaxScaler(MinMaxScaler),
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
    Svm(Svm),
}

impl ArtifactModel {
    pub fn kind(&self) -> &'static str {
        match self {
            ArtifactModel::StandardScaler(_) => "standard_scaler",
            ArtifactModel::MinMaxScaler(_) => "min_max_scaler",
            ArtifactModel::LogisticRegression(_) => "logistic_regression",
            ArtifactModel::RandomForest(_) => "random_forest",
            ArtifactModel::Svm(_) => "svm",
        }
    }
}

/// Only the version is read first so old or future artifacts fail with a
/// version error instead of a parse error
#[derive(Deserialize)]
struct ArtifactHeader {
    format_version: u32,
}

/// Locations of the four startup artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub scaler: PathBuf,
    pub logistic_regression: PathBuf,
    pub random_forest: PathBuf,
    pub svm: PathBuf,
}

impl ArtifactPaths {
    /// Conventional file names inside one directory
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            scaler: dir.join(SCALER_FILE),
            logistic_regression: dir.join(model_file_name(ModelId::LogisticRegression)),
            random_forest: dir.join(model_file_name(ModelId::RandomForest)),
            svm: dir.join(model_file_name(ModelId::Svm)),
        }
    }

    pub fn model(&self, id: ModelId) -> &Path {
        match id {
            ModelId::LogisticRegression => &self.logistic_regression,
            ModelId::RandomForest => &self.random_forest,
            ModelId::Svm => &self.svm,
        }
    }
}

/// Conventional artifact file name for a model
pub fn model_file_name(id: ModelId) -> String {
    format!("{}.json", id.as_str())
}

/// Summary of a loaded artifact for logs and inspection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactSummary {
    pub name: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<FeatureInput>,
    pub n_features: usize,
    pub classes: Vec<String>,
}

/// Fitted scaler and models, owned for the lifetime of the process
#[derive(Debug)]
pub struct ModelStore {
    scaler: FeatureScaler,
    models: Vec<ModelDescriptor>,
}

impl ModelStore {
    pub fn new(scaler: FeatureScaler, models: Vec<ModelDescriptor>) -> Self {
        Self { scaler, models }
    }

    /// Load every artifact; any failure is fatal
    pub fn load(paths: &ArtifactPaths) -> Result<Self, StartupError> {
        let scaler = match read_artifact(&paths.scaler)? {
            ArtifactModel::StandardScaler(s) => FeatureScaler::Standard(s),
            ArtifactModel::MinMaxScaler(s) => FeatureScaler::MinMax(s),
            other => {
                return Err(StartupError::KindMismatch {
                    path: paths.scaler.clone(),
                    expected: SCALER_KINDS,
                    found: other.kind(),
                })
            }
        };
        scaler
            .validate()
            .map_err(|reason| invalid(&paths.scaler, reason))?;
        info!(
            path = %paths.scaler.display(),
            kind = scaler.kind(),
            n_features = scaler.n_features(),
            "Loaded scaler artifact"
        );

        let mut models = Vec::with_capacity(ModelId::ALL.len());
        for id in ModelId::ALL {
            let path = paths.model(id);
            let model = load_model(id, path)?;
            info!(
                model = %id,
                path = %path.display(),
                n_features = model.n_features(),
                classes = ?model.classes(),
                "Loaded model artifact"
            );
            models.push(ModelDescriptor::new(id, model));
        }

        Ok(Self::new(scaler, models))
    }

    pub fn scaler(&self) -> &FeatureScaler {
        &self.scaler
    }

    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn model(&self, id: ModelId) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Verify the scaler and every model accept `width` columns
    pub fn check_consistency(&self, width: usize) -> Result<(), ConsistencyError> {
        if self.scaler.n_features() != width {
            return Err(ConsistencyError::width("scaler", width, self.scaler.n_features()));
        }
        for descriptor in &self.models {
            let n_features = descriptor.model.n_features();
            if n_features != width {
                return Err(ConsistencyError::width(
                    format!("model `{}`", descriptor.id),
                    width,
                    n_features,
                ));
            }
        }
        Ok(())
    }

    pub fn summaries(&self) -> Vec<ArtifactSummary> {
        let mut summaries = vec![ArtifactSummary {
            name: "scaler".to_string(),
            kind: self.scaler.kind(),
            input: None,
            n_features: self.scaler.n_features(),
            classes: Vec::new(),
        }];
        summaries.extend(self.models.iter().map(|d| ArtifactSummary {
            name: d.id.to_string(),
            kind: d.model.kind(),
            input: Some(d.input),
            n_features: d.model.n_features(),
            classes: d.model.classes().to_vec(),
        }));
        summaries
    }
}

fn load_model(id: ModelId, path: &Path) -> Result<Box<dyn Classifier>, StartupError> {
    let artifact = read_artifact(path)?;
    let (model, validation): (Box<dyn Classifier>, Result<(), String>) = match (id, artifact) {
        (ModelId::LogisticRegression, ArtifactModel::LogisticRegression(m)) => {
            let check = m.validate();
            (Box::new(m), check)
        }
        (ModelId::RandomForest, ArtifactModel::RandomForest(m)) => {
            let check = m.validate();
            (Box::new(m), check)
        }
        (ModelId::Svm, ArtifactModel::Svm(m)) => {
            let check = m.validate();
            (Box::new(m), check)
        }
        (id, other) => {
            return Err(StartupError::KindMismatch {
                path: path.to_path_buf(),
                expected: id.as_str(),
                found: other.kind(),
            })
        }
    };
    validation.map_err(|reason| invalid(path, reason))?;
    Ok(model)
}

/// Read, checksum, version-check and parse one artifact
pub fn read_artifact(path: &Path) -> Result<ArtifactModel, StartupError> {
    let bytes = std::fs::read(path).map_err(|source| StartupError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    verify_checksum(path, &bytes)?;

    let header: ArtifactHeader =
        serde_json::from_slice(&bytes).map_err(|source| StartupError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    if header.format_version != FORMAT_VERSION {
        return Err(StartupError::UnsupportedFormat {
            path: path.to_path_buf(),
            found: header.format_version,
            supported: FORMAT_VERSION,
        });
    }

    let artifact: Artifact =
        serde_json::from_slice(&bytes).map_err(|source| StartupError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(artifact.model)
}

/// Compute the lowercase hex SHA256 of artifact bytes
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Path of the optional checksum sidecar for an artifact
pub fn checksum_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".sha256");
    PathBuf::from(name)
}

fn verify_checksum(path: &Path, bytes: &[u8]) -> Result<(), StartupError> {
    let sidecar = checksum_path(path);
    let contents = match std::fs::read_to_string(&sidecar) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No checksum sidecar, skipping verification");
            return Ok(());
        }
        Err(source) => {
            return Err(StartupError::Read {
                path: sidecar,
                source,
            })
        }
    };

    // Accepts both a bare digest and `sha256sum` output
    let expected = contents
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();
    let actual = compute_checksum(bytes);
    if expected != actual {
        return Err(StartupError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected,
            actual,
        });
    }

    debug!(path = %path.display(), checksum = %actual, "Artifact checksum validated");
    Ok(())
}

fn invalid(path: &Path, reason: String) -> StartupError {
    StartupError::InvalidArtifact {
        path: path.to_path_buf(),
        reason,
    }
}
