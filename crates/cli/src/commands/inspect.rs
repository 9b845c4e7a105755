//! Artifact inspection

use anyhow::{Context, Result};
use classifier_lib::{
    models::CATEGORICAL_FIELDS,
    pipeline::ClassificationPipeline,
    store::{checksum_path, compute_checksum, ArtifactPaths, ArtifactSummary},
};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tabled::Tabled;

use crate::output::{format_bytes, print_json, print_success, print_table, OutputFormat};

/// Row for the artifacts table
#[derive(Tabled)]
struct ArtifactRow {
    #[tabled(rename = "Artifact")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Input")]
    input: String,
    #[tabled(rename = "Features")]
    n_features: usize,
    #[tabled(rename = "Classes")]
    classes: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "SHA256")]
    checksum: String,
}

#[derive(Serialize)]
struct ArtifactReport {
    #[serde(flatten)]
    summary: ArtifactSummary,
    path: PathBuf,
    size_bytes: u64,
    sha256: String,
    pinned: bool,
}

#[derive(Serialize)]
struct InspectReport {
    schema_path: PathBuf,
    schema_columns: usize,
    columns: Vec<String>,
    /// Categories with an indicator column; any other value encodes as the reference
    categories: BTreeMap<String, Vec<String>>,
    artifacts: Vec<ArtifactReport>,
}

fn artifact_path(paths: &ArtifactPaths, name: &str) -> PathBuf {
    match name {
        "logistic_regression" => paths.logistic_regression.clone(),
        "random_forest" => paths.random_forest.clone(),
        "svm" => paths.svm.clone(),
        _ => paths.scaler.clone(),
    }
}

/// Load every artifact, run the startup checks and describe the result
pub fn inspect(schema_path: &Path, model_dir: &Path, format: OutputFormat) -> Result<()> {
    let paths = ArtifactPaths::in_dir(model_dir);
    let pipeline = ClassificationPipeline::load(schema_path, &paths)
        .context("Artifacts failed the startup checks")?;

    let mut artifacts = Vec::new();
    for summary in pipeline.store().summaries() {
        let path = artifact_path(&paths, &summary.name);
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        artifacts.push(ArtifactReport {
            size_bytes: bytes.len() as u64,
            sha256: compute_checksum(&bytes),
            pinned: checksum_path(&path).exists(),
            path,
            summary,
        });
    }

    let categories = CATEGORICAL_FIELDS
        .into_iter()
        .map(|field| {
            let known = pipeline.assembler().known_categories(field);
            (
                field.name().to_string(),
                known.into_iter().map(str::to_string).collect(),
            )
        })
        .collect();

    let report = InspectReport {
        schema_path: schema_path.to_path_buf(),
        schema_columns: pipeline.schema().len(),
        columns: pipeline.schema().columns().to_vec(),
        categories,
        artifacts,
    };

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => {
            println!("{}", "Classifier Artifacts".bold());
            println!("{}", "=".repeat(60));
            println!("Schema:  {}", report.schema_path.display().to_string().cyan());
            println!("Columns: {}", report.schema_columns);
            for (field, known) in &report.categories {
                let listed = if known.is_empty() {
                    "-".to_string()
                } else {
                    known.join(", ")
                };
                println!("  {:<14} {}", field, listed.dimmed());
            }
            println!();

            let rows = report
                .artifacts
                .iter()
                .map(|a| ArtifactRow {
                    name: a.summary.name.clone(),
                    kind: a.summary.kind.to_string(),
                    input: match a.summary.input {
                        Some(input) => format!("{:?}", input).to_lowercase(),
                        None => "-".to_string(),
                    },
                    n_features: a.summary.n_features,
                    classes: a.summary.classes.join(", "),
                    size: format_bytes(a.size_bytes),
                    checksum: format!(
                        "{}{}",
                        &a.sha256[..12],
                        if a.pinned { " (pinned)" } else { "" }
                    ),
                })
                .collect();
            print_table(rows);

            println!();
            print_success("All artifacts agree on the schema width");
            Ok(())
        }
    }
}
