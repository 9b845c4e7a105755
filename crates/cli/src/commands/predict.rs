//! Prediction commands, against a running server or the local artifacts

use anyhow::{Context, Result};
use clap::Args;
use classifier_lib::{
    models::{ModelId, RawInputRecord},
    pipeline::ClassificationPipeline,
    store::ArtifactPaths,
};
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_label, print_info, print_json, print_table, OutputFormat};

/// Connection fields; values are sent as typed and validated by the classifier
#[derive(Debug, Clone, Default, Args)]
pub struct FieldArgs {
    /// JSON file with some or all of the fields; flags override it
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    #[arg(long, allow_hyphen_values = true)]
    pub duration: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    pub src_bytes: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    pub dst_bytes: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    pub logged_in: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    pub wrong_fragment: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    pub same_srv_rate: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    pub srv_count: Option<String>,

    #[arg(long)]
    pub protocol_type: Option<String>,

    #[arg(long)]
    pub service: Option<String>,

    #[arg(long)]
    pub flag: Option<String>,
}

impl FieldArgs {
    /// Merge the input file and the flags into raw field values
    pub fn to_fields(&self) -> Result<BTreeMap<String, String>> {
        let mut fields = match &self.input {
            Some(path) => read_input_file(path)?,
            None => BTreeMap::new(),
        };

        let flags = [
            ("duration", &self.duration),
            ("src_bytes", &self.src_bytes),
            ("dst_bytes", &self.dst_bytes),
            ("logged_in", &self.logged_in),
            ("wrong_fragment", &self.wrong_fragment),
            ("same_srv_rate", &self.same_srv_rate),
            ("srv_count", &self.srv_count),
            ("protocol_type", &self.protocol_type),
            ("service", &self.service),
            ("flag", &self.flag),
        ];
        for (name, value) in flags {
            if let Some(value) = value {
                fields.insert(name.to_string(), value.clone());
            }
        }
        Ok(fields)
    }
}

fn read_input_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;
    let object: serde_json::Map<String, Value> = serde_json::from_str(&content)
        .with_context(|| format!("Input file {} is not a JSON object", path.display()))?;

    Ok(object
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect())
}

/// Row for the predictions table
#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Prediction")]
    prediction: String,
}

#[derive(Serialize)]
struct PredictionOutput<'a> {
    predictions: &'a BTreeMap<String, String>,
    majority: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_ms: Option<f64>,
}

fn display_name(model: &str) -> String {
    ModelId::ALL
        .into_iter()
        .find(|id| id.as_str() == model)
        .map(|id| id.display_name().to_string())
        .unwrap_or_else(|| model.to_string())
}

fn print_predictions(
    predictions: &BTreeMap<String, String>,
    majority: Option<&str>,
    elapsed_ms: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&PredictionOutput {
            predictions,
            majority,
            elapsed_ms,
        }),
        OutputFormat::Table => {
            let rows = predictions
                .iter()
                .map(|(model, label)| PredictionRow {
                    model: display_name(model),
                    prediction: color_label(label),
                })
                .collect();
            print_table(rows);

            match majority {
                Some(label) => println!("\nMajority: {}", color_label(label)),
                None => println!("\nMajority: {}", "no agreement".yellow()),
            }
            if let Some(ms) = elapsed_ms {
                print_info(&format!("Classified in {:.3} ms", ms));
            }
            Ok(())
        }
    }
}

/// Classify through a running server
pub async fn predict_remote(client: &ApiClient, args: &FieldArgs, format: OutputFormat) -> Result<()> {
    let fields = args.to_fields()?;
    let response = client.predict(&fields).await?;
    print_predictions(
        &response.predictions,
        response.majority.as_deref(),
        Some(response.elapsed_ms),
        format,
    )
}

/// Classify in-process with the artifacts on disk
pub fn classify_local(
    schema_path: &Path,
    model_dir: &Path,
    args: &FieldArgs,
    format: OutputFormat,
) -> Result<()> {
    let fields = args.to_fields()?;
    let pipeline = ClassificationPipeline::load(schema_path, &ArtifactPaths::in_dir(model_dir))
        .context("Failed to load classifier artifacts")?;

    let result = pipeline.classify(&RawInputRecord::from_fields(fields))?;

    let predictions: BTreeMap<String, String> = result
        .iter()
        .map(|(id, label)| (id.as_str().to_string(), label.to_string()))
        .collect();
    print_predictions(&predictions, result.majority(), None, format)
}
