//! Network Connection Classifier CLI
//!
//! A command-line tool for classifying connection records, either through a
//! running netclass-server or in-process from the artifacts on disk, and for
//! inspecting those artifacts.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{inspect, predict, status};
use std::path::PathBuf;

/// Network Connection Classifier CLI
#[derive(Parser)]
#[command(name = "netclass")]
#[command(author, version, about = "CLI for the Network Connection Classifier", long_about = None)]
pub struct Cli {
    /// Server URL (can also be set via NETCLASS_API_URL env var)
    #[arg(long, env = "NETCLASS_API_URL")]
    pub api_url: Option<String>,

    /// Config file (defaults to ~/.config/netclass/config.json)
    #[arg(long, env = "NETCLASS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a connection record with a running server
    Predict {
        #[command(flatten)]
        fields: predict::FieldArgs,
    },

    /// Classify a connection record in-process from the local artifacts
    Classify {
        #[command(flatten)]
        artifacts: ArtifactArgs,

        #[command(flatten)]
        fields: predict::FieldArgs,
    },

    /// Load the local artifacts, check them and describe them
    Inspect {
        #[command(flatten)]
        artifacts: ArtifactArgs,
    },

    /// Show health and readiness of a running server
    Status,
}

#[derive(clap::Args)]
pub struct ArtifactArgs {
    /// Encoded column list
    #[arg(long, env = "NETCLASS_SCHEMA_PATH")]
    pub schema: Option<PathBuf>,

    /// Directory holding scaler.json and the model artifacts
    #[arg(long, env = "NETCLASS_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load(cli.config.as_deref())?;
    let format = cli
        .format
        .or_else(|| {
            config
                .default_format
                .as_deref()
                .and_then(output::OutputFormat::from_name)
        })
        .unwrap_or_default();

    match cli.command {
        Commands::Predict { fields } => {
            let client = client::ApiClient::new(&config.api_url(cli.api_url.as_deref()))?;
            predict::predict_remote(&client, &fields, format).await?;
        }
        Commands::Classify { artifacts, fields } => {
            predict::classify_local(
                &config.schema_path(artifacts.schema.as_deref()),
                &config.model_dir(artifacts.model_dir.as_deref()),
                &fields,
                format,
            )?;
        }
        Commands::Inspect { artifacts } => {
            inspect::inspect(
                &config.schema_path(artifacts.schema.as_deref()),
                &config.model_dir(artifacts.model_dir.as_deref()),
                format,
            )?;
        }
        Commands::Status => {
            let client = client::ApiClient::new(&config.api_url(cli.api_url.as_deref()))?;
            status::show_status(&client, format).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        output::print_error(&format!("{:#}", err));
        std::process::exit(1);
    }
}
