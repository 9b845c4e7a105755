//! Server health and readiness

use anyhow::Result;
use chrono::{TimeZone, Utc};
use classifier_lib::health::{HealthResponse, HealthStatus};
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{color_status, print_json, print_warning, OutputFormat};

fn status_name(status: HealthStatus) -> &'static str {
    match status {
        HealthStatus::Healthy => "healthy",
        HealthStatus::Degraded => "degraded",
    }
}

fn format_timestamp(secs: i64) -> String {
    Utc.timestamp_opt(secs, 0)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

fn print_health(health: &HealthResponse) {
    println!("Health:    {}", color_status(status_name(health.status)));

    if let Some(artifacts) = &health.artifacts {
        println!("Schema:    {} columns", artifacts.schema_columns);
        println!("Artifacts: {}", artifacts.names.join(", ").cyan());
        println!("Loaded:    {}", format_timestamp(artifacts.loaded_timestamp));
    }

    let predictor = &health.predictor;
    println!(
        "Failures:  {} consecutive, {} total",
        predictor.consecutive_failures, predictor.total_failures
    );
    if let Some(error) = &predictor.last_error {
        let when = predictor
            .last_failure_timestamp
            .map(format_timestamp)
            .unwrap_or_default();
        println!("Last error ({}): {}", when, error.red());
    }
}

/// Show health and readiness of a running server
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let (_, health) = client.health().await?;
    let (_, readiness) = client.readiness().await?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "health": health,
            "readiness": readiness,
        })),
        OutputFormat::Table => {
            println!("{}", "Server Status".bold());
            println!("{}", "=".repeat(60));
            let ready = if readiness.ready { "ready" } else { "not ready" };
            println!("Readiness: {}", color_status(ready));
            if let Some(reason) = &readiness.reason {
                print_warning(reason);
            }
            print_health(&health);
            Ok(())
        }
    }
}
