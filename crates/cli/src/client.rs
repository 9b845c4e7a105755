//! API client for communicating with netclass-server

use anyhow::{Context, Result};
use classifier_lib::health::{HealthResponse, ReadinessResponse};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// API client for netclass-server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request, returning the status code with the parsed body.
    /// Probe endpoints answer 503 with a meaningful body.
    pub async fn probe<T: DeserializeOwned>(&self, path: &str) -> Result<(u16, T)> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status().as_u16();
        let body = response.json().await.context("Failed to parse response")?;
        Ok((status, body))
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(error) => anyhow::bail!("{}", error),
                Err(_) => anyhow::bail!("API error ({}): {}", status, body),
            }
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn predict(&self, fields: &BTreeMap<String, String>) -> Result<PredictResponse> {
        self.post("api/v1/predict", fields).await
    }

    pub async fn health(&self) -> Result<(u16, HealthResponse)> {
        self.probe("healthz").await
    }

    pub async fn readiness(&self) -> Result<(u16, ReadinessResponse)> {
        self.probe("readyz").await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: BTreeMap<String, String>,
    pub majority: Option<String>,
    pub elapsed_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    pub status: u16,
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.stage, &self.field) {
            (Some(stage), Some(field)) => write!(
                f,
                "{} error on field `{}` ({}): {}",
                stage, field, self.status, self.error
            ),
            (Some(stage), None) => write!(f, "{} error ({}): {}", stage, self.status, self.error),
            _ => write!(f, "API error ({}): {}", self.status, self.error),
        }
    }
}
