use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;

use crate::config::ClientConfig;

/// A work as returned by the server.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Work {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub file_path: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(alias = "date")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug)]
pub struct UploadResponse {
    pub work: Work,
}

#[derive(Deserialize, Debug)]
struct ErrorResponse {
    error: String,
}

/// Blocking HTTP client bound to one server.
pub struct ServerClient {
    http: Client,
    base: String,
}

impl ServerClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base: config.server_url(),
        })
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

/// Pass successful responses through; turn others into an error carrying the
/// server's `{"error": ...}` message when there is one.
pub fn check_response(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(body) => Err(anyhow::anyhow!("{} failed ({}): {}", action, status, body.error)),
        Err(_) => Err(anyhow::anyhow!("{} failed: {}", action, status)),
    }
}
