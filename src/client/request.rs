use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use super::error::ClientError;
use crate::models::AnalysisResult;

/// HTTP client for the analysis service's `POST /analyze`.
#[derive(Debug, Clone)]
pub struct AnalyzeClient {
    http: reqwest::Client,
    endpoint: String,
}

impl AnalyzeClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn analyze_url(&self) -> String {
        format!("{}/analyze", self.endpoint)
    }

    /// Send one analysis request for `repo_url` (as typed, untrimmed).
    ///
    /// The body is decoded into [`AnalysisResult`] here, so a payload of the
    /// wrong shape is reported as a request failure rather than reaching the
    /// renderer.
    pub async fn analyze(&self, repo_url: &str) -> Result<AnalysisResult, ClientError> {
        let url = self.analyze_url();
        debug!(%url, %repo_url, "sending analysis request");

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "repo_url": repo_url }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::http_status(status.as_u16()));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| ClientError::request(format!("Invalid analysis response: {e}")))
    }
}
