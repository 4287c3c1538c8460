//! HTTP adapter to an already-running automation bridge service.
//!
//! The bridge wraps the actual browser driver and keeps the browser alive
//! between calls (daemon model). This adapter never starts, installs, or
//! supervises the service.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{AutomationBackend, PageState};
use webpilot_core::config::BridgeConfig;
use webpilot_core::{Error, Result};
use webpilot_providers::Provider;

pub struct HttpBridge {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    instruction: &'a str,
    model: &'a str,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    #[serde(default)]
    output: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StateResponse {
    #[serde(default)]
    url: String,
    #[serde(default)]
    screenshot: Option<String>,
}

impl HttpBridge {
    pub fn new(config: &BridgeConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build bridge HTTP client, using default");
                Client::new()
            });
        Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AutomationBackend for HttpBridge {
    async fn run(
        &self,
        instruction: &str,
        reasoner: Arc<dyn Provider>,
        timeout: Duration,
    ) -> Result<String> {
        let url = format!("{}/run", self.endpoint);
        let request = RunRequest {
            instruction,
            model: reasoner.model(),
            timeout_secs: timeout.as_secs(),
        };

        info!(
            endpoint = %self.endpoint,
            model = %reasoner.model(),
            instruction_len = instruction.len(),
            "Dispatching instruction to automation bridge"
        );

        let response = self
            .client
            .post(&url)
            // The run call may legitimately take the whole budget; give the
            // transport a little headroom beyond it.
            .timeout(timeout + Duration::from_secs(5))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("Bridge request failed: {}", e)))?;

        let status = response.status();
        let raw_body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(Error::Backend(format!(
                "Bridge error {}: {}",
                status, raw_body
            )));
        }

        let run: RunResponse = serde_json::from_str(&raw_body)
            .map_err(|e| Error::Backend(format!("Bad bridge response: {}", e)))?;

        if let Some(err) = run.error {
            return Err(Error::Backend(err));
        }

        Ok(run.output)
    }

    async fn capture_state(&self) -> Result<PageState> {
        let url = format!("{}/state", self.endpoint);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("State capture failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Backend(format!("State capture error {}", status)));
        }

        let state: StateResponse = response
            .json()
            .await
            .map_err(|e| Error::Backend(format!("Bad state response: {}", e)))?;

        debug!(url = %state.url, has_screenshot = state.screenshot.is_some(), "Captured browser state");

        Ok(PageState {
            url: state.url,
            screenshot_ref: state.screenshot,
        })
    }

    async fn reset(&self) -> Result<()> {
        let url = format!("{}/reset", self.endpoint);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("Reset failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Backend(format!(
                "Reset error {}",
                response.status()
            )));
        }

        info!("Browser state reset");
        Ok(())
    }
}
