use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::CallbackConfig;
use crate::pipeline::AnalysisResult;

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("Callback request failed: {0}")]
    Request(String),
    #[error("Callback returned HTTP {0}")]
    Status(u16),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload<'a> {
    pub analysis_id: &'a str,
    pub results: &'a AnalysisResult,
}

/// Receiver of finished analyses.
pub trait ResultSink: Send + Sync {
    fn deliver(&self, payload: &CallbackPayload<'_>) -> Result<(), CallbackError>;
}

/// Posts results to the application's webhook with a bearer secret.
pub struct WebhookCallback {
    client: reqwest::blocking::Client,
    url: String,
    secret: String,
}

impl WebhookCallback {
    pub fn new(app_url: &str, config: &CallbackConfig, secret: String) -> Result<Self, CallbackError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CallbackError::Request(e.to_string()))?;

        Ok(Self {
            client,
            url: callback_url(app_url, &config.path),
            secret,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

pub fn callback_url(app_url: &str, path: &str) -> String {
    format!("{}/{}", app_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

impl ResultSink for WebhookCallback {
    fn deliver(&self, payload: &CallbackPayload<'_>) -> Result<(), CallbackError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.secret)
            .json(payload)
            .send()
            .map_err(|e| CallbackError::Request(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(CallbackError::Status(status.as_u16()));
        }
        Ok(())
    }
}
