use crate::{
    config::PollerConfig,
    error::{RelayError, Result},
    models::{JobStatus, RelayEnvelope, RelayRequest, StatusReport},
    relay::Relay,
};
use async_trait::async_trait;
use reqwest::Client;

pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to start image generation";
pub const STATUS_FAILED_MESSAGE: &str = "Failed to check status";

/// How the poller reaches the relay.
#[async_trait]
pub trait RelayApi: Send + Sync {
    async fn submit(&self, prompt: &str) -> Result<String>;
    async fn query_status(&self, task_id: &str) -> Result<StatusReport>;
}

/// Talks to a relay over HTTP.
#[derive(Clone)]
pub struct HttpRelayClient {
    client: Client,
    relay_url: String,
}

impl HttpRelayClient {
    pub fn new(relay_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            relay_url: relay_url.into(),
        }
    }

    pub fn from_config(config: &PollerConfig) -> Self {
        Self::new(config.relay_url.clone())
    }

    async fn post(&self, request: &RelayRequest, default_error: &str) -> Result<RelayEnvelope> {
        let response = self
            .client
            .post(&self.relay_url)
            .json(request)
            .send()
            .await
            .map_err(|e| RelayError::RequestError(format!("Relay request failed: {}", e)))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| RelayError::RequestError(format!("Failed to read relay response: {}", e)))?;

        let http_error = || {
            RelayError::ResponseError(format!("HTTP error! status: {}", status.as_u16()))
        };

        let envelope = match serde_json::from_str::<RelayEnvelope>(&raw) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => return Err(http_error()),
            Err(e) => {
                return Err(RelayError::ResponseError(format!(
                    "Malformed relay response: {}",
                    e
                )))
            }
        };

        let error = envelope.error.clone().filter(|error| !error.is_empty());
        match error {
            Some(message) if !envelope.success => Err(RelayError::ResponseError(message)),
            // JSON error pages that say nothing are reported by their status.
            None if !status.is_success() => Err(http_error()),
            None if !envelope.success => {
                Err(RelayError::ResponseError(default_error.to_string()))
            }
            _ => Ok(envelope),
        }
    }
}

pub(crate) fn report_from_envelope(envelope: RelayEnvelope) -> Result<StatusReport> {
    let status: JobStatus = envelope
        .status
        .as_deref()
        .ok_or_else(|| RelayError::ResponseError("Relay response carries no status".into()))?
        .parse::<JobStatus>()
        .map_err(|e| RelayError::ResponseError(e.to_string()))?;

    StatusReport::from_parts(status, envelope.image_url, envelope.failure)
        .map_err(|e| RelayError::ResponseError(e.to_string()))
}

#[async_trait]
impl RelayApi for HttpRelayClient {
    async fn submit(&self, prompt: &str) -> Result<String> {
        let envelope = self
            .post(&RelayRequest::generate(prompt), SUBMIT_FAILED_MESSAGE)
            .await?;
        envelope
            .task_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RelayError::ResponseError("Relay response carries no taskId".into()))
    }

    async fn query_status(&self, task_id: &str) -> Result<StatusReport> {
        let envelope = self
            .post(&RelayRequest::status(task_id), STATUS_FAILED_MESSAGE)
            .await?;
        report_from_envelope(envelope)
    }
}

/// Drives a relay in-process, without HTTP in between.
#[async_trait]
impl RelayApi for Relay {
    async fn submit(&self, prompt: &str) -> Result<String> {
        Relay::submit(self, prompt).await
    }

    async fn query_status(&self, task_id: &str) -> Result<StatusReport> {
        Relay::query_status(self, task_id).await
    }
}
