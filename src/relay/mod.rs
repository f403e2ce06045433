#[cfg(feature = "server")]
pub mod server;

use crate::{
    error::{RelayError, Result},
    models::{
        ErrorResponse, GenerateResponse, GenerationRequest, RelayRequest, RelayResponse,
        StatusReport, ACTION_GENERATE, ACTION_STATUS,
    },
    provider::ImageProvider,
};
use reqwest::StatusCode;
use std::sync::Arc;
use uuid::Uuid;

/// Status code and JSON body produced for one relay request.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayReply {
    pub status: StatusCode,
    pub body: RelayResponse,
}

impl RelayReply {
    fn ok(body: RelayResponse) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    fn error(err: &RelayError) -> Self {
        Self {
            status: err.status_code(),
            body: RelayResponse::Error(ErrorResponse::new(err.to_string())),
        }
    }
}

/// Stateless forwarder between clients and an [`ImageProvider`].
#[derive(Clone)]
pub struct Relay {
    provider: Arc<dyn ImageProvider>,
}

impl Relay {
    pub fn new(provider: Arc<dyn ImageProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn submit(&self, prompt: &str) -> Result<String> {
        let request = GenerationRequest::new(prompt)?;
        self.provider.submit(&request).await
    }

    pub async fn query_status(&self, task_id: &str) -> Result<StatusReport> {
        if task_id.trim().is_empty() {
            return Err(RelayError::ValidationError("Missing taskId".into()));
        }
        self.provider.fetch(task_id).await
    }

    /// Dispatches a raw POST body to the requested action.
    pub async fn handle(&self, body: &[u8]) -> RelayReply {
        let request_id = Uuid::new_v4();
        log::debug!(
            "📬 [{}] Raw request body: {}",
            request_id,
            String::from_utf8_lossy(body)
        );

        match self.dispatch(body).await {
            Ok(response) => RelayReply::ok(response),
            Err(err) => {
                match &err {
                    RelayError::InvalidAction => {
                        log::warn!("⚠️  [{}] Rejected request: {}", request_id, err)
                    }
                    _ => log::error!("🔥 [{}] Request failed: {}", request_id, err),
                }
                RelayReply::error(&err)
            }
        }
    }

    async fn dispatch(&self, body: &[u8]) -> Result<RelayResponse> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(RelayError::ValidationError("Request body is empty".into()));
        }

        let request: RelayRequest = serde_json::from_slice(body)
            .map_err(|e| RelayError::ValidationError(format!("Invalid request body: {}", e)))?;

        match request.action.as_deref() {
            Some(ACTION_GENERATE) => {
                let prompt = request.prompt.unwrap_or_default();
                let task_id = self.submit(&prompt).await?;
                log::info!("✅ Generation started with task id {}", task_id);
                Ok(RelayResponse::Generate(GenerateResponse {
                    success: true,
                    task_id,
                }))
            }
            Some(ACTION_STATUS) => {
                let task_id = request.task_id.unwrap_or_default();
                let report = self.query_status(&task_id).await?;
                log::info!("📦 Task {} is {}", task_id, report.status());
                Ok(RelayResponse::Status((&report).into()))
            }
            _ => Err(RelayError::InvalidAction),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::JobStatus;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory provider that hands out scripted answers and records what it saw.
    #[derive(Default)]
    pub(crate) struct ScriptedProvider {
        pub submits: AtomicUsize,
        pub fetched: Mutex<Vec<String>>,
        pub reject_submit: bool,
    }

    #[async_trait]
    impl ImageProvider for ScriptedProvider {
        async fn submit(&self, _request: &GenerationRequest) -> Result<String> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            if self.reject_submit {
                return Err(RelayError::UpstreamError(
                    "Failed to start image generation: {\"error\":\"quota\"}".into(),
                ));
            }
            Ok("abc123".to_string())
        }

        async fn fetch(&self, task_id: &str) -> Result<StatusReport> {
            self.fetched.lock().unwrap().push(task_id.to_string());
            match task_id {
                "abc123" => Ok(StatusReport::complete("https://x/img.png")),
                "pending" => Ok(StatusReport::pending()),
                _ => Err(RelayError::NotFoundError(format!(
                    "Generation job with ID {} not found.",
                    task_id
                ))),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn relay() -> (Relay, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider::default());
        (Relay::new(provider.clone()), provider)
    }

    fn body_json(reply: &RelayReply) -> serde_json::Value {
        serde_json::to_value(&reply.body).unwrap()
    }

    #[tokio::test]
    async fn generate_returns_task_id() {
        let (relay, _) = relay();
        let reply = relay
            .handle(br#"{"action":"generate","prompt":"a red bicycle"}"#)
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(body_json(&reply), json!({ "success": true, "taskId": "abc123" }));
    }

    #[tokio::test]
    async fn blank_prompt_never_reaches_provider() {
        let (relay, provider) = relay();
        let reply = relay.handle(br#"{"action":"generate","prompt":"   "}"#).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(&reply),
            json!({ "success": false, "error": "Prompt is required" })
        );

        let reply = relay.handle(br#"{"action":"generate"}"#).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(provider.submits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn status_forwards_task_id_unchanged() {
        let (relay, provider) = relay();
        let reply = relay.handle(br#"{"action":"status","taskId":"abc123"}"#).await;
        assert_eq!(
            body_json(&reply),
            json!({
                "success": true,
                "status": "COMPLETE",
                "imageUrl": "https://x/img.png",
                "failure": null
            })
        );
        assert_eq!(*provider.fetched.lock().unwrap(), vec!["abc123".to_string()]);
    }

    #[tokio::test]
    async fn missing_task_id_is_a_validation_error() {
        let (relay, provider) = relay();
        let reply = relay.handle(br#"{"action":"status"}"#).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(&reply)["error"], "Missing taskId");
        assert!(provider.fetched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_string_fields_read_as_missing() {
        let (relay, provider) = relay();
        let reply = relay.handle(br#"{"action":"status","taskId":123}"#).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(&reply),
            json!({ "success": false, "error": "Missing taskId" })
        );

        let reply = relay.handle(br#"{"action":"generate","prompt":42}"#).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(&reply),
            json!({ "success": false, "error": "Prompt is required" })
        );
        assert!(provider.fetched.lock().unwrap().is_empty());
        assert_eq!(provider.submits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_job_maps_to_500() {
        let (relay, _) = relay();
        let reply = relay.handle(br#"{"action":"status","taskId":"zzz"}"#).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(&reply),
            json!({ "success": false, "error": "Generation job with ID zzz not found." })
        );
    }

    #[tokio::test]
    async fn unknown_or_missing_action_is_400() {
        let (relay, _) = relay();
        for body in [
            br#"{"action":"delete","taskId":"abc123"}"#.as_slice(),
            br#"{"prompt":"a red bicycle"}"#.as_slice(),
            br#"{"action":5}"#.as_slice(),
            br#"{"action":null,"taskId":"abc123"}"#.as_slice(),
            br#"{"action":{"name":"status"}}"#.as_slice(),
        ] {
            let reply = relay.handle(body).await;
            assert_eq!(reply.status, StatusCode::BAD_REQUEST);
            assert_eq!(
                body_json(&reply),
                json!({ "success": false, "error": "Invalid action" })
            );
        }
    }

    #[tokio::test]
    async fn empty_and_malformed_bodies_are_500() {
        let (relay, _) = relay();
        let reply = relay.handle(b"").await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(&reply)["error"], "Request body is empty");

        let reply = relay.handle(b"not json").await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(&reply)["success"], false);
    }

    #[tokio::test]
    async fn provider_rejection_surfaces_message() {
        let provider = Arc::new(ScriptedProvider {
            reject_submit: true,
            ..Default::default()
        });
        let relay = Relay::new(provider);
        let err = relay.submit("a red bicycle").await.unwrap_err();
        assert!(matches!(err, RelayError::UpstreamError(_)));
        assert!(err.to_string().contains("quota"));
    }

    #[tokio::test]
    async fn pending_report_has_no_image() {
        let (relay, _) = relay();
        let report = relay.query_status("pending").await.unwrap();
        assert_eq!(report.status(), JobStatus::Pending);
        assert_eq!(report.image_url(), None);
    }
}
