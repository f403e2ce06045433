use crate::{
    config::LeonardoConfig,
    error::{RelayError, Result},
    logger,
    models::{
        GenerationRequest, JobStatus, LeonardoGenerationRequest, LeonardoGenerationResponse,
        LeonardoStatusResponse, StatusReport,
    },
    provider::traits::ImageProvider,
};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::Value;

pub const LEONARDO_FAILURE_REASON: &str = "Generation failed on Leonardo";

#[derive(Clone)]
pub struct LeonardoClient {
    client: Client,
    config: LeonardoConfig,
    api_key: String,
}

impl LeonardoClient {
    pub fn new(config: LeonardoConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| RelayError::ConfigError("LEONARDO_API_KEY is required".into()))?;

        Ok(Self {
            client: Client::new(),
            config,
            api_key,
        })
    }

    /// Appends `segments` to the base URL, percent-encoding each one so a task id can
    /// never leave the `generations/` path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| RelayError::ConfigError(format!("Invalid Leonardo base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| {
                RelayError::ConfigError(format!(
                    "Leonardo base URL cannot carry a path: {}",
                    self.config.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn build_payload(&self, request: &GenerationRequest) -> LeonardoGenerationRequest {
        LeonardoGenerationRequest {
            prompt: request.prompt().to_string(),
            model_id: self.config.model_id.clone(),
            height: self.config.height,
            width: self.config.width,
            num_images: self.config.num_images,
            num_inference_steps: self.config.num_inference_steps,
            guidance_scale: self.config.guidance_scale,
            preset_style: self.config.preset_style.clone(),
        }
    }
}

/// Reads a Leonardo response body, which is expected to be JSON whatever the status.
async fn read_body(response: Response) -> Result<(StatusCode, Value)> {
    let status = response.status();
    let raw = response.text().await.map_err(|e| {
        RelayError::UpstreamError(format!("Failed to read Leonardo response: {}", e))
    })?;

    match serde_json::from_str::<Value>(&raw) {
        Ok(body) => Ok((status, body)),
        Err(_) => {
            log::error!("Failed to parse Leonardo response as JSON: {}", raw);
            Err(RelayError::UpstreamError(format!(
                "Non-JSON response from Leonardo: {}",
                raw
            )))
        }
    }
}

#[async_trait]
impl ImageProvider for LeonardoClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<String> {
        let payload = self.build_payload(request);
        log::info!("🚀 Starting generation with model: {}", payload.model_id);

        let _timer = logger::timer("leonardo submit");
        let response = self
            .client
            .post(self.endpoint(&["generations"])?)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RelayError::UpstreamError(format!("Leonardo request failed: {}", e)))?;

        let (status, body) = read_body(response).await?;
        log::debug!("Leonardo generation response ({}): {}", status, body);

        if !status.is_success() {
            return Err(RelayError::UpstreamError(format!(
                "Failed to start image generation: {}",
                body
            )));
        }

        let parsed: LeonardoGenerationResponse = serde_json::from_value(body)
            .map_err(|e| RelayError::UpstreamError(format!("Malformed Leonardo response: {}", e)))?;

        parsed
            .generation_id()
            .map(String::from)
            .ok_or_else(|| {
                RelayError::UpstreamError("Missing generationId from Leonardo response.".into())
            })
    }

    async fn fetch(&self, task_id: &str) -> Result<StatusReport> {
        log::info!("🔍 Checking image status for task: {}", task_id);
        // Dot segments would be dropped from the path rather than encoded.
        if matches!(task_id, "." | "..") {
            return Err(RelayError::NotFoundError(format!(
                "Generation job with ID {} not found.",
                task_id
            )));
        }

        let _timer = logger::timer("leonardo status");
        let response = self
            .client
            .get(self.endpoint(&["generations", task_id])?)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| RelayError::UpstreamError(format!("Leonardo request failed: {}", e)))?;

        let (status, body) = read_body(response).await?;
        log::debug!("Leonardo status response ({}): {}", status, body);

        if status == StatusCode::NOT_FOUND {
            return Err(RelayError::NotFoundError(format!(
                "Generation job with ID {} not found.",
                task_id
            )));
        }
        if !status.is_success() {
            return Err(RelayError::UpstreamError(format!(
                "Status API error: {}",
                body
            )));
        }

        let parsed: LeonardoStatusResponse = serde_json::from_value(body)
            .map_err(|e| RelayError::UpstreamError(format!("Malformed Leonardo response: {}", e)))?;

        let job = parsed.generations_by_pk.ok_or_else(|| {
            RelayError::NotFoundError(format!("Generation job with ID {} not found.", task_id))
        })?;

        let job_status: JobStatus = job.status.parse()?;
        let failure = match job_status {
            JobStatus::Failed => Some(LEONARDO_FAILURE_REASON.to_string()),
            _ => None,
        };

        StatusReport::from_parts(job_status, job.first_image_url().map(String::from), failure)
    }

    fn name(&self) -> &str {
        "Leonardo AI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_is_required() {
        let err = LeonardoClient::new(LeonardoConfig::new()).err().unwrap();
        assert!(matches!(err, RelayError::ConfigError(_)));
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let client = LeonardoClient::new(
            LeonardoConfig::new()
                .with_api_key("key")
                .with_base_url("http://upstream/api/"),
        )
        .unwrap();
        assert_eq!(
            client.endpoint(&["generations"]).unwrap().as_str(),
            "http://upstream/api/generations"
        );
    }

    #[test]
    fn task_ids_are_encoded_as_one_segment() {
        let client = LeonardoClient::new(
            LeonardoConfig::new()
                .with_api_key("key")
                .with_base_url("http://upstream/api"),
        )
        .unwrap();
        assert_eq!(
            client.endpoint(&["generations", "../me"]).unwrap().as_str(),
            "http://upstream/api/generations/..%2Fme"
        );
        assert_eq!(
            client.endpoint(&["generations", "x?y=1#z"]).unwrap().as_str(),
            "http://upstream/api/generations/x%3Fy=1%23z"
        );
    }

    #[tokio::test]
    async fn dot_task_ids_are_not_found() {
        let client = LeonardoClient::new(
            LeonardoConfig::new()
                .with_api_key("key")
                .with_base_url("http://upstream/api"),
        )
        .unwrap();
        let err = client.fetch("..").await.unwrap_err();
        assert!(matches!(err, RelayError::NotFoundError(_)));
    }

    #[test]
    fn malformed_base_url_is_a_config_error() {
        let client = LeonardoClient::new(
            LeonardoConfig::new()
                .with_api_key("key")
                .with_base_url("not a url"),
        )
        .unwrap();
        let err = client.endpoint(&["generations"]).unwrap_err();
        assert!(matches!(err, RelayError::ConfigError(_)));
    }

    #[test]
    fn payload_carries_configured_model() {
        let client = LeonardoClient::new(
            LeonardoConfig::new()
                .with_api_key("key")
                .with_model("custom-model")
                .with_dimensions(512, 768),
        )
        .unwrap();
        let request = GenerationRequest::new("a red bicycle").unwrap();
        let payload = client.build_payload(&request);
        assert_eq!(payload.model_id, "custom-model");
        assert_eq!((payload.width, payload.height), (512, 768));
        assert_eq!(payload.prompt, "a red bicycle");
    }

    #[cfg(feature = "server")]
    mod against_stub {
        use super::super::*;
        use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
        use serde_json::json;

        fn authorized(req: &HttpRequest) -> bool {
            req.headers()
                .get("Authorization")
                .and_then(|value| value.to_str().ok())
                == Some("Bearer test-key")
        }

        async fn create(req: HttpRequest, body: web::Json<Value>) -> HttpResponse {
            if !authorized(&req) {
                return HttpResponse::Unauthorized().json(json!({ "error": "unauthorized" }));
            }
            match body["prompt"].as_str() {
                Some("reject me") => HttpResponse::BadRequest().json(json!({ "error": "quota" })),
                Some("no id") => HttpResponse::Ok().json(json!({ "sdGenerationJob": {} })),
                _ => HttpResponse::Ok()
                    .json(json!({ "sdGenerationJob": { "generationId": "abc123" } })),
            }
        }

        async fn lookup(req: HttpRequest, path: web::Path<String>) -> HttpResponse {
            if !authorized(&req) {
                return HttpResponse::Unauthorized().json(json!({ "error": "unauthorized" }));
            }
            match path.as_str() {
                "abc123" => HttpResponse::Ok().json(json!({
                    "generations_by_pk": {
                        "status": "COMPLETE",
                        "generated_images": [{ "url": "https://x/img.png" }]
                    }
                })),
                "pending" => HttpResponse::Ok().json(json!({
                    "generations_by_pk": { "status": "PENDING", "generated_images": [] }
                })),
                "broken" => HttpResponse::Ok().json(json!({
                    "generations_by_pk": { "status": "FAILED", "generated_images": [] }
                })),
                "html" => HttpResponse::BadGateway()
                    .content_type("text/html")
                    .body("<html>bad gateway</html>"),
                _ => HttpResponse::Ok().json(json!({ "generations_by_pk": null })),
            }
        }

        fn spawn_stub() -> String {
            let server = HttpServer::new(|| {
                App::new()
                    .route("/generations", web::post().to(create))
                    .route("/generations/{id}", web::get().to(lookup))
            })
            .workers(1)
            .bind(("127.0.0.1", 0))
            .unwrap();
            let addr = server.addrs()[0];
            actix_web::rt::spawn(server.run());
            format!("http://{}", addr)
        }

        fn client(base_url: &str) -> LeonardoClient {
            LeonardoClient::new(
                LeonardoConfig::new()
                    .with_api_key("test-key")
                    .with_base_url(base_url),
            )
            .unwrap()
        }

        #[actix_web::test]
        async fn submit_returns_generation_id() {
            let client = client(&spawn_stub());
            let request = GenerationRequest::new("a red bicycle").unwrap();
            assert_eq!(client.submit(&request).await.unwrap(), "abc123");
        }

        #[actix_web::test]
        async fn rejected_or_id_less_submissions_are_upstream_errors() {
            let client = client(&spawn_stub());

            let rejected = GenerationRequest::new("reject me").unwrap();
            let err = client.submit(&rejected).await.unwrap_err();
            assert!(matches!(err, RelayError::UpstreamError(ref m) if m.contains("quota")));

            let id_less = GenerationRequest::new("no id").unwrap();
            let err = client.submit(&id_less).await.unwrap_err();
            assert_eq!(err.to_string(), "Missing generationId from Leonardo response.");
        }

        #[actix_web::test]
        async fn fetch_normalizes_statuses() {
            let client = client(&spawn_stub());

            let done = client.fetch("abc123").await.unwrap();
            assert_eq!(done.status(), JobStatus::Complete);
            assert_eq!(done.image_url(), Some("https://x/img.png"));

            let pending = client.fetch("pending").await.unwrap();
            assert_eq!(pending.status(), JobStatus::Pending);
            assert_eq!(pending.image_url(), None);

            let failed = client.fetch("broken").await.unwrap();
            assert_eq!(failed.failure(), Some(LEONARDO_FAILURE_REASON));
        }

        #[actix_web::test]
        async fn unknown_jobs_and_html_bodies_are_errors() {
            let client = client(&spawn_stub());

            let err = client.fetch("nope").await.unwrap_err();
            assert!(matches!(err, RelayError::NotFoundError(_)));
            assert_eq!(err.to_string(), "Generation job with ID nope not found.");

            let err = client.fetch("html").await.unwrap_err();
            assert!(err.to_string().starts_with("Non-JSON response from Leonardo"));
        }

        #[actix_web::test]
        async fn task_ids_cannot_escape_the_generations_path() {
            let client = client(&spawn_stub());

            for task_id in ["../abc123", "x?y=1", "abc123/../pending"] {
                let err = client.fetch(task_id).await.unwrap_err();
                assert_eq!(
                    err.to_string(),
                    format!("Generation job with ID {} not found.", task_id)
                );
            }
        }

        #[actix_web::test]
        async fn wrong_credentials_surface_as_upstream_errors() {
            let base_url = spawn_stub();
            let client = LeonardoClient::new(
                LeonardoConfig::new()
                    .with_api_key("wrong")
                    .with_base_url(&base_url),
            )
            .unwrap();
            let err = client.fetch("abc123").await.unwrap_err();
            assert!(matches!(err, RelayError::UpstreamError(_)));
        }
    }
}
