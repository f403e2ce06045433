use super::job::{JobStatus, StatusReport};
use serde::{Deserialize, Deserializer, Serialize};

pub const ACTION_GENERATE: &str = "generate";
pub const ACTION_STATUS: &str = "status";

/// Body a client POSTs to the relay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_none"
    )]
    pub action: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_none"
    )]
    pub prompt: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_none"
    )]
    pub task_id: Option<String>,
}

/// Reads a field that should be a string; any other JSON type counts as absent.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(value)) => Some(value),
        _ => None,
    })
}

impl RelayRequest {
    pub fn generate(prompt: impl Into<String>) -> Self {
        Self {
            action: Some(ACTION_GENERATE.to_string()),
            prompt: Some(prompt.into()),
            task_id: None,
        }
    }

    pub fn status(task_id: impl Into<String>) -> Self {
        Self {
            action: Some(ACTION_STATUS.to_string()),
            prompt: None,
            task_id: Some(task_id.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub task_id: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    pub status: JobStatus,
    pub image_url: Option<String>,
    pub failure: Option<String>,
}

impl From<&StatusReport> for StatusResponse {
    fn from(report: &StatusReport) -> Self {
        Self {
            success: true,
            status: report.status(),
            image_url: report.image_url().map(String::from),
            failure: report.failure().map(String::from),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Everything the relay can answer with.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum RelayResponse {
    Generate(GenerateResponse),
    Status(StatusResponse),
    Error(ErrorResponse),
}

/// Client-side view of a relay answer, tolerant of any of the response shapes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayEnvelope {
    #[serde(default)]
    pub success: bool,
    pub task_id: Option<String>,
    pub status: Option<String>,
    pub image_url: Option<String>,
    pub failure: Option<String>,
    pub error: Option<String>,
}
