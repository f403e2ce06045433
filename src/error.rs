use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// A required field is missing or blank.
    #[error("{0}")]
    ValidationError(String),
    /// The upstream provider failed, rejected the request or answered with something unreadable.
    #[error("{0}")]
    UpstreamError(String),
    /// The upstream provider knows no job with the requested id.
    #[error("{0}")]
    NotFoundError(String),
    #[error("Invalid action")]
    InvalidAction,
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Request error: {0}")]
    RequestError(String),
    /// The relay reported a failure back to a client.
    #[error("{0}")]
    ResponseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl RelayError {
    /// HTTP status the relay answers with when this error reaches its boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::InvalidAction => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
