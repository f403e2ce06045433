use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Complete => "COMPLETE",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(JobStatus::Pending),
            "COMPLETE" => Ok(JobStatus::Complete),
            "FAILED" => Ok(JobStatus::Failed),
            other => Err(RelayError::UpstreamError(format!(
                "Unknown generation status: {}",
                other
            ))),
        }
    }
}

/// A prompt that is known to contain something other than whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Result<Self> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(RelayError::ValidationError("Prompt is required".into()));
        }
        Ok(Self { prompt })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// Normalized answer to a status query.
///
/// Constructors uphold the invariant that an image URL is present exactly when the
/// job is complete, and a failure reason only ever accompanies a failed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    status: JobStatus,
    image_url: Option<String>,
    failure: Option<String>,
}

impl StatusReport {
    pub fn pending() -> Self {
        Self {
            status: JobStatus::Pending,
            image_url: None,
            failure: None,
        }
    }

    pub fn complete(image_url: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Complete,
            image_url: Some(image_url.into()),
            failure: None,
        }
    }

    pub fn failed(reason: Option<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            image_url: None,
            failure: reason,
        }
    }

    /// Builds a report from loosely typed parts, dropping fields that do not belong to
    /// the status and rejecting a completed job that carries no image.
    pub fn from_parts(
        status: JobStatus,
        image_url: Option<String>,
        failure: Option<String>,
    ) -> Result<Self> {
        match status {
            JobStatus::Pending => Ok(Self::pending()),
            JobStatus::Failed => Ok(Self::failed(failure.filter(|f| !f.is_empty()))),
            JobStatus::Complete => match image_url.filter(|url| !url.is_empty()) {
                Some(url) => Ok(Self::complete(url)),
                None => Err(RelayError::UpstreamError(
                    "Generation completed without an image URL".into(),
                )),
            },
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationJob {
    task_id: String,
    status: JobStatus,
    image_url: Option<String>,
}

impl GenerationJob {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: JobStatus::Pending,
            image_url: None,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    /// Returns the job as described by a fresh status report. The task id never changes.
    pub fn updated(&self, report: &StatusReport) -> Self {
        Self {
            task_id: self.task_id.clone(),
            status: report.status(),
            image_url: report.image_url().map(String::from),
        }
    }
}
