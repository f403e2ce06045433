//! Client-side job tracking as a finite-state machine.
//!
//! [`transition`] is pure: it never performs I/O and never looks at a clock. Timers and
//! relay calls live in the controller, which feeds their outcomes back in as events.

use crate::models::{GenerationJob, JobStatus, StatusReport};

pub const BLANK_PROMPT_MESSAGE: &str = "Please enter a description for the image";
pub const GENERATION_FAILED_MESSAGE: &str = "Image generation failed";
pub const TIMEOUT_MESSAGE: &str = "Image generation timed out";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Submitting {
        prompt: String,
    },
    Polling {
        job: GenerationJob,
        /// Status queries answered so far.
        polls: u32,
    },
    Complete {
        job: GenerationJob,
    },
    Failed {
        task_id: Option<String>,
        message: String,
    },
    TimedOut {
        task_id: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerEvent {
    /// The user asked for an image.
    Submit { prompt: String },
    Submitted { task_id: String },
    SubmitFailed { message: String },
    StatusReceived { task_id: String, report: StatusReport },
    QueryFailed { task_id: String, message: String },
    DeadlineElapsed,
}

impl PollerState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PollerState::Complete { .. } | PollerState::Failed { .. } | PollerState::TimedOut { .. }
        )
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            PollerState::Submitting { .. } | PollerState::Polling { .. }
        )
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            PollerState::Polling { job, .. } | PollerState::Complete { job } => Some(job.task_id()),
            PollerState::Failed { task_id, .. } => task_id.as_deref(),
            PollerState::TimedOut { task_id, .. } => Some(task_id.as_str()),
            PollerState::Idle | PollerState::Submitting { .. } => None,
        }
    }

    pub fn image_url(&self) -> Option<&str> {
        match self {
            PollerState::Complete { job } => job.image_url(),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            PollerState::Failed { message, .. } | PollerState::TimedOut { message, .. } => {
                Some(message.as_str())
            }
            _ => None,
        }
    }

    /// Text shown to the user for this state.
    pub fn status_line(&self) -> String {
        match self {
            PollerState::Idle => String::new(),
            PollerState::Submitting { .. } => "Starting image generation...".to_string(),
            PollerState::Polling { job, polls: 0 } if job.status() == JobStatus::Pending => {
                "Image generation started, processing...".to_string()
            }
            PollerState::Polling { job, .. } => format!("Status: {}", job.status()),
            PollerState::Complete { .. } => "Image generation complete!".to_string(),
            PollerState::Failed { message, .. } | PollerState::TimedOut { message, .. } => {
                format!("Error: {}", message)
            }
        }
    }
}

/// Computes the state that follows `state` once `event` has happened.
///
/// Events that make no sense in the current state leave it unchanged. This is what
/// keeps late relay replies from touching a job that already finished or timed out.
pub fn transition(state: &PollerState, event: PollerEvent) -> PollerState {
    match (state, event) {
        (current, PollerEvent::Submit { prompt }) if !current.is_busy() => {
            if prompt.trim().is_empty() {
                PollerState::Failed {
                    task_id: None,
                    message: BLANK_PROMPT_MESSAGE.to_string(),
                }
            } else {
                PollerState::Submitting { prompt }
            }
        }

        (PollerState::Submitting { .. }, PollerEvent::Submitted { task_id }) => {
            PollerState::Polling {
                job: GenerationJob::new(task_id),
                polls: 0,
            }
        }

        (PollerState::Submitting { .. }, PollerEvent::SubmitFailed { message }) => {
            PollerState::Failed {
                task_id: None,
                message,
            }
        }

        (PollerState::Polling { job, polls }, PollerEvent::StatusReceived { task_id, report })
            if task_id == job.task_id() =>
        {
            let job = job.updated(&report);
            match report.status() {
                JobStatus::Pending => PollerState::Polling {
                    job,
                    polls: polls + 1,
                },
                JobStatus::Complete => PollerState::Complete { job },
                JobStatus::Failed => PollerState::Failed {
                    task_id: Some(task_id),
                    message: report
                        .failure()
                        .unwrap_or(GENERATION_FAILED_MESSAGE)
                        .to_string(),
                },
            }
        }

        (PollerState::Polling { job, .. }, PollerEvent::QueryFailed { task_id, message })
            if task_id == job.task_id() =>
        {
            PollerState::Failed {
                task_id: Some(task_id),
                message,
            }
        }

        (PollerState::Polling { job, .. }, PollerEvent::DeadlineElapsed) => PollerState::TimedOut {
            task_id: job.task_id().to_string(),
            message: TIMEOUT_MESSAGE.to_string(),
        },

        (current, _) => current.clone(),
    }
}
