use crate::{
    error::Result,
    models::{GenerationRequest, StatusReport},
};
use async_trait::async_trait;

/// An upstream text-to-image service that works through asynchronous jobs.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Starts a generation job and returns the provider's id for it.
    async fn submit(&self, request: &GenerationRequest) -> Result<String>;

    /// Looks up the current state of a job.
    async fn fetch(&self, task_id: &str) -> Result<StatusReport>;

    fn name(&self) -> &str;
}
