pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod poller;
pub mod provider;
pub mod relay;

pub use config::{LeonardoConfig, PollerConfig, RelayConfig};
pub use error::{RelayError, Result};
pub use models::{GenerationJob, GenerationRequest, JobStatus, StatusReport};
pub use poller::{HttpRelayClient, PollerController, PollerState, RelayApi};
pub use provider::{ImageProvider, LeonardoClient};
pub use relay::{Relay, RelayReply};
