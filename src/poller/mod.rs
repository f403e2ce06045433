pub mod client;
pub mod controller;
pub mod state;

pub use client::{HttpRelayClient, RelayApi};
pub use controller::PollerController;
pub use state::{transition, PollerEvent, PollerState};
