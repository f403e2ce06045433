pub mod job;
pub mod leonardo;
pub mod wire;

pub use job::*;
pub use leonardo::*;
pub use wire::*;
