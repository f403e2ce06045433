pub mod leonardo;
pub mod traits;

pub use leonardo::LeonardoClient;
pub use traits::ImageProvider;
