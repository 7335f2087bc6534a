pub mod config;
pub mod error;
pub mod id;

pub use error::{RelayError, RelayResult};
pub use id::ObjectId;
