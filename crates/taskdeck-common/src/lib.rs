pub mod errors;
pub mod id;

pub use errors::{ConfigError, StoreError, TaskdeckError};
pub use id::{new_correlation_id, ConnectionId};

pub type Result<T> = std::result::Result<T, TaskdeckError>;
