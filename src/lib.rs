pub mod agent;
pub mod config;
pub mod error;

pub use agent::{Agent, AgentHandle, AgentId, AgentStatus, Ask, Tell};
pub use error::{BoxError, Error, Result};
pub use tokio_util::sync::CancellationToken;
