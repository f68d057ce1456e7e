use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error accepted from user-supplied transitions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Transition failed: {0}")]
    Transition(Arc<dyn std::error::Error + Send + Sync>),

    #[error("Agent faulted: {reason}")]
    Faulted { reason: String },

    #[error("Agent cancelled")]
    Cancelled,

    #[error("Timed out after {0:?} waiting for a reply")]
    Timeout(Duration),

    #[error("Mailbox closed before the message was handled")]
    MailboxClosed,

    #[error("Invalid lifecycle transition: {current} -> {requested}")]
    InvalidTransition { current: String, requested: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn transition(err: impl Into<BoxError>) -> Self {
        Self::Transition(Arc::from(err.into()))
    }

    pub fn faulted(reason: impl Into<String>) -> Self {
        Self::Faulted {
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for the errors that mean the agent will never process another message.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Faulted { .. } | Self::Cancelled | Self::MailboxClosed
        )
    }
}
