use crate::{Error, Result};
use std::fmt;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identity of one agent: its consumer loop and the state cell it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentId(Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// Agent states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentStatus {
    Running,
    Faulted { reason: String },
    Cancelled,
}

// Lifecycle events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    TransitionFailed { reason: String },
    CancelRequested,
}

impl AgentStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_running()
    }

    /// The error a caller sees when it tries to use an agent in this status.
    pub fn to_error(&self) -> Option<Error> {
        match self {
            Self::Running => None,
            Self::Faulted { reason } => Some(Error::faulted(reason.clone())),
            Self::Cancelled => Some(Error::Cancelled),
        }
    }

    /// Pure transition table. Both terminal states absorb nothing.
    pub fn next(&self, event: &LifecycleEvent) -> Result<AgentStatus> {
        match (self, event) {
            (Self::Running, LifecycleEvent::TransitionFailed { reason }) => Ok(Self::Faulted {
                reason: reason.clone(),
            }),
            (Self::Running, LifecycleEvent::CancelRequested) => Ok(Self::Cancelled),
            _ => Err(Error::InvalidTransition {
                current: self.to_string(),
                requested: format!("{:?}", event),
            }),
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Faulted { reason } => write!(f, "faulted ({})", reason),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Writer side of an agent's status cell. Owned by the processor; handles
/// observe it through [`watch::Receiver`]s.
pub struct Lifecycle {
    id: AgentId,
    status: watch::Sender<AgentStatus>,
}

impl Lifecycle {
    pub fn new(id: AgentId) -> (Self, watch::Receiver<AgentStatus>) {
        let (status, observer) = watch::channel(AgentStatus::Running);
        (Self { id, status }, observer)
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn current(&self) -> AgentStatus {
        self.status.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.status.borrow().is_running()
    }

    pub fn apply(&self, event: LifecycleEvent) -> Result<()> {
        let old_status = self.current();
        debug!(agent = %self.id, "Lifecycle processing {:?} in {}", event, old_status);

        let new_status = match old_status.next(&event) {
            Ok(status) => status,
            Err(e) => {
                warn!(agent = %self.id, "Ignoring lifecycle event {:?}: {}", event, e);
                return Err(e);
            }
        };

        info!(agent = %self.id, "Agent status: {} -> {}", old_status, new_status);
        self.status.send_replace(new_status);
        Ok(())
    }
}
