use super::{
    lifecycle::{AgentId, AgentStatus},
    mailbox::{Envelope, Mailbox, ReplySlot},
};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Fire-and-forget side of an agent, independent of its state type.
pub trait Tell<M>: Send + Sync {
    fn tell(&self, message: M) -> Result<()>;
}

/// Request/reply side of an agent, independent of its state type.
#[async_trait]
pub trait Ask<M>: Send + Sync {
    type Reply;

    async fn ask(&self, message: M, timeout: Duration) -> Result<Self::Reply>;
}

/// Cloneable handle to a running agent. All access to the agent's state
/// goes through its mailbox.
pub struct AgentHandle<S, M, R = ()> {
    id: AgentId,
    mailbox: Mailbox<S, M, R>,
    cancel: CancellationToken,
}

impl<S, M, R> AgentHandle<S, M, R> {
    pub(crate) fn new(id: AgentId, mailbox: Mailbox<S, M, R>, cancel: CancellationToken) -> Self {
        Self {
            id,
            mailbox,
            cancel,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn status(&self) -> AgentStatus {
        self.mailbox.status()
    }

    /// Enqueues `message` without waiting for it to be processed. Any reply
    /// the transition produces is discarded.
    pub fn tell(&self, message: M) -> Result<()> {
        self.mailbox.enqueue(Envelope::Message {
            message,
            reply: None,
        })
    }

    /// Enqueues `message` and waits up to `timeout` for the transition's
    /// reply. A timeout leaves the message queued and the agent untouched.
    pub async fn ask(&self, message: M, timeout: Duration) -> Result<R> {
        let (slot, reply) = ReplySlot::new();
        self.mailbox.enqueue(Envelope::Message {
            message,
            reply: Some(slot),
        })?;

        match tokio::time::timeout(timeout, reply).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(self.mailbox.closed_error()),
            Err(_) => {
                debug!(agent = %self.id, "Ask timed out after {:?}", timeout);
                Err(Error::Timeout(timeout))
            }
        }
    }

    /// Reads the state as of every message accepted before this call.
    pub async fn snapshot(&self, timeout: Duration) -> Result<S> {
        let (tx, rx) = oneshot::channel();
        self.mailbox.request_snapshot(tx)?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(state)) => Ok(state),
            Ok(Err(_)) => Err(self.mailbox.closed_error()),
            Err(_) => Err(Error::Timeout(timeout)),
        }
    }

    /// Fires the agent's cancellation signal. Queued and in-flight asks
    /// resolve with [`Error::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits until the agent reaches a terminal status.
    pub async fn terminated(&self) -> AgentStatus {
        let mut status = self.mailbox.status_receiver();
        match status.wait_for(AgentStatus::is_terminal).await {
            Ok(terminal) => terminal.clone(),
            Err(_) => self.mailbox.status(),
        }
    }
}

impl<S, M, R> Clone for AgentHandle<S, M, R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            mailbox: self.mailbox.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<S, M, R> Tell<M> for AgentHandle<S, M, R>
where
    S: Send,
    M: Send,
    R: Send,
{
    fn tell(&self, message: M) -> Result<()> {
        AgentHandle::tell(self, message)
    }
}

#[async_trait]
impl<S, M, R> Ask<M> for AgentHandle<S, M, R>
where
    S: Send + 'static,
    M: Send + 'static,
    R: Send + 'static,
{
    type Reply = R;

    async fn ask(&self, message: M, timeout: Duration) -> Result<R> {
        AgentHandle::ask(self, message, timeout).await
    }
}
