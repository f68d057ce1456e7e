use super::lifecycle::AgentStatus;
use crate::{Error, Result};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// One unit of work queued for the processor.
pub enum Envelope<S, M, R> {
    Message {
        message: M,
        reply: Option<ReplySlot<R>>,
    },
    /// Read of the state cell, ordered with the messages around it.
    Snapshot(oneshot::Sender<S>),
}

/// Single-assignment slot correlating one `ask` with its result. Fulfilling
/// consumes the slot, so it can only ever be written once.
pub struct ReplySlot<R> {
    tx: oneshot::Sender<Result<R>>,
}

impl<R> ReplySlot<R> {
    pub fn new() -> (Self, oneshot::Receiver<Result<R>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    pub fn fulfill(self, result: Result<R>) {
        if self.tx.send(result).is_err() {
            // Caller stopped waiting (timeout or dropped future).
            trace!("Reply slot receiver already gone");
        }
    }
}

/// Fulfils the slot if there is one; one-way messages carry none.
pub fn reply_with<R>(slot: Option<ReplySlot<R>>, result: Result<R>) {
    if let Some(slot) = slot {
        slot.fulfill(result);
    }
}

/// Sending half of the mailbox. Enqueue never blocks.
pub struct Mailbox<S, M, R> {
    tx: mpsc::UnboundedSender<Envelope<S, M, R>>,
    status: watch::Receiver<AgentStatus>,
    // The processor flips the status asynchronously; the token is visible
    // to senders the moment it fires.
    cancel: CancellationToken,
}

/// Receiving half, owned by the single processor loop.
pub struct Inbox<S, M, R> {
    rx: mpsc::UnboundedReceiver<Envelope<S, M, R>>,
}

pub fn channel<S, M, R>(
    status: watch::Receiver<AgentStatus>,
    cancel: CancellationToken,
) -> (Mailbox<S, M, R>, Inbox<S, M, R>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Mailbox { tx, status, cancel }, Inbox { rx })
}

impl<S, M, R> Mailbox<S, M, R> {
    /// Appends to the tail. Fails fast once the agent is terminal instead of
    /// dropping the envelope.
    pub fn enqueue(&self, envelope: Envelope<S, M, R>) -> Result<()> {
        if let Some(err) = self.rejection() {
            return Err(err);
        }

        self.tx.send(envelope).map_err(|_| self.closed_error())
    }

    /// Queues a state read. Unlike messages, reads are still accepted while
    /// the agent is faulted.
    pub fn request_snapshot(&self, tx: oneshot::Sender<S>) -> Result<()> {
        if self.cancel.is_cancelled() || *self.status.borrow() == AgentStatus::Cancelled {
            return Err(Error::Cancelled);
        }

        self.tx
            .send(Envelope::Snapshot(tx))
            .map_err(|_| self.closed_error())
    }

    fn rejection(&self) -> Option<Error> {
        let status = self.status.borrow();
        if status.is_running() && self.cancel.is_cancelled() {
            return Some(Error::Cancelled);
        }
        status.to_error()
    }

    pub fn status(&self) -> AgentStatus {
        self.status.borrow().clone()
    }

    pub fn status_receiver(&self) -> watch::Receiver<AgentStatus> {
        self.status.clone()
    }

    /// Error for a mailbox whose processor has gone away.
    pub fn closed_error(&self) -> Error {
        self.status.borrow().to_error().unwrap_or(Error::MailboxClosed)
    }
}

impl<S, M, R> Clone for Mailbox<S, M, R> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            status: self.status.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<S, M, R> Inbox<S, M, R> {
    /// Waits for the next envelope; `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<Envelope<S, M, R>> {
        self.rx.recv().await
    }

    /// Stops accepting envelopes and hands back everything already queued,
    /// in FIFO order.
    pub fn close_and_drain(&mut self) -> Vec<Envelope<S, M, R>> {
        self.rx.close();

        let mut pending = Vec::new();
        while let Ok(envelope) = self.rx.try_recv() {
            pending.push(envelope);
        }
        pending
    }
}
