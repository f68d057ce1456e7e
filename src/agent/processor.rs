use super::{
    lifecycle::{AgentId, Lifecycle, LifecycleEvent},
    mailbox::{Envelope, Inbox, reply_with},
};
use crate::{BoxError, Error};
use futures_util::FutureExt;
use std::{
    any::Any,
    future::Future,
    panic::{self, AssertUnwindSafe},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

/// The single consumer of an agent's mailbox. Owns the state cell; nothing
/// else can reach it.
pub struct Processor<S, M, R, F> {
    state: S,
    transition: F,
    inbox: Inbox<S, M, R>,
    lifecycle: Lifecycle,
    cancel: CancellationToken,
}

enum Step<S, R> {
    Advanced(S, R),
    Failed(Error),
    Cancelled,
}

impl<S, M, R, F, Fut, E> Processor<S, M, R, F>
where
    S: Clone,
    F: FnMut(S, M) -> Fut,
    Fut: Future<Output = Result<(S, R), E>>,
    E: Into<BoxError>,
{
    pub fn new(
        state: S,
        transition: F,
        inbox: Inbox<S, M, R>,
        lifecycle: Lifecycle,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            state,
            transition,
            inbox,
            lifecycle,
            cancel,
        }
    }

    pub fn id(&self) -> AgentId {
        self.lifecycle.id()
    }

    /// Runs until cancelled or until every handle has been dropped.
    pub async fn run(self) {
        let Self {
            mut state,
            mut transition,
            mut inbox,
            lifecycle,
            cancel,
        } = self;
        let mut processed: u64 = 0;

        info!("Agent processor started");

        loop {
            let envelope = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = inbox.recv() => match next {
                    Some(envelope) => envelope,
                    None => {
                        debug!(processed, "All handles dropped, mailbox closed");
                        return;
                    }
                },
            };

            let (message, reply) = match envelope {
                Envelope::Snapshot(tx) => {
                    // Served in any non-cancelled status; a faulted agent
                    // still reports the state it held before the failure.
                    match panic::catch_unwind(AssertUnwindSafe(|| state.clone())) {
                        Ok(copy) => {
                            let _ = tx.send(copy);
                        }
                        Err(payload) => {
                            let reason = Error::transition(panic_message("state clone", payload)).to_string();
                            error!(processed, "State clone failed: {}", reason);
                            if lifecycle.is_running() {
                                let _ = lifecycle.apply(LifecycleEvent::TransitionFailed { reason });
                            }
                            // Dropping `tx` wakes the reader with the fault.
                        }
                    }
                    continue;
                }
                Envelope::Message { message, reply } => (message, reply),
            };

            if let Some(err) = lifecycle.current().to_error() {
                trace!("Rejecting message accepted before the status change");
                reply_with(reply, Err(err));
                continue;
            }

            // Borrowed mutably so the future is `Send` without requiring `S: Sync`.
            let current = &mut state;
            let transition = &mut transition;
            let attempt = AssertUnwindSafe(async move {
                let input = S::clone(current);
                transition(input, message).await
            })
            .catch_unwind();

            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Cancelled,
                outcome = attempt => match outcome {
                    Ok(Ok((next, value))) => Step::Advanced(next, value),
                    Ok(Err(e)) => Step::Failed(Error::transition(e)),
                    Err(payload) => Step::Failed(Error::transition(panic_message("transition", payload))),
                },
            };

            match step {
                Step::Advanced(next, value) => {
                    state = next;
                    processed += 1;
                    trace!(processed, "Transition applied");
                    reply_with(reply, Ok(value));
                }
                Step::Failed(err) => {
                    let reason = err.to_string();
                    error!(processed, "Transition failed, agent faulted: {}", reason);
                    let _ = lifecycle.apply(LifecycleEvent::TransitionFailed { reason });
                    reply_with(reply, Err(err));
                }
                Step::Cancelled => {
                    debug!("Cancelled during an in-flight transition");
                    reply_with(reply, Err(Error::Cancelled));
                    break;
                }
            }
        }

        if lifecycle.is_running() {
            let _ = lifecycle.apply(LifecycleEvent::CancelRequested);
        }

        let pending = inbox.close_and_drain();
        info!(processed, pending = pending.len(), "Agent processor stopped");

        let status = lifecycle.current();
        for envelope in pending {
            // Dropping a snapshot sender wakes its waiter with the status error.
            if let Envelope::Message { reply, .. } = envelope {
                reply_with(reply, Err(status.to_error().unwrap_or(Error::Cancelled)));
            }
        }
    }
}

fn panic_message(what: &str, payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("{} panicked: {}", what, msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("{} panicked: {}", what, msg)
    } else {
        format!("{} panicked", what)
    }
}
