//! Mailbox-driven agents.
//!
//! An agent owns a piece of state and changes it only inside its own
//! processor loop, one message at a time. Callers hold an [`AgentHandle`]
//! and either `tell` it a message (fire-and-forget) or `ask` it one and
//! wait for the reply under a deadline.
//!
//! Every constructor below is a thin wrapper over one generic engine: the
//! stateless variants use `()` as state and the one-way variants use `()`
//! as reply. A transition fails by returning `Err` or by panicking; either
//! way the agent moves to [`AgentStatus::Faulted`], keeps its last good
//! state, and refuses further messages.
//!
//! All constructors spawn onto the current tokio runtime.

mod handle;
pub mod lifecycle;
mod mailbox;
mod processor;

pub use handle::{AgentHandle, Ask, Tell};
pub use lifecycle::{AgentId, AgentStatus, Lifecycle, LifecycleEvent};

use crate::BoxError;
use processor::Processor;
use std::future::{self, Future};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info_span};

/// Constructor namespace for agents.
pub struct Agent;

impl Agent {
    /// Runs `action` once per message, with no state carried between calls.
    pub fn start_stateless<M, A, E>(action: A, cancel: CancellationToken) -> AgentHandle<(), M>
    where
        M: Send + 'static,
        A: FnMut(M) -> Result<(), E> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let mut action = action;
        Self::spawn((), move |(), message| future::ready(action(message).map(|()| ((), ()))), cancel)
    }

    pub fn start_stateless_async<M, A, Fut, E>(
        action: A,
        cancel: CancellationToken,
    ) -> AgentHandle<(), M>
    where
        M: Send + 'static,
        A: FnMut(M) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let mut action = action;
        Self::spawn(
            (),
            move |(), message| {
                let pending = action(message);
                async move { pending.await.map(|()| ((), ())) }
            },
            cancel,
        )
    }

    /// Folds each message into the state with `transition`.
    pub fn start_stateful<S, M, T, E>(
        initial_state: S,
        transition: T,
        cancel: CancellationToken,
    ) -> AgentHandle<S, M>
    where
        S: Clone + Send + 'static,
        M: Send + 'static,
        T: FnMut(S, M) -> Result<S, E> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let mut transition = transition;
        Self::spawn(
            initial_state,
            move |state, message| future::ready(transition(state, message).map(|next| (next, ()))),
            cancel,
        )
    }

    /// Like [`Agent::start_stateful`], with the initial state produced by
    /// `init` at start-up.
    pub fn start_stateful_with<S, M, I, T, E>(
        init: I,
        transition: T,
        cancel: CancellationToken,
    ) -> AgentHandle<S, M>
    where
        S: Clone + Send + 'static,
        M: Send + 'static,
        I: FnOnce() -> S,
        T: FnMut(S, M) -> Result<S, E> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        Self::start_stateful(init(), transition, cancel)
    }

    /// Folds each message into the state with a transition that may suspend.
    /// The next message is not taken until the suspension completes.
    pub fn start_stateful_async<S, M, T, Fut, E>(
        initial_state: S,
        transition: T,
        cancel: CancellationToken,
    ) -> AgentHandle<S, M>
    where
        S: Clone + Send + 'static,
        M: Send + 'static,
        T: FnMut(S, M) -> Fut + Send + 'static,
        Fut: Future<Output = Result<S, E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let mut transition = transition;
        Self::spawn(
            initial_state,
            move |state, message| {
                let pending = transition(state, message);
                async move { pending.await.map(|next| (next, ())) }
            },
            cancel,
        )
    }

    /// Two-way agent: `transition` returns the next state and the reply for
    /// the asking caller.
    pub fn start_two_way<S, M, R, T, E>(
        initial_state: S,
        transition: T,
        cancel: CancellationToken,
    ) -> AgentHandle<S, M, R>
    where
        S: Clone + Send + 'static,
        M: Send + 'static,
        R: Send + 'static,
        T: FnMut(S, M) -> Result<(S, R), E> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let mut transition = transition;
        Self::spawn(
            initial_state,
            move |state, message| future::ready(transition(state, message)),
            cancel,
        )
    }

    pub fn start_two_way_async<S, M, R, T, Fut, E>(
        initial_state: S,
        transition: T,
        cancel: CancellationToken,
    ) -> AgentHandle<S, M, R>
    where
        S: Clone + Send + 'static,
        M: Send + 'static,
        R: Send + 'static,
        T: FnMut(S, M) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(S, R), E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        Self::spawn(initial_state, transition, cancel)
    }

    fn spawn<S, M, R, T, Fut, E>(
        initial_state: S,
        transition: T,
        cancel: CancellationToken,
    ) -> AgentHandle<S, M, R>
    where
        S: Clone + Send + 'static,
        M: Send + 'static,
        R: Send + 'static,
        T: FnMut(S, M) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(S, R), E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let id = AgentId::new();
        let (lifecycle, status) = Lifecycle::new(id);
        let (mailbox, inbox) = mailbox::channel(status, cancel.clone());

        let processor = Processor::new(initial_state, transition, inbox, lifecycle, cancel.clone());
        let span = info_span!("agent", id = %processor.id());
        tokio::spawn(processor.run().instrument(span));

        AgentHandle::new(id, mailbox, cancel)
    }
}
