use std::sync::Mutex;

use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::core::request::{EngagementPayload, PresentationRequest};
use crate::core::response::ResponseItems;
use crate::session::SessionError;
use crate::utils::lock_unpoisoned;

/// State of a presentation session as observed by the UI.
///
/// Transitions are strictly forward along
/// `Loading → EngagementReady → RequestReceived → ResponseReady → Success`,
/// with `Error` reachable from any state. `ResponseReady` alone may be
/// re-published, to accommodate selection edits before sending. The remote
/// flow has no engagement step and skips `EngagementReady`.
#[derive(Debug, Clone, Default)]
pub enum PresentationState {
    /// Session created, no engagement data yet.
    #[default]
    Loading,
    /// Engagement payload available for display (QR / BLE advertisement).
    EngagementReady(EngagementPayload),
    /// The verifier's request arrived and was parsed into disclosable items.
    RequestReceived(PresentationRequest),
    /// The holder's selection was reduced into a transmission-ready payload.
    ResponseReady(ResponseItems),
    /// Response transmitted and acknowledged. Terminal.
    Success,
    /// The session failed. Terminal.
    Error(SessionError),
}

impl PresentationState {
    /// Position along the forward-only chain. `Error` outranks everything
    /// but `Success`, so it stays publishable from any live state.
    fn rank(&self) -> u8 {
        match self {
            Self::Loading => 0,
            Self::EngagementReady(_) => 1,
            Self::RequestReceived(_) => 2,
            Self::ResponseReady(_) => 3,
            Self::Success => 5,
            Self::Error(_) => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error(_))
    }
}

/// Compares variants only, not payloads.
impl PartialEq for PresentationState {
    fn eq(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }
}

#[derive(Debug, Default)]
struct WriteSide {
    subscribers: Vec<mpsc::UnboundedSender<PresentationState>>,
    closed: bool,
}

/// Single-writer, multi-reader broadcast of [`PresentationState`].
///
/// The writer is the session coordinator; readers are the interactor and the
/// UI. The current value is an atomically swapped immutable snapshot, so
/// readers on other tasks never observe a torn value and never block. The
/// write side is serialized behind a mutex, so publications are totally
/// ordered.
#[derive(Debug)]
pub struct StateChannel {
    latest: watch::Sender<PresentationState>,
    write: Mutex<WriteSide>,
}

impl Default for StateChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl StateChannel {
    /// A channel starting in [`PresentationState::Loading`].
    pub fn new() -> Self {
        let (latest, _) = watch::channel(PresentationState::Loading);
        Self {
            latest,
            write: Mutex::new(WriteSide::default()),
        }
    }

    /// The current state. Never blocks.
    pub fn current(&self) -> PresentationState {
        self.latest.borrow().clone()
    }

    /// Full-history subscription: yields every state published after this
    /// call, in publication order, with no gaps. The stream ends after a
    /// terminal state is delivered or the channel is closed.
    pub fn subscribe(&self) -> StateStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut write = lock_unpoisoned(&self.write);
        if !write.closed {
            write.subscribers.push(tx);
        }
        StateStream { rx }
    }

    /// Latest-value subscription. A slow reader observes the most recent
    /// state only; rapid intermediate updates may coalesce.
    pub fn watch(&self) -> watch::Receiver<PresentationState> {
        self.latest.subscribe()
    }

    /// Publish a state transition. Returns `false` when the transition was
    /// rejected: the channel is closed, or the new state does not advance
    /// the forward-only chain (re-publishing `ResponseReady` is the one
    /// permitted repeat).
    pub(crate) fn publish(&self, state: PresentationState) -> bool {
        let mut write = lock_unpoisoned(&self.write);
        if write.closed {
            return false;
        }

        let current = self.latest.borrow().rank();
        let re_entrant = matches!(state, PresentationState::ResponseReady(_))
            && current == state.rank();
        if state.rank() <= current && !re_entrant {
            debug!(?state, "rejected non-advancing state transition");
            return false;
        }

        let terminal = state.is_terminal();
        self.latest.send_replace(state.clone());
        write
            .subscribers
            .retain(|tx| tx.send(state.clone()).is_ok());
        if terminal {
            write.subscribers.clear();
            write.closed = true;
        }
        true
    }

    /// Close the channel, ending every full-history subscription. The last
    /// published state remains readable through [`current`].
    ///
    /// [`current`]: StateChannel::current
    pub(crate) fn close(&self) {
        let mut write = lock_unpoisoned(&self.write);
        write.subscribers.clear();
        write.closed = true;
    }
}

/// An in-order stream of state transitions from [`StateChannel::subscribe`].
#[derive(Debug)]
pub struct StateStream {
    rx: mpsc::UnboundedReceiver<PresentationState>,
}

impl StateStream {
    /// The next published state, or `None` once the channel terminated.
    pub async fn next(&mut self) -> Option<PresentationState> {
        self.rx.recv().await
    }
}
