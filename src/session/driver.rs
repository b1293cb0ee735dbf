use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::core::request::{PresentationRequest, RequestSnapshot};
use crate::core::response::{DisclosureSelection, ResponseItems};
use crate::session::state::{PresentationState, StateChannel};
use crate::session::SessionError;
use crate::utils::lock_unpoisoned;
use crate::wallet::PresentationHandle;

/// One-shot slot for the verifier's request, filled by the background wait
/// spawned at initialization.
#[derive(Debug, Default)]
enum InboundRequest {
    #[default]
    NotStarted,
    Waiting(oneshot::Receiver<anyhow::Result<RequestSnapshot>>),
    Taken,
}

/// Protocol steps shared by the proximity and remote coordinators: the state
/// channel, the background request wait, the recorded response payload, and
/// teardown. The flow-specific parts (engagement vs. URL resolution) stay in
/// the coordinators.
#[derive(Debug, Default)]
pub(crate) struct SessionDriver {
    states: StateChannel,
    inbound: Mutex<InboundRequest>,
    pending: Mutex<Option<ResponseItems>>,
    request_task: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl SessionDriver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn states(&self) -> &StateChannel {
        &self.states
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub(crate) fn request_wait_started(&self) -> bool {
        !matches!(*lock_unpoisoned(&self.inbound), InboundRequest::NotStarted)
    }

    /// Publish a terminal `Error` and hand the cause back to the caller.
    pub(crate) fn fail(&self, error: SessionError) -> SessionError {
        self.states.publish(PresentationState::Error(error.clone()));
        error
    }

    /// Spawn the concurrent wait for the verifier's request. The result is
    /// parked in the inbound slot until [`await_request`] consumes it.
    ///
    /// [`await_request`]: SessionDriver::await_request
    pub(crate) fn begin_request_wait(&self, handle: Arc<dyn PresentationHandle>) {
        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let _ = tx.send(handle.receive_request().await);
        });
        *lock_unpoisoned(&self.inbound) = InboundRequest::Waiting(rx);
        *lock_unpoisoned(&self.request_task) = Some(task);
    }

    /// Suspend until the verifier's request arrives, then snapshot it and
    /// publish `RequestReceived`.
    pub(crate) async fn await_request(&self) -> Result<PresentationRequest, SessionError> {
        let rx = {
            let mut inbound = lock_unpoisoned(&self.inbound);
            match mem::replace(&mut *inbound, InboundRequest::Taken) {
                InboundRequest::Waiting(rx) => rx,
                InboundRequest::NotStarted => {
                    *inbound = InboundRequest::NotStarted;
                    return Err(SessionError::InvalidStateTransition(
                        "request_received before initialize",
                    ));
                }
                InboundRequest::Taken => {
                    return Err(SessionError::InvalidStateTransition(
                        "verifier request already consumed",
                    ));
                }
            }
        };

        let snapshot = match rx.await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(cause)) => return Err(self.fail(SessionError::transport(cause))),
            // The wait task was aborted by stop(); the channel is already
            // closed, nothing further to publish.
            Err(_) => {
                return Err(SessionError::InvalidStateTransition(
                    "session stopped while waiting for the verifier request",
                ))
            }
        };

        let Some(request) = PresentationRequest::from_snapshot(snapshot) else {
            return Err(self.fail(SessionError::NoDisclosableDocuments));
        };

        debug!(
            documents = request.documents.len(),
            relying_party = %request.relying_party,
            "verifier request received"
        );
        self.states
            .publish(PresentationState::RequestReceived(request.clone()));
        Ok(request)
    }

    /// Reduce the selection and record the payload for sending. Synchronous.
    pub(crate) fn prepare(
        &self,
        selection: &DisclosureSelection,
    ) -> Result<ResponseItems, SessionError> {
        if self.is_stopped() {
            return Err(SessionError::InvalidStateTransition("session stopped"));
        }
        if !matches!(
            self.states.current(),
            PresentationState::RequestReceived(_) | PresentationState::ResponseReady(_)
        ) {
            return Err(SessionError::InvalidStateTransition(
                "prepare_response before request_received",
            ));
        }

        let items = ResponseItems::from_selection(selection);
        if items.is_empty() {
            // Recoverable: the holder may re-select without losing the session.
            return Err(SessionError::EmptySelection);
        }

        *lock_unpoisoned(&self.pending) = Some(items.clone());
        self.states
            .publish(PresentationState::ResponseReady(items.clone()));
        Ok(items)
    }

    /// Transmit the recorded payload over `handle`.
    pub(crate) async fn send(
        &self,
        handle: &Arc<dyn PresentationHandle>,
    ) -> Result<(), SessionError> {
        if self.is_stopped() {
            return Err(SessionError::InvalidStateTransition("session stopped"));
        }
        if !matches!(self.states.current(), PresentationState::ResponseReady(_)) {
            return Err(SessionError::InvalidStateTransition(
                "send_response before prepare_response",
            ));
        }
        let Some(items) = lock_unpoisoned(&self.pending).take() else {
            return Err(SessionError::InvalidStateTransition(
                "no prepared response payload",
            ));
        };

        debug!(documents = items.document_count(), "transmitting response");
        match handle.send_response(&items).await {
            Ok(()) => {
                self.states.publish(PresentationState::Success);
                Ok(())
            }
            Err(cause) => Err(self.fail(SessionError::transport(cause))),
        }
    }

    /// First call aborts the request wait and closes the state channel,
    /// returning `true`; later calls are no-ops.
    pub(crate) fn shutdown(&self) -> bool {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return false;
        }
        if let Some(task) = lock_unpoisoned(&self.request_task).take() {
            task.abort();
        }
        self.states.close();
        true
    }
}
