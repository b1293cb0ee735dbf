use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::core::request::{EngagementPayload, PresentationRequest};
use crate::core::response::{DisclosureSelection, ResponseItems};
use crate::session::driver::SessionDriver;
use crate::session::state::{PresentationState, StateChannel};
use crate::session::{SessionCoordinator, SessionError};
use crate::wallet::PresentationHandle;

/// Coordinator for a BLE proximity presentation: generates device
/// engagement, waits for the verifier's request, and sends the response over
/// the same handle.
#[derive(Debug)]
pub struct ProximityCoordinator {
    id: Uuid,
    handle: Arc<dyn PresentationHandle>,
    driver: SessionDriver,
}

impl ProximityCoordinator {
    /// Take exclusive ownership of a freshly opened SDK session handle.
    pub fn new(handle: Arc<dyn PresentationHandle>) -> Self {
        Self {
            id: Uuid::new_v4(),
            handle,
            driver: SessionDriver::new(),
        }
    }

    /// The engagement payload for QR display.
    ///
    /// Fails with `EngagementUnavailable` when the handle has not produced
    /// engagement data yet, i.e. [`initialize`] has not run. Publishes
    /// `EngagementReady` (a repeat publication after `initialize` is a
    /// no-op).
    ///
    /// [`initialize`]: SessionCoordinator::initialize
    pub fn qr_engagement(&self) -> Result<EngagementPayload, SessionError> {
        let Some(payload) = self.handle.engagement_payload() else {
            return Err(SessionError::EngagementUnavailable);
        };
        self.driver
            .states()
            .publish(PresentationState::EngagementReady(payload.clone()));
        Ok(payload)
    }
}

#[async_trait]
impl SessionCoordinator for ProximityCoordinator {
    fn id(&self) -> Uuid {
        self.id
    }

    fn states(&self) -> &StateChannel {
        self.driver.states()
    }

    async fn initialize(&self) -> Result<(), SessionError> {
        if self.driver.is_stopped() {
            return Err(SessionError::InvalidStateTransition("session stopped"));
        }
        if self.driver.request_wait_started() {
            return Err(SessionError::InvalidStateTransition(
                "session already initialized",
            ));
        }

        if let Err(cause) = self.handle.begin_engagement().await {
            return Err(self.driver.fail(SessionError::transport(cause)));
        }
        if let Some(payload) = self.handle.engagement_payload() {
            self.driver
                .states()
                .publish(PresentationState::EngagementReady(payload));
        }

        self.driver.begin_request_wait(self.handle.clone());
        debug!(session = %self.id, "proximity engagement started");
        Ok(())
    }

    async fn request_received(&self) -> Result<PresentationRequest, SessionError> {
        self.driver.await_request().await
    }

    fn prepare_response(
        &self,
        selection: &DisclosureSelection,
    ) -> Result<ResponseItems, SessionError> {
        self.driver.prepare(selection)
    }

    async fn send_response(&self) -> Result<(), SessionError> {
        self.driver.send(&self.handle).await
    }

    async fn stop(&self) {
        if self.driver.shutdown() {
            self.handle.terminate().await;
            debug!(session = %self.id, "proximity session stopped");
        }
    }
}
