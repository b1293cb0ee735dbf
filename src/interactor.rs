//! UI-facing façade over the session coordinators.
//!
//! Translates coordinator results into partial-state outcomes the view layer
//! can match on directly, and adds interaction policy: a reachability check
//! before proximity engagement, and a short settle delay before transmitting
//! so a progress indicator does not flash.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::core::request::{EngagementPayload, PresentationRequest};
use crate::core::response::{DisclosureSelection, ResponseItems};
use crate::session::{
    PresentationState, ProximityCoordinator, RemoteCoordinator, SessionCoordinator, SessionError,
    SessionKind, SessionManager,
};
use crate::wallet::{BleAvailability, Reachability};

/// Outcome of initializing a presentation session.
#[derive(Debug)]
pub enum InitializationOutcome {
    Ready,
    /// Bluetooth is switched off; the holder can enable it and retry.
    BleDisabled,
    /// The app lacks the Bluetooth permission. Distinct from a generic
    /// failure so the UI can route to settings.
    BleNoPermission,
    Failure(SessionError),
}

/// Outcome of requesting the QR engagement payload.
#[derive(Debug)]
pub enum QrOutcome {
    Ready(EngagementPayload),
    Failure(SessionError),
}

/// Outcome of waiting for the verifier's request.
#[derive(Debug)]
pub enum RequestOutcome {
    Received(PresentationRequest),
    Failure(SessionError),
}

/// Outcome of reducing the holder's selection.
#[derive(Debug)]
pub enum PreparationOutcome {
    Ready(ResponseItems),
    Failure(SessionError),
}

/// Outcome of transmitting the response.
#[derive(Debug)]
pub enum SendOutcome {
    Sent,
    Failure(SessionError),
}

/// Interaction-level tuning. The delay is presentation polish, not protocol
/// behavior; tests run it at zero.
#[derive(Debug, Clone)]
pub struct InteractorConfig {
    /// Pause before transmitting the response.
    pub send_settle_delay: Duration,
}

impl Default for InteractorConfig {
    fn default() -> Self {
        Self {
            send_settle_delay: Duration::from_secs(2),
        }
    }
}

/// Façade for the proximity (BLE / QR) presentation flow.
#[derive(Debug)]
pub struct ProximityInteractor {
    coordinator: Arc<ProximityCoordinator>,
    manager: SessionManager,
    reachability: Arc<dyn Reachability>,
    config: InteractorConfig,
}

impl ProximityInteractor {
    pub fn new(
        coordinator: Arc<ProximityCoordinator>,
        manager: SessionManager,
        reachability: Arc<dyn Reachability>,
    ) -> Self {
        Self {
            coordinator,
            manager,
            reachability,
            config: InteractorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InteractorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn coordinator(&self) -> &Arc<ProximityCoordinator> {
        &self.coordinator
    }

    /// Check the radio, then begin device engagement and the concurrent
    /// request wait.
    pub async fn on_device_engagement(&self) -> InitializationOutcome {
        match self.reachability.ble_availability().await {
            BleAvailability::Disabled => return InitializationOutcome::BleDisabled,
            BleAvailability::NoPermission => return InitializationOutcome::BleNoPermission,
            BleAvailability::Available => {}
        }
        match self.coordinator.initialize().await {
            Ok(()) => InitializationOutcome::Ready,
            Err(error) => InitializationOutcome::Failure(error),
        }
    }

    /// The engagement payload for rendering as a QR code.
    pub async fn on_qr_generation(&self) -> QrOutcome {
        match self.coordinator.qr_engagement() {
            Ok(payload) => QrOutcome::Ready(payload),
            Err(error) => QrOutcome::Failure(error),
        }
    }

    pub async fn on_request_received(&self) -> RequestOutcome {
        match self.coordinator.request_received().await {
            Ok(request) => RequestOutcome::Received(request),
            Err(error) => RequestOutcome::Failure(error),
        }
    }

    pub fn on_response_prepare(&self, selection: &DisclosureSelection) -> PreparationOutcome {
        match self.coordinator.prepare_response(selection) {
            Ok(items) => PreparationOutcome::Ready(items),
            Err(error) => PreparationOutcome::Failure(error),
        }
    }

    /// Transmit the prepared response after the settle delay. Only available
    /// once [`on_response_prepare`] succeeded.
    ///
    /// [`on_response_prepare`]: ProximityInteractor::on_response_prepare
    pub async fn on_send_response(&self) -> SendOutcome {
        send_after_settle(&*self.coordinator, &self.config).await
    }

    /// Tear down the active proximity session and release its registry slot.
    pub async fn stop_presentation(&self) {
        self.manager.registry().remove(SessionKind::Proximity).await;
    }
}

/// Façade for the remote (deep link / cross-device URL) presentation flow.
#[derive(Debug)]
pub struct RemoteInteractor {
    coordinator: Arc<RemoteCoordinator>,
    manager: SessionManager,
    config: InteractorConfig,
}

impl RemoteInteractor {
    pub fn new(coordinator: Arc<RemoteCoordinator>, manager: SessionManager) -> Self {
        Self {
            coordinator,
            manager,
            config: InteractorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InteractorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn coordinator(&self) -> &Arc<RemoteCoordinator> {
        &self.coordinator
    }

    /// Resolve the inbound URL and begin the concurrent request wait.
    pub async fn on_initialization(&self) -> InitializationOutcome {
        match self.coordinator.initialize().await {
            Ok(()) => InitializationOutcome::Ready,
            Err(error) => InitializationOutcome::Failure(error),
        }
    }

    pub async fn on_request_received(&self) -> RequestOutcome {
        match self.coordinator.request_received().await {
            Ok(request) => RequestOutcome::Received(request),
            Err(error) => RequestOutcome::Failure(error),
        }
    }

    pub fn on_response_prepare(&self, selection: &DisclosureSelection) -> PreparationOutcome {
        match self.coordinator.prepare_response(selection) {
            Ok(items) => PreparationOutcome::Ready(items),
            Err(error) => PreparationOutcome::Failure(error),
        }
    }

    pub async fn on_send_response(&self) -> SendOutcome {
        send_after_settle(&*self.coordinator, &self.config).await
    }

    /// Tear down the active remote session and release its registry slot.
    pub async fn stop_presentation(&self) {
        self.manager.registry().remove(SessionKind::Remote).await;
    }
}

async fn send_after_settle(
    coordinator: &dyn SessionCoordinator,
    config: &InteractorConfig,
) -> SendOutcome {
    // Surface the out-of-sequence call before sleeping.
    if !matches!(
        coordinator.states().current(),
        PresentationState::ResponseReady(_)
    ) {
        return SendOutcome::Failure(SessionError::InvalidStateTransition(
            "send_response before prepare_response",
        ));
    }

    if !config.send_settle_delay.is_zero() {
        debug!(delay = ?config.send_settle_delay, "settling before send");
        tokio::time::sleep(config.send_settle_delay).await;
    }

    match coordinator.send_response().await {
        Ok(()) => SendOutcome::Sent,
        Err(error) => SendOutcome::Failure(error),
    }
}
