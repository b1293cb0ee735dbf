//! Presentation-session coordination.
//!
//! A [`SessionCoordinator`] owns one SDK session handle and drives it from
//! device engagement through request reception, response assembly, and
//! transmission, republishing each step on a [`StateChannel`]. The
//! [`SessionRegistry`] keeps at most one live coordinator per flow kind, and
//! the [`SessionManager`] wires new coordinators over fresh SDK handles.

use std::fmt::Debug;
use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use url::Url;
use uuid::Uuid;

use crate::core::request::PresentationRequest;
use crate::core::response::{DisclosureSelection, ResponseItems};
use crate::wallet::Wallet;

mod driver;
pub mod proximity;
pub mod registry;
pub mod remote;
pub mod state;

pub use proximity::ProximityCoordinator;
pub use registry::{SessionKind, SessionRegistry};
pub use remote::RemoteCoordinator;
pub use state::{PresentationState, StateChannel, StateStream};

/// Why a presentation-session operation failed.
///
/// `NoDisclosableDocuments` and `TransportFailure` are terminal for the
/// session and are published on the state channel before being returned, so
/// observers see the failure even when the caller drops the result.
/// `EmptySelection` and `EngagementUnavailable` are recoverable and leave the
/// published state untouched. `InvalidStateTransition` is a caller contract
/// violation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("engagement data is unavailable, initialize the session first")]
    EngagementUnavailable,
    #[error("no stored documents match the verifier's request")]
    NoDisclosableDocuments,
    #[error("no items are selected for disclosure")]
    EmptySelection,
    #[error("operation invoked out of sequence: {0}")]
    InvalidStateTransition(&'static str),
    #[error("presentation transport failure: {0}")]
    TransportFailure(Arc<anyhow::Error>),
    #[error("no active presentation session")]
    NoActiveSession,
}

impl SessionError {
    pub(crate) fn transport(cause: anyhow::Error) -> Self {
        Self::TransportFailure(Arc::new(cause))
    }
}

/// Drives one underlying SDK session through the presentation state machine.
///
/// Created by a factory over an opaque session handle; the handle's lifetime
/// equals the coordinator's. All state publications go through the
/// coordinator's serialized write path, in the order the operations ran.
#[async_trait]
pub trait SessionCoordinator: Debug + Send + Sync {
    /// Stable identifier of this session.
    fn id(&self) -> Uuid;

    /// The state broadcast for this session.
    fn states(&self) -> &StateChannel;

    /// Begin engagement (or resolve the inbound URL, for the remote flow)
    /// and start waiting for the verifier's request in the background.
    /// Returns once the work is scheduled.
    async fn initialize(&self) -> Result<(), SessionError>;

    /// Wait for the verifier's request and snapshot it. Publishes
    /// `RequestReceived`, or fails with `NoDisclosableDocuments` when the
    /// parsed request matches nothing in the wallet.
    async fn request_received(&self) -> Result<PresentationRequest, SessionError>;

    /// Reduce the holder's selection into a transmission-ready payload.
    /// Synchronous; publishes `ResponseReady` and records the payload for
    /// [`send_response`]. Fails with `EmptySelection` when nothing at all
    /// was selected.
    ///
    /// [`send_response`]: SessionCoordinator::send_response
    fn prepare_response(
        &self,
        selection: &DisclosureSelection,
    ) -> Result<ResponseItems, SessionError>;

    /// Transmit the recorded payload. Requires the current state to be
    /// `ResponseReady`. Publishes `Success` and ends the subscriptions, or
    /// publishes a terminal `Error` on transport failure; there is no
    /// implicit retry.
    async fn send_response(&self) -> Result<(), SessionError>;

    /// Tear down the underlying handle and close the state channel.
    /// Idempotent; safe to call in any state.
    async fn stop(&self);
}

/// Entry point for starting and stopping presentations.
///
/// Explicitly constructed and passed where needed; replaces the source
/// design's process-wide singleton controller.
#[derive(Debug, Clone)]
pub struct SessionManager {
    wallet: Arc<dyn Wallet>,
    registry: Arc<SessionRegistry>,
}

impl SessionManager {
    pub fn builder() -> SessionManagerBuilder {
        SessionManagerBuilder::default()
    }

    pub fn wallet(&self) -> &Arc<dyn Wallet> {
        &self.wallet
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Open a fresh BLE session and install a proximity coordinator for it,
    /// retiring any previously active proximity session.
    pub async fn start_proximity_presentation(
        &self,
    ) -> Result<Arc<ProximityCoordinator>, SessionError> {
        let handle = self
            .wallet
            .begin_proximity_presentation()
            .await
            .map_err(SessionError::transport)?;
        let coordinator = Arc::new(ProximityCoordinator::new(handle));
        self.registry
            .set_active(SessionKind::Proximity, coordinator.clone())
            .await;
        Ok(coordinator)
    }

    /// Install a remote coordinator for an inbound presentation URL,
    /// retiring any previously active remote session. The URL is resolved
    /// when the coordinator is initialized.
    pub async fn start_remote_presentation(&self, url: Url) -> Arc<RemoteCoordinator> {
        let coordinator = Arc::new(RemoteCoordinator::new(self.wallet.clone(), url));
        self.registry
            .set_active(SessionKind::Remote, coordinator.clone())
            .await;
        coordinator
    }

    /// Stop and clear every active session.
    pub async fn stop_presentation(&self) {
        self.registry.clear().await;
    }
}

/// Builder struct for [SessionManager].
#[derive(Debug, Default)]
pub struct SessionManagerBuilder {
    wallet: Option<Arc<dyn Wallet>>,
    registry: Option<Arc<SessionRegistry>>,
}

impl SessionManagerBuilder {
    pub fn build(self) -> anyhow::Result<SessionManager> {
        let Self { wallet, registry } = self;

        let Some(wallet) = wallet else {
            bail!("wallet is required, see `with_wallet`")
        };

        Ok(SessionManager {
            wallet,
            registry: registry.unwrap_or_default(),
        })
    }

    /// Set the [Wallet] collaborator that supplies SDK session handles.
    pub fn with_wallet(mut self, wallet: Arc<dyn Wallet>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    /// Share an existing [SessionRegistry] instead of creating a new one.
    pub fn with_registry(mut self, registry: Arc<SessionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }
}
