use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::core::request::PresentationRequest;
use crate::core::response::{DisclosureSelection, ResponseItems};
use crate::session::driver::SessionDriver;
use crate::session::state::StateChannel;
use crate::session::{SessionCoordinator, SessionError};
use crate::utils::lock_unpoisoned;
use crate::wallet::{PresentationHandle, Wallet};

/// Coordinator for a remote presentation started from a same-device deep
/// link or a cross-device URL.
///
/// There is no engagement step: `initialize` resolves the inbound URL into a
/// session handle through the wallet collaborator, and the state machine
/// skips `EngagementReady`.
#[derive(Debug)]
pub struct RemoteCoordinator {
    id: Uuid,
    wallet: Arc<dyn Wallet>,
    url: Url,
    handle: Mutex<Option<Arc<dyn PresentationHandle>>>,
    driver: SessionDriver,
}

impl RemoteCoordinator {
    pub fn new(wallet: Arc<dyn Wallet>, url: Url) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet,
            url,
            handle: Mutex::new(None),
            driver: SessionDriver::new(),
        }
    }

    /// The inbound URL this session was started from.
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn resolved_handle(&self) -> Result<Arc<dyn PresentationHandle>, SessionError> {
        lock_unpoisoned(&self.handle)
            .clone()
            .ok_or(SessionError::InvalidStateTransition(
                "session not initialized",
            ))
    }
}

#[async_trait]
impl SessionCoordinator for RemoteCoordinator {
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

        let handle = match self.wallet.resolve_presentation_url(&self.url).await {
            Ok(handle) => handle,
            Err(cause) => return Err(self.driver.fail(SessionError::transport(cause))),
        };
        *lock_unpoisoned(&self.handle) = Some(handle.clone());

        self.driver.begin_request_wait(handle);
        debug!(session = %self.id, url = %self.url, "remote presentation resolved");
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
        let handle = self.resolved_handle()?;
        self.driver.send(&handle).await
    }

    async fn stop(&self) {
        if self.driver.shutdown() {
            let handle = lock_unpoisoned(&self.handle).take();
            if let Some(handle) = handle {
                handle.terminate().await;
            }
            debug!(session = %self.id, "remote session stopped");
        }
    }
}
