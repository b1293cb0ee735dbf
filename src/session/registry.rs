use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::session::{SessionCoordinator, SessionError};

/// The two presentation flows a wallet can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// BLE / QR device engagement.
    Proximity,
    /// Same-device or cross-device URL redirect.
    Remote,
}

/// Process-wide single-slot registries, one per [`SessionKind`].
///
/// Only one credential-sharing session of a given kind may be live at a
/// time; installing a new coordinator implicitly retires the previous one.
/// All mutation goes through the registry's own serialized operations.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    proximity: Mutex<Option<Arc<dyn SessionCoordinator>>>,
    remote: Mutex<Option<Arc<dyn SessionCoordinator>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: SessionKind) -> &Mutex<Option<Arc<dyn SessionCoordinator>>> {
        match kind {
            SessionKind::Proximity => &self.proximity,
            SessionKind::Remote => &self.remote,
        }
    }

    /// Install `coordinator` as the active session of `kind`, stopping the
    /// previous occupant if the slot was taken.
    pub async fn set_active(&self, kind: SessionKind, coordinator: Arc<dyn SessionCoordinator>) {
        let previous = { self.slot(kind).lock().await.replace(coordinator) };
        if let Some(previous) = previous {
            debug!(?kind, session = %previous.id(), "retiring previous session");
            previous.stop().await;
        }
    }

    /// The active coordinator of `kind`, or `NoActiveSession` when the slot
    /// is empty.
    pub async fn active(
        &self,
        kind: SessionKind,
    ) -> Result<Arc<dyn SessionCoordinator>, SessionError> {
        self.slot(kind)
            .lock()
            .await
            .clone()
            .ok_or(SessionError::NoActiveSession)
    }

    /// Stop and empty the slot of `kind`, if taken.
    pub async fn remove(&self, kind: SessionKind) {
        let coordinator = { self.slot(kind).lock().await.take() };
        if let Some(coordinator) = coordinator {
            coordinator.stop().await;
        }
    }

    /// Stop and empty both slots.
    pub async fn clear(&self) {
        self.remove(SessionKind::Proximity).await;
        self.remove(SessionKind::Remote).await;
    }
}
