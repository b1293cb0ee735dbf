use std::fmt::Debug;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use url::Url;

use crate::core::document::{DeferredDocument, DeferredResumption, DocumentId, IssuedDocument};
use crate::core::request::{EngagementPayload, RequestSnapshot};
use crate::core::response::ResponseItems;

/// A live presentation session supplied by the wallet SDK.
///
/// The SDK owns the transport (BLE for proximity, HTTP for remote), the wire
/// encoding, and the cryptographic proof generation. This crate only drives
/// the handle through the protocol steps; a handle is exclusively owned by
/// one coordinator and never shared.
#[async_trait]
pub trait PresentationHandle: Debug + Send + Sync {
    /// Start device engagement (BLE advertisement and QR material
    /// generation). Resolves once engagement data exists.
    async fn begin_engagement(&self) -> Result<()>;

    /// The engagement payload, once [`begin_engagement`] has produced one.
    ///
    /// [`begin_engagement`]: PresentationHandle::begin_engagement
    fn engagement_payload(&self) -> Option<EngagementPayload>;

    /// Wait for the verifier's request. Suspends until the request arrives
    /// or the underlying transport fails.
    async fn receive_request(&self) -> Result<RequestSnapshot>;

    /// Transmit the assembled selective-disclosure response.
    async fn send_response(&self, items: &ResponseItems) -> Result<()>;

    /// Tear down the underlying transport. Idempotent.
    async fn terminate(&self);
}

/// Document and session operations provided by the wallet SDK.
///
/// Passed explicitly into the session manager and the deferred-issuance
/// driver; there is no ambient global instance.
#[async_trait]
pub trait Wallet: Debug + Send + Sync {
    /// Open a fresh proximity (BLE) presentation session.
    async fn begin_proximity_presentation(&self) -> Result<Arc<dyn PresentationHandle>>;

    /// Resolve an inbound same-device or cross-device URL into a remote
    /// presentation session.
    async fn resolve_presentation_url(&self, url: &Url) -> Result<Arc<dyn PresentationHandle>>;

    /// Finished documents currently stored in the wallet.
    async fn issued_documents(&self) -> Result<Vec<IssuedDocument>>;

    /// Documents whose issuance the issuer deferred.
    async fn deferred_documents(&self) -> Result<Vec<DeferredDocument>>;

    /// Retry the issuance of one deferred document.
    async fn resume_deferred(&self, document: &DeferredDocument) -> Result<DeferredResumption>;

    /// Delete a stored document (issued or deferred).
    async fn delete_document(&self, id: &DocumentId) -> Result<()>;
}

/// Bluetooth radio availability on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleAvailability {
    Available,
    /// The radio exists but is switched off.
    Disabled,
    /// The app has not been granted the Bluetooth permission.
    NoPermission,
}

/// Capability probe consulted before attempting proximity engagement.
#[async_trait]
pub trait Reachability: Debug + Send + Sync {
    async fn ble_availability(&self) -> BleAvailability;
}
