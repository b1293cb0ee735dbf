use base64::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::document::{DocType, DocumentId};
use crate::utils::NonEmptyVec;

/// Relying-party name used when the verifier's identity could not be
/// established from its certificate.
pub const UNKNOWN_VERIFIER: &str = "Unknown verifier";

/// Request context used when the verifier supplied no purpose statement.
pub const DEFAULT_REQUEST_CONTEXT: &str =
    "The verifier is requesting data from your wallet. Review the items before sharing.";

/// Opaque device-engagement material produced by the wallet SDK, typically
/// rendered as a QR code by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementPayload(Vec<u8>);

impl EngagementPayload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Base64 rendering for display or transport in a URI.
    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(&self.0)
    }
}

impl From<Vec<u8>> for EngagementPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// A single data element the verifier has asked for, and which the holder
/// may choose to disclose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosableElement {
    /// ISO 18013-5 namespace, e.g. `org.iso.18013.5.1`.
    pub namespace: String,
    /// Element identifier within the namespace, e.g. `family_name`.
    pub element: String,
    /// Stored value rendered for review, when one is available.
    pub display_value: Option<String>,
    /// Whether the verifier marked the element as required.
    pub required: bool,
}

/// A stored document matching the verifier's request, with the elements
/// requested from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosableDocument {
    pub id: DocumentId,
    pub doc_type: DocType,
    pub display_name: String,
    pub elements: NonEmptyVec<DisclosableElement>,
}

/// Raw parsed request handed over by the wallet SDK when the verifier's
/// request arrives. The coordinator turns this into a [`PresentationRequest`].
#[derive(Debug, Clone, Default)]
pub struct RequestSnapshot {
    /// Stored documents matching the request. May be empty, in which case the
    /// session fails with `NoDisclosableDocuments`.
    pub documents: Vec<DisclosableDocument>,
    /// Verifier identity from the reader-auth certificate, if validated.
    pub reader_identity: Option<String>,
    /// Human-readable context from certificate validation.
    pub validation_message: Option<String>,
    /// Whether the reader certificate chains to a trusted root.
    pub trusted: bool,
}

/// Immutable snapshot of the verifier's data request, created once per
/// session. Selection state lives outside this type, keyed by element
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationRequest {
    pub documents: NonEmptyVec<DisclosableDocument>,
    pub relying_party: String,
    pub request_context: String,
    pub trusted: bool,
}

impl PresentationRequest {
    /// Build the immutable request from the SDK's parsed snapshot.
    ///
    /// Returns `None` when the snapshot matched no stored documents.
    pub fn from_snapshot(snapshot: RequestSnapshot) -> Option<Self> {
        let documents = NonEmptyVec::maybe_new(snapshot.documents)?;
        Some(Self {
            documents,
            relying_party: snapshot
                .reader_identity
                .unwrap_or_else(|| UNKNOWN_VERIFIER.to_string()),
            request_context: snapshot
                .validation_message
                .unwrap_or_else(|| DEFAULT_REQUEST_CONTEXT.to_string()),
            trusted: snapshot.trusted,
        })
    }
}
