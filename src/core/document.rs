use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// Wallet-local identifier of a stored document.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl Deref for DocumentId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Document type identifier, e.g. `org.iso.18013.5.1.mDL` or
/// `eu.europa.ec.eudiw.pid.1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocType(String);

impl DocType {
    pub fn new(doc_type: impl Into<String>) -> Self {
        Self(doc_type.into())
    }
}

impl Deref for DocType {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocType {
    fn from(doc_type: &str) -> Self {
        Self(doc_type.to_string())
    }
}

/// A finished document held by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedDocument {
    pub id: DocumentId,
    pub doc_type: DocType,
    /// Name shown to the holder, e.g. "Driving Licence".
    pub display_name: String,
    pub issuer_name: Option<String>,
}

/// A document whose issuance the issuer deferred. The wallet retries the
/// issuance later using the issuer-supplied transaction reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredDocument {
    pub id: DocumentId,
    pub doc_type: DocType,
    pub display_name: String,
}

/// Outcome of resuming a single deferred issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredResumption {
    /// The issuer returned the finished document.
    Issued(IssuedDocument),
    /// The issuer has not finished yet; retry on a later cycle.
    StillPending,
}
