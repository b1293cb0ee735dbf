//! Mock wallet-SDK collaborators shared by the integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use presentment::core::document::{
    DeferredDocument, DeferredResumption, DocumentId, IssuedDocument,
};
use presentment::core::request::{
    DisclosableDocument, DisclosableElement, EngagementPayload, RequestSnapshot,
};
use presentment::core::response::ResponseItems;
use presentment::utils::NonEmptyVec;
use presentment::wallet::{BleAvailability, PresentationHandle, Reachability, Wallet};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use url::Url;

/// A one-document, one-element request snapshot.
pub fn simple_snapshot() -> RequestSnapshot {
    RequestSnapshot {
        documents: vec![DisclosableDocument {
            id: "doc-1".into(),
            doc_type: "org.iso.18013.5.1.mDL".into(),
            display_name: "Driving Licence".to_string(),
            elements: NonEmptyVec::new(DisclosableElement {
                namespace: "org.iso.18013.5.1".to_string(),
                element: "family_name".to_string(),
                display_value: Some("Doe".to_string()),
                required: true,
            }),
        }],
        reader_identity: Some("Example Verifier".to_string()),
        validation_message: None,
        trusted: true,
    }
}

/// Scripted SDK session handle. The test side keeps the [`oneshot::Sender`]
/// and decides when (and with what) the verifier's request "arrives".
#[derive(Debug)]
pub struct MockHandle {
    engagement_bytes: Vec<u8>,
    engaged: AtomicBool,
    fail_engagement: bool,
    request_rx: AsyncMutex<Option<oneshot::Receiver<Result<RequestSnapshot>>>>,
    send_error: Option<String>,
    pub sent: Mutex<Option<ResponseItems>>,
    terminations: AtomicUsize,
}

impl MockHandle {
    pub fn new() -> (Arc<Self>, oneshot::Sender<Result<RequestSnapshot>>) {
        Self::build(b"mock-engagement".to_vec(), false, None)
    }

    pub fn failing_engagement() -> (Arc<Self>, oneshot::Sender<Result<RequestSnapshot>>) {
        Self::build(Vec::new(), true, None)
    }

    pub fn failing_send(message: &str) -> (Arc<Self>, oneshot::Sender<Result<RequestSnapshot>>) {
        Self::build(
            b"mock-engagement".to_vec(),
            false,
            Some(message.to_string()),
        )
    }

    fn build(
        engagement_bytes: Vec<u8>,
        fail_engagement: bool,
        send_error: Option<String>,
    ) -> (Arc<Self>, oneshot::Sender<Result<RequestSnapshot>>) {
        let (tx, rx) = oneshot::channel();
        let handle = Arc::new(Self {
            engagement_bytes,
            engaged: AtomicBool::new(false),
            fail_engagement,
            request_rx: AsyncMutex::new(Some(rx)),
            send_error,
            sent: Mutex::new(None),
            terminations: AtomicUsize::new(0),
        });
        (handle, tx)
    }

    pub fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PresentationHandle for MockHandle {
    async fn begin_engagement(&self) -> Result<()> {
        if self.fail_engagement {
            bail!("bluetooth advertisement failed");
        }
        self.engaged.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn engagement_payload(&self) -> Option<EngagementPayload> {
        self.engaged
            .load(Ordering::SeqCst)
            .then(|| EngagementPayload::new(self.engagement_bytes.clone()))
    }

    async fn receive_request(&self) -> Result<RequestSnapshot> {
        let rx = self
            .request_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| anyhow!("request already received"))?;
        rx.await.map_err(|_| anyhow!("engagement closed"))?
    }

    async fn send_response(&self, items: &ResponseItems) -> Result<()> {
        if let Some(message) = &self.send_error {
            bail!("{message}");
        }
        *self.sent.lock().unwrap() = Some(items.clone());
        Ok(())
    }

    async fn terminate(&self) {
        self.terminations.fetch_add(1, Ordering::SeqCst);
    }
}

/// How the mock wallet answers `resume_deferred` for one document.
#[derive(Debug, Clone)]
pub enum ResumeScript {
    Issue,
    StillPending,
    Fail,
}

/// In-memory wallet collaborator.
#[derive(Debug, Default)]
pub struct MockWallet {
    pub issued: Mutex<Vec<IssuedDocument>>,
    pub deferred: Mutex<Vec<DeferredDocument>>,
    pub resume_scripts: Mutex<HashMap<DocumentId, ResumeScript>>,
    pub resume_delay: Mutex<Duration>,
    resume_calls: AtomicUsize,
    proximity_handles: Mutex<Vec<Arc<dyn PresentationHandle>>>,
    remote_handle: Mutex<Option<Arc<dyn PresentationHandle>>>,
}

impl MockWallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_proximity_handle(&self, handle: Arc<dyn PresentationHandle>) {
        self.proximity_handles.lock().unwrap().insert(0, handle);
    }

    pub fn set_remote_handle(&self, handle: Arc<dyn PresentationHandle>) {
        *self.remote_handle.lock().unwrap() = Some(handle);
    }

    pub fn add_deferred(&self, id: &str, script: ResumeScript) {
        let id = DocumentId::from(id);
        self.deferred.lock().unwrap().push(DeferredDocument {
            id: id.clone(),
            doc_type: "eu.europa.ec.eudiw.pid.1".into(),
            display_name: format!("Deferred {id}"),
        });
        self.resume_scripts.lock().unwrap().insert(id, script);
    }

    pub fn resume_calls(&self) -> usize {
        self.resume_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Wallet for MockWallet {
    async fn begin_proximity_presentation(&self) -> Result<Arc<dyn PresentationHandle>> {
        self.proximity_handles
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| anyhow!("no scripted proximity handle"))
    }

    async fn resolve_presentation_url(&self, url: &Url) -> Result<Arc<dyn PresentationHandle>> {
        self.remote_handle
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("could not resolve presentation url {url}"))
    }

    async fn issued_documents(&self) -> Result<Vec<IssuedDocument>> {
        Ok(self.issued.lock().unwrap().clone())
    }

    async fn deferred_documents(&self) -> Result<Vec<DeferredDocument>> {
        Ok(self.deferred.lock().unwrap().clone())
    }

    async fn resume_deferred(&self, document: &DeferredDocument) -> Result<DeferredResumption> {
        let delay = *self.resume_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.resume_calls.fetch_add(1, Ordering::SeqCst);

        let script = self
            .resume_scripts
            .lock()
            .unwrap()
            .get(&document.id)
            .cloned()
            .unwrap_or(ResumeScript::StillPending);
        match script {
            ResumeScript::Issue => {
                let finished = IssuedDocument {
                    id: document.id.clone(),
                    doc_type: document.doc_type.clone(),
                    display_name: document.display_name.clone(),
                    issuer_name: Some("Example Issuer".to_string()),
                };
                self.deferred.lock().unwrap().retain(|d| d.id != document.id);
                self.issued.lock().unwrap().push(finished.clone());
                Ok(DeferredResumption::Issued(finished))
            }
            ResumeScript::StillPending => Ok(DeferredResumption::StillPending),
            ResumeScript::Fail => bail!("issuer rejected the transaction"),
        }
    }

    async fn delete_document(&self, id: &DocumentId) -> Result<()> {
        let mut deferred = self.deferred.lock().unwrap();
        let mut issued = self.issued.lock().unwrap();
        let before = deferred.len() + issued.len();
        deferred.retain(|d| &d.id != id);
        issued.retain(|d| &d.id != id);
        if deferred.len() + issued.len() == before {
            bail!("no document with id {id}");
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct MockReachability(pub BleAvailability);

#[async_trait]
impl Reachability for MockReachability {
    async fn ble_availability(&self) -> BleAvailability {
        self.0
    }
}
