//! Deferred-issuance polling.
//!
//! When a dashboard refresh finds documents whose issuance the issuer
//! deferred, a single cancellable background cycle waits out the poll delay
//! and then retries each document's issuance independently. One document
//! failing never aborts its siblings; results are partitioned into issued
//! and failed lists. A cancelled cycle reports no completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::core::document::{DeferredResumption, DocumentId, IssuedDocument};
use crate::utils::lock_unpoisoned;
use crate::wallet::Wallet;

/// Result of one polling cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredRetryOutcome {
    Completed {
        issued: Vec<IssuedDocument>,
        failed: Vec<DocumentId>,
    },
    /// The cycle was cancelled before finishing; nothing was reported.
    Cancelled,
}

/// Result of deleting a deferred document.
#[derive(Debug)]
pub enum DeleteDeferredOutcome {
    Deleted,
    /// The deletion succeeded and the wallet is now empty.
    NoDocumentsLeft,
    Failure(anyhow::Error),
}

/// Tuning for the polling cycle. The delay stands in for issuer poll
/// backoff and is not load-bearing; tests run it at zero.
#[derive(Debug, Clone)]
pub struct DeferredRetryConfig {
    pub poll_delay: Duration,
}

impl Default for DeferredRetryConfig {
    fn default() -> Self {
        Self {
            poll_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug)]
struct Cycle {
    task: JoinHandle<()>,
    cancel: Arc<AtomicBool>,
}

/// Supervises at most one in-flight deferred-issuance cycle.
///
/// One service instance per dashboard view model; dropping the service
/// cancels any running cycle.
#[derive(Debug)]
pub struct DeferredRetryService {
    wallet: Arc<dyn Wallet>,
    config: DeferredRetryConfig,
    cycle: Mutex<Option<Cycle>>,
}

impl DeferredRetryService {
    pub fn new(wallet: Arc<dyn Wallet>) -> Self {
        Self {
            wallet,
            config: DeferredRetryConfig::default(),
            cycle: Mutex::new(None),
        }
    }

    pub fn with_config(mut self, config: DeferredRetryConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn has_issued_documents(&self) -> bool {
        self.wallet
            .issued_documents()
            .await
            .map(|documents| !documents.is_empty())
            .unwrap_or(false)
    }

    pub async fn has_deferred_documents(&self) -> bool {
        self.wallet
            .deferred_documents()
            .await
            .map(|documents| !documents.is_empty())
            .unwrap_or(false)
    }

    /// Start a polling cycle, unless one is already in flight.
    ///
    /// Returns a receiver resolving to the cycle's outcome, or `None` when
    /// an earlier cycle has not finished yet. Await the receiver through
    /// [`outcome`] to fold an aborted cycle into `Cancelled`.
    ///
    /// [`outcome`]: DeferredRetryService::outcome
    pub fn try_start(&self) -> Option<oneshot::Receiver<DeferredRetryOutcome>> {
        let mut slot = lock_unpoisoned(&self.cycle);
        if let Some(cycle) = slot.as_ref() {
            if !cycle.task.is_finished() {
                debug!("deferred-issuance cycle already in flight");
                return None;
            }
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = oneshot::channel();
        let wallet = self.wallet.clone();
        let delay = self.config.poll_delay;
        let flag = cancel.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(run_cycle(wallet, flag).await);
        });

        *slot = Some(Cycle { task, cancel });
        Some(rx)
    }

    /// Cancel the in-flight cycle, if any. Already-recorded per-document
    /// results are discarded with it; nothing is reported.
    pub fn cancel(&self) {
        if let Some(cycle) = lock_unpoisoned(&self.cycle).take() {
            cycle.cancel.store(true, Ordering::SeqCst);
            cycle.task.abort();
            debug!("deferred-issuance cycle cancelled");
        }
    }

    /// Resolve a cycle receiver from [`try_start`], treating an aborted
    /// cycle as cancelled.
    ///
    /// [`try_start`]: DeferredRetryService::try_start
    pub async fn outcome(rx: oneshot::Receiver<DeferredRetryOutcome>) -> DeferredRetryOutcome {
        rx.await.unwrap_or(DeferredRetryOutcome::Cancelled)
    }

    /// Delete one deferred document, reporting whether the wallet still
    /// holds anything afterwards.
    pub async fn delete_deferred(&self, id: &DocumentId) -> DeleteDeferredOutcome {
        if let Err(cause) = self.wallet.delete_document(id).await {
            return DeleteDeferredOutcome::Failure(cause);
        }
        let issued = self.wallet.issued_documents().await.unwrap_or_default();
        let deferred = self.wallet.deferred_documents().await.unwrap_or_default();
        if issued.is_empty() && deferred.is_empty() {
            DeleteDeferredOutcome::NoDocumentsLeft
        } else {
            DeleteDeferredOutcome::Deleted
        }
    }
}

impl Drop for DeferredRetryService {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_cycle(wallet: Arc<dyn Wallet>, cancel: Arc<AtomicBool>) -> DeferredRetryOutcome {
    let deferred = match wallet.deferred_documents().await {
        Ok(deferred) => deferred,
        Err(cause) => {
            warn!(%cause, "could not list deferred documents");
            return DeferredRetryOutcome::Completed {
                issued: Vec::new(),
                failed: Vec::new(),
            };
        }
    };

    let mut issued = Vec::new();
    let mut failed = Vec::new();

    for document in deferred {
        // Checked before each per-document step: results recorded so far are
        // dropped with the cycle, unstarted resumptions are skipped.
        if cancel.load(Ordering::SeqCst) {
            return DeferredRetryOutcome::Cancelled;
        }

        match wallet.resume_deferred(&document).await {
            Ok(DeferredResumption::Issued(finished)) => issued.push(finished),
            Ok(DeferredResumption::StillPending) => {
                debug!(document = %document.id, "issuance still pending")
            }
            Err(cause) => {
                debug!(document = %document.id, %cause, "deferred issuance failed");
                failed.push(document.id.clone());
            }
        }
    }

    DeferredRetryOutcome::Completed { issued, failed }
}
