//! Holder-side presentation session coordination for digital identity
//! wallets.
//!
//! The wallet SDK (document storage, mdoc/SD-JWT parsing, BLE transport,
//! OpenID4VP wire encoding) sits behind the traits in [`wallet`]; this crate
//! provides the state machine that drives a credential-sharing session from
//! device engagement through request reception, selective-disclosure
//! response assembly, and transmission, in both proximity (BLE/QR) and
//! remote (URL redirect) flows, plus the deferred-issuance polling driver.
//!
//! # Proximity flow
//!
//! ```ignore
//! use presentment::session::{SessionManager, SessionCoordinator};
//! use presentment::core::response::DisclosureSelection;
//!
//! let manager = SessionManager::builder()
//!     .with_wallet(wallet)
//!     .build()?;
//!
//! // Open a BLE session; any previous proximity session is retired.
//! let coordinator = manager.start_proximity_presentation().await?;
//! let mut states = coordinator.states().subscribe();
//!
//! // Begin engagement and render the QR code.
//! coordinator.initialize().await?;
//! let qr = coordinator.qr_engagement()?;
//!
//! // Wait for the verifier, review, select, send.
//! let request = coordinator.request_received().await?;
//! let selection = DisclosureSelection::select_all(&request);
//! coordinator.prepare_response(&selection)?;
//! coordinator.send_response().await?;
//!
//! // Observers saw, in order: EngagementReady, RequestReceived,
//! // ResponseReady, Success; the subscription then ended.
//! while let Some(state) = states.next().await {
//!     println!("{state:?}");
//! }
//! ```
//!
//! # Remote flow
//!
//! ```ignore
//! // Started from a same-device deep link or cross-device URL; there is no
//! // engagement step.
//! let coordinator = manager.start_remote_presentation(url).await;
//! coordinator.initialize().await?;
//! let request = coordinator.request_received().await?;
//! ```
//!
//! # State machine
//!
//! [`PresentationState`] moves strictly forward along
//! `Loading → EngagementReady → RequestReceived → ResponseReady → Success`,
//! with `Error` reachable from any state and terminal. The
//! [`StateChannel`] broadcasts every transition in order to full-history
//! subscribers; latest-value watchers may coalesce rapid updates.
//!
//! Terminal failures (`NoDisclosableDocuments`, `TransportFailure`) are
//! published before they are returned, so the UI observes them even when
//! the direct caller drops the result. Recoverable failures
//! (`EmptySelection`, `EngagementUnavailable`) leave the session intact.
//!
//! # UI façade and background work
//!
//! [`interactor`] wraps the coordinators in partial-state outcomes and adds
//! interaction policy (BLE reachability check, settle delay before sending).
//! [`deferred`] supervises the cancellable background cycle that retries
//! issuer-deferred document issuance.
//!
//! [`PresentationState`]: crate::session::PresentationState
//! [`StateChannel`]: crate::session::StateChannel

pub mod core;
pub mod deferred;
pub mod interactor;
pub mod session;
pub mod utils;
pub mod wallet;
