//! Billing Gateway: recurring-billing client and transaction reconciliation
//!
//! A Rust library for talking to a recurring-billing payment gateway and
//! keeping local billing records in step with the gateway's transaction
//! history.
//!
//! # What does it do?
//!
//! - **Dual transport**: the same flat request travels over a native
//!   integration library when one is installed, or over certificate-validated
//!   HTTPS otherwise, with the right password for each channel
//! - **Typed results**: gateway answers become a [`GatewayResult`] with a fixed
//!   [`Status`] and predicates; declines are data, not errors
//! - **Reconciliation**: [`sync::SyncEngine`] pulls each profile's transaction
//!   export and records unseen transactions exactly once
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Application   │  subscription::create / charge / ... , billing-sync cron job
//! └────────┬────────┘
//!          │ RequestParameters
//! ┌────────▼────────────────────────────────────────┐
//! │           GatewayClient (this crate)            │
//! │  credentials + demo flag ──▶ TransportSelector  │
//! │        ┌──────────────┐    ┌──────────────┐     │
//! │        │ NativeChannel│    │ HttpsChannel │     │
//! │        └──────────────┘    └──────────────┘     │
//! └────────┬───────────────────────────┬────────────┘
//!          │ key=value                 │ CSV export
//! ┌────────▼────────┐        ┌─────────▼──────────┐
//! │  GatewayResult  │        │     SyncEngine     │──▶ BillingStore
//! └─────────────────┘        └────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ## 1. Store a card and charge it
//!
//! ```rust,no_run
//! use billing_gateway::{
//!     GatewayClient, GatewayConfig,
//!     subscription::{self, NewSubscription},
//!     sync::BillingId,
//! };
//!
//! # async fn example() -> billing_gateway::Result<()> {
//! let config = GatewayConfig::from_file("billing.toml")?.with_env_overrides();
//! let client = GatewayClient::new(&config)?;
//!
//! let stored = subscription::create(
//!     &client,
//!     NewSubscription::new("4111111111111111", "0412", 1200, "1m"),
//! )
//! .await?;
//!
//! if let Some(id) = stored.billing_id() {
//!     let billing_id = BillingId::parse(id)?;
//!     let sale = subscription::charge(&client, &billing_id, 1995).await?;
//!     println!("sale status: {}", sale.status());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## 2. Reconcile recent subscriptions
//!
//! ```rust,no_run
//! use billing_gateway::{
//!     GatewayClient, GatewayConfig,
//!     store::FileStore,
//!     sync::SyncEngine,
//! };
//!
//! # async fn example() -> billing_gateway::Result<()> {
//! let client = GatewayClient::new(&GatewayConfig::default())?;
//! let store = FileStore::open("billing-store.json").await?;
//!
//! let report = SyncEngine::new(client, store).sync(Some("3h")).await?;
//! println!("{} new transactions", report.transactions_created);
//! # Ok(())
//! # }
//! ```
//!
//! # Security
//!
//! - HTTPS only, certificates always validated
//! - Passwords and card numbers are zeroized on drop and redacted in `Debug`
//! - Neither is ever written to logs

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(
    clippy::multiple_crate_versions,
    reason = "transitive dependencies from reqwest"
)]

pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod params;
pub mod reliability;
pub mod result;
pub mod store;
pub mod subscription;
pub mod sync;
pub mod transport;

pub use client::{GatewayClient, RequestKind};
pub use config::{Credentials, GatewayConfig};
pub use error::{GatewayError, Result};
pub use export::TabularExport;
pub use result::{GatewayResult, Status};
