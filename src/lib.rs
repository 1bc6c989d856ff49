//! haproxy-manager - keeps a running HAProxy in line with declarative routing state.
//!
//! The crate translates desired state (domains, ingress rules, redirects, basic-auth
//! credentials, TLS bundles) into granular edits against the HAProxy **Dataplane API**,
//! batched into short version-scoped transactions that are committed with a reload so
//! traffic keeps flowing while the configuration changes.
//!
//! # Features
//! - Frontend (listener) management with reserved-port and one-mode-per-port checks
//! - Backend pools discovered through DNS server-templates, scaled in place
//! - Host-based backend switching rules resolved by position before every delete
//! - User lists with SHA-256-crypt hashed passwords and Basic-Auth enforcement
//! - Forced HTTPS and generic domain redirects
//! - Certificate bundle upload / replace
//! - A link façade composing the above into "route port/domain to backend"
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use haproxy_manager::{DataplaneClient, HaproxyManager, Mode, config::ManagerConfig};
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let cfg: ManagerConfig = haproxy_manager::config::loader::load_config("config.toml").await?;
//! let manager = HaproxyManager::new(Arc::new(DataplaneClient::from_config(&cfg.dataplane)?), &cfg);
//!
//! let tx = manager.new_transaction().await?;
//! manager.add_backend(&tx, Mode::Http, "web", 8080, 3).await?;
//! manager.add_http_link(&tx, "be_http_web_8080", "example.com").await?;
//! manager.commit(&tx).await?;
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations) while keeping
//! the reconciler inside `core`. The reconciler holds no copy of the remote configuration:
//! every existence check re-queries the proxy, so any operation can be re-run after a
//! partial failure and converges to the same live state.
//!
//! # Error Handling
//! Library APIs return [`ManagerResult`]. Deleting something that is already gone is
//! success, never an error. The binary wraps failures with `eyre` context.
//!
//! # Concurrency
//! A [`Transaction`] belongs to one pass. Independent domains or services reconcile in
//! parallel by opening independent transactions; the manager itself is cheap to clone.
pub mod config;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{DataplaneClient, Endpoint},
    core::{
        BackendSpec, CertificateBundle, Credential, HaproxyManager, ManagerError, ManagerResult,
        Mode, RouteSpec, Transaction,
    },
    ports::dataplane::DataplaneTransport,
    utils::{RetryPolicy, retry_on_version_conflict},
};
