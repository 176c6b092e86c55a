//! Tether core
//!
//! This crate carries everything a Tether adapter and its host share: the
//! desired/observed resource record, the two external ports (remote call,
//! secret store), the error taxonomy, the readiness poll contract, and the
//! host-facing lifecycle surface.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                      Host                        │
//! │   (loads Definition, persists State, schedules   │
//! │    readiness polls per PollConfig)               │
//! └───────────────────────┬──────────────────────────┘
//!                         │ trait Adapter
//! ┌───────────────────────▼──────────────────────────┐
//! │               adapter implementation             │
//! │   (tether-reconcile Reconciler, tether-webhook,  │
//! │    or a hand-written one)                        │
//! └───────┬──────────────────────────────┬───────────┘
//!         │ trait RemoteCall             │ trait SecretStore
//! ┌───────▼───────┐              ┌───────▼───────┐
//! │  provider API │              │ secret store  │
//! └───────────────┘              └───────────────┘
//! ```
//!
//! Adapters are invoked one lifecycle operation at a time per resource
//! instance; nothing in this crate locks internally.

pub mod adapter;
pub mod error;
pub mod poll;
pub mod record;
pub mod remote;
pub mod secrets;

// Re-exports
pub use adapter::{Adapter, wait_until_ready};
pub use error::{Result, TetherError};
pub use poll::PollConfig;
pub use record::{Definition, Observed, State};
pub use remote::{HttpRemote, Method, RemoteCall, RemoteRequest, RemoteResponse};
pub use secrets::{FileSecretStore, MemorySecretStore, SecretStore};
