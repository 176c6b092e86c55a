//! Lifecycle reconciliation for Tether adapters
//!
//! This crate carries the one state machine every adapter shares:
//!
//! ```text
//! Absent → Creating → {Adopted | Created} → Ready
//!                                     ↑        │
//!                                     └ Updating
//!                     Deleting → Absent
//! ```
//!
//! A provider implements [`ResourceProvider`] (how to look its resource up
//! by name or id, what a create request looks like, which statuses mean
//! "settled") and [`Reconciler`] turns that into a full
//! [`tether_core::Adapter`]: idempotent create-or-adopt, delta-gated
//! update, ownership-guarded delete with children drained first, and the
//! readiness/liveness poll steps.
//!
//! # Example
//!
//! ```ignore
//! use tether_core::{Adapter, Definition, wait_until_ready};
//! use tether_reconcile::Reconciler;
//!
//! let adapter = Reconciler::new(TopicProvider::new(remote));
//! let definition = Definition::new("topic", "orders-topic");
//!
//! let mut state = adapter.create(&definition).await?;
//! if !wait_until_ready(&adapter, &mut state).await? {
//!     // attempts exhausted, resource never settled
//! }
//! ```

pub mod provider;
pub mod reconciler;

// Re-exports
pub use provider::{Delta, ResourceProvider};
pub use reconciler::Reconciler;
