//! Webhook-backed adapter for Tether
//!
//! Some resources have no provider API at all; their lifecycle logic is a
//! piece of operator-owned code. This crate lets that code live in an HTTP
//! endpoint: the adapter forwards every lifecycle operation to the
//! endpoint and absorbs the state it answers with, while still enforcing
//! the ownership invariant locally (an adopted resource is never deleted
//! through the webhook).

pub mod adapter;

// Re-exports
pub use adapter::WebhookAdapter;
