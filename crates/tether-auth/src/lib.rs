//! Credential token cache for Tether adapters
//!
//! Remote providers rarely accept long-lived credentials directly; the
//! credential is exchanged for a short-lived bearer token. This crate
//! caches that token in the secret store next to the credential it came
//! from, so repeated adapter operations within the token's lifetime cost
//! no extra exchange round-trips.
//!
//! ```ignore
//! use tether_auth::{ExchangeConfig, TokenCache};
//!
//! let cache = TokenCache::new(secrets, remote, ExchangeConfig::new("/v2/tokens"));
//! let token = cache.get_token("do_credentials").await?;
//! ```

pub mod cache;
pub mod error;
pub mod remote;

// Re-exports
pub use cache::{EXPIRY_MARGIN_SECS, ExchangeConfig, TokenCache};
pub use error::{AuthError, Result};
pub use remote::AuthorizedRemote;
