//! Credential token cache
//!
//! Exchanges a long-lived credential for a short-lived bearer token and
//! caches it in the secret store with its expiry. A cached token is
//! trusted only while it has more than [`EXPIRY_MARGIN_SECS`] of life
//! left, so a token cannot expire between the cache check and its first
//! use. Token values are never logged.

use crate::error::{AuthError, Result};
use chrono::Utc;
use serde::Deserialize;
use tether_core::{Method, RemoteCall, RemoteRequest, SecretStore};
use tracing::{debug, warn};

const TOKEN_SUFFIX: &str = "_cached_token";
const EXPIRES_SUFFIX: &str = "_cached_token_expires";

/// Safety margin subtracted from a cached token's remaining life before
/// trusting it.
pub const EXPIRY_MARGIN_SECS: i64 = 30;

/// Where the token exchange lives on the provider API.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// Request path of the exchange endpoint.
    pub path: String,
}

impl ExchangeConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(alias = "token")]
    access_token: String,

    /// Token lifetime in seconds, when the provider reports one.
    expires_in: Option<i64>,
}

/// Cache of short-lived bearer tokens, keyed by credential-secret name.
///
/// `get_token` is the whole surface; there is no explicit invalidation.
/// Stale entries are ignored and overwritten by the next exchange.
pub struct TokenCache<S, R> {
    secrets: S,
    remote: R,
    exchange: ExchangeConfig,
}

impl<S, R> TokenCache<S, R>
where
    S: SecretStore,
    R: RemoteCall,
{
    pub fn new(secrets: S, remote: R, exchange: ExchangeConfig) -> Self {
        Self {
            secrets,
            remote,
            exchange,
        }
    }

    /// Return a bearer token for the credential stored under
    /// `secret_name`, exchanging and re-caching only when the cached token
    /// is missing or stale.
    pub async fn get_token(&self, secret_name: &str) -> Result<String> {
        if let Some(token) = self.cached(secret_name).await? {
            debug!(secret = secret_name, "Using cached token");
            return Ok(token);
        }

        // The long-lived credential itself. Its absence is a configuration
        // problem, not something a retry can fix.
        let credential = self
            .secrets
            .get(secret_name)
            .await?
            .ok_or_else(|| AuthError::MissingCredential(secret_name.to_string()))?;

        let (token, expires_in) = self.exchange_credential(&credential).await?;

        match expires_in {
            Some(seconds) => {
                let expires_at = Utc::now().timestamp() + seconds;
                self.secrets
                    .set(&format!("{secret_name}{TOKEN_SUFFIX}"), &token)
                    .await?;
                self.secrets
                    .set(&format!("{secret_name}{EXPIRES_SUFFIX}"), &expires_at.to_string())
                    .await?;
                debug!(secret = secret_name, expires_at, "Cached fresh token");
            }
            None => {
                // A token of unknown lifetime is used once, never cached.
                debug!(
                    secret = secret_name,
                    "Exchange reported no expiry, token will not be cached"
                );
            }
        }

        Ok(token)
    }

    async fn cached(&self, secret_name: &str) -> Result<Option<String>> {
        let token = self
            .secrets
            .get(&format!("{secret_name}{TOKEN_SUFFIX}"))
            .await?;
        let expires = self
            .secrets
            .get(&format!("{secret_name}{EXPIRES_SUFFIX}"))
            .await?;
        let (Some(token), Some(expires)) = (token, expires) else {
            return Ok(None);
        };

        let Ok(expires_at) = expires.parse::<i64>() else {
            warn!(secret = secret_name, "Cached expiry is unreadable, discarding entry");
            return Ok(None);
        };

        if Utc::now().timestamp() + EXPIRY_MARGIN_SECS < expires_at {
            Ok(Some(token))
        } else {
            debug!(secret = secret_name, "Cached token expired");
            Ok(None)
        }
    }

    async fn exchange_credential(&self, credential: &str) -> Result<(String, Option<i64>)> {
        let request =
            RemoteRequest::new(Method::Post, self.exchange.path.clone()).with_bearer(credential);
        let response = self.remote.call(request).await?;
        if !response.is_success() {
            return Err(AuthError::Exchange(format!(
                "exchange endpoint answered status {}",
                response.status
            )));
        }
        let decoded: TokenResponse = response.json()?;
        Ok((decoded.access_token, decoded.expires_in))
    }
}
