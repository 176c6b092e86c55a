//! Authorized remote call decorator
//!
//! Wraps a [`RemoteCall`] so that every request carries a bearer token
//! obtained through the [`TokenCache`]. Adapter code stays unaware of
//! token lifetimes; it issues plain requests and authorization happens at
//! the port boundary.

use crate::cache::TokenCache;
use crate::error::AuthError;
use async_trait::async_trait;
use tether_core::{RemoteCall, RemoteRequest, RemoteResponse, Result, SecretStore, TetherError};

/// [`RemoteCall`] implementation that authorizes each request with a token
/// from the cache before delegating to the wrapped port.
pub struct AuthorizedRemote<S, R> {
    cache: TokenCache<S, R>,
    remote: R,
    secret_name: String,
}

impl<S, R> AuthorizedRemote<S, R>
where
    S: SecretStore,
    R: RemoteCall,
{
    pub fn new(cache: TokenCache<S, R>, remote: R, secret_name: impl Into<String>) -> Self {
        Self {
            cache,
            remote,
            secret_name: secret_name.into(),
        }
    }
}

#[async_trait]
impl<S, R> RemoteCall for AuthorizedRemote<S, R>
where
    S: SecretStore,
    R: RemoteCall,
{
    async fn call(&self, request: RemoteRequest) -> Result<RemoteResponse> {
        let token = self
            .cache
            .get_token(&self.secret_name)
            .await
            .map_err(|e| match e {
                AuthError::Core(core) => core,
                other => TetherError::Config(other.to_string()),
            })?;
        self.remote.call(request.with_bearer(&token)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ExchangeConfig;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tether_core::{MemorySecretStore, Method};

    /// Serves the token exchange itself and records the authorization
    /// header of every other request.
    struct FakeApi {
        exchanges: AtomicUsize,
        auth_headers: Mutex<Vec<Option<String>>>,
    }

    impl FakeApi {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                exchanges: AtomicUsize::new(0),
                auth_headers: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RemoteCall for FakeApi {
        async fn call(&self, request: RemoteRequest) -> Result<RemoteResponse> {
            if request.path == "/v2/tokens" {
                self.exchanges.fetch_add(1, Ordering::SeqCst);
                return Ok(RemoteResponse::new(
                    200,
                    br#"{"access_token": "tok-1", "expires_in": 3600}"#.to_vec(),
                ));
            }
            self.auth_headers
                .lock()
                .unwrap()
                .push(request.headers.get("authorization").cloned());
            Ok(RemoteResponse::new(200, b"{}".to_vec()))
        }
    }

    #[tokio::test]
    async fn test_requests_carry_the_cached_token() {
        let secrets = Arc::new(MemorySecretStore::new());
        secrets.set("do_credentials", "long-lived").await.unwrap();
        let api = FakeApi::new();

        let cache = TokenCache::new(secrets, api.clone(), ExchangeConfig::new("/v2/tokens"));
        let authorized = AuthorizedRemote::new(cache, api.clone(), "do_credentials");

        authorized
            .call(RemoteRequest::new(Method::Get, "/v2/topics"))
            .await
            .unwrap();
        authorized
            .call(RemoteRequest::new(Method::Get, "/v2/topics"))
            .await
            .unwrap();

        // One exchange covers both authorized requests.
        assert_eq!(api.exchanges.load(Ordering::SeqCst), 1);
        let headers = api.auth_headers.lock().unwrap().clone();
        assert_eq!(headers.len(), 2);
        assert!(headers.iter().all(|h| h.as_deref() == Some("Bearer tok-1")));
    }

    #[tokio::test]
    async fn test_missing_credential_surfaces_as_config_error() {
        let secrets = Arc::new(MemorySecretStore::new());
        let api = FakeApi::new();

        let cache = TokenCache::new(secrets, api.clone(), ExchangeConfig::new("/v2/tokens"));
        let authorized = AuthorizedRemote::new(cache, api.clone(), "do_credentials");

        let err = authorized
            .call(RemoteRequest::new(Method::Get, "/v2/topics"))
            .await
            .unwrap_err();
        assert!(matches!(err, TetherError::Config(_)));
        assert_eq!(api.auth_headers.lock().unwrap().len(), 0);
    }
}
