//! Remote call port
//!
//! Every adapter operation reaches its provider through this port. The
//! production implementation is [`HttpRemote`]; tests substitute in-memory
//! fakes.
//!
//! Transport failures (connection refused, DNS, timeouts) surface as
//! [`TetherError::Transport`] from the port itself. An HTTP response comes
//! back as a normal [`RemoteResponse`] whatever its status; callers
//! classify error statuses with [`RemoteResponse::error_for_status`].

use crate::error::{Result, TetherError};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

/// HTTP method of a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single provider API request.
#[derive(Debug, Clone)]
pub struct RemoteRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Vec<u8>>,
    pub headers: HashMap<String, String>,
}

impl RemoteRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HashMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Attach a JSON body and the matching content-type header.
    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        self.headers
            .insert("content-type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Authorize the request with a bearer token.
    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header("authorization", format!("Bearer {token}"))
    }
}

/// A provider API response.
#[derive(Debug, Clone)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RemoteResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status < 400
    }

    /// Classify an error status: 404 reads as [`TetherError::NotFound`],
    /// 409 as [`TetherError::Conflict`], anything else at or above 400 as
    /// [`TetherError::Api`]. `what` names the resource or operation for the
    /// error message.
    pub fn error_for_status(&self, what: &str) -> Result<()> {
        match self.status {
            status if status < 400 => Ok(()),
            404 => Err(TetherError::NotFound(what.to_string())),
            409 => Err(TetherError::Conflict(what.to_string())),
            status => Err(TetherError::Api {
                status,
                message: format!("{}: {}", what, self.text_snippet()),
            }),
        }
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    fn text_snippet(&self) -> String {
        const SNIPPET_LIMIT: usize = 200;
        String::from_utf8_lossy(&self.body)
            .chars()
            .take(SNIPPET_LIMIT)
            .collect()
    }
}

/// The remote call capability every adapter operation is built on.
#[async_trait]
pub trait RemoteCall: Send + Sync {
    /// Issue one request and return the response. `Err` is reserved for
    /// transport-level failures; HTTP error statuses come back as a normal
    /// response for the caller to classify.
    async fn call(&self, request: RemoteRequest) -> Result<RemoteResponse>;
}

#[async_trait]
impl<T: RemoteCall + ?Sized> RemoteCall for Arc<T> {
    async fn call(&self, request: RemoteRequest) -> Result<RemoteResponse> {
        (**self).call(request).await
    }
}

/// [`RemoteCall`] implementation over HTTP with a fixed base URL.
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl RemoteCall for HttpRemote {
    async fn call(&self, request: RemoteRequest) -> Result<RemoteResponse> {
        let url = self.url_for(&request.path);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Patch => reqwest::Method::PATCH,
        };

        tracing::debug!(method = %request.method, url = %url, "Remote call");

        let mut builder = self.client.request(method, &url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TetherError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TetherError::Transport(e.to_string()))?;

        Ok(RemoteResponse::new(status, body.to_vec()))
    }
}
