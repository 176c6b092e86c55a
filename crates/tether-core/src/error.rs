//! Error types shared across the Tether crates

use thiserror::Error;

/// Errors surfaced by adapter operations and the ports they depend on.
#[derive(Error, Debug)]
pub enum TetherError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("resource already exists: {0}")]
    Conflict(String),

    #[error("remote API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("secret not found: {0}")]
    SecretNotFound(String),

    #[error("field '{field}' cannot be changed after creation; the resource must be recreated")]
    RequiresRecreation { field: String },

    #[error("resource {0} no longer exists in the remote system")]
    Vanished(String),

    #[error("resource {id} entered terminal status '{status}'")]
    Faulted { id: String, status: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TetherError>;
