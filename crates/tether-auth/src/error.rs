//! Token cache error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("credential secret not found: {0} (store it before requesting a token)")]
    MissingCredential(String),

    #[error("token exchange failed: {0}")]
    Exchange(String),

    #[error("core error: {0}")]
    Core(#[from] tether_core::TetherError),
}

pub type Result<T> = std::result::Result<T, AuthError>;
