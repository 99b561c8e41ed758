use thiserror::Error;

use super::guard::ResourceKind;

/// Why a bearer token was rejected. Callers outside the auth core only
/// ever see [`AuthError::Unauthenticated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not match")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("principal does not own this {0}")]
    Forbidden(ResourceKind),
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("token lifetime is out of range")]
    Lifetime,
    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}
