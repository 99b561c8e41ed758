use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{
    auth::{guard::ResourceKind, AuthError},
    store::Duplicate,
};

/// Error surface of every HTTP handler.
#[derive(Debug, Error)]
pub enum ApiError {
    // One message for every 401 so callers cannot tell which check failed.
    #[error("invalid or missing credentials")]
    Unauthorized,
    #[error("you do not own this {0}")]
    Forbidden(ResourceKind),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast_ref::<Duplicate>() {
            Some(dup) => Self::Conflict(dup.to_string()),
            None => Self::Internal(e),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Unauthenticated => Self::Unauthorized,
            AuthError::Forbidden(kind) => Self::Forbidden(kind),
            AuthError::EmptyPassword => Self::bad_request("Password must not be empty"),
            other => Self::Internal(anyhow::Error::new(other)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(e) => {
                error!(error = %e, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn duplicate_store_errors_become_conflicts() {
        let err = ApiError::from(anyhow::Error::new(Duplicate::Email));
        assert!(matches!(&err, ApiError::Conflict(m) if m == "Email already registered"));
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let wrapped: anyhow::Result<()> = Err(Duplicate::Username).context("insert user");
        let err = ApiError::from(wrapped.unwrap_err());
        assert!(matches!(&err, ApiError::Conflict(m) if m == "Username already taken"));
    }

    #[test]
    fn other_store_errors_stay_internal() {
        let err = ApiError::from(anyhow::anyhow!("connection reset"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
