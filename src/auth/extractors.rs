use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use super::{principal::Principal, session::CredentialMaterial};
use crate::{error::ApiError, state::AppState};

fn credential_material(parts: &Parts) -> Option<Result<CredentialMaterial, ApiError>> {
    let header = parts.headers.get(axum::http::header::AUTHORIZATION)?;
    Some(
        header
            .to_str()
            .ok()
            .and_then(CredentialMaterial::from_header)
            .ok_or(ApiError::Unauthorized),
    )
}

/// Resolves the caller from the `Authorization` header, or rejects with 401.
pub struct AuthUser(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let material = credential_material(parts).ok_or(ApiError::Unauthorized)??;
        let principal = state.auth.resolve(&material).await?;
        Ok(AuthUser(principal))
    }
}

/// Caller identity on public reads. Anything that fails to resolve is
/// treated as anonymous.
pub struct MaybeAuthUser(pub Option<Principal>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(Ok(material)) = credential_material(parts) else {
            return Ok(MaybeAuthUser(None));
        };
        match state.auth.resolve(&material).await {
            Ok(principal) => Ok(MaybeAuthUser(Some(principal))),
            Err(e) => {
                debug!(error = %e, "optional credentials ignored");
                Ok(MaybeAuthUser(None))
            }
        }
    }
}
