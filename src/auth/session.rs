use std::{fmt, sync::Arc, time::Duration};

use base64ct::{Base64, Encoding};
use tracing::{error, info};
use uuid::Uuid;

use super::{
    error::AuthError,
    guard::{Authorized, OwnedResource, OwnershipGuard, ResourceKind},
    jwt::{Token, TokenService},
    password::{CredentialStore, PasswordHash},
    principal::{Principal, PrincipalResolver, UserLookup},
};
use crate::clock::Clock;

/// What a request presented in its `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialMaterial {
    Bearer(String),
    Basic { username: String, password: String },
}

impl CredentialMaterial {
    /// Parses `Bearer <token>` or `Basic <base64(user:pass)>`.
    pub fn from_header(value: &str) -> Option<Self> {
        let (scheme, rest) = value.trim().split_once(' ')?;
        let rest = rest.trim();
        if scheme.eq_ignore_ascii_case("bearer") && !rest.is_empty() {
            return Some(Self::Bearer(rest.to_owned()));
        }
        if scheme.eq_ignore_ascii_case("basic") {
            let decoded = Base64::decode_vec(rest).ok()?;
            let pair = String::from_utf8(decoded).ok()?;
            let (username, password) = pair.split_once(':')?;
            return Some(Self::Basic {
                username: username.to_owned(),
                password: password.to_owned(),
            });
        }
        None
    }
}

impl fmt::Debug for CredentialMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer(..)"),
            Self::Basic { username, .. } => {
                f.debug_struct("Basic").field("username", username).finish_non_exhaustive()
            }
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub principal: Principal,
    pub token: Token,
}

/// Single entry point for logging in and for authorizing a request.
#[derive(Clone)]
pub struct AuthSession {
    tokens: Arc<TokenService>,
    credentials: CredentialStore,
    resolver: PrincipalResolver,
    guard: OwnershipGuard,
    clock: Arc<dyn Clock>,
}

impl AuthSession {
    pub fn new(
        tokens: Arc<TokenService>,
        credentials: CredentialStore,
        users: Arc<dyn UserLookup>,
        clock: Arc<dyn Clock>,
        lookup_timeout: Duration,
    ) -> Self {
        let resolver =
            PrincipalResolver::new(tokens.clone(), credentials.clone(), users, lookup_timeout);
        Self {
            tokens,
            credentials,
            resolver,
            guard: OwnershipGuard,
            clock,
        }
    }

    pub async fn login(&self, username: &str, plain: &str) -> Result<Session, AuthError> {
        let principal = self
            .resolver
            .resolve_from_credentials(username, plain)
            .await?;
        let token = self.tokens.issue(&principal.username, self.clock.now())?;
        info!(user_id = %principal.user_id, "user logged in");
        Ok(Session { principal, token })
    }

    /// Issues a token for a principal that was just created (signup).
    pub fn start_session(&self, principal: Principal) -> Result<Session, AuthError> {
        let token = self.tokens.issue(&principal.username, self.clock.now())?;
        Ok(Session { principal, token })
    }

    pub async fn resolve(&self, material: &CredentialMaterial) -> Result<Principal, AuthError> {
        match material {
            CredentialMaterial::Bearer(token) => {
                self.resolver
                    .resolve_from_token(token, self.clock.now())
                    .await
            }
            CredentialMaterial::Basic { username, password } => {
                self.resolver
                    .resolve_from_credentials(username, password)
                    .await
            }
        }
    }

    /// Resolves the caller, then requires it to own the target.
    ///
    /// Library-level entry point for callers holding raw header material
    /// and an owner id. The HTTP handlers resolve once through
    /// [`AuthUser`](super::extractors::AuthUser) and then call
    /// [`authorize`](Self::authorize), which also yields the
    /// [`Authorized`] proof the store needs.
    pub async fn authorize_request(
        &self,
        material: &CredentialMaterial,
        kind: ResourceKind,
        owner_user_id: Uuid,
    ) -> Result<Principal, AuthError> {
        let principal = self.resolve(material).await?;
        self.guard
            .authorize_mutation(&principal, kind, owner_user_id)?;
        Ok(principal)
    }

    pub fn authorize<R: OwnedResource>(
        &self,
        principal: &Principal,
        resource: R,
    ) -> Result<Authorized<R>, AuthError> {
        self.guard.authorize(principal, resource)
    }

    pub async fn hash_password(&self, plain: String) -> Result<PasswordHash, AuthError> {
        let credentials = self.credentials.clone();
        tokio::task::spawn_blocking(move || credentials.hash(&plain))
            .await
            .map_err(|e| {
                error!(error = %e, "password hashing task failed");
                AuthError::Hashing(e.to_string())
            })?
    }

    pub async fn verify_password(&self, plain: String, hash: PasswordHash) -> bool {
        let credentials = self.credentials.clone();
        tokio::task::spawn_blocking(move || credentials.verify(&plain, &hash))
            .await
            .unwrap_or(false)
    }
}
