use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::time::timeout;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::{
    error::AuthError,
    jwt::TokenService,
    password::CredentialStore,
    repo_types::{AuthSubject, User},
};

/// Identity resolved for the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
        }
    }
}

/// Account lookups the auth core depends on.
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
}

/// Turns a bearer token or a username/password pair into a [`Principal`].
///
/// Every failure, including a slow or broken user store, comes back as
/// [`AuthError::Unauthenticated`]; the distinction only shows up in logs.
#[derive(Clone)]
pub struct PrincipalResolver {
    tokens: Arc<TokenService>,
    credentials: CredentialStore,
    users: Arc<dyn UserLookup>,
    lookup_timeout: Duration,
}

impl PrincipalResolver {
    pub fn new(
        tokens: Arc<TokenService>,
        credentials: CredentialStore,
        users: Arc<dyn UserLookup>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            tokens,
            credentials,
            users,
            lookup_timeout,
        }
    }

    pub async fn resolve_from_token(
        &self,
        text: &str,
        now: OffsetDateTime,
    ) -> Result<Principal, AuthError> {
        let token = self.tokens.parse(text).map_err(|e| {
            debug!(error = %e, "bearer token rejected");
            AuthError::Unauthenticated
        })?;
        let subject = self.tokens.validate(&token, now).map_err(|e| {
            debug!(error = %e, "bearer token rejected");
            AuthError::Unauthenticated
        })?;

        match self.lookup(&subject).await? {
            Some(user) => Ok(Principal::from(&user)),
            None => {
                warn!(username = %subject, "token subject no longer exists");
                Err(AuthError::Unauthenticated)
            }
        }
    }

    pub async fn resolve_from_credentials(
        &self,
        username: &str,
        plain: &str,
    ) -> Result<Principal, AuthError> {
        let user = self.lookup(username).await?;

        let stored = user.as_ref().map(AuthSubject::password_hash_for_auth);
        let credentials = self.credentials.clone();
        let plain = plain.to_owned();
        // a miss still pays for one full verification
        let matches = tokio::task::spawn_blocking(move || match stored {
            Some(hash) => credentials.verify(&plain, &hash),
            None => credentials.verify_decoy(&plain),
        })
        .await
        .map_err(|e| {
            error!(error = %e, "password verification task failed");
            AuthError::Unauthenticated
        })?;

        match user {
            Some(user) if matches => Ok(Principal::from(&user)),
            _ => {
                warn!(%username, "invalid credentials");
                Err(AuthError::Unauthenticated)
            }
        }
    }

    async fn lookup(&self, username: &str) -> Result<Option<User>, AuthError> {
        match timeout(self.lookup_timeout, self.users.find_by_username(username)).await {
            Ok(Ok(user)) => Ok(user),
            Ok(Err(e)) => {
                error!(error = %e, "user lookup failed");
                Err(AuthError::Unauthenticated)
            }
            Err(_) => {
                error!(timeout_ms = self.lookup_timeout.as_millis() as u64, "user lookup timed out");
                Err(AuthError::Unauthenticated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{password::PasswordHash, repo_types::NewUser},
        config::JwtConfig,
        store::{memory::MemoryStore, Store},
    };
    use time::macros::datetime;

    const T0: OffsetDateTime = datetime!(2024-03-01 12:00 UTC);

    fn tokens() -> Arc<TokenService> {
        Arc::new(TokenService::new(&JwtConfig {
            secret: "resolver-test-secret-long-enough-1234".into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            ttl_minutes: 30,
        }))
    }

    async fn setup() -> (PrincipalResolver, Arc<TokenService>, User) {
        let credentials = CredentialStore::new().unwrap();
        let store = Arc::new(MemoryStore::default());
        let alice = store
            .create_user(NewUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password_hash: credentials.hash("Secret123").unwrap(),
                bio: None,
                profile_picture: None,
            })
            .await
            .unwrap();
        let tokens = tokens();
        let resolver = PrincipalResolver::new(
            tokens.clone(),
            credentials,
            store,
            Duration::from_secs(1),
        );
        (resolver, tokens, alice)
    }

    #[tokio::test]
    async fn token_resolves_to_user() {
        let (resolver, tokens, alice) = setup().await;
        let token = tokens.issue("alice", T0).unwrap();
        let principal = resolver.resolve_from_token(token.as_str(), T0).await.unwrap();
        assert_eq!(principal, Principal { user_id: alice.id, username: "alice".into() });
    }

    #[tokio::test]
    async fn token_failures_collapse_to_unauthenticated() {
        let (resolver, tokens, _) = setup().await;
        let token = tokens.issue("alice", T0).unwrap();

        let expired = resolver
            .resolve_from_token(token.as_str(), token.expires_at())
            .await;
        assert!(matches!(expired, Err(AuthError::Unauthenticated)));

        let garbage = resolver.resolve_from_token("garbage", T0).await;
        assert!(matches!(garbage, Err(AuthError::Unauthenticated)));

        let ghost = tokens.issue("ghost", T0).unwrap();
        let missing = resolver.resolve_from_token(ghost.as_str(), T0).await;
        assert!(matches!(missing, Err(AuthError::Unauthenticated)));
    }

    #[tokio::test]
    async fn credentials_resolve_only_with_right_password() {
        let (resolver, _, alice) = setup().await;
        let ok = resolver.resolve_from_credentials("alice", "Secret123").await.unwrap();
        assert_eq!(ok.user_id, alice.id);

        let wrong = resolver.resolve_from_credentials("alice", "wrong").await;
        let ghost = resolver.resolve_from_credentials("ghost", "Secret123").await;
        assert_eq!(
            wrong.unwrap_err().to_string(),
            ghost.unwrap_err().to_string()
        );
    }

    #[tokio::test]
    async fn unknown_user_costs_the_same_verification() {
        let credentials = CredentialStore::new().unwrap();
        let store = Arc::new(MemoryStore::default());
        store
            .create_user(NewUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password_hash: credentials.hash("Secret123").unwrap(),
                bio: None,
                profile_picture: None,
            })
            .await
            .unwrap();
        store
            .create_user(NewUser {
                username: "carol".into(),
                email: "carol@example.com".into(),
                password_hash: PasswordHash::from_stored("truncated$row"),
                bio: None,
                profile_picture: None,
            })
            .await
            .unwrap();
        let resolver = PrincipalResolver::new(
            tokens(),
            credentials.clone(),
            store,
            Duration::from_secs(1),
        );

        let before = credentials.verifications();
        assert!(resolver.resolve_from_credentials("ghost", "Secret123").await.is_err());
        assert_eq!(credentials.verifications() - before, 1);

        let before = credentials.verifications();
        assert!(resolver.resolve_from_credentials("alice", "Wrong1234").await.is_err());
        assert_eq!(credentials.verifications() - before, 1);

        let before = credentials.verifications();
        assert!(resolver.resolve_from_credentials("carol", "Secret123").await.is_err());
        assert_eq!(credentials.verifications() - before, 1);
    }

    struct SlowLookup;

    #[async_trait]
    impl UserLookup for SlowLookup {
        async fn find_by_username(&self, _username: &str) -> anyhow::Result<Option<User>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(None)
        }

        async fn find_by_email(&self, _email: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }
    }

    struct BrokenLookup;

    #[async_trait]
    impl UserLookup for BrokenLookup {
        async fn find_by_username(&self, _username: &str) -> anyhow::Result<Option<User>> {
            anyhow::bail!("connection refused")
        }

        async fn find_by_email(&self, _email: &str) -> anyhow::Result<Option<User>> {
            anyhow::bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn slow_or_failing_lookup_is_unauthenticated() {
        let tokens = tokens();
        let token = tokens.issue("alice", T0).unwrap();
        let credentials = CredentialStore::new().unwrap();

        let slow = PrincipalResolver::new(
            tokens.clone(),
            credentials.clone(),
            Arc::new(SlowLookup),
            Duration::from_millis(20),
        );
        assert!(matches!(
            slow.resolve_from_token(token.as_str(), T0).await,
            Err(AuthError::Unauthenticated)
        ));

        let broken = PrincipalResolver::new(
            tokens,
            credentials,
            Arc::new(BrokenLookup),
            Duration::from_secs(1),
        );
        assert!(matches!(
            broken.resolve_from_credentials("alice", "Secret123").await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn principal_from_user_copies_identity() {
        let user = User {
            id: Uuid::new_v4(),
            username: "bob".into(),
            email: "bob@example.com".into(),
            password_hash: "x".into(),
            bio: None,
            profile_picture: None,
            created_at: T0,
        };
        let p = Principal::from(&user);
        assert_eq!(p.user_id, user.id);
        assert_eq!(p.username, "bob");
    }
}
