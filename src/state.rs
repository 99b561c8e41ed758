use std::{sync::Arc, time::Duration};

use crate::auth::{
    jwt::TokenService, password::CredentialStore, principal::UserLookup, session::AuthSession,
};
use crate::clock::{Clock, SystemClock};
use crate::config::{AppConfig, StoreBackend};
use crate::store::{memory::MemoryStore, pg::PgStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub users: Arc<dyn UserLookup>,
    pub auth: AuthSession,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let clock = Arc::new(SystemClock) as Arc<dyn Clock>;

        match (config.store_backend, config.database_url.as_deref()) {
            (StoreBackend::Postgres, Some(url)) => {
                let store = Arc::new(PgStore::connect(url).await?);
                Self::from_parts(config, store, clock)
            }
            (StoreBackend::Postgres, None) => {
                anyhow::bail!("DATABASE_URL is required for the postgres store")
            }
            (StoreBackend::Memory, _) => {
                tracing::warn!("using the in-memory store; data is lost on restart");
                Self::from_parts(config, Arc::new(MemoryStore::default()), clock)
            }
        }
    }

    /// Wires the auth core on top of one store that serves both the entity
    /// tables and account lookups.
    pub fn from_parts<S>(
        config: Arc<AppConfig>,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self>
    where
        S: Store + UserLookup + 'static,
    {
        let tokens = Arc::new(TokenService::new(&config.jwt));
        let credentials = CredentialStore::new()?;
        let users = store.clone() as Arc<dyn UserLookup>;
        let auth = AuthSession::new(
            tokens,
            credentials,
            users.clone(),
            clock,
            Duration::from_millis(config.lookup_timeout_ms),
        );
        Ok(Self {
            config,
            store,
            users,
            auth,
        })
    }

    #[cfg(test)]
    pub fn fake(clock: Arc<crate::clock::FixedClock>) -> Self {
        use crate::config::JwtConfig;

        let config = Arc::new(AppConfig {
            database_url: None,
            store_backend: StoreBackend::Memory,
            jwt: JwtConfig {
                secret: "app-test-secret-app-test-secret-app-test".into(),
                issuer: "test".into(),
                audience: "test".into(),
                ttl_minutes: 60,
            },
            lookup_timeout_ms: 1000,
        });
        Self::from_parts(config, Arc::new(MemoryStore::default()), clock).expect("fake state")
    }
}
