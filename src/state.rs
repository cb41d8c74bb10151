use std::sync::Arc;

use tracing::info;

use crate::auth::jwt::JwtKeys;
use crate::auth::repo::{DynamoUserStore, UserStore};
use crate::config::{AppConfig, StoreBackend};
use crate::journals::repo::{DynamoJournalStore, JournalStore};
use crate::memory::{MemoryJournalStore, MemoryUserStore};
use crate::storage;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub users: Arc<dyn UserStore>,
    pub journals: Arc<dyn JournalStore>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let jwt = JwtKeys::new(&config.jwt);

        let (users, journals) = match config.store.backend {
            StoreBackend::DynamoDb => {
                let client = storage::connect(&config.store).await;
                let users = Arc::new(DynamoUserStore::new(
                    client.clone(),
                    &config.store.users_table,
                    &config.store.users_email_index,
                )) as Arc<dyn UserStore>;
                let journals = Arc::new(DynamoJournalStore::new(
                    client,
                    &config.store.journals_table,
                )) as Arc<dyn JournalStore>;
                (users, journals)
            }
            StoreBackend::Memory => {
                info!("using in-memory stores; data is lost on restart");
                (
                    Arc::new(MemoryUserStore::default()) as Arc<dyn UserStore>,
                    Arc::new(MemoryJournalStore::default()) as Arc<dyn JournalStore>,
                )
            }
        };

        Ok(Self::from_parts(config, jwt, users, journals))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        jwt: JwtKeys,
        users: Arc<dyn UserStore>,
        journals: Arc<dyn JournalStore>,
    ) -> Self {
        Self {
            config,
            jwt,
            users,
            journals,
        }
    }

    /// In-memory state with a fixed JWT config, for tests.
    #[cfg(test)]
    pub fn fake() -> Self {
        let config = AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors_origin: None,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            store: crate::config::StoreConfig {
                backend: StoreBackend::Memory,
                region: "us-west-2".into(),
                endpoint: None,
                access_key: None,
                secret_key: None,
                users_table: "Users".into(),
                users_email_index: "email-index".into(),
                journals_table: "JournalEntries".into(),
            },
        };
        let jwt = JwtKeys::new(&config.jwt);
        Self::from_parts(
            Arc::new(config),
            jwt,
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryJournalStore::default()),
        )
    }
}
