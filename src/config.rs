use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Which store implementation backs the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    DynamoDb,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub users_table: String,
    pub users_email_index: String,
    pub journals_table: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: Option<String>,
    pub jwt: JwtConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; fails on a missing JWT secret
    /// so misconfiguration surfaces at startup rather than per request.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secret = optional("JWT_SECRET").context("JWT_SECRET must be set")?;

        let ttl_minutes = var_or("JWT_TTL_MINUTES", "60")
            .parse::<i64>()
            .context("JWT_TTL_MINUTES must be an integer")?;
        if ttl_minutes <= 0 {
            bail!("JWT_TTL_MINUTES must be positive");
        }

        let jwt = JwtConfig {
            secret,
            issuer: var_or("JWT_ISSUER", "tennis-journal"),
            audience: var_or("JWT_AUDIENCE", "tennis-journal-users"),
            ttl_minutes,
        };

        let backend = match var_or("STORE_BACKEND", "dynamodb").to_lowercase().as_str() {
            "dynamodb" | "dynamo" => StoreBackend::DynamoDb,
            "memory" => StoreBackend::Memory,
            other => bail!("unknown STORE_BACKEND: {other}"),
        };

        let store = StoreConfig {
            backend,
            region: var_or("AWS_REGION", "us-west-2"),
            endpoint: optional("DYNAMODB_ENDPOINT"),
            access_key: optional("AWS_ACCESS_KEY_ID"),
            secret_key: optional("AWS_SECRET_ACCESS_KEY"),
            users_table: var_or("USERS_TABLE", "Users"),
            users_email_index: var_or("USERS_EMAIL_INDEX", "email-index"),
            journals_table: var_or("JOURNALS_TABLE", "JournalEntries"),
        };

        let port = var_or("APP_PORT", "8080")
            .parse::<u16>()
            .context("APP_PORT must be a port number")?;

        Ok(Self {
            host: var_or("APP_HOST", "0.0.0.0"),
            port,
            cors_origin: optional("CORS_ORIGIN"),
            jwt,
            store,
        })
    }
}
