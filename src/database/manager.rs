use std::sync::Arc;
use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use super::{MemoryStore, PgStore, SharedStore};
use crate::config::{DatabaseConfig, StoreBackend};

/// Errors from the data-store layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Builds the configured store backend
pub struct DatabaseManager;

impl DatabaseManager {
    /// Connect the configured backend, running migrations first when enabled
    pub async fn connect(config: &DatabaseConfig) -> Result<SharedStore, DatabaseError> {
        match config.backend {
            StoreBackend::Memory => {
                info!("Using in-memory store");
                Ok(Arc::new(MemoryStore::new()))
            }
            StoreBackend::Postgres => {
                let pool = Self::pg_pool(config).await?;
                let store = PgStore::new(pool);
                if config.run_migrations {
                    store.migrate().await?;
                }
                Ok(Arc::new(store))
            }
        }
    }

    /// Open a PostgreSQL pool from `DATABASE_URL`
    pub async fn pg_pool(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let raw = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let redacted = Self::redacted_url(raw)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(raw)
            .await?;

        info!("Connected database pool: {}", redacted);
        Ok(pool)
    }

    /// Connection string with the password masked, safe for logs
    fn redacted_url(raw: &str) -> Result<String, DatabaseError> {
        let mut url = url::Url::parse(raw).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }
        if url.password().is_some() {
            url.set_password(Some("****"))
                .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        }
        Ok(url.into())
    }
}
