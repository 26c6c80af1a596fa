pub mod health;
pub mod migrate;
pub mod seed;

use crate::config::AppConfig;
use crate::database::{DatabaseManager, SharedStore};

/// Open the configured store after validating the configuration
pub(crate) async fn open_store(config: &AppConfig) -> anyhow::Result<SharedStore> {
    config.validate()?;
    Ok(DatabaseManager::connect(&config.database).await?)
}
