use crate::cli::output::output_success;
use crate::cli::OutputFormat;
use crate::config::{AppConfig, StoreBackend};
use crate::database::{DatabaseManager, PgStore, Store};

pub async fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    config.validate()?;
    if config.database.backend == StoreBackend::Memory {
        return output_success(output_format, "In-memory store has no migrations", None);
    }

    let store = PgStore::new(DatabaseManager::pg_pool(&config.database).await?);
    let result = store.migrate().await;
    store.close().await;
    result?;

    output_success(output_format, "Migrations applied", None)
}
