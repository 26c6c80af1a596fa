use serde_json::json;

use super::open_store;
use crate::cli::output::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;

pub async fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let checked = store.health_check().await;
    let users = match &checked {
        Ok(()) => store.count_users().await.ok(),
        Err(_) => None,
    };
    store.close().await;

    match checked {
        Ok(()) => output_success(
            output_format,
            "Store is reachable",
            Some(json!({
                "environment": format!("{:?}", config.environment),
                "backend": format!("{:?}", config.database.backend),
                "users": users,
            })),
        ),
        Err(e) => {
            output_error(output_format, &e.to_string(), Some("STORE_UNAVAILABLE"))?;
            Err(e.into())
        }
    }
}
