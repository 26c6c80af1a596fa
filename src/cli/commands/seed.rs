use serde_json::json;

use super::open_store;
use crate::cli::output::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::seed::seed_demo_accounts;

pub async fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let result = seed_demo_accounts(store.as_ref()).await;
    store.close().await;

    match result {
        Ok(report) => output_success(
            output_format,
            &format!(
                "Demo accounts ready: {} created, {} already present",
                report.created.len(),
                report.existing.len()
            ),
            Some(json!({ "created": report.created, "existing": report.existing })),
        ),
        Err(e) => {
            output_error(output_format, &e.to_string(), Some("SEED_FAILED"))?;
            Err(e.into())
        }
    }
}
