use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use skyshift_api::config::config;
use skyshift_api::database::DatabaseManager;
use skyshift_api::{build_app, seed, AppState};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env if present so cargo run picks up DATABASE_URL, AUTH_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match serve().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("SkyShift server stopped: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = config();
    config.validate()?;
    info!("Starting SkyShift in {:?} mode", config.environment);

    let store = DatabaseManager::connect(&config.database).await?;

    if config.database.seed_on_start {
        match seed::seed_demo_accounts(store.as_ref()).await {
            Ok(report) => info!(
                "Demo accounts ready ({} created, {} existing)",
                report.created.len(),
                report.existing.len()
            ),
            Err(e) => {
                store.close().await;
                return Err(e.into());
            }
        }
    }

    let state = match AppState::new(config.clone(), store.clone()) {
        Ok(state) => state,
        Err(e) => {
            store.close().await;
            return Err(e.into());
        }
    };
    let refresher = state.query_client().spawn_refetch();

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            store.close().await;
            return Err(anyhow::anyhow!("failed to bind {}: {}", bind_addr, e));
        }
    };
    info!("SkyShift listening on http://{}", bind_addr);

    let served = axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some(handle) = refresher {
        handle.abort();
    }
    store.close().await;
    info!("Store closed");

    served.map_err(Into::into)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
