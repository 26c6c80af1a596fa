pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod pages;
pub mod providers;
pub mod query_client;
pub mod rpc;
pub mod schemas;
pub mod seed;

#[cfg(test)]
pub mod testing;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{AuthError, SessionManager};
use crate::config::{AppConfig, SecurityConfig};
use crate::database::SharedStore;
use crate::providers::Providers;
use crate::query_client::QueryClient;
use crate::rpc::{app_router, RpcRouter};

/// Everything a request handler may need, cloned per request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: SharedStore,
    pub rpc: Arc<RpcRouter>,
    pub providers: Providers,
}

impl AppState {
    pub fn new(config: AppConfig, store: SharedStore) -> Result<Self, AuthError> {
        let rpc = Arc::new(app_router());
        let sessions = SessionManager::new(&config.auth)?;
        let query_client = QueryClient::new(Arc::clone(&rpc), &config.query);

        Ok(Self {
            config: Arc::new(config),
            store,
            rpc,
            providers: Providers::new(sessions, query_client),
        })
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.providers.sessions
    }

    pub fn query_client(&self) -> &Arc<QueryClient> {
        &self.providers.query_client
    }

    #[cfg(test)]
    pub fn for_tests(store: SharedStore) -> Self {
        Self::new(AppConfig::development(), store).expect("development config is valid")
    }
}

/// Complete HTTP application: health, auth endpoint, RPC endpoint and pages
pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security);

    Router::new()
        .route("/health", get(health))
        .route(
            "/api/auth/*action",
            get(auth::handlers::auth_get).post(auth::handlers::auth_post),
        )
        .merge(rpc::adapter::routes())
        .merge(pages::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
