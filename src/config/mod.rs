use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Signing secret used in development when `AUTH_SECRET` is unset. Refused
/// in every other environment.
pub const DEVELOPMENT_AUTH_SECRET: &str = "skyshift-development-secret-change-me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("AUTH_SECRET must be set to a non-default value outside development")]
    InsecureAuthSecret,

    #[error("DATABASE_URL is required for the postgres store")]
    MissingDatabaseUrl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub query: QueryConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
    /// Insert the demo accounts when the server starts
    pub seed_on_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub secret: String,
    pub session_max_age_hours: u64,
    pub secure_cookies: bool,
}

/// Query-client cache policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub stale_time_secs: u64,
    pub retry: u32,
    pub refetch_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl AuthConfig {
    pub fn session_max_age(&self) -> Duration {
        Duration::from_secs(self.session_max_age_hours.saturating_mul(3600))
    }
}

impl QueryConfig {
    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }

    pub fn refetch_interval(&self) -> Option<Duration> {
        self.refetch_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    /// Reject configurations the server must not run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environment != Environment::Development
            && (self.auth.secret.is_empty() || self.auth.secret == DEVELOPMENT_AUTH_SECRET)
        {
            return Err(ConfigError::InsecureAuthSecret);
        }
        if self.database.backend == StoreBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        Ok(())
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("SKYSHIFT_HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("SKYSHIFT_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("SKYSHIFT_STORE") {
            self.database.backend = match v.as_str() {
                "memory" => StoreBackend::Memory,
                _ => StoreBackend::Postgres,
            };
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }
        if let Ok(v) = env::var("SKYSHIFT_SEED_ON_START") {
            self.database.seed_on_start = v.parse().unwrap_or(self.database.seed_on_start);
        }

        // Auth overrides
        if let Ok(v) = env::var("AUTH_SECRET") {
            self.auth.secret = v;
        }
        if let Ok(v) = env::var("AUTH_SESSION_MAX_AGE_HOURS") {
            self.auth.session_max_age_hours = v.parse().unwrap_or(self.auth.session_max_age_hours);
        }
        if let Ok(v) = env::var("AUTH_SECURE_COOKIES") {
            self.auth.secure_cookies = v.parse().unwrap_or(self.auth.secure_cookies);
        }

        // Query client overrides
        if let Ok(v) = env::var("QUERY_STALE_TIME_SECS") {
            self.query.stale_time_secs = v.parse().unwrap_or(self.query.stale_time_secs);
        }
        if let Ok(v) = env::var("QUERY_RETRY") {
            self.query.retry = v.parse().unwrap_or(self.query.retry);
        }
        if let Ok(v) = env::var("QUERY_REFETCH_INTERVAL_SECS") {
            self.query.refetch_interval_secs = v.parse().ok();
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
                seed_on_start: false,
            },
            auth: AuthConfig {
                secret: DEVELOPMENT_AUTH_SECRET.to_string(),
                session_max_age_hours: 24 * 30,
                secure_cookies: false,
            },
            query: QueryConfig {
                stale_time_secs: 30,
                retry: 1,
                refetch_interval_secs: None,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
                seed_on_start: false,
            },
            auth: AuthConfig {
                secret: String::new(),
                session_max_age_hours: 24 * 7,
                secure_cookies: true,
            },
            query: QueryConfig {
                stale_time_secs: 30,
                retry: 1,
                refetch_interval_secs: None,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.skyshift.app".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: false,
                seed_on_start: false,
            },
            auth: AuthConfig {
                secret: String::new(),
                session_max_age_hours: 24 * 7,
                secure_cookies: true,
            },
            query: QueryConfig {
                stale_time_secs: 30,
                retry: 1,
                refetch_interval_secs: None,
            },
            security: SecurityConfig {
                enable_cors: false,
                cors_origins: vec!["https://app.skyshift.app".to_string()],
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
