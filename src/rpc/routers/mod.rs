pub mod flight;
pub mod user;

use chrono::Utc;
use serde_json::json;

use super::procedure::{public_procedure, Procedure};

/// Liveness probe reachable without a session
pub fn health() -> Procedure {
    public_procedure().query(|_ctx, ()| async { Ok(json!({ "status": "ok", "timestamp": Utc::now() })) })
}
