//! Error boundary for the dashboard pages. Handler errors and panics are
//! logged and rendered as a recoverable error page; other routes never see it.

use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};

use super::views::{document, escape};
use crate::database::DatabaseError;
use crate::rpc::{ErrorCode, RpcError};

/// Failure while rendering a dashboard page
#[derive(Debug)]
pub enum PageError {
    Rpc(RpcError),
    Store(DatabaseError),
}

impl From<RpcError> for PageError {
    fn from(err: RpcError) -> Self {
        PageError::Rpc(err)
    }
}

impl From<DatabaseError> for PageError {
    fn from(err: DatabaseError) -> Self {
        PageError::Store(err)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            // The session vanished between extraction and the call
            PageError::Rpc(err) if err.code == ErrorCode::Unauthorized => {
                Redirect::to("/login").into_response()
            }
            PageError::Rpc(err) => {
                tracing::error!("Dashboard page failed: {}", err);
                error_page()
            }
            PageError::Store(err) => {
                tracing::error!("Dashboard page failed: {}", err);
                error_page()
            }
        }
    }
}

pub fn error_page() -> Response {
    let body = format!(
        r#"<main class="error-boundary">
<h1>Something went wrong</h1>
<p>{}</p>
<p><a href="">Try again</a> <a href="/dashboard">Return to dashboard</a></p>
</main>"#,
        escape("We couldn't load this page. The problem has been logged.")
    );
    (StatusCode::INTERNAL_SERVER_ERROR, document("Error", &body)).into_response()
}

/// `CatchPanicLayer` hook for dashboard routes
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Dashboard handler panicked: {}", detail);
    error_page()
}
