//! HTTP binding for procedures: `GET|POST /api/trpc/:path`.
//!
//! Queries are read with GET and take their input as the URL-encoded JSON
//! `input` parameter. Mutations are sent with POST and a JSON body.

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use url::form_urlencoded;

use super::{create_context, ErrorCode, ProcedureKind, RpcError};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/api/trpc/:path",
        get(rpc_get).post(rpc_post).fallback(unsupported_method),
    )
}

async fn rpc_get(
    State(state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let input = match query_input(query.as_deref()) {
        Ok(input) => input,
        Err(e) => return respond(&path, Err(e)),
    };

    let ctx = create_context(state.store.clone(), &headers, state.sessions()).await;
    let result = state.rpc.call(&path, ProcedureKind::Query, ctx, input).await;
    respond(&path, result)
}

async fn rpc_post(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let input = match body_input(&body) {
        Ok(input) => input,
        Err(e) => return respond(&path, Err(e)),
    };

    let ctx = create_context(state.store.clone(), &headers, state.sessions()).await;
    let result = state.rpc.call(&path, ProcedureKind::Mutation, ctx, input).await;

    if result.is_ok() {
        // Cached reads of this namespace are now stale
        let namespace = path.split('.').next().unwrap_or_default();
        state.query_client().invalidate(namespace).await;
    }
    respond(&path, result)
}

async fn unsupported_method(Path(path): Path<String>) -> Response {
    let err = RpcError::new(
        ErrorCode::MethodNotSupported,
        "Only GET and POST are supported",
    );
    respond(&path, Err(err))
}

/// `input` query parameter as JSON; absent means no input
fn query_input(query: Option<&str>) -> Result<Value, RpcError> {
    let raw = query.and_then(|q| {
        form_urlencoded::parse(q.as_bytes())
            .find(|(key, _)| key == "input")
            .map(|(_, value)| value.into_owned())
    });

    match raw {
        None => Ok(Value::Null),
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| RpcError::parse_error(format!("Invalid JSON in input parameter: {}", e))),
    }
}

fn body_input(body: &[u8]) -> Result<Value, RpcError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body)
        .map_err(|e| RpcError::parse_error(format!("Invalid JSON body: {}", e)))
}

fn respond(path: &str, result: Result<Value, RpcError>) -> Response {
    match result {
        Ok(data) => Json(json!({ "result": { "data": data } })).into_response(),
        Err(e) => {
            if e.code == ErrorCode::InternalServerError {
                tracing::error!("Procedure {} failed: {}", path, e);
            } else {
                tracing::debug!("Procedure {} rejected: {}", path, e);
            }
            (e.code.http_status(), Json(e.to_json(path))).into_response()
        }
    }
}
