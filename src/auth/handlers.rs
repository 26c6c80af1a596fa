//! `/api/auth/*action`: the credentials sign-in flow plus session, CSRF and
//! provider discovery endpoints used by the login page and API clients.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Json, Redirect, Response},
};
use chrono::Utc;
use serde_json::{json, Map, Value};
use url::{form_urlencoded, Position, Url};

use super::{cookies, csrf, password, Session, SessionUser};
use crate::error::ApiError;
use crate::schemas::{Credentials, Schema};
use crate::AppState;

pub const DEFAULT_CALLBACK: &str = "/dashboard";

/// Error codes carried back to the login page as `?error=`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigninError {
    CredentialsSignin,
    MissingCsrf,
    Configuration,
}

impl SigninError {
    pub fn as_str(&self) -> &'static str {
        match self {
            SigninError::CredentialsSignin => "CredentialsSignin",
            SigninError::MissingCsrf => "MissingCSRF",
            SigninError::Configuration => "Configuration",
        }
    }

    /// Message shown on the login page for a `?error=` value
    pub fn describe(code: &str) -> &'static str {
        match code {
            "CredentialsSignin" => "Invalid email or password.",
            "MissingCSRF" => "Your sign-in form expired. Please try again.",
            "SessionRequired" => "Please sign in to continue.",
            _ => "Unable to sign in right now. Please try again later.",
        }
    }

    fn redirect(self) -> Response {
        Redirect::to(&format!("/login?error={}", self.as_str())).into_response()
    }
}

pub async fn auth_get(
    State(state): State<AppState>,
    Path(action): Path<String>,
    headers: HeaderMap,
) -> Response {
    match action.trim_end_matches('/') {
        "session" => session_get(&state, &headers).await,
        "csrf" => csrf_get(&state, &headers),
        "providers" => providers_get(),
        "signin" | "signin/credentials" => Redirect::to("/login").into_response(),
        other => unknown_action(other),
    }
}

pub async fn auth_post(
    State(state): State<AppState>,
    Path(action): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match action.trim_end_matches('/') {
        "callback/credentials" | "signin/credentials" => {
            let form = read_body(&headers, &body);
            credentials_callback(&state, &headers, &form).await
        }
        "session" => session_refresh(&state, &headers).await,
        "signout" => signout(&state),
        other => unknown_action(other),
    }
}

fn unknown_action(action: &str) -> Response {
    ApiError::not_found(format!("Unknown auth action '{}'", action)).into_response()
}

async fn session_get(state: &AppState, headers: &HeaderMap) -> Response {
    match state.sessions().resolve(state.store.as_ref(), headers).await {
        Some(session) => Json(session).into_response(),
        None => Json(json!({})).into_response(),
    }
}

/// Reuses the token from a still-valid CSRF cookie, otherwise issues one
fn csrf_get(state: &AppState, headers: &HeaderMap) -> Response {
    let secret = state.sessions().secret();
    let existing = cookies::cookie_value(headers, csrf::CSRF_COOKIE)
        .and_then(|cookie| csrf::token_from_cookie(cookie, secret).map(str::to_string));

    match existing {
        Some(token) => Json(json!({ "csrfToken": token })).into_response(),
        None => {
            let (token, cookie) = csrf::issue(secret);
            (
                [(header::SET_COOKIE, state.sessions().csrf_cookie(&cookie))],
                Json(json!({ "csrfToken": token })),
            )
                .into_response()
        }
    }
}

fn providers_get() -> Response {
    Json(json!({
        "credentials": {
            "id": "credentials",
            "name": "Credentials",
            "type": "credentials",
            "signinUrl": "/api/auth/signin/credentials",
            "callbackUrl": "/api/auth/callback/credentials"
        }
    }))
    .into_response()
}

/// JSON bodies are read as-is, anything else as a url-encoded form
fn read_body(headers: &HeaderMap, body: &Bytes) -> Value {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false);

    if is_json {
        return serde_json::from_slice(body).unwrap_or(Value::Null);
    }

    let fields: Map<String, Value> = form_urlencoded::parse(body)
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect();
    Value::Object(fields)
}

async fn credentials_callback(state: &AppState, headers: &HeaderMap, form: &Value) -> Response {
    let sessions = state.sessions();

    let submitted = form.get("csrfToken").and_then(Value::as_str).unwrap_or_default();
    let csrf_cookie = cookies::cookie_value(headers, csrf::CSRF_COOKIE);
    if !csrf::verify(submitted, csrf_cookie, sessions.secret()) {
        tracing::warn!("Rejected credentials sign-in with a missing or stale CSRF token");
        return SigninError::MissingCsrf.redirect();
    }

    let credentials = match Credentials::parse(form, Utc::now()) {
        Ok(credentials) => credentials,
        Err(e) => {
            tracing::debug!("Malformed credentials: {}", e);
            return SigninError::CredentialsSignin.redirect();
        }
    };

    let user = match authorize(state, &credentials).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::info!("Failed sign-in for {}", credentials.email);
            return SigninError::CredentialsSignin.redirect();
        }
        Err(e) => {
            tracing::error!("Sign-in for {} failed: {}", credentials.email, e);
            return SigninError::Configuration.redirect();
        }
    };

    let (token, _) = match sessions.issue(&user) {
        Ok(issued) => issued,
        Err(e) => {
            tracing::error!("Failed to sign session token: {}", e);
            return SigninError::Configuration.redirect();
        }
    };

    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
    let raw_callback = form.get("callbackUrl").and_then(Value::as_str);
    let target = safe_callback_url(raw_callback, host);

    tracing::info!("User {} signed in", user.id);
    (
        [(header::SET_COOKIE, sessions.session_cookie(&token))],
        Redirect::to(&target),
    )
        .into_response()
}

/// The user for a credentials pair, or `None` when they do not match.
/// Users without a stored password (external sign-in only) never match.
async fn authorize(
    state: &AppState,
    credentials: &Credentials,
) -> Result<Option<SessionUser>, ApiError> {
    let Some(user) = state.store.find_user_by_email(&credentials.email).await? else {
        return Ok(None);
    };
    let Some(hash) = user.password.as_deref() else {
        return Ok(None);
    };

    if password::verify_password(&credentials.password, hash).await? {
        Ok(Some(SessionUser::from(&user)))
    } else {
        Ok(None)
    }
}

/// Re-sign the token with a fresh expiry when a valid session exists
async fn session_refresh(state: &AppState, headers: &HeaderMap) -> Response {
    let sessions = state.sessions();
    let Some(session) = sessions.resolve(state.store.as_ref(), headers).await else {
        return Json(json!({})).into_response();
    };

    match sessions.issue(&session.user) {
        Ok((token, expires)) => (
            [(header::SET_COOKIE, sessions.session_cookie(&token))],
            Json(Session {
                user: session.user,
                expires,
            }),
        )
            .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

fn signout(state: &AppState) -> Response {
    (
        [(header::SET_COOKIE, state.sessions().clear_session_cookie())],
        Redirect::to("/login"),
    )
        .into_response()
}

/// Same-origin redirect target for a submitted `callbackUrl`
pub fn safe_callback_url(raw: Option<&str>, host: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return DEFAULT_CALLBACK.to_string();
    };

    if raw.starts_with('/') && !raw.starts_with("//") && !raw.starts_with("/\\") {
        return raw.to_string();
    }

    match (Url::parse(raw), host) {
        (Ok(url), Some(host))
            if matches!(url.scheme(), "http" | "https")
                && &url[Position::BeforeHost..Position::AfterPort] == host =>
        {
            url[Position::BeforePath..].to_string()
        }
        _ => {
            tracing::debug!("Ignoring cross-origin callback URL {}", raw);
            DEFAULT_CALLBACK.to_string()
        }
    }
}
