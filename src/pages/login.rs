use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use super::views::{document, escape};
use crate::auth::handlers::SigninError;
use crate::auth::{cookies, csrf};
use crate::providers::CurrentSession;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginQuery {
    pub error: Option<String>,
    pub callback_url: Option<String>,
}

pub async fn page(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(query): Query<LoginQuery>,
    headers: HeaderMap,
) -> Response {
    if session.is_some() {
        return Redirect::to("/dashboard").into_response();
    }

    let secret = state.sessions().secret();
    let existing = cookies::cookie_value(&headers, csrf::CSRF_COOKIE)
        .and_then(|cookie| csrf::token_from_cookie(cookie, secret).map(str::to_string));
    let (token, new_cookie) = match existing {
        Some(token) => (token, None),
        None => {
            let (token, cookie) = csrf::issue(secret);
            (token, Some(state.sessions().csrf_cookie(&cookie)))
        }
    };

    let html = render(&token, &query);
    match new_cookie {
        Some(cookie) => ([(header::SET_COOKIE, cookie)], html).into_response(),
        None => html.into_response(),
    }
}

fn render(csrf_token: &str, query: &LoginQuery) -> axum::response::Html<String> {
    let alert = query
        .error
        .as_deref()
        .map(|code| format!(r#"<p class="alert" role="alert">{}</p>"#, escape(SigninError::describe(code))))
        .unwrap_or_default();
    let callback = query.callback_url.as_deref().unwrap_or("/dashboard");

    let body = format!(
        r#"<main class="login">
<h1>Sign in to SkyShift</h1>
{alert}
<form method="post" action="/api/auth/callback/credentials">
<input type="hidden" name="csrfToken" value="{csrf}">
<input type="hidden" name="callbackUrl" value="{callback}">
<label>Email <input type="email" name="email" autocomplete="username" required></label>
<label>Password <input type="password" name="password" autocomplete="current-password" required></label>
<button type="submit">Sign in</button>
</form>
<p class="hint">Demo accounts: student@skyshift.com, instructor@skyshift.com, admin@skyshift.com (password: password123)</p>
</main>"#,
        alert = alert,
        csrf = escape(csrf_token),
        callback = escape(callback),
    );
    document("Sign in", &body)
}
