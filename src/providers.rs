//! Application-root providers: the shared query client and the session
//! provider used by page handlers.

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::Redirect;

use crate::auth::{Session, SessionManager};
use crate::query_client::QueryClient;
use crate::rpc::{Context, SessionState};
use crate::AppState;

#[derive(Clone)]
pub struct Providers {
    pub sessions: Arc<SessionManager>,
    pub query_client: Arc<QueryClient>,
}

impl Providers {
    pub fn new(sessions: SessionManager, query_client: QueryClient) -> Self {
        Self {
            sessions: Arc::new(sessions),
            query_client: Arc::new(query_client),
        }
    }
}

/// Session of the current request, if any
pub struct CurrentSession(pub Option<Session>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = state
            .sessions()
            .resolve(state.store.as_ref(), &parts.headers)
            .await;
        Ok(CurrentSession(session))
    }
}

/// Session of the current request; anonymous visitors are sent to `/login`
pub struct RequiredSession(pub Session);

impl RequiredSession {
    /// Procedure context for server-side calls made on behalf of this session
    pub fn context(&self, state: &AppState) -> Context {
        Context::new(
            state.store.clone(),
            SessionState::Authenticated(self.0.clone()),
        )
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequiredSession {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = CurrentSession::from_request_parts(parts, state)
            .await
            .unwrap_or(CurrentSession(None));
        session.map(RequiredSession).ok_or_else(|| {
            tracing::debug!("Anonymous request for {}, redirecting to login", parts.uri.path());
            Redirect::to("/login")
        })
    }
}
