use axum::http::HeaderMap;
use chrono::{DateTime, Utc};

use super::RpcError;
use crate::auth::{Session, SessionManager};
use crate::database::SharedStore;

/// Who is calling: either nobody, or a resolved session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Anonymous,
    Authenticated(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Anonymous => None,
            SessionState::Authenticated(session) => Some(session),
        }
    }
}

impl From<Option<Session>> for SessionState {
    fn from(session: Option<Session>) -> Self {
        session.map_or(SessionState::Anonymous, SessionState::Authenticated)
    }
}

/// Per-request context handed to public procedures
#[derive(Clone)]
pub struct Context {
    pub store: SharedStore,
    pub session: SessionState,
    /// Request time, used as "now" by input validation
    pub now: DateTime<Utc>,
}

/// Context of a protected procedure; the session is always present
#[derive(Clone)]
pub struct AuthedContext {
    pub store: SharedStore,
    pub session: Session,
    pub now: DateTime<Utc>,
}

impl Context {
    pub fn new(store: SharedStore, session: SessionState) -> Self {
        Self {
            store,
            session,
            now: Utc::now(),
        }
    }

    /// Narrow to an authenticated context or fail with UNAUTHORIZED
    pub fn authed(self) -> Result<AuthedContext, RpcError> {
        match self.session {
            SessionState::Authenticated(session) => Ok(AuthedContext {
                store: self.store,
                session,
                now: self.now,
            }),
            SessionState::Anonymous => Err(RpcError::unauthorized()),
        }
    }
}

impl AuthedContext {
    pub fn user_id(&self) -> &str {
        &self.session.user.id
    }
}

/// Build the context for one request. Never fails: unusable credentials
/// leave the caller anonymous.
pub async fn create_context(
    store: SharedStore,
    headers: &HeaderMap,
    sessions: &SessionManager,
) -> Context {
    let session = sessions.resolve(store.as_ref(), headers).await;
    Context::new(store, session.into())
}
