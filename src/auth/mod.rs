pub mod cookies;
pub mod csrf;
pub mod handlers;
pub mod password;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use axum::http::{header, HeaderMap};

use crate::config::AuthConfig;
use crate::database::models::{Role, TrainingLevel, User};
use crate::database::Store;

pub const SESSION_COOKIE: &str = "skyshift.session-token";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Auth secret is not configured")]
    InvalidSecret,

    #[error("Session max age is out of range")]
    InvalidSessionAge,

    #[error("Session token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Signed session token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// The user as seen by the rest of the application
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
    pub training_level: TrainingLevel,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            training_level: user.training_level,
        }
    }
}

impl SessionUser {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Proof of an authenticated user for the current request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub user: SessionUser,
    pub expires: DateTime<Utc>,
}

/// Issues, reads and clears session tokens
pub struct SessionManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    secret: String,
    max_age: Duration,
    secure_cookies: bool,
}

impl SessionManager {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        if config.secret.is_empty() {
            return Err(AuthError::InvalidSecret);
        }
        let max_age = Duration::from_std(config.session_max_age())
            .map_err(|_| AuthError::InvalidSessionAge)?;
        if Utc::now().checked_add_signed(max_age).is_none() {
            return Err(AuthError::InvalidSessionAge);
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            secret: config.secret.clone(),
            max_age,
            secure_cookies: config.secure_cookies,
        })
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub(crate) fn secret(&self) -> &str {
        &self.secret
    }

    /// Sign a fresh token for `user`; returns the token and its expiry
    pub fn issue(&self, user: &SessionUser) -> Result<(String, DateTime<Utc>), AuthError> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.max_age)
            .ok_or(AuthError::InvalidSessionAge)?;
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok((token, expires))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    /// Resolve the session for a request. Never fails: any problem with the
    /// token, or a user that no longer exists, means anonymous.
    pub async fn resolve(&self, store: &dyn Store, headers: &HeaderMap) -> Option<Session> {
        let token = Self::token_from_headers(headers)?;

        let claims = match self.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("Ignoring session token: {}", e);
                return None;
            }
        };

        let user = match store.find_user_by_id(&claims.sub).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::debug!("Session user {} no longer exists", claims.sub);
                return None;
            }
            Err(e) => {
                tracing::warn!("Session lookup failed for {}: {}", claims.sub, e);
                return None;
            }
        };

        Some(Session {
            user: SessionUser::from(&user),
            expires: Utc.timestamp_opt(claims.exp, 0).single()?,
        })
    }

    /// Session cookie first, then `Authorization: Bearer`
    fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
        if let Some(token) = cookies::cookie_value(headers, SESSION_COOKIE) {
            return Some(token);
        }
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn session_cookie(&self, token: &str) -> String {
        cookies::build(SESSION_COOKIE, token, self.max_age.num_seconds(), self.secure_cookies)
    }

    pub fn clear_session_cookie(&self) -> String {
        cookies::build(SESSION_COOKIE, "", 0, self.secure_cookies)
    }

    /// CSRF cookie for `value`, valid for one session lifetime
    pub fn csrf_cookie(&self, value: &str) -> String {
        cookies::build(csrf::CSRF_COOKIE, value, self.max_age.num_seconds(), self.secure_cookies)
    }
}
