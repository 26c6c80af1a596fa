use axum::http::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::database::DatabaseError;
use crate::schemas::ValidationErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ParseError,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotSupported,
    Conflict,
    InternalServerError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::MethodNotSupported => "METHOD_NOT_SUPPORTED",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::ParseError | ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::MethodNotSupported => StatusCode::METHOD_NOT_ALLOWED,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error raised by a procedure or by the machinery around it
#[derive(Debug, Clone, Error)]
#[error("{}: {message}", .code.as_str())]
pub struct RpcError {
    pub code: ErrorCode,
    pub message: String,
    pub field_errors: Option<ValidationErrors>,
}

impl RpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            ErrorCode::Unauthorized,
            "You must be logged in to access this resource",
        )
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalServerError, message)
    }

    /// Only server-side failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        self.code == ErrorCode::InternalServerError
    }

    pub fn to_json(&self, path: &str) -> Value {
        let mut error = json!({
            "message": self.message,
            "code": self.code.as_str(),
            "httpStatus": self.code.http_status().as_u16(),
            "path": path,
        });
        if let Some(fields) = &self.field_errors {
            error["fieldErrors"] = json!(fields);
        }
        json!({ "error": error })
    }
}

impl From<ValidationErrors> for RpcError {
    fn from(errors: ValidationErrors) -> Self {
        Self {
            code: ErrorCode::BadRequest,
            message: errors.to_string(),
            field_errors: Some(errors),
        }
    }
}

impl From<DatabaseError> for RpcError {
    fn from(err: DatabaseError) -> Self {
        tracing::error!("Store error in procedure: {}", err);
        RpcError::internal("An error occurred while processing your request")
    }
}
