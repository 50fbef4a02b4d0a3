use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::auth::validate::ValidationError;

/// Errors surfaced by the auth endpoints.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Body that is not a JSON object of the expected shape.
    #[error("Invalid request body: {0}")]
    BadRequest(String),

    /// Unknown email and wrong password share this variant so callers cannot
    /// tell them apart.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("Email already registered")]
    EmailTaken,

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Errors raised by a `UserStore` backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate email")]
    Duplicate,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => AuthError::EmailTaken,
            StoreError::Database(e) => AuthError::Internal(e.into()),
        }
    }
}

impl From<JsonRejection> for AuthError {
    fn from(e: JsonRejection) -> Self {
        AuthError::BadRequest(e.body_text())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AuthError::Validation(v) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": v.message, "field": v.field.name(), "type": v.kind.code() }),
            ),
            AuthError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() }))
            }
            AuthError::InvalidCredentials | AuthError::Unauthorized(_) => {
                (StatusCode::UNAUTHORIZED, json!({ "error": self.to_string() }))
            }
            AuthError::EmailTaken => (StatusCode::CONFLICT, json!({ "error": self.to_string() })),
            AuthError::Config(ref msg) => {
                error!(error = %msg, "configuration error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
            AuthError::Internal(ref e) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
