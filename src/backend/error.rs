use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::database::db::gmail::ConnectionError;

/// Error surface of the HTTP API. Every handler returns `Result<_, ApiError>`
/// and the `IntoResponse` impl below decides the status code and JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("missing or invalid bearer token")]
    Unauthorized,
    #[error(transparent)]
    Db(sqlx::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Csv(#[from] csv::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::NotFound("record"),
            sqlx::Error::Database(db) => match db.code().as_deref() {
                // unique_violation
                Some("23505") => ApiError::Conflict("a conflicting record already exists".into()),
                // foreign_key_violation: the payload referenced a missing row
                Some("23503") => ApiError::Validation("referenced record does not exist".into()),
                // check_violation: a CHECK constraint caught what validation missed
                Some("23514") => ApiError::Validation(db.message().to_string()),
                _ => ApiError::Db(err),
            },
            _ => ApiError::Db(err),
        }
    }
}

impl From<ConnectionError> for ApiError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::LockUnavailable => ApiError::Unavailable(err.to_string()),
            ConnectionError::Db(db) => db.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Db(err) => {
                tracing::error!(%err, "database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
            }
            ApiError::Io(err) => {
                tracing::error!(%err, "io error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
            }
            ApiError::Csv(err) => {
                tracing::error!(%err, "csv export error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Maps `RowNotFound` to a 404 naming the entity; other errors pass through.
pub fn not_found(entity: &'static str) -> impl FnOnce(sqlx::Error) -> ApiError {
    move |err| match err {
        sqlx::Error::RowNotFound => ApiError::NotFound(entity),
        other => other.into(),
    }
}
