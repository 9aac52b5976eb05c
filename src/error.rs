use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Field name -> messages, in the order they were raised.
#[derive(Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct FormErrors {
    pub errors: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FormErrors::default();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), ServerError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServerError::Validation(self))
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("There was a problem with the database")]
    DbError(#[from] diesel::result::Error),

    #[error("Couldn't get a database connection")]
    PoolError(#[from] diesel::r2d2::PoolError),

    #[error("The in-memory store is poisoned")]
    Poisoned,

    #[error("Couldn't hash password: {0}")]
    Hashing(String),

    #[error("Not found")]
    NotFound,

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("{0}")]
    BadRequest(String),

    #[error("Form is invalid")]
    Validation(FormErrors),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            // invalid forms are answered like a re-rendered form, not as a failure
            ServerError::Validation(errors) => {
                return (StatusCode::OK, Json(errors.clone())).into_response();
            }
            ServerError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::DbError(e) => {
                error!("database error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            ServerError::PoolError(e) => {
                error!("connection pool error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            ServerError::Poisoned | ServerError::Hashing(_) => {
                error!("{self}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}
