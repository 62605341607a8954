use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use perch_models::PerchModelError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PerchError {
    #[error("Database Error: {0}")]
    Database(#[from] PerchModelError),
    #[error("SQLx Error: {0}")]
    SQLx(#[from] sqlx::Error),
    #[error("SQL Migration Error: {0}")]
    SQLMigration(#[from] sqlx::migrate::MigrateError),
    #[error("IO Error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Serde: JSON: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Envy Error: {0}")]
    Envy(#[from] envy::Error),
    #[error("Could not parse URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Could not join thread: {0}")]
    JoinError(#[from] tokio::task::JoinError),
    #[error("No credential presented")]
    Unauthorized,
    #[error("Credential was not accepted")]
    InvalidCredential,
    #[error("Access has been denied")]
    Forbidden,
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Other Error: {0:?}")]
    Other(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type PerchResult<T> = std::result::Result<T, PerchError>;

impl PerchError {
    pub fn status(&self) -> StatusCode {
        match self {
            PerchError::Unauthorized | PerchError::InvalidCredential => StatusCode::UNAUTHORIZED,
            PerchError::Forbidden => StatusCode::FORBIDDEN,
            PerchError::Validation(_)
            | PerchError::Database(PerchModelError::EmptyMessage)
            | PerchError::Database(PerchModelError::SelfConversation) => StatusCode::BAD_REQUEST,
            PerchError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PerchError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            // never leak internals to the caller
            error!("error presented to user: {:?}", self);
            "internal error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn credential_failures_are_unauthorized() {
        assert_eq!(PerchError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            PerchError::InvalidCredential.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn membership_failures_are_forbidden() {
        assert_eq!(PerchError::Forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn validation_failures_are_bad_requests() {
        assert_eq!(
            PerchError::Validation("empty message".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PerchError::Database(PerchModelError::EmptyMessage).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PerchError::Database(PerchModelError::SelfConversation).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn lookups_and_the_rest_map_to_404_and_500() {
        assert_eq!(
            PerchError::NotFound("conversation".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PerchError::Other("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
