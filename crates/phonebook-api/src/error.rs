//! API error type and its mapping onto the response envelope

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use phonebook_db::RepositoryError;
use thiserror::Error;
use tracing::{debug, error};

use crate::accounts::AccountError;
use crate::models::ApiResponse;

/// Every failure a handler or the gate can report.
///
/// Server-side variants carry a detail string that is logged but never sent
/// to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    AlreadyExists(String),

    /// Unknown login and wrong password look the same from outside
    #[error("invalid login or password")]
    InvalidCredentials,

    #[error("{0}")]
    NotFound(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::AlreadyExists(_)
            | ApiError::InvalidCredentials => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code placed in the envelope's `description`
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::AlreadyExists(_) => "already_exists",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::NotFound(_) => "not_found",
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Storage(_) => "storage_error",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Storage(_) | ApiError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(code = self.code(), "Request failed: {}", self);
        } else {
            debug!(code = self.code(), "Request rejected: {}", self);
        }

        ApiResponse::new(status, self.code(), self.public_message()).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ApiError::NotFound("record not found".to_string()),
            RepositoryError::Conflict(detail) => ApiError::AlreadyExists(detail),
            RepositoryError::MissingReference(_) => {
                ApiError::NotFound("user not found".to_string())
            }
            RepositoryError::Database(e) => ApiError::Storage(e.to_string()),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(message) => ApiError::Validation(message),
            AccountError::AlreadyExists => ApiError::AlreadyExists("user already exists".to_string()),
            AccountError::UnknownLogin | AccountError::InvalidCredentials => {
                ApiError::InvalidCredentials
            }
            AccountError::NotFound => ApiError::NotFound("user not found".to_string()),
            AccountError::Storage(e) => ApiError::Storage(e.to_string()),
            AccountError::Internal(detail) => ApiError::Internal(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_validation_error_envelope() {
        let (status, body) = body_json(ApiError::Validation("login too short".to_string())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert_eq!(body["description"], "validation_error");
        assert_eq!(body["data"], "login too short");
    }

    #[tokio::test]
    async fn test_server_errors_hide_detail() {
        let (status, body) =
            body_json(ApiError::Storage("connection refused at 10.0.0.3".to_string())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["description"], "storage_error");
        assert_eq!(body["data"], "internal server error");
    }

    #[test]
    fn test_missing_owner_is_not_found() {
        let err = ApiError::from(RepositoryError::MissingReference(
            "FOREIGN KEY constraint failed".to_string(),
        ));

        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn test_login_failures_collapse() {
        let unknown = ApiError::from(AccountError::UnknownLogin);
        let wrong = ApiError::from(AccountError::InvalidCredentials);

        assert_eq!(unknown.code(), wrong.code());
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_status_table() {
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Forbidden(String::new()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound(String::new()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::AlreadyExists(String::new()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Internal(String::new()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
