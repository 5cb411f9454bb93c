//! Central error type and its axum integration.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Generic message for failures whose details must stay server-side.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong, try again later";

/// Every failure a request can end with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Missing or invalid input.
    #[error("{0}")]
    BadRequest(String),

    /// No, invalid, or expired session artifact, or wrong credentials.
    #[error("{0}")]
    Unauthenticated(String),

    /// Authenticated but lacking role or ownership.
    #[error("{0}")]
    Forbidden(String),

    /// Referenced resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Uniqueness violation reported by the document store.
    #[error("{0}")]
    DuplicateKey(String),

    /// Catch-all. The message is logged, never sent to the client.
    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::DuplicateKey(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to the client.
    pub fn public_message(&self) -> &str {
        match self {
            ApiError::Internal(_) => GENERIC_ERROR_MESSAGE,
            ApiError::BadRequest(msg)
            | ApiError::Unauthenticated(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::DuplicateKey(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!("Internal error: {}", detail);
        }

        let body = Json(serde_json::json!({
            "status": "error",
            "message": self.public_message(),
        }));

        (self.status_code(), body).into_response()
    }
}

impl From<surrealdb::Error> for ApiError {
    fn from(err: surrealdb::Error) -> Self {
        let message = err.to_string();
        match duplicate_field(&message) {
            Some(field) => ApiError::DuplicateKey(format!(
                "Duplicate value entered for {} field, please choose another value",
                field
            )),
            None => ApiError::Internal(message),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("Task join error: {}", err))
    }
}

/// Extract the offending field from a unique-index violation message.
///
/// SurrealDB reports these as "Database index `<name>` already contains ...".
fn duplicate_field(message: &str) -> Option<&'static str> {
    if !message.contains("already contains") {
        return None;
    }

    let index = message.split('`').nth(1).unwrap_or_default();
    let field = match index {
        "user_email" => "email",
        "user_user_id" => "userId",
        "review_product_user" => "product, user",
        _ => "unique",
    };

    Some(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthenticated("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::DuplicateKey("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_message_is_hidden() {
        let err = ApiError::Internal("connection refused on 10.0.0.3".into());
        assert_eq!(err.public_message(), GENERIC_ERROR_MESSAGE);

        let err = ApiError::NotFound("No user with id : 42".into());
        assert_eq!(err.public_message(), "No user with id : 42");
    }

    #[test]
    fn test_duplicate_field_detection() {
        let msg = "Database index `user_email` already contains 'a@x.com', with record `user:abc`";
        assert_eq!(duplicate_field(msg), Some("email"));

        let msg = "Database index `review_product_user` already contains ['p', 'u'], with record `review:r`";
        assert_eq!(duplicate_field(msg), Some("product, user"));

        assert_eq!(duplicate_field("The query was not executed"), None);
    }
}
