// Error handling for the catalog endpoints
// Renders the same `{success:false,message}` envelope as the auth core

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{debug, error, warn};

/// Main error type for the catalog handlers
#[derive(Debug)]
pub enum ApiError {
    /// Maps to HTTP 400 Bad Request
    ValidationError(validator::ValidationErrors),

    /// Unparseable path or body; maps to HTTP 400
    BadRequest(String),

    /// Maps to HTTP 404 Not Found
    NotFound { resource: String, id: String },

    /// Maps to HTTP 409 Conflict
    Conflict { message: String },

    /// Maps to HTTP 403 Forbidden
    Forbidden(String),

    /// Maps to HTTP 500; details stay in the logs
    DatabaseError(sqlx::Error),
}

/// Error envelope shared with the auth core
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    /// Field-level validation errors, omitted when empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl ErrorResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self.to_error_response())).into_response()
    }
}

impl ApiError {
    fn to_error_response(&self) -> ErrorResponse {
        match self {
            ApiError::ValidationError(errors) => {
                debug!("Validation error: {:?}", errors);
                ErrorResponse {
                    errors: Some(serde_json::to_value(errors).unwrap_or(serde_json::json!({}))),
                    ..ErrorResponse::new("request validation failed")
                }
            }
            ApiError::BadRequest(detail) => {
                debug!("Malformed request: {}", detail);
                ErrorResponse::new("malformed request")
            }
            ApiError::NotFound { resource, id } => {
                debug!("{} with id {} not found", resource, id);
                ErrorResponse::new(format!("{} with id {} not found", resource, id))
            }
            ApiError::Conflict { message } => {
                warn!("Conflict: {}", message);
                ErrorResponse::new(message.clone())
            }
            ApiError::Forbidden(message) => {
                warn!("Forbidden: {}", message);
                ErrorResponse::new(message.clone())
            }
            ApiError::DatabaseError(db_error) => {
                error!("Database error: {:?}", db_error);
                ErrorResponse::new("internal server error")
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            // a concurrent insert won the race past the duplicate check
            sqlx::Error::Database(ref db_error) if db_error.is_unique_violation() => {
                ApiError::Conflict {
                    message: "resource already exists".to_string(),
                }
            }
            _ => ApiError::DatabaseError(error),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;
    use sqlx::error::{DatabaseError, ErrorKind};

    async fn body_json(error: ApiError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_not_found_envelope() {
        let (status, body) = body_json(ApiError::NotFound {
            resource: "Product".to_string(),
            id: "42".to_string(),
        })
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Product with id 42 not found");
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn test_database_error_hides_details() {
        let (status, body) = body_json(ApiError::DatabaseError(sqlx::Error::RowNotFound)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "internal server error");
    }

    #[derive(Debug)]
    struct UniqueViolation;

    impl std::fmt::Display for UniqueViolation {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("duplicate key value violates unique constraint")
        }
    }

    impl std::error::Error for UniqueViolation {}

    impl DatabaseError for UniqueViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[tokio::test]
    async fn test_unique_violation_is_conflict() {
        let error: ApiError = sqlx::Error::Database(Box::new(UniqueViolation)).into();
        assert_eq!(error.status_code(), StatusCode::CONFLICT);

        let (status, body) = body_json(error).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "resource already exists");
    }

    #[tokio::test]
    async fn test_other_sqlx_errors_stay_internal() {
        let error: ApiError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_bad_request_hides_rejection_detail() {
        let (status, body) = body_json(ApiError::BadRequest(
            "Cannot parse `abc` to a `i64`".to_string(),
        ))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "malformed request");
        assert!(body.get("errors").is_none());
    }
}
