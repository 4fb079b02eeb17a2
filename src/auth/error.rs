// Authentication and authorization error types

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use tracing::{debug, error, warn};
use crate::auth::models::Role;

/// Authentication and authorization error types
///
/// Every gate matches on these variants explicitly; each one renders a fixed
/// status code and a fixed client-facing message.
#[derive(Debug)]
pub enum AuthError {
    // Token lifecycle errors
    MissingToken,
    ExpiredToken,
    InvalidToken,
    IdentityNotFound,
    RefreshFailed,
    /// Missing or invalid token presented on a refresh-tolerant route
    RefreshRejected,
    /// Unexpected failure while authenticating (store unavailable, etc.)
    AuthenticationInternal(String),

    // Authorization errors
    AccountDeactivated,
    AuthenticationRequired,
    /// User lacks required permissions for the operation
    /// Contains the required role and the user's actual role
    InsufficientPermissions {
        required: Role,
        actual: Role,
    },

    // Account flow errors
    ValidationError(validator::ValidationErrors),
    /// Path or body that could not be parsed; detail is logged only
    MalformedRequest(String),
    /// Login throttle tripped for the caller
    TooManyRequests,
    InvalidCredentials,
    EmailAlreadyExists,
    CannotModifySelf,
    DatabaseError(String),
    PasswordHashError,
    TokenGenerationError(String),
    ConfigError(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing authentication token"),
            AuthError::ExpiredToken => write!(f, "Token has expired"),
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::IdentityNotFound => write!(f, "Token subject does not resolve to a user"),
            AuthError::RefreshFailed => write!(f, "Token could not be refreshed"),
            AuthError::RefreshRejected => write!(f, "Invalid token on refresh-tolerant route"),
            AuthError::AuthenticationInternal(msg) => write!(f, "Authentication error: {}", msg),
            AuthError::AccountDeactivated => write!(f, "Account is deactivated"),
            AuthError::AuthenticationRequired => write!(f, "Authentication required"),
            AuthError::InsufficientPermissions { required, actual } => {
                write!(f, "Insufficient permissions: required role '{}', but user has role '{}'", required, actual)
            }
            AuthError::ValidationError(errors) => write!(f, "Validation error: {}", errors),
            AuthError::MalformedRequest(detail) => write!(f, "Malformed request: {}", detail),
            AuthError::TooManyRequests => write!(f, "Too many login attempts"),
            AuthError::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthError::EmailAlreadyExists => write!(f, "Email already exists"),
            AuthError::CannotModifySelf => write!(f, "Administrators cannot change their own role or status"),
            AuthError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AuthError::PasswordHashError => write!(f, "Password hashing error"),
            AuthError::TokenGenerationError(msg) => write!(f, "Token generation error: {}", msg),
            AuthError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::MissingToken => debug!("Request without bearer token"),
            AuthError::ExpiredToken => debug!("Expired token presented"),
            AuthError::InvalidToken | AuthError::RefreshRejected => warn!("Invalid token attempt"),
            AuthError::IdentityNotFound => warn!("Token subject no longer exists"),
            AuthError::RefreshFailed => warn!("Token refresh refused"),
            AuthError::AccountDeactivated => warn!("Request from deactivated account"),
            AuthError::InsufficientPermissions { required, actual } => {
                warn!("Authorization failed: required role '{}', user has role '{}'", required, actual)
            }
            AuthError::MalformedRequest(detail) => debug!("Malformed request: {}", detail),
            AuthError::TooManyRequests => warn!("Login throttle tripped"),
            AuthError::AuthenticationInternal(msg) => error!("Authentication error: {}", msg),
            AuthError::DatabaseError(msg) => error!("Database error in auth: {}", msg),
            AuthError::PasswordHashError => error!("Password hashing error"),
            AuthError::TokenGenerationError(msg) => error!("Token generation error: {}", msg),
            AuthError::ConfigError(msg) => error!("Authorization configuration error: {}", msg),
            _ => {}
        }

        let mut body = json!({
            "success": false,
            "message": self.error_message(),
        });
        if let AuthError::ValidationError(errors) = &self {
            body["errors"] = serde_json::to_value(errors).unwrap_or_else(|_| json!({}));
        }

        (self.status_code(), Json(body)).into_response()
    }
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken => StatusCode::UNAUTHORIZED,
            AuthError::ExpiredToken => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::IdentityNotFound => StatusCode::NOT_FOUND,
            AuthError::RefreshFailed => StatusCode::UNAUTHORIZED,
            AuthError::RefreshRejected => StatusCode::UNAUTHORIZED,
            AuthError::AuthenticationInternal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::AccountDeactivated => StatusCode::FORBIDDEN,
            AuthError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
            AuthError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AuthError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            AuthError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::EmailAlreadyExists => StatusCode::CONFLICT,
            AuthError::CannotModifySelf => StatusCode::BAD_REQUEST,
            AuthError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::PasswordHashError => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::TokenGenerationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a descriptive error message for this error
    /// This message is safe to send to clients (no sensitive data)
    pub fn error_message(&self) -> String {
        match self {
            AuthError::MissingToken => "token not provided".to_string(),
            AuthError::ExpiredToken => "token expired".to_string(),
            AuthError::InvalidToken => "token invalid".to_string(),
            AuthError::IdentityNotFound => "identity not found".to_string(),
            AuthError::RefreshFailed => "could not refresh token".to_string(),
            AuthError::RefreshRejected => "invalid token".to_string(),
            AuthError::AuthenticationInternal(_) => "authentication error".to_string(),
            AuthError::AccountDeactivated => {
                "account deactivated, contact an administrator".to_string()
            }
            AuthError::AuthenticationRequired => "authentication required".to_string(),
            AuthError::InsufficientPermissions { required, .. } => {
                format!("forbidden, required role: {}", required)
            }
            AuthError::ValidationError(_) => "request validation failed".to_string(),
            AuthError::MalformedRequest(_) => "malformed request".to_string(),
            AuthError::TooManyRequests => "too many login attempts, try again later".to_string(),
            AuthError::InvalidCredentials => "invalid email or password".to_string(),
            AuthError::EmailAlreadyExists => "email already registered".to_string(),
            AuthError::CannotModifySelf => {
                "administrators cannot change their own role or status".to_string()
            }
            AuthError::DatabaseError(_) => "internal server error".to_string(),
            AuthError::PasswordHashError => "internal server error".to_string(),
            AuthError::TokenGenerationError(_) => "internal server error".to_string(),
            AuthError::ConfigError(_) => "internal server error".to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AuthError::ValidationError(errors)
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::MalformedRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AuthError {
    fn from(rejection: PathRejection) -> Self {
        AuthError::MalformedRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(error: AuthError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_envelope_shape_is_uniform() {
        let (status, body) = body_of(AuthError::MissingToken).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"success": false, "message": "token not provided"}));
    }

    #[tokio::test]
    async fn test_role_forbidden_names_required_role() {
        let (status, body) = body_of(AuthError::InsufficientPermissions {
            required: Role::Admin,
            actual: Role::User,
        })
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "forbidden, required role: admin");
    }

    #[tokio::test]
    async fn test_internal_errors_do_not_leak_details() {
        let (status, body) =
            body_of(AuthError::AuthenticationInternal("connection refused at 10.0.0.3".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "authentication error");

        let (_, body) = body_of(AuthError::DatabaseError("relation users does not exist".into())).await;
        assert_eq!(body["message"], "internal server error");
    }

    #[test]
    fn test_status_codes_per_kind() {
        assert_eq!(AuthError::ExpiredToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::IdentityNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AuthError::AccountDeactivated.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::RefreshFailed.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::RefreshRejected.error_message(), "invalid token");
        assert_eq!(AuthError::TooManyRequests.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_malformed_request_hides_parser_detail() {
        let (status, body) =
            body_of(AuthError::MalformedRequest("Cannot parse `abc` to a `i64`".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"success": false, "message": "malformed request"}));
    }
}
