// Request gates for protected routes
//
// Each gate is an axum middleware function. Routes compose them in order:
// authenticate (or refresh_tolerant) -> ensure_active -> require_role.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, info, warn};

use crate::auth::{error::AuthError, models::{Role, User}, AuthState};

/// Live identity resolved for the current request
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Bearer token the current request is authenticated with
#[derive(Debug, Clone)]
pub struct PresentedToken(pub String);

/// Expired token the client sent when the refresh gate swapped in a new one
#[derive(Debug, Clone)]
pub struct RenewedFrom(pub String);

/// Pull the bearer token out of the Authorization header.
/// Anything that is not `Bearer <non-empty>` counts as no token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Authentication gate: reject unless the bearer token resolves to a live user
pub async fn authenticate(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(request.headers())
        .ok_or(AuthError::MissingToken)?
        .to_string();

    let user = match auth.tokens.authenticate(&token).await {
        Ok(user) => user,
        Err(e @ (AuthError::MissingToken
        | AuthError::ExpiredToken
        | AuthError::InvalidToken
        | AuthError::IdentityNotFound
        | AuthError::AuthenticationInternal(_))) => return Err(e),
        Err(other) => return Err(AuthError::AuthenticationInternal(other.to_string())),
    };

    debug!("Authenticated user_id={} for {}", user.id, request.uri().path());
    request.extensions_mut().insert(CurrentUser(user));
    request.extensions_mut().insert(PresentedToken(token));
    Ok(next.run(request).await)
}

/// Refresh gate: like `authenticate`, but renews an expired token instead of
/// rejecting it. The new token is returned in the response Authorization
/// header whatever the handler's outcome.
pub async fn refresh_tolerant(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(request.headers())
        .ok_or(AuthError::RefreshRejected)?
        .to_string();

    match auth.tokens.authenticate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(CurrentUser(user));
            request.extensions_mut().insert(PresentedToken(token));
            Ok(next.run(request).await)
        }
        Err(AuthError::ExpiredToken) => {
            let renewal = auth
                .tokens
                .refresh(&token)
                .await
                .map_err(refresh_rejection)?;

            let new_token = renewal.token.token;
            request.extensions_mut().insert(CurrentUser(renewal.identity));
            // later gates act on the token the client will hold from now on
            request.extensions_mut().insert(PresentedToken(new_token.clone()));
            request.extensions_mut().insert(RenewedFrom(token));

            let mut response = next.run(request).await;
            match HeaderValue::from_str(&format!("Bearer {}", new_token)) {
                Ok(value) => {
                    response.headers_mut().insert(header::AUTHORIZATION, value);
                }
                Err(e) => error!("Refreshed token is not a valid header value: {}", e),
            }
            Ok(response)
        }
        Err(AuthError::MissingToken | AuthError::InvalidToken) => Err(AuthError::RefreshRejected),
        Err(AuthError::IdentityNotFound) => Err(AuthError::IdentityNotFound),
        Err(AuthError::AuthenticationInternal(msg)) => Err(AuthError::AuthenticationInternal(msg)),
        Err(other) => Err(AuthError::AuthenticationInternal(other.to_string())),
    }
}

/// Refusals keep their kind; anything else failed on our side and is a 500
fn refresh_rejection(error: AuthError) -> AuthError {
    match error {
        AuthError::RefreshFailed => AuthError::RefreshFailed,
        AuthError::IdentityNotFound => AuthError::IdentityNotFound,
        AuthError::AuthenticationInternal(msg) => AuthError::AuthenticationInternal(msg),
        other => AuthError::AuthenticationInternal(other.to_string()),
    }
}

/// Account-status gate: deactivated accounts are rejected and their tokens revoked.
/// After a refresh both the renewed token and the one it replaced are revoked.
pub async fn ensure_active(
    State(auth): State<AuthState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let inactive_user = request
        .extensions()
        .get::<CurrentUser>()
        .filter(|CurrentUser(user)| !user.status.is_active())
        .map(|CurrentUser(user)| user.id);

    if let Some(user_id) = inactive_user {
        warn!("Rejecting request from deactivated user_id={}", user_id);
        let presented = request.extensions().get::<PresentedToken>().cloned();
        let renewed_from = request.extensions().get::<RenewedFrom>().cloned();
        if let Some(PresentedToken(token)) = presented {
            auth.tokens.invalidate(&token).await;
            info!("Revoked token of deactivated user_id={}", user_id);
        }
        if let Some(RenewedFrom(token)) = renewed_from {
            auth.tokens.invalidate(&token).await;
            info!("Revoked replaced token of deactivated user_id={}", user_id);
        }
        return Err(AuthError::AccountDeactivated);
    }

    Ok(next.run(request).await)
}

/// Role gate: the live identity must hold exactly `required`
pub async fn require_role(
    State(required): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let endpoint = request.uri().path().to_string();

    let (user_id, role) = match request.extensions().get::<CurrentUser>() {
        Some(CurrentUser(user)) => (user.id, user.role),
        None => {
            warn!("Role check without authenticated user on {}", endpoint);
            return Err(AuthError::AuthenticationRequired);
        }
    };

    if role != required {
        warn!(
            "Authorization failed: user_id={}, required_role={}, actual_role={}, endpoint={}",
            user_id, required, role, endpoint
        );
        return Err(AuthError::InsufficientPermissions {
            required,
            actual: role,
        });
    }

    debug!(
        "Authorization successful: user_id={}, role={}, endpoint={}",
        user_id, role, endpoint
    );
    Ok(next.run(request).await)
}

/// Renders the login throttle's 429 in the error envelope, keeping its
/// retry headers
pub async fn throttled_envelope(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if response.status() != StatusCode::TOO_MANY_REQUESTS {
        return response;
    }

    let (parts, _) = response.into_parts();
    let mut enveloped = AuthError::TooManyRequests.into_response();
    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            enveloped.headers_mut().insert(name.clone(), value.clone());
        }
    }
    enveloped
}

/// Authenticated user extractor for handlers behind the gates
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .map(|CurrentUser(user)| AuthenticatedUser(user.clone()))
            .ok_or(AuthError::AuthenticationRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn headers_with(value: &str) -> HeaderMap {
        let req = Request::builder()
            .uri("/")
            .header(header::AUTHORIZATION, value)
            .body(())
            .unwrap();
        req.headers().clone()
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&headers_with("bearer abc")), Some("abc"));
    }

    #[test]
    fn test_non_bearer_headers_count_as_missing() {
        for value in ["", "Bearer ", "Bearer    ", "Basic dXNlcjpwYXNz", "token_without_bearer"] {
            assert_eq!(bearer_token(&headers_with(value)), None, "header {:?}", value);
        }
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_extractor_requires_current_user() {
        let req = Request::builder().uri("/").body(()).unwrap();
        let (mut parts, _) = req.into_parts();
        let result = AuthenticatedUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::AuthenticationRequired)));
    }

    #[test]
    fn test_refresh_rejection_keeps_refusals_and_surfaces_faults() {
        assert!(matches!(
            refresh_rejection(AuthError::RefreshFailed),
            AuthError::RefreshFailed
        ));
        assert!(matches!(
            refresh_rejection(AuthError::IdentityNotFound),
            AuthError::IdentityNotFound
        ));

        let fault = refresh_rejection(AuthError::TokenGenerationError("key rejected".into()));
        assert!(matches!(fault, AuthError::AuthenticationInternal(_)));
        assert_eq!(fault.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
