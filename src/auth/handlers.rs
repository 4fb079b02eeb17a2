// HTTP handlers for authentication and account management endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

use crate::auth::{
    error::AuthError,
    middleware::{AuthenticatedUser, PresentedToken},
    models::{
        AccountStatus, AuthResponse, LoginRequest, MessageResponse, RegisterRequest, TokenResponse,
        UpdateRoleRequest, User, UserEnvelope, UserListEnvelope,
    },
    token::IssuedToken,
    AuthState,
};

fn auth_response(user: User, issued: IssuedToken) -> AuthResponse {
    AuthResponse {
        success: true,
        token: TokenResponse {
            access_token: issued.token,
            token_type: "bearer".to_string(),
            expires_in: issued.expires_in,
        },
        user: user.into(),
    }
}

/// Register a new user
/// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Invalid input data"),
        (status = 409, description = "Email already registered")
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(auth): State<AuthState>,
    request: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    let Json(request) = request?;
    request.validate()?;

    let (user, issued) = auth.accounts.register(request).await?;
    Ok((StatusCode::CREATED, Json(auth_response(user, issued))))
}

/// Login a user
/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid email or password"),
        (status = 403, description = "Account deactivated"),
        (status = 429, description = "Too many login attempts")
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(auth): State<AuthState>,
    request: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AuthError> {
    let Json(request) = request?;
    request.validate()?;

    let (user, issued) = auth.accounts.login(&request.email, &request.password).await?;
    Ok(Json(auth_response(user, issued)))
}

/// Revoke the presented token
/// POST /api/auth/logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Token revoked", body = MessageResponse),
        (status = 401, description = "Missing, expired or invalid token")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn logout_handler(
    State(auth): State<AuthState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Extension(PresentedToken(token)): Extension<PresentedToken>,
) -> Json<MessageResponse> {
    auth.accounts.logout(&user, &token).await;
    Json(MessageResponse::ok("logged out"))
}

/// Get current user information (protected endpoint)
/// GET /api/auth/me and GET /api/auth/session
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserEnvelope),
        (status = 401, description = "Missing, expired or invalid token"),
        (status = 403, description = "Account deactivated")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me_handler(AuthenticatedUser(user): AuthenticatedUser) -> Json<UserEnvelope> {
    Json(user.into())
}

/// List every account
/// GET /api/admin/users
#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All accounts", body = UserListEnvelope),
        (status = 401, description = "Missing, expired or invalid token"),
        (status = 403, description = "Account deactivated or not an administrator")
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn list_users_handler(
    State(auth): State<AuthState>,
) -> Result<Json<UserListEnvelope>, AuthError> {
    let users = auth.accounts.list_users().await?;
    Ok(Json(UserListEnvelope {
        success: true,
        users: users.into_iter().map(Into::into).collect(),
    }))
}

/// PUT /api/admin/users/:id/role
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/role",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = UserEnvelope),
        (status = 400, description = "Malformed request or own account"),
        (status = 403, description = "Account deactivated or not an administrator"),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn update_role_handler(
    State(auth): State<AuthState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    id: Result<Path<i64>, PathRejection>,
    request: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> Result<Json<UserEnvelope>, AuthError> {
    let Path(id) = id?;
    let Json(request) = request?;
    let user = auth.accounts.change_role(&admin, id, request.role).await?;
    Ok(Json(user.into()))
}

/// POST /api/admin/users/:id/activate
#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/activate",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Account active", body = UserEnvelope),
        (status = 400, description = "Malformed id or own account"),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn activate_handler(
    State(auth): State<AuthState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<UserEnvelope>, AuthError> {
    let Path(id) = id?;
    let user = auth.accounts.change_status(&admin, id, AccountStatus::Active).await?;
    Ok(Json(user.into()))
}

/// POST /api/admin/users/:id/deactivate
#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/deactivate",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Account inactive", body = UserEnvelope),
        (status = 400, description = "Malformed id or own account"),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn deactivate_handler(
    State(auth): State<AuthState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<UserEnvelope>, AuthError> {
    let Path(id) = id?;
    let user = auth.accounts.change_status(&admin, id, AccountStatus::Inactive).await?;
    Ok(Json(user.into()))
}

/// POST /api/admin/users/:id/toggle-status
#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/toggle-status",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Status flipped", body = UserEnvelope),
        (status = 400, description = "Malformed id or own account"),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn toggle_status_handler(
    State(auth): State<AuthState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<UserEnvelope>, AuthError> {
    let Path(id) = id?;
    let user = auth.accounts.toggle_status(&admin, id).await?;
    Ok(Json(user.into()))
}
