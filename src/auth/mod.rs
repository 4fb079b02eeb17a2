// Authentication module
// Provides JWT-based authentication, token refresh and revocation, and role-gated routes

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod redis_denylist;
pub mod repository;
pub mod service;
pub mod store;
pub mod token;


use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::config::RateLimitConfig;

// Re-export commonly used types
pub use error::AuthError;
pub use middleware::{AuthenticatedUser, CurrentUser, PresentedToken};
pub use models::{AccountStatus, Role, User, UserResponse};
pub use service::{AuthService, TokenService};
pub use store::{IdentityStore, TokenDenylist};
pub use token::TokenCodec;

/// Shared state for the gates and the account handlers
#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenService>,
    pub accounts: Arc<AuthService>,
}

impl AuthState {
    pub fn new(
        codec: TokenCodec,
        identities: Arc<dyn IdentityStore>,
        denylist: Arc<dyn TokenDenylist>,
    ) -> Self {
        let tokens = Arc::new(TokenService::new(codec, identities.clone(), denylist));
        let accounts = Arc::new(AuthService::new(identities, tokens.clone()));
        Self { tokens, accounts }
    }
}

/// Authentication gate alone; the account status is not checked
pub fn authenticate_only<S>(router: Router<S>, auth: &AuthState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(from_fn_with_state(auth.clone(), middleware::authenticate))
}

/// Authentication gate followed by the account-status gate
pub fn authenticated<S>(router: Router<S>, auth: &AuthState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(
        ServiceBuilder::new()
            .layer(from_fn_with_state(auth.clone(), middleware::authenticate))
            .layer(from_fn_with_state(auth.clone(), middleware::ensure_active)),
    )
}

/// Refresh gate followed by the account-status gate
pub fn refreshable<S>(router: Router<S>, auth: &AuthState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(
        ServiceBuilder::new()
            .layer(from_fn_with_state(auth.clone(), middleware::refresh_tolerant))
            .layer(from_fn_with_state(auth.clone(), middleware::ensure_active)),
    )
}

/// Authentication, account-status and role gates, in that order
pub fn with_role<S>(router: Router<S>, auth: &AuthState, role: Role) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(
        ServiceBuilder::new()
            .layer(from_fn_with_state(auth.clone(), middleware::authenticate))
            .layer(from_fn_with_state(auth.clone(), middleware::ensure_active))
            .layer(from_fn_with_state(role, middleware::require_role)),
    )
}

/// Routes under /api/auth and /api/admin
///
/// With `login_limit` set, login attempts are throttled per client IP and the
/// app must be served with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn router(state: AuthState, login_limit: Option<RateLimitConfig>) -> Router {
    let mut login: Router<AuthState> =
        Router::new().route("/api/auth/login", post(handlers::login_handler));
    if let Some(limit) = login_limit {
        match GovernorConfigBuilder::default()
            .per_second(limit.per_second)
            .burst_size(limit.burst_size)
            .finish()
        {
            // Built once at startup
            Some(config) => {
                login = login
                    .layer(GovernorLayer {
                        config: Box::leak(Box::new(config)),
                    })
                    .layer(from_fn(middleware::throttled_envelope));
            }
            None => tracing::warn!("Login rate limit rejected by governor, throttling disabled"),
        }
    }

    let public: Router<AuthState> = Router::new()
        .route("/api/auth/register", post(handlers::register_handler))
        .merge(login);

    let session: Router<AuthState> = authenticated(
        Router::new()
            .route("/api/auth/me", get(handlers::me_handler))
            .route("/api/auth/logout", post(handlers::logout_handler)),
        &state,
    );

    let renewable: Router<AuthState> = refreshable(
        Router::new().route("/api/auth/session", get(handlers::me_handler)),
        &state,
    );

    let admin: Router<AuthState> = with_role(
        Router::new()
            .route("/api/admin/users", get(handlers::list_users_handler))
            .route("/api/admin/users/:id/role", put(handlers::update_role_handler))
            .route("/api/admin/users/:id/activate", post(handlers::activate_handler))
            .route("/api/admin/users/:id/deactivate", post(handlers::deactivate_handler))
            .route("/api/admin/users/:id/toggle-status", post(handlers::toggle_status_handler)),
        &state,
        Role::Admin,
    );

    Router::new()
        .merge(public)
        .merge(session)
        .merge(renewable)
        .merge(admin)
        .with_state(state)
}
