// Authentication services - business logic layer

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::auth::{
    error::AuthError,
    models::{AccountStatus, NewUser, RegisterRequest, Role, User},
    password::PasswordService,
    store::{IdentityStore, TokenDenylist},
    token::{fingerprint, IssuedToken, TokenCodec},
};

/// Result of a successful refresh
#[derive(Debug, Clone)]
pub struct Renewal {
    pub token: IssuedToken,
    /// Live identity the new token was minted for
    pub identity: User,
}

/// Issues, authenticates, refreshes and revokes bearer tokens
pub struct TokenService {
    codec: TokenCodec,
    identities: Arc<dyn IdentityStore>,
    denylist: Arc<dyn TokenDenylist>,
}

impl TokenService {
    pub fn new(codec: TokenCodec, identities: Arc<dyn IdentityStore>, denylist: Arc<dyn TokenDenylist>) -> Self {
        Self {
            codec,
            identities,
            denylist,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Mint a token carrying the user's current role, name and status
    pub fn issue(&self, user: &User) -> Result<IssuedToken, AuthError> {
        let issued = self.codec.encode_for(user)?;
        debug!("Issued token for user_id={} expiring at {}", user.id, issued.expires_at);
        Ok(issued)
    }

    /// Verify the token and resolve its subject to the live user record
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }

        let claims = self.codec.decode(token)?;

        if self.is_revoked(token).await? {
            debug!("Revoked token presented for user_id={}", claims.sub);
            return Err(AuthError::InvalidToken);
        }

        self.identities
            .find_by_id(claims.sub)
            .await
            .map_err(into_internal)?
            .ok_or(AuthError::IdentityNotFound)
    }

    /// Renew a token that expired but is otherwise sound.
    ///
    /// The replacement carries the subject's current claims. The old token is
    /// not revoked.
    pub async fn refresh(&self, token: &str) -> Result<Renewal, AuthError> {
        let claims = self
            .codec
            .decode_allow_expired(token)
            .map_err(|_| AuthError::RefreshFailed)?;

        let now = Utc::now().timestamp();
        if claims.exp >= now {
            debug!("Refresh refused for user_id={}: token has not expired", claims.sub);
            return Err(AuthError::RefreshFailed);
        }
        // the denylist holds a revoked token only while its deadline is ahead
        if now >= claims.refresh_deadline(self.codec.refresh_ttl()) {
            debug!("Refresh refused for user_id={}: refresh window closed", claims.sub);
            return Err(AuthError::RefreshFailed);
        }
        if self.is_revoked(token).await? {
            warn!("Refresh attempted with revoked token for user_id={}", claims.sub);
            return Err(AuthError::RefreshFailed);
        }

        let identity = self
            .identities
            .find_by_id(claims.sub)
            .await
            .map_err(into_internal)?
            .ok_or(AuthError::IdentityNotFound)?;

        let token = self.issue(&identity)?;
        info!("Refreshed token for user_id={}", identity.id);
        Ok(Renewal { token, identity })
    }

    /// Revoke a token. Best effort: failures are logged and swallowed.
    pub async fn invalidate(&self, token: &str) {
        let expires_at = self.codec.revocation_deadline(token);
        match self.denylist.insert(&fingerprint(token), expires_at).await {
            Ok(()) => debug!("Token revoked until {}", expires_at),
            Err(e) => warn!("Failed to revoke token: {}", e),
        }
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, AuthError> {
        self.denylist
            .contains(&fingerprint(token))
            .await
            .map_err(into_internal)
    }
}

/// Store failures surface as internal authentication errors
fn into_internal(error: AuthError) -> AuthError {
    match error {
        AuthError::DatabaseError(msg) => AuthError::AuthenticationInternal(msg),
        other => other,
    }
}

/// Authentication service coordinating account operations
pub struct AuthService {
    identities: Arc<dyn IdentityStore>,
    tokens: Arc<TokenService>,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(identities: Arc<dyn IdentityStore>, tokens: Arc<TokenService>) -> Self {
        Self { identities, tokens }
    }

    /// Register a new user with the default role and status
    pub async fn register(&self, request: RegisterRequest) -> Result<(User, IssuedToken), AuthError> {
        let password_hash = PasswordService::hash_password(&request.password)?;
        let user = self
            .identities
            .create(NewUser {
                name: request.name.trim().to_string(),
                email: request.email.trim().to_lowercase(),
                password_hash,
            })
            .await?;

        let token = self.tokens.issue(&user)?;
        info!("Registered user_id={}", user.id);
        Ok((user, token))
    }

    /// Login a user
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, IssuedToken), AuthError> {
        let user = match self.identities.find_by_email(email.trim()).await? {
            Some(user) => user,
            None => {
                debug!("Login attempt for unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !PasswordService::verify_password(password, &user.password_hash)? {
            warn!("Failed login for user_id={}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        if !user.status.is_active() {
            warn!("Login refused for deactivated user_id={}", user.id);
            return Err(AuthError::AccountDeactivated);
        }

        let token = self.tokens.issue(&user)?;
        info!("User logged in: user_id={}", user.id);
        Ok((user, token))
    }

    /// Revoke the token the user is currently presenting
    pub async fn logout(&self, user: &User, token: &str) {
        self.tokens.invalidate(token).await;
        info!("User logged out: user_id={}", user.id);
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AuthError> {
        self.identities.list().await
    }

    pub async fn change_role(&self, actor: &User, target_id: i64, role: Role) -> Result<User, AuthError> {
        if actor.id == target_id {
            return Err(AuthError::CannotModifySelf);
        }

        let user = self
            .identities
            .set_role(target_id, role)
            .await?
            .ok_or(AuthError::IdentityNotFound)?;

        info!("user_id={} set role of user_id={} to {}", actor.id, user.id, role);
        Ok(user)
    }

    pub async fn change_status(&self, actor: &User, target_id: i64, status: AccountStatus) -> Result<User, AuthError> {
        if actor.id == target_id {
            return Err(AuthError::CannotModifySelf);
        }

        let user = self
            .identities
            .set_status(target_id, status)
            .await?
            .ok_or(AuthError::IdentityNotFound)?;

        info!("user_id={} set status of user_id={} to {}", actor.id, user.id, status);
        Ok(user)
    }

    pub async fn toggle_status(&self, actor: &User, target_id: i64) -> Result<User, AuthError> {
        let current = self
            .identities
            .find_by_id(target_id)
            .await?
            .ok_or(AuthError::IdentityNotFound)?;

        self.change_status(actor, target_id, current.status.toggled()).await
    }
}
