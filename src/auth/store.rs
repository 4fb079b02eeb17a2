// Storage seams used by the token service and account management

use axum::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::{
    error::AuthError,
    models::{AccountStatus, NewUser, Role, User},
};

/// Durable source of truth for identities
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AuthError>;

    /// Case-insensitive lookup
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    /// Fails with `EmailAlreadyExists` on a duplicate email
    async fn create(&self, new_user: NewUser) -> Result<User, AuthError>;

    async fn list(&self) -> Result<Vec<User>, AuthError>;

    /// Returns `None` when no user has that id
    async fn set_role(&self, id: i64, role: Role) -> Result<Option<User>, AuthError>;

    /// Returns `None` when no user has that id
    async fn set_status(&self, id: i64, status: AccountStatus) -> Result<Option<User>, AuthError>;
}

/// Record of tokens that must be rejected before they expire.
/// Entries are keyed by token fingerprint.
#[async_trait]
pub trait TokenDenylist: Send + Sync {
    async fn contains(&self, fingerprint: &str) -> Result<bool, AuthError>;

    /// Inserting an already present fingerprint is not an error
    async fn insert(&self, fingerprint: &str, expires_at: DateTime<Utc>) -> Result<(), AuthError>;
}
