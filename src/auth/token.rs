// JWT token generation and validation

use crate::auth::{
    error::AuthError,
    models::{AccountStatus, Role, User},
};
use crate::config::JwtConfig;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// JWT claims structure
///
/// `role`, `name` and `status` are a snapshot taken at issuance. Gates never
/// authorize from them; they re-resolve the user by `sub`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,        // user_id
    pub jti: String,
    pub role: Role,
    pub name: String,
    pub status: AccountStatus,
    pub iat: i64,        // issued at timestamp
    pub exp: i64,        // expiration timestamp
}

impl Claims {
    /// Last instant at which this token may still be renewed
    pub fn refresh_deadline(&self, refresh_ttl: Duration) -> i64 {
        self.iat + refresh_ttl.num_seconds()
    }
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub expires_in: i64,
}

/// Signs and verifies HS256 tokens
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: Duration::minutes(config.ttl_minutes),
            refresh_ttl: Duration::minutes(config.refresh_ttl_minutes),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Sign a token for `user`, issued now
    pub fn encode_for(&self, user: &User) -> Result<IssuedToken, AuthError> {
        self.encode_at(user, Utc::now())
    }

    /// Sign a token for `user` as if issued at `issued_at`
    pub fn encode_at(&self, user: &User, issued_at: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let expires_at = issued_at + self.ttl;
        let claims = Claims {
            sub: user.id,
            jti: Uuid::new_v4().to_string(),
            role: user.role,
            name: user.name.clone(),
            status: user.status,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGenerationError(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at,
            expires_in: (expires_at - Utc::now()).num_seconds().max(0),
        })
    }

    /// Verify signature and expiry
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        self.decode_with(token, true)
    }

    /// Verify the signature only; expiry is left to the caller
    pub fn decode_allow_expired(&self, token: &str) -> Result<Claims, AuthError> {
        self.decode_with(token, false)
    }

    fn decode_with(&self, token: &str, validate_exp: bool) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = validate_exp;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            })
    }

    /// How long a denylist entry for this token must live: until the token can
    /// neither authenticate nor be refreshed.
    pub fn revocation_deadline(&self, token: &str) -> DateTime<Utc> {
        let fallback = Utc::now() + self.refresh_ttl;
        match self.decode_allow_expired(token) {
            Ok(claims) => {
                let deadline = claims.exp.max(claims.refresh_deadline(self.refresh_ttl));
                Utc.timestamp_opt(deadline, 0).single().unwrap_or(fallback)
            }
            Err(_) => fallback,
        }
    }
}

/// SHA-256 fingerprint under which a token is recorded in the denylist
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SECRET: &str = "test_secret_key_for_testing_purposes_0123456789";

    fn test_config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            ttl_minutes: 60,
            refresh_ttl_minutes: 20160,
        }
    }

    fn test_codec() -> TokenCodec {
        TokenCodec::new(&test_config(SECRET))
    }

    fn test_user(id: i64, role: Role) -> User {
        User {
            id,
            name: format!("Apicultor {}", id),
            email: format!("user{}@colmena.org", id),
            password_hash: String::new(),
            role,
            status: AccountStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_lifetime_matches_ttl() {
        let codec = test_codec();
        let issued = codec.encode_for(&test_user(1, Role::User)).unwrap();
        let claims = codec.decode(&issued.token).unwrap();

        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(issued.expires_in > 3590 && issued.expires_in <= 3600);
    }

    #[test]
    fn test_claims_snapshot_identity() {
        let codec = test_codec();
        let user = test_user(42, Role::Moderator);
        let issued = codec.encode_for(&user).unwrap();
        let claims = codec.decode(&issued.token).unwrap();

        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, Role::Moderator);
        assert_eq!(claims.name, "Apicultor 42");
        assert_eq!(claims.status, AccountStatus::Active);
    }

    #[test]
    fn test_tokens_issued_in_same_second_differ() {
        let codec = test_codec();
        let user = test_user(1, Role::User);
        let now = Utc::now();
        let first = codec.encode_at(&user, now).unwrap();
        let second = codec.encode_at(&user, now).unwrap();
        assert_ne!(first.token, second.token);
    }

    #[test]
    fn test_expired_token_is_classified_as_expired() {
        let codec = test_codec();
        let issued = codec
            .encode_at(&test_user(1, Role::User), Utc::now() - Duration::hours(2))
            .unwrap();

        assert!(matches!(codec.decode(&issued.token), Err(AuthError::ExpiredToken)));
        assert!(codec.decode_allow_expired(&issued.token).is_ok());
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        let codec = test_codec();
        for token in ["", "not.a.token", "invalid_token_format",
            "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.invalid.signature"]
        {
            assert!(matches!(codec.decode(token), Err(AuthError::InvalidToken)));
        }
    }

    #[test]
    fn test_token_signature_verification() {
        let codec1 = TokenCodec::new(&test_config("secret-one-secret-one-secret-one-1"));
        let codec2 = TokenCodec::new(&test_config("secret-two-secret-two-secret-two-2"));

        let issued = codec1.encode_for(&test_user(1, Role::User)).unwrap();
        assert!(codec1.decode(&issued.token).is_ok());
        assert!(matches!(codec2.decode(&issued.token), Err(AuthError::InvalidToken)));
        // an expired token with a foreign signature is invalid, not expired
        let old = codec1
            .encode_at(&test_user(1, Role::User), Utc::now() - Duration::hours(3))
            .unwrap();
        assert!(matches!(codec2.decode_allow_expired(&old.token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_revocation_deadline_covers_refresh_window() {
        let codec = test_codec();
        let issued_at = Utc::now();
        let issued = codec.encode_at(&test_user(1, Role::User), issued_at).unwrap();

        let deadline = codec.revocation_deadline(&issued.token);
        assert_eq!(deadline.timestamp(), issued_at.timestamp() + 20160 * 60);
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = fingerprint("abc");
        assert_eq!(a, fingerprint("abc"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, fingerprint("abd"));
    }

    proptest! {
        #[test]
        fn prop_valid_tokens_are_accepted(user_id in 1i64..1_000_000) {
            let codec = test_codec();
            let issued = codec.encode_for(&test_user(user_id, Role::User)).unwrap();
            let claims = codec.decode(&issued.token).unwrap();
            prop_assert_eq!(claims.sub, user_id);
        }

        #[test]
        fn prop_malformed_tokens_rejected(malformed in "[a-zA-Z0-9]{10,50}") {
            let codec = test_codec();
            prop_assert!(codec.decode(&malformed).is_err());
        }
    }
}
