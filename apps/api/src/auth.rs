//! JWT authentication and password hashing.
//!
//! ## Token Lifecycle
//! ```text
//! POST /api/login ──► verify_password(argon2) ──► JwtManager::issue()
//!                                                      │
//!                         Authorization: Bearer <jwt>  │
//!                                                      ▼
//! any protected route ──► extract_bearer_token ──► JwtManager::verify()
//!                                                      │
//!                                                      ▼
//!                                               Claims ──► Actor
//! ```
//!
//! Tokens are HS256, carry the caller's role and branch, and are not
//! refreshable or revocable: they simply expire.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use branchline_core::access::Actor;
use branchline_core::types::{Role, User};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: i64,

    pub username: String,

    pub role: Role,

    /// Assigned branch, if any
    pub branch_id: Option<i64>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

impl Claims {
    /// The request identity these claims describe.
    pub fn actor(&self) -> Actor {
        Actor::new(self.sub, self.username.clone(), self.role, self.branch_id)
    }
}

/// JWT token manager.
#[derive(Clone)]
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime_secs: i64,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}

impl JwtManager {
    pub fn new(secret: &str, lifetime_secs: i64) -> Self {
        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime_secs,
        }
    }

    /// Issues a bearer token for `user`.
    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            branch_id: user.branch_id,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Validates signature and expiry and returns the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data: TokenData<Claims> = decode(token, &self.decoding, &Validation::default())
            .map_err(|e| {
                debug!(error = %e, "Rejected bearer token");
                ApiError::Unauthorized("Invalid or expired token".to_string())
            })?;

        Ok(token_data.claims)
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// =============================================================================
// Passwords
// =============================================================================

/// Hashes a password into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored PHC string. Malformed hashes never
/// verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-at-least-16";

    fn user(role: Role, branch_id: Option<i64>) -> User {
        User {
            id: 7,
            username: "ana".to_string(),
            password_hash: String::new(),
            full_name: "Ana Ruiz".to_string(),
            email: None,
            role,
            branch_id,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new(SECRET, 3600);
        let token = manager.issue(&user(Role::Manager, Some(2))).unwrap();

        let claims = manager.verify(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "ana");
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.branch_id, Some(2));
        assert_eq!(claims.exp - claims.iat, 3600);

        let actor = claims.actor();
        assert_eq!(actor.user_id, 7);
        assert_eq!(actor.branch_id, Some(2));
    }

    #[test]
    fn test_expired_token_rejected() {
        // well past the default 60s leeway
        let manager = JwtManager::new(SECRET, -3600);
        let token = manager.issue(&user(Role::Admin, None)).unwrap();

        assert!(matches!(manager.verify(&token), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = JwtManager::new(SECRET, 3600)
            .issue(&user(Role::Employee, Some(1)))
            .unwrap();
        let other = JwtManager::new("another-secret-of-16+", 3600);

        assert!(other.verify(&token).is_err());
        assert!(other.verify("not-a-jwt").is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-phc-string"));
    }
}
