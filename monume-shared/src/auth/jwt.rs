/// Signed session tokens
///
/// A successful login produces a server-side session row and an HS256 JWT
/// that names it. The token carries a snapshot of the identity taken at
/// login (user id, username, role, location); the guard still reloads the
/// user when it builds a [`SessionContext`](super::session::SessionContext).
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Expiration**: absolute, configurable (default 12 hours)
/// - **Validation**: signature, expiration, not-before and issuer
/// - **Revocation**: the `sid` claim must still name a live session row
///
/// # Example
///
/// ```
/// use monume_shared::auth::jwt::{create_token, validate_token, SessionClaims};
/// use monume_shared::models::user::UserRole;
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let claims = SessionClaims::new(
///     7,
///     Uuid::new_v4(),
///     "alice".to_string(),
///     UserRole::Manager,
///     Some("Downtown".to_string()),
///     Duration::hours(12),
/// );
/// let token = create_token(&claims, "your-secret-key")?;
///
/// let validated = validate_token(&token, "your-secret-key")?;
/// assert_eq!(validated.sub, 7);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::UserRole;

/// Issuer claim stamped on every token
pub const ISSUER: &str = "monume";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Invalid issuer
    #[error("Invalid issuer: expected {expected}, got {actual}")]
    InvalidIssuer { expected: String, actual: String },
}

/// Session token claims
///
/// # Standard Claims
///
/// - `sub`: user id
/// - `iss`: always "monume"
/// - `iat`, `exp`, `nbf`: timestamps
///
/// # Custom Claims
///
/// - `sid`: session row id, checked on every request
/// - `username`, `role`, `location`: identity snapshot taken at login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject - User ID
    pub sub: i64,

    /// Session ID
    pub sid: Uuid,

    /// Username at login time
    pub username: String,

    /// Role at login time
    pub role: UserRole,

    /// Assigned location at login time
    pub location: Option<String>,

    /// Issuer - Always "monume"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

impl SessionClaims {
    /// Creates claims expiring `max_age` from now
    pub fn new(
        user_id: i64,
        session_id: Uuid,
        username: String,
        role: UserRole,
        location: Option<String>,
        max_age: Duration,
    ) -> Self {
        let now = Utc::now();
        let expiration = now + max_age;

        Self {
            sub: user_id,
            sid: session_id,
            username,
            role,
            location,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
        }
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Gets time until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now().timestamp();
        if self.exp > now {
            Some(Duration::seconds(self.exp - now))
        } else {
            None
        }
    }
}

/// Signs claims into a token string
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &SessionClaims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a token and extracts claims
///
/// Verifies signature, expiry, not-before and issuer. Does not check the
/// session row; that is the guard's job.
pub fn validate_token(token: &str, secret: &str) -> Result<SessionClaims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    // Expiry is exact; sessions already have an idle timeout on top
    validation.leeway = 0;

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
                expected: ISSUER.to_string(),
                actual: "unknown".to_string(),
            },
            _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
        }
    })?;

    Ok(token_data.claims)
}
