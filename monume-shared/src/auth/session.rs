/// Login sessions and request authentication
///
/// Login verifies a username and passcode, opens a `sessions` row and signs
/// a token naming it. Every later request presents that token either as
/// `Authorization: Bearer <token>` or as the `monume_session` cookie;
/// [`authenticate_request`] turns it back into a [`SessionContext`].
///
/// # Request Flow
///
/// 1. Extract the token (bearer header wins over cookie)
/// 2. Verify signature, expiry and issuer
/// 3. Load the session row; missing means logged out
/// 4. Reject and delete the row if it has been idle too long
/// 5. Load the user so role changes take effect immediately
/// 6. Bump `last_seen_at`
///
/// # Example
///
/// ```no_run
/// use monume_shared::auth::session::{authenticate, open_session, SessionSettings};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let settings = SessionSettings::new("a-secret-that-is-at-least-32-bytes!!", 60, 12);
/// let user = authenticate(&pool, "admin", "ori3").await?;
/// let (context, token) = open_session(&pool, &settings, &user).await?;
/// println!("{} logged in with session {}", context.username, context.session_id);
/// # Ok(())
/// # }
/// ```

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::jwt::{create_token, validate_token, JwtError, SessionClaims};
use super::password::{verify_against_dummy, verify_password};
use crate::models::session::Session;
use crate::models::user::{User, UserRole};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "monume_session";

/// Message shared by both login failure cases
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Token and timeout settings for sessions
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// HS256 signing secret
    pub secret: String,

    /// Sessions unused for longer than this are rejected
    pub idle_timeout: Duration,

    /// Absolute token lifetime
    pub max_age: Duration,
}

impl SessionSettings {
    pub fn new(secret: impl Into<String>, idle_timeout_minutes: i64, max_age_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            idle_timeout: Duration::minutes(idle_timeout_minutes),
            max_age: Duration::hours(max_age_hours),
        }
    }
}

/// Identity of the caller, scoped to one request
///
/// Inserted into request extensions by the guard. Handlers extract it with
/// `Extension<SessionContext>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: i64,
    pub session_id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub location: Option<String>,
}

impl SessionContext {
    pub fn from_user(user: &User, session_id: Uuid) -> Self {
        Self {
            user_id: user.id,
            session_id,
            username: user.username.clone(),
            role: user.role,
            location: user.location.clone(),
        }
    }
}

/// Error type for authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No bearer header and no session cookie
    #[error("Authentication required")]
    MissingCredentials,

    /// Unknown username or wrong passcode
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Token failed signature, expiry or issuer checks
    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    /// Session row is gone (logged out or user deleted)
    #[error("Session is no longer valid")]
    SessionRevoked,

    /// Session idle for longer than the timeout
    #[error("Session expired due to inactivity")]
    SessionExpired,

    #[error("Failed to issue session token: {0}")]
    TokenIssue(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            AuthError::DatabaseError(_) | AuthError::TokenIssue(_) => {
                tracing::error!(error = %self, "Authentication failed with internal error");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({
                        "error": "internal_error",
                        "message": "An internal error occurred",
                    })),
                )
                    .into_response();
            }
            _ => (StatusCode::UNAUTHORIZED, "unauthorized"),
        };

        (
            status,
            Json(serde_json::json!({
                "error": error,
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}

/// Pulls the session token from the request headers
///
/// A `Bearer` authorization header wins over the cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Builds the `Set-Cookie` value carrying a fresh session token
pub fn session_cookie(token: &str, max_age: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        max_age.num_seconds()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Builds the `Set-Cookie` value that clears the session cookie
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", Duration::zero(), secure)
}

/// Checks a username and passcode
///
/// Both failure cases return [`AuthError::InvalidCredentials`]. When the
/// username is unknown a dummy hash is still verified so the two cases take
/// the same time.
pub async fn authenticate(pool: &PgPool, username: &str, passcode: &str) -> Result<User, AuthError> {
    let Some(user) = User::find_by_username(pool, username.trim()).await? else {
        verify_against_dummy(passcode);
        return Err(AuthError::InvalidCredentials);
    };

    match verify_password(passcode, &user.password_hash) {
        Ok(true) => Ok(user),
        Ok(false) => Err(AuthError::InvalidCredentials),
        Err(e) => {
            // Unusable stored hash counts as a failed login
            tracing::error!(user_id = user.id, error = %e, "Stored credential hash is unusable");
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Opens a session for an authenticated user and signs its token
pub async fn open_session(
    pool: &PgPool,
    settings: &SessionSettings,
    user: &User,
) -> Result<(SessionContext, String), AuthError> {
    // Abandoned sessions are never presented again, so sweep them on login
    match Session::purge_idle(pool, settings.idle_timeout).await {
        Ok(0) => {}
        Ok(purged) => tracing::debug!(purged, "Purged idle sessions"),
        Err(e) => tracing::warn!(error = %e, "Failed to purge idle sessions"),
    }

    let session = Session::create(pool, user.id).await?;

    let claims = SessionClaims::new(
        user.id,
        session.id,
        user.username.clone(),
        user.role,
        user.location.clone(),
        settings.max_age,
    );

    let token = match create_token(&claims, &settings.secret) {
        Ok(token) => token,
        Err(e) => {
            Session::delete(pool, session.id).await?;
            return Err(AuthError::TokenIssue(e.to_string()));
        }
    };

    tracing::info!(user_id = user.id, session_id = %session.id, "Session opened");

    Ok((SessionContext::from_user(user, session.id), token))
}

/// Revokes the session a token names
///
/// Unknown, expired or garbage tokens are ignored.
pub async fn close_session(pool: &PgPool, settings: &SessionSettings, token: &str) -> Result<bool, AuthError> {
    let Ok(claims) = validate_token(token, &settings.secret) else {
        return Ok(false);
    };

    let deleted = Session::delete(pool, claims.sid).await?;
    if deleted {
        tracing::info!(user_id = claims.sub, session_id = %claims.sid, "Session closed");
    }

    Ok(deleted)
}

/// Resolves the caller of a request
///
/// # Errors
///
/// - `MissingCredentials` if no token was sent
/// - `InvalidToken` if the token fails verification
/// - `SessionRevoked` if the session or its user no longer exists
/// - `SessionExpired` if the session was idle too long (the row is deleted)
pub async fn authenticate_request(
    pool: &PgPool,
    settings: &SessionSettings,
    headers: &HeaderMap,
) -> Result<SessionContext, AuthError> {
    let token = extract_token(headers).ok_or(AuthError::MissingCredentials)?;

    let claims = validate_token(&token, &settings.secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken("Malformed or tampered token".to_string()),
    })?;

    let session = Session::find_by_id(pool, claims.sid)
        .await?
        .filter(|s| s.user_id == claims.sub)
        .ok_or(AuthError::SessionRevoked)?;

    if session.is_idle(settings.idle_timeout, Utc::now()) {
        Session::delete(pool, session.id).await?;
        tracing::info!(user_id = session.user_id, session_id = %session.id, "Idle session expired");
        return Err(AuthError::SessionExpired);
    }

    let user = User::find_by_id(pool, session.user_id)
        .await?
        .ok_or(AuthError::SessionRevoked)?;

    Session::touch(pool, session.id).await?;

    Ok(SessionContext::from_user(&user, session.id))
}
