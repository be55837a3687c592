/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /login` - Check credentials, open a session
/// - `POST /logout` - Revoke the current session
/// - `GET /get_current_user` - Echo the session identity
/// - `POST /change_passcode` - Rotate own or another user's passcode
/// - `POST /verify_password` - Step-up check for management screens
/// - `POST /confirm_passcode` - Boolean passcode check for a user id
/// - `GET /get_auth_audit?limit=N` - Most recent failed attempts (admin)
///
/// Failed credential checks are logged and persisted to
/// `auth_audit_events`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::MessageResponse,
};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Extension, Json,
};
use monume_shared::{
    auth::{
        authorization::{require_can_modify, require_location_scope},
        password,
        session::{self, SessionContext, INVALID_CREDENTIALS},
    },
    models::{
        auth_audit::{AuthAuditEvent, AuthEventKind},
        session::Session,
        user::{User, UserRole},
    },
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[serde(alias = "passcode")]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response
///
/// The token is also set as the `monume_session` cookie.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub username: String,
    pub role: UserRole,
    pub location: Option<String>,
    pub token: String,
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /login
/// Content-Type: application/json
///
/// { "username": "admin", "password": "..." }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown user or wrong password (same message for both)
/// - `422 Unprocessable Entity`: Empty username or password
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let user = match session::authenticate(&state.db, &req.username, &req.password).await {
        Ok(user) => user,
        Err(session::AuthError::InvalidCredentials) => {
            tracing::warn!(username = %req.username, "Failed login attempt");
            AuthAuditEvent::record_quietly(
                &state.db,
                AuthEventKind::LoginFailed,
                Some(req.username.trim()),
                None,
                None,
            )
            .await;
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let (ctx, token) = session::open_session(&state.db, &state.sessions, &user).await?;

    tracing::info!(user_id = ctx.user_id, role = %ctx.role, "User logged in");

    let cookie = session::session_cookie(&token, state.sessions.max_age, state.secure_cookies());

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            user_id: ctx.user_id,
            username: ctx.username,
            role: ctx.role,
            location: ctx.location,
            token,
        }),
    ))
}

/// Logout endpoint
///
/// Always succeeds; revokes the session if the request carries a valid
/// token and clears the cookie either way.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    if let Some(token) = session::extract_token(&headers) {
        session::close_session(&state.db, &state.sessions, &token).await?;
    }

    Ok((
        [(header::SET_COOKIE, session::clear_session_cookie(state.secure_cookies()))],
        Json(MessageResponse::new("Logged out successfully")),
    ))
}

/// Returns the identity of the session
pub async fn current_user(Extension(ctx): Extension<SessionContext>) -> Json<SessionContext> {
    Json(ctx)
}

/// Change passcode request
///
/// `user_id` defaults to the caller.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasscodeRequest {
    pub user_id: Option<i64>,

    pub current_passcode: Option<String>,

    #[validate(length(min = 1, message = "New passcode is required"))]
    pub new_passcode: String,
}

/// Change passcode endpoint
///
/// Changing your own passcode requires the current one. Changing someone
/// else's requires manager or admin and skips that check; the target's
/// sessions are revoked.
///
/// # Errors
///
/// - `400 Bad Request`: Own change without `current_passcode`
/// - `401 Unauthorized`: Current passcode is wrong
/// - `403 Forbidden`: Employee changing another user, manager changing an
///   admin or a user at another location
/// - `404 Not Found`: Unknown user
/// - `422 Unprocessable Entity`: New passcode too short or too long
pub async fn change_passcode(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<ChangePasscodeRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;
    password::validate_passcode(&req.new_passcode)
        .map_err(|msg| ApiError::field("new_passcode", msg))?;

    let target_id = req.user_id.unwrap_or(ctx.user_id);
    let own = target_id == ctx.user_id;

    if !own && !ctx.role.is_manager_or_admin() {
        return Err(ApiError::Forbidden(
            "Only managers can change other users' passcodes".to_string(),
        ));
    }

    let target = User::find_by_id(&state.db, target_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if own {
        let current = req
            .current_passcode
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Current passcode is required".to_string()))?;

        if !password::verify_password(current, &target.password_hash)? {
            tracing::warn!(user_id = ctx.user_id, "Passcode change with wrong current passcode");
            AuthAuditEvent::record_quietly(
                &state.db,
                AuthEventKind::CredentialCheckFailed,
                Some(&ctx.username),
                Some(ctx.user_id),
                Some("change_passcode"),
            )
            .await;
            return Err(ApiError::Unauthorized("Current passcode is incorrect".to_string()));
        }
    } else {
        require_can_modify(&ctx, target.role)?;
        require_location_scope(&ctx, target.location.as_deref())?;
    }

    let hash = password::hash_password(&req.new_passcode)?;
    User::update_password_hash(&state.db, target.id, &hash).await?;

    if !own {
        let revoked = Session::delete_for_user(&state.db, target.id).await?;
        tracing::info!(
            user_id = target.id,
            changed_by = ctx.user_id,
            revoked_sessions = revoked,
            "Passcode reset by manager"
        );
    } else {
        tracing::info!(user_id = ctx.user_id, "Passcode changed");
    }

    Ok(Json(MessageResponse::new("Passcode updated successfully")))
}

/// Verify password request
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyPasswordRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[serde(alias = "passcode")]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyPasswordResponse {
    pub message: String,
    pub role: UserRole,
}

/// Step-up check gating the management screens
///
/// # Errors
///
/// - `401 Unauthorized`: Bad credentials
/// - `403 Forbidden`: Valid credentials of an employee
pub async fn verify_password(
    State(state): State<AppState>,
    Json(req): Json<VerifyPasswordRequest>,
) -> ApiResult<Json<VerifyPasswordResponse>> {
    req.validate()?;

    let user = match session::authenticate(&state.db, &req.username, &req.password).await {
        Ok(user) => user,
        Err(session::AuthError::InvalidCredentials) => {
            tracing::warn!(username = %req.username, "Failed management access check");
            AuthAuditEvent::record_quietly(
                &state.db,
                AuthEventKind::CredentialCheckFailed,
                Some(req.username.trim()),
                None,
                Some("verify_password"),
            )
            .await;
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    if !user.role.is_manager_or_admin() {
        return Err(ApiError::Forbidden(
            "Management access requires a manager or admin account".to_string(),
        ));
    }

    Ok(Json(VerifyPasswordResponse {
        message: "Password verified".to_string(),
        role: user.role,
    }))
}

/// Confirm passcode request
#[derive(Debug, Deserialize, Validate)]
pub struct ConfirmPasscodeRequest {
    pub user_id: i64,

    #[validate(length(min = 1, message = "Passcode is required"))]
    pub passcode: String,
}

/// Confirms that `passcode` belongs to `user_id`
///
/// Unknown ids and wrong passcodes both return `401`.
pub async fn confirm_passcode(
    State(state): State<AppState>,
    Json(req): Json<ConfirmPasscodeRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    let confirmed = match User::find_by_id(&state.db, req.user_id).await? {
        Some(user) => password::verify_password(&req.passcode, &user.password_hash)?,
        None => {
            password::verify_against_dummy(&req.passcode);
            false
        }
    };

    if !confirmed {
        tracing::warn!(user_id = req.user_id, "Passcode confirmation failed");
        AuthAuditEvent::record_quietly(
            &state.db,
            AuthEventKind::CredentialCheckFailed,
            None,
            Some(req.user_id),
            Some("confirm_passcode"),
        )
        .await;
        return Err(ApiError::Unauthorized("Invalid user ID or passcode".to_string()));
    }

    Ok(Json(MessageResponse::new("Passcode confirmed")))
}

/// Default and upper bound on `limit` for the audit listing
const DEFAULT_AUDIT_LIMIT: i64 = 100;
const MAX_AUDIT_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub events: Vec<AuthAuditEvent>,
}

/// Lists recent failed logins, denials and credential checks, newest first
pub async fn get_auth_audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<AuditResponse>> {
    let limit = audit_limit(query.limit);
    let events = AuthAuditEvent::list_recent(&state.db, limit).await?;
    Ok(Json(AuditResponse { events }))
}

fn audit_limit(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .clamp(1, MAX_AUDIT_LIMIT)
}
