/// Staff directory endpoints (manager or admin)
///
/// # Endpoints
///
/// - `POST /create_user`
/// - `POST /update_user`
/// - `POST /remove_user`
/// - `GET /get_users`
///
/// Managers act only on users at their own location and never on admins;
/// only admins hand out the admin role.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{input, MessageResponse},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use monume_shared::{
    auth::{
        authorization::{require_can_modify, require_location_scope, require_role_assignment},
        password,
        session::SessionContext,
    },
    models::{
        session::Session,
        user::{CreateUser, UpdateUser, User, UserRole},
    },
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Create user request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[serde(deserialize_with = "input::trimmed")]
    #[validate(length(min = 1, max = 64, message = "Username must be 1-64 characters"))]
    pub username: String,

    pub passcode: String,

    /// Blank means no address
    #[serde(default, deserialize_with = "input::blank_as_none")]
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "input::blank_as_none")]
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    pub role: UserRole,

    /// Defaults to the manager's own location
    #[serde(default, deserialize_with = "input::blank_as_none")]
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub message: String,
    pub user: User,
}

/// Creates a staff account
///
/// # Errors
///
/// - `403 Forbidden`: Manager assigning admin or another location
/// - `409 Conflict`: Username taken
/// - `422 Unprocessable Entity`: Field validation failed
pub async fn create_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    req.validate()?;
    password::validate_passcode(&req.passcode).map_err(|msg| ApiError::field("passcode", msg))?;

    require_role_assignment(&ctx, req.role)?;

    let location = req.location.or_else(|| {
        if ctx.role.is_admin() {
            None
        } else {
            ctx.location.clone()
        }
    });
    require_location_scope(&ctx, location.as_deref())?;

    let username = req.username;
    if User::exists_by_username(&state.db, &username).await? {
        return Err(ApiError::Conflict("Username already exists".to_string()));
    }

    let user = User::create(
        &state.db,
        CreateUser {
            name: req.name.or_else(|| Some(username.clone())),
            username,
            password_hash: password::hash_password(&req.passcode)?,
            email: req.email,
            role: req.role,
            location,
        },
    )
    .await?;

    tracing::info!(
        user_id = user.id,
        role = %user.role,
        created_by = ctx.user_id,
        "User created"
    );

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: "User created successfully".to_string(),
            user,
        }),
    ))
}

/// Update user request
///
/// Every field but `user_id` is optional; absent or blank fields are left
/// alone, since the edit form posts every field.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    pub user_id: i64,

    #[serde(default, deserialize_with = "input::blank_as_none")]
    #[validate(length(min = 1, max = 64, message = "Username must be 1-64 characters"))]
    pub username: Option<String>,

    #[serde(default, deserialize_with = "input::blank_as_none")]
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "input::blank_as_none")]
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    pub role: Option<UserRole>,

    #[serde(default, deserialize_with = "input::blank_as_none")]
    pub location: Option<String>,

    #[serde(default, deserialize_with = "input::blank_as_none")]
    pub passcode: Option<String>,
}

/// Applies a partial update to a staff account
///
/// # Errors
///
/// - `400 Bad Request`: Nothing to update
/// - `403 Forbidden`: Manager touching an admin, granting admin, or
///   reaching outside their location
/// - `404 Not Found`: Unknown user
/// - `409 Conflict`: New username taken
pub async fn update_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    req.validate()?;

    let target = User::find_by_id(&state.db, req.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    require_can_modify(&ctx, target.role)?;
    if target.id != ctx.user_id {
        require_location_scope(&ctx, target.location.as_deref())?;
    }
    if let Some(role) = req.role {
        require_role_assignment(&ctx, role)?;
    }

    let location = req.location;
    if location.is_some() {
        require_location_scope(&ctx, location.as_deref())?;
    }

    let password_hash = match req.passcode.as_deref() {
        Some(passcode) => {
            password::validate_passcode(passcode)
                .map_err(|msg| ApiError::field("passcode", msg))?;
            Some(password::hash_password(passcode)?)
        }
        None => None,
    };

    let username = req.username;
    if let Some(ref username) = username {
        if username != &target.username && User::exists_by_username(&state.db, username).await? {
            return Err(ApiError::Conflict("Username already exists".to_string()));
        }
    }

    let changes = UpdateUser {
        username,
        password_hash,
        email: req.email,
        name: req.name,
        role: req.role,
        location,
    };

    if changes.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let credential_changed = changes.password_hash.is_some();

    let user = User::update(&state.db, target.id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if credential_changed && user.id != ctx.user_id {
        Session::delete_for_user(&state.db, user.id).await?;
    }

    tracing::info!(user_id = user.id, updated_by = ctx.user_id, "User updated");

    Ok(Json(UserResponse {
        message: "User updated successfully".to_string(),
        user,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RemoveUserRequest {
    pub user_id: i64,
}

/// Deletes a staff account
///
/// # Errors
///
/// - `400 Bad Request`: Caller tried to delete themselves
/// - `403 Forbidden`: Manager removing an admin or a user elsewhere
/// - `404 Not Found`: Unknown user
pub async fn remove_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<RemoveUserRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if req.user_id == ctx.user_id {
        return Err(ApiError::BadRequest("Cannot delete your own account".to_string()));
    }

    let target = User::find_by_id(&state.db, req.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    require_can_modify(&ctx, target.role)?;
    require_location_scope(&ctx, target.location.as_deref())?;

    if !User::delete(&state.db, target.id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = target.id, removed_by = ctx.user_id, "User removed");

    Ok(Json(MessageResponse::new("User removed successfully")))
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
}

/// Lists staff: all for admins, same location for managers
pub async fn get_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
) -> ApiResult<Json<UsersResponse>> {
    let users = if ctx.role.is_admin() {
        User::list_all(&state.db).await?
    } else {
        match ctx.location.as_deref() {
            Some(location) => User::list_by_location(&state.db, location).await?,
            None => Vec::new(),
        }
    };

    Ok(Json(UsersResponse { users }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_requires_role() {
        let result: Result<CreateUserRequest, _> =
            serde_json::from_str(r#"{"username": "jdoe", "passcode": "1234"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_create_request_rejects_bad_email() {
        let req: CreateUserRequest = serde_json::from_str(
            r#"{"username": "jdoe", "passcode": "1234", "role": "employee", "email": "nope"}"#,
        )
        .unwrap();
        assert!(req.validate().unwrap_err().field_errors().contains_key("email"));
    }

    #[test]
    fn test_blank_fields_from_edit_form_are_absent() {
        let req: UpdateUserRequest = serde_json::from_str(
            r#"{"user_id": 7, "username": "", "email": "", "name": "Bob", "location": " ", "passcode": ""}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert!(req.email.is_none());
        assert!(req.username.is_none());
        assert!(req.location.is_none());
        assert!(req.passcode.is_none());
        assert_eq!(req.name.as_deref(), Some("Bob"));

        let req: CreateUserRequest = serde_json::from_str(
            r#"{"username": " jdoe ", "passcode": "1234", "role": "employee", "email": ""}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.username, "jdoe");
        assert!(req.email.is_none());
    }

    #[test]
    fn test_update_request_is_partial() {
        let req: UpdateUserRequest =
            serde_json::from_str(r#"{"user_id": 7, "role": "manager"}"#).unwrap();
        assert_eq!(req.role, Some(UserRole::Manager));
        assert!(req.username.is_none());
        assert!(req.validate().is_ok());
    }
}
