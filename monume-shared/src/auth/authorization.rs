/// Authorization helpers and permission checks
///
/// # Permission Model
///
/// 1. **Route access**: every route group carries an [`Access`] level that
///    the guard checks before the handler runs
/// 2. **Role assignment**: only admins may grant the admin role or touch admin accounts
/// 3. **Location scope**: managers act only on users at their own location
///
/// All checks take a [`SessionContext`]; the data layer never sees roles.
///
/// # Example
///
/// ```
/// use monume_shared::auth::authorization::{require_access, Access};
/// use monume_shared::auth::session::SessionContext;
/// use monume_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// let manager = SessionContext {
///     user_id: 2,
///     session_id: Uuid::new_v4(),
///     username: "mgr".to_string(),
///     role: UserRole::Manager,
///     location: Some("Downtown".to_string()),
/// };
///
/// assert!(require_access(&manager, Access::ManagerOrAdmin).is_ok());
/// assert!(require_access(&manager, Access::AdminOnly).is_err());
/// ```

use serde::{Deserialize, Serialize};

use super::session::SessionContext;
use crate::models::user::UserRole;

/// Access level required by a route group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// No session needed
    Public,
    /// Any logged-in user
    Authenticated,
    ManagerOrAdmin,
    AdminOnly,
}

impl Access {
    /// Whether the level needs a session at all
    pub fn requires_session(&self) -> bool {
        !matches!(self, Access::Public)
    }

    /// Whether a caller with `role` satisfies this level
    pub fn permits(&self, role: UserRole) -> bool {
        match self {
            Access::Public | Access::Authenticated => true,
            Access::ManagerOrAdmin => role.is_manager_or_admin(),
            Access::AdminOnly => role.is_admin(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::Authenticated => "authenticated",
            Access::ManagerOrAdmin => "manager_or_admin",
            Access::AdminOnly => "admin_only",
        }
    }
}

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Caller's role is below the route's access level
    #[error("Insufficient permissions: requires {}, has {actual}", required.as_str())]
    InsufficientRole { required: Access, actual: UserRole },

    /// Action is reserved for admins
    #[error("Only an admin may {0}")]
    AdminRequired(&'static str),

    /// Manager acting outside their own location
    #[error("Managers may only manage users at their own location")]
    OutsideLocation,
}

/// Checks a caller against a route access level
pub fn require_access(ctx: &SessionContext, required: Access) -> Result<(), AuthzError> {
    if !required.permits(ctx.role) {
        return Err(AuthzError::InsufficientRole {
            required,
            actual: ctx.role,
        });
    }

    Ok(())
}

/// Checks that the caller may give a user `role`
pub fn require_role_assignment(ctx: &SessionContext, role: UserRole) -> Result<(), AuthzError> {
    if role.is_admin() && !ctx.role.is_admin() {
        return Err(AuthzError::AdminRequired("assign the admin role"));
    }

    Ok(())
}

/// Checks that the caller may modify or remove a user holding `target_role`
pub fn require_can_modify(ctx: &SessionContext, target_role: UserRole) -> Result<(), AuthzError> {
    if target_role.is_admin() && !ctx.role.is_admin() {
        return Err(AuthzError::AdminRequired("modify an admin account"));
    }

    Ok(())
}

/// Checks that a manager is placing a user at their own location
///
/// Admins may use any location.
pub fn require_location_scope(
    ctx: &SessionContext,
    location: Option<&str>,
) -> Result<(), AuthzError> {
    if ctx.role.is_admin() {
        return Ok(());
    }

    match (ctx.location.as_deref(), location) {
        (Some(own), Some(target)) if own == target => Ok(()),
        _ => Err(AuthzError::OutsideLocation),
    }
}
