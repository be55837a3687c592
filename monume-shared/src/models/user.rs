/// User model and database operations
///
/// Staff accounts for the tracker. Each user has exactly one role and an
/// optional free-text store location (not a foreign key into `locations`;
/// managers are scoped by string equality on this column).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     username TEXT NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     email TEXT,
///     name TEXT,
///     role user_role NOT NULL DEFAULT 'employee',
///     location TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use monume_shared::models::user::{User, CreateUser, UserRole};
/// use monume_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     username: "jdoe".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     email: None,
///     name: Some("John Doe".to_string()),
///     role: UserRole::Employee,
///     location: Some("Downtown".to_string()),
/// }).await?;
///
/// let found = User::find_by_username(&pool, "jdoe").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Role of a user
///
/// Ordered by privilege: `Employee < Manager < Admin`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Records own tracking data
    Employee,

    /// Manages users at their own location
    Manager,

    /// Full access
    Admin,
}

impl UserRole {
    /// True for managers and admins
    pub fn is_manager_or_admin(&self) -> bool {
        matches!(self, UserRole::Manager | UserRole::Admin)
    }

    /// True only for admins
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Employee => "employee",
            UserRole::Manager => "manager",
            UserRole::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "employee" => Ok(UserRole::Employee),
            "manager" => Ok(UserRole::Manager),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("Invalid role: {}", other)),
        }
    }
}

/// User account
///
/// `password_hash` is never serialized, so a `User` can be returned from
/// handlers directly.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,

    /// Unique login name
    pub username: String,

    /// Argon2id PHC string
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub email: Option<String>,

    /// Display name
    pub name: Option<String>,

    pub role: UserRole,

    /// Store location (free text)
    pub location: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,

    /// Argon2id hash (NOT the plaintext passcode)
    pub password_hash: String,

    pub email: Option<String>,

    pub name: Option<String>,

    pub role: UserRole,

    pub location: Option<String>,
}

/// Input for updating an existing user
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,

    pub password_hash: Option<String>,

    pub email: Option<String>,

    pub name: Option<String>,

    pub role: Option<UserRole>,

    pub location: Option<String>,
}

impl UpdateUser {
    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.password_hash.is_none()
            && self.email.is_none()
            && self.name.is_none()
            && self.role.is_none()
            && self.location.is_none()
    }
}

const USER_COLUMNS: &str =
    "id, username, password_hash, email, name, role, location, created_at, updated_at";

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns an error if the username is taken (unique constraint
    /// violation) or the database connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (username, password_hash, email, name, role, location)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(data.username)
            .bind(data.password_hash)
            .bind(data.email)
            .bind(data.name)
            .bind(data.role)
            .bind(data.location)
            .fetch_one(pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by username (exact match)
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use monume_shared::models::user::User;
    /// # use sqlx::PgPool;
    /// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
    /// if let Some(user) = User::find_by_username(&pool, "admin").await? {
    ///     println!("Found user: {} ({})", user.username, user.role);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);

        let user = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Checks whether a username is already taken
    pub async fn exists_by_username(pool: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(pool)
                .await?;

        Ok(exists)
    }

    /// Lists every user, ordered by username
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users ORDER BY username", USER_COLUMNS);

        let users = sqlx::query_as::<_, User>(&query).fetch_all(pool).await?;

        Ok(users)
    }

    /// Lists users assigned to one location, ordered by username
    pub async fn list_by_location(pool: &PgPool, location: &str) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM users WHERE location = $1 ORDER BY username",
            USER_COLUMNS
        );

        let users = sqlx::query_as::<_, User>(&query)
            .bind(location)
            .fetch_all(pool)
            .await?;

        Ok(users)
    }

    /// Updates an existing user
    ///
    /// Only non-None fields in `data` will be updated. The `updated_at`
    /// timestamp is always bumped.
    ///
    /// # Returns
    ///
    /// The updated user if found, None if the user doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.username.is_some() {
            bind_count += 1;
            query.push_str(&format!(", username = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.role.is_some() {
            bind_count += 1;
            query.push_str(&format!(", role = ${}", bind_count));
        }
        if data.location.is_some() {
            bind_count += 1;
            query.push_str(&format!(", location = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", USER_COLUMNS));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(username) = data.username {
            q = q.bind(username);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(role) = data.role {
            q = q.bind(role);
        }
        if let Some(location) = data.location {
            q = q.bind(location);
        }

        let user = q.fetch_optional(pool).await?;

        Ok(user)
    }

    /// Replaces a user's credential hash
    ///
    /// # Returns
    ///
    /// True if the user was found and updated
    pub async fn update_password_hash(
        pool: &PgPool,
        id: i64,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a user by ID
    ///
    /// Tracking entries and sessions cascade.
    ///
    /// # Returns
    ///
    /// True if user was deleted, false if user didn't exist
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts total number of users
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Display name, falling back to the username
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.username)
    }
}
