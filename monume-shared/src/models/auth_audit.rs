/// Persisted record of failed authentication and authorization attempts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "auth_event_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuthEventKind {
    /// Unknown username or wrong passcode at login
    LoginFailed,
    /// Authenticated caller lacked the role for a route or action
    AccessDenied,
    /// Passcode confirmation or verification failed
    CredentialCheckFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuthAuditEvent {
    pub id: i64,
    pub username: Option<String>,
    pub user_id: Option<i64>,
    pub event: AuthEventKind,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuthAuditEvent {
    pub async fn record(
        pool: &PgPool,
        event: AuthEventKind,
        username: Option<&str>,
        user_id: Option<i64>,
        detail: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO auth_audit_events (username, user_id, event, detail)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(username)
        .bind(user_id)
        .bind(event)
        .bind(detail)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Records an event, logging instead of failing if the insert fails
    pub async fn record_quietly(
        pool: &PgPool,
        event: AuthEventKind,
        username: Option<&str>,
        user_id: Option<i64>,
        detail: Option<&str>,
    ) {
        if let Err(e) = Self::record(pool, event, username, user_id, detail).await {
            tracing::error!(error = %e, ?event, "Failed to persist auth audit event");
        }
    }

    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        let events = sqlx::query_as::<_, AuthAuditEvent>(
            r#"
            SELECT id, username, user_id, event, detail, created_at
            FROM auth_audit_events
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(events)
    }
}
