/// Outbound email audit log
///
/// Append-only. The dispatcher writes exactly one row per send attempt,
/// including attempts skipped because their category is switched off.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE email_logs (
///     id BIGSERIAL PRIMARY KEY,
///     recipient TEXT NOT NULL,
///     subject TEXT,
///     category email_category NOT NULL,
///     status email_status NOT NULL,
///     error_message TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// What kind of email a send is
///
/// Decides which settings flag (if any) gates the send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "email_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EmailCategory {
    /// Per-entry performance summary, gated by `auto_email_enabled`
    Performance,
    /// Gated by `daily_email_enabled`
    Daily,
    /// Gated by `weekly_email_enabled`
    Weekly,
    Test,
    Appointment,
    Notification,
    Other,
}

impl EmailCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailCategory::Performance => "performance",
            EmailCategory::Daily => "daily",
            EmailCategory::Weekly => "weekly",
            EmailCategory::Test => "test",
            EmailCategory::Appointment => "appointment",
            EmailCategory::Notification => "notification",
            EmailCategory::Other => "other",
        }
    }
}

impl std::fmt::Display for EmailCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one send attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "email_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    Success,
    Failed,
    /// Not attempted because the category is disabled
    Skipped,
}

/// A logged send attempt
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmailLog {
    pub id: i64,
    pub recipient: String,
    pub subject: Option<String>,
    pub category: EmailCategory,
    pub status: EmailStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for appending a log row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEmailLog {
    pub recipient: String,
    pub subject: Option<String>,
    pub category: EmailCategory,
    pub status: EmailStatus,
    pub error_message: Option<String>,
}

/// Default page size for log listings
pub const DEFAULT_LOG_LIMIT: i64 = 20;

impl EmailLog {
    pub async fn create(pool: &PgPool, data: NewEmailLog) -> Result<Self, sqlx::Error> {
        let log = sqlx::query_as::<_, EmailLog>(
            r#"
            INSERT INTO email_logs (recipient, subject, category, status, error_message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, recipient, subject, category, status, error_message, created_at
            "#,
        )
        .bind(data.recipient)
        .bind(data.subject)
        .bind(data.category)
        .bind(data.status)
        .bind(data.error_message)
        .fetch_one(pool)
        .await?;

        Ok(log)
    }

    /// Lists the most recent attempts, newest first
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        let logs = sqlx::query_as::<_, EmailLog>(
            r#"
            SELECT id, recipient, subject, category, status, error_message, created_at
            FROM email_logs
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(logs)
    }

    pub async fn count_by_status(pool: &PgPool, status: EmailStatus) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM email_logs WHERE status = $1")
            .bind(status)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
