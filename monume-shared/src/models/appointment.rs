/// Appointment status changes
///
/// Customers confirm, cancel or reschedule from a tokenised link in their
/// confirmation email. Each action appends a row; the latest row for a
/// token is the current status.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE appointment_status_changes (
///     id BIGSERIAL PRIMARY KEY,
///     token TEXT NOT NULL,
///     status appointment_status NOT NULL,
///     rescheduled_for TIMESTAMPTZ,
///     notes TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "appointment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Cancelled,
    Rescheduled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Rescheduled => "rescheduled",
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AppointmentStatusChange {
    pub id: i64,
    pub token: String,
    pub status: AppointmentStatus,
    pub rescheduled_for: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStatusChange {
    pub token: String,
    pub status: AppointmentStatus,
    pub rescheduled_for: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl AppointmentStatusChange {
    pub async fn record(pool: &PgPool, data: NewStatusChange) -> Result<Self, sqlx::Error> {
        let change = sqlx::query_as::<_, AppointmentStatusChange>(
            r#"
            INSERT INTO appointment_status_changes (token, status, rescheduled_for, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING id, token, status, rescheduled_for, notes, created_at
            "#,
        )
        .bind(data.token)
        .bind(data.status)
        .bind(data.rescheduled_for)
        .bind(data.notes)
        .fetch_one(pool)
        .await?;

        Ok(change)
    }

    /// All changes for a token, newest first
    pub async fn history(pool: &PgPool, token: &str) -> Result<Vec<Self>, sqlx::Error> {
        let changes = sqlx::query_as::<_, AppointmentStatusChange>(
            r#"
            SELECT id, token, status, rescheduled_for, notes, created_at
            FROM appointment_status_changes
            WHERE token = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(token)
        .fetch_all(pool)
        .await?;

        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        let parsed: AppointmentStatus = serde_json::from_str("\"rescheduled\"").unwrap();
        assert_eq!(parsed, AppointmentStatus::Rescheduled);
        assert_eq!(AppointmentStatus::Cancelled.to_string(), "cancelled");
        assert!(serde_json::from_str::<AppointmentStatus>("\"no-show\"").is_err());
    }
}
