/// Daily performance ledger
///
/// Append-only: every save inserts a new row, even for a (user, date) pair
/// that already has one. History reads join the owning user so the report
/// can show username and location.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE employee_responses (
///     id BIGSERIAL PRIMARY KEY,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     date DATE NOT NULL DEFAULT CURRENT_DATE,
///     opal_demos INTEGER NOT NULL DEFAULT 0,
///     opal_sales INTEGER NOT NULL DEFAULT 0,
///     scan_demos INTEGER NOT NULL DEFAULT 0,
///     scan_sold INTEGER NOT NULL DEFAULT 0,
///     net_sales DOUBLE PRECISION NOT NULL DEFAULT 0,
///     hours_worked DOUBLE PRECISION NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;

/// One saved day of counters
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrackingEntry {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub opal_demos: i32,
    pub opal_sales: i32,
    pub scan_demos: i32,
    pub scan_sold: i32,
    pub net_sales: f64,
    pub hours_worked: f64,
    pub created_at: DateTime<Utc>,
}

/// Counters submitted by an employee
///
/// Missing counters are zero and a missing date is today (server time).
/// There is no `user_id` field: the owner always comes from
/// the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewTrackingEntry {
    pub date: Option<NaiveDate>,

    #[validate(range(min = 0, message = "opal_demos must not be negative"))]
    #[serde(default)]
    pub opal_demos: i32,

    #[validate(range(min = 0, message = "opal_sales must not be negative"))]
    #[serde(default)]
    pub opal_sales: i32,

    #[validate(range(min = 0, message = "scan_demos must not be negative"))]
    #[serde(default)]
    pub scan_demos: i32,

    #[validate(range(min = 0, message = "scan_sold must not be negative"))]
    #[serde(default)]
    pub scan_sold: i32,

    #[validate(range(min = 0.0, message = "net_sales must not be negative"))]
    #[serde(default)]
    pub net_sales: f64,

    #[validate(range(min = 0.0, max = 24.0, message = "hours_worked must be between 0 and 24"))]
    #[serde(default)]
    pub hours_worked: f64,
}

/// A ledger row joined with its owner, as shown in the history report
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HistoryRow {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub date: NaiveDate,
    pub opal_demos: i32,
    pub opal_sales: i32,
    pub scan_demos: i32,
    pub scan_sold: i32,
    pub net_sales: f64,
    pub hours_worked: f64,
    pub created_at: DateTime<Utc>,
}

impl TrackingEntry {
    /// Appends an entry for `user_id`
    pub async fn record(
        pool: &PgPool,
        user_id: i64,
        data: NewTrackingEntry,
    ) -> Result<Self, sqlx::Error> {
        let date = data.date.unwrap_or_else(|| Utc::now().date_naive());

        let entry = sqlx::query_as::<_, TrackingEntry>(
            r#"
            INSERT INTO employee_responses
                (user_id, date, opal_demos, opal_sales, scan_demos, scan_sold, net_sales, hours_worked)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, date, opal_demos, opal_sales, scan_demos, scan_sold,
                      net_sales, hours_worked, created_at
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(data.opal_demos)
        .bind(data.opal_sales)
        .bind(data.scan_demos)
        .bind(data.scan_sold)
        .bind(data.net_sales)
        .bind(data.hours_worked)
        .fetch_one(pool)
        .await?;

        Ok(entry)
    }

    /// Lists every entry with its owner, newest date first
    pub async fn list_history(pool: &PgPool) -> Result<Vec<HistoryRow>, sqlx::Error> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT r.id, r.user_id, u.username, u.name, u.location, r.date,
                   r.opal_demos, r.opal_sales, r.scan_demos, r.scan_sold,
                   r.net_sales, r.hours_worked, r.created_at
            FROM employee_responses r
            JOIN users u ON u.id = r.user_id
            ORDER BY r.date DESC, r.id DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    /// Opal closing rate as a percentage (0 when there were no demos)
    pub fn opal_conversion(&self) -> f64 {
        percentage(self.opal_sales, self.opal_demos)
    }

    /// Scan closing rate as a percentage (0 when there were no demos)
    pub fn scan_conversion(&self) -> f64 {
        percentage(self.scan_sold, self.scan_demos)
    }

    /// Net sales per hour worked (0 when no hours were logged)
    pub fn sales_per_hour(&self) -> f64 {
        if self.hours_worked > 0.0 {
            self.net_sales / self.hours_worked
        } else {
            0.0
        }
    }
}

fn percentage(part: i32, whole: i32) -> f64 {
    if whole > 0 {
        f64::from(part) * 100.0 / f64::from(whole)
    } else {
        0.0
    }
}
