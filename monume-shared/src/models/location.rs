/// Store locations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE locations (
///     id BIGSERIAL PRIMARY KEY,
///     location_name TEXT NOT NULL,
///     mall TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// A store location
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Location {
    pub id: i64,

    pub location_name: String,

    /// Shopping centre the store sits in
    pub mall: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Input for creating a location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLocation {
    pub location_name: String,
    pub mall: Option<String>,
}

/// Partial update for a location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLocation {
    pub location_name: Option<String>,
    pub mall: Option<String>,
}

impl Location {
    pub async fn create(pool: &PgPool, data: CreateLocation) -> Result<Self, sqlx::Error> {
        let location = sqlx::query_as::<_, Location>(
            r#"
            INSERT INTO locations (location_name, mall)
            VALUES ($1, $2)
            RETURNING id, location_name, mall, created_at
            "#,
        )
        .bind(data.location_name)
        .bind(data.mall)
        .fetch_one(pool)
        .await?;

        Ok(location)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let location = sqlx::query_as::<_, Location>(
            "SELECT id, location_name, mall, created_at FROM locations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(location)
    }

    /// Lists all locations ordered by name
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let locations = sqlx::query_as::<_, Location>(
            "SELECT id, location_name, mall, created_at FROM locations ORDER BY location_name, id",
        )
        .fetch_all(pool)
        .await?;

        Ok(locations)
    }

    /// Applies a partial update
    ///
    /// Unset fields keep their current value.
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateLocation,
    ) -> Result<Option<Self>, sqlx::Error> {
        let location = sqlx::query_as::<_, Location>(
            r#"
            UPDATE locations
            SET location_name = COALESCE($2, location_name),
                mall = COALESCE($3, mall)
            WHERE id = $1
            RETURNING id, location_name, mall, created_at
            "#,
        )
        .bind(id)
        .bind(data.location_name)
        .bind(data.mall)
        .fetch_optional(pool)
        .await?;

        Ok(location)
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM locations")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
