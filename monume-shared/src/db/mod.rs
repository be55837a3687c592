/// Database layer
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: Embedded migration runner
/// - `seed`: Bootstrap admin, default locations and sample forms
/// - Models are in the `models` module at crate root level
///
/// # Example
///
/// ```no_run
/// use monume_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}, seed::seed_defaults};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig::from_url(std::env::var("DATABASE_URL")?)).await?;
///     run_migrations(&pool).await?;
///     seed_defaults(&pool, "ori3").await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
pub mod seed;
