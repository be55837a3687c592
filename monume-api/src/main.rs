//! # MonuMe Tracker API Server
//!
//! Serves the tracker's JSON API: login sessions, the staff and location
//! directory, daily tracking entries, forms, and transactional email.
//!
//! On startup the server applies pending migrations and seeds an empty
//! database with the `admin` account, default locations and sample forms.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/monume JWT_SECRET=... cargo run -p monume-api
//! ```

use monume_api::{
    app::{build_router, AppState},
    config::Config,
};
use monume_shared::db::{
    migrations::{ensure_database_exists, run_migrations},
    pool::{close_pool, create_pool, DatabaseConfig},
    seed::seed_defaults,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "monume_api=debug,monume_shared=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "MonuMe Tracker API v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    ensure_database_exists(&config.database.url).await?;

    let pool = create_pool(DatabaseConfig {
        max_connections: config.database.max_connections,
        ..DatabaseConfig::from_url(config.database.url.clone())
    })
    .await?;

    run_migrations(&pool).await?;

    let report = seed_defaults(&pool, &config.bootstrap_admin_password).await?;
    if report.admin_created {
        tracing::warn!("Seeded default admin account; change its passcode after first login");
    }
    tracing::info!(
        locations = report.locations_created,
        forms = report.forms_created,
        "Bootstrap data checked"
    );

    let address = config.bind_address();
    let state = AppState::new(pool.clone(), config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown signal received, closing database pool...");
    close_pool(pool).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
