/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use monume_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use monume_shared::{
    auth::{
        authorization::{require_access, Access},
        session::{authenticate_request, SessionSettings},
    },
    email::{
        dispatcher::{DeliveryLog, Dispatcher},
        settings::SettingsStore,
        transport::{MailTransport, SmtpMailer},
    },
    models::auth_audit::{AuthAuditEvent, AuthEventKind},
};
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Token signing secret and session lifetimes
    pub sessions: Arc<SessionSettings>,

    /// Outbound email, backed by the settings file and `email_logs`
    pub dispatcher: Dispatcher,
}

impl AppState {
    /// Creates application state that delivers email over SMTP
    pub fn new(db: PgPool, config: Config) -> Self {
        let transport = Arc::new(SmtpMailer::new(Duration::from_secs(
            config.email.smtp_timeout_seconds,
        )));
        Self::with_transport(db, config, transport)
    }

    /// Creates application state with a caller-supplied mail transport
    pub fn with_transport(db: PgPool, config: Config, transport: Arc<dyn MailTransport>) -> Self {
        let sessions = SessionSettings::new(
            config.session.secret.clone(),
            config.session.idle_timeout_minutes,
            config.session.max_age_hours,
        );
        let settings = Arc::new(SettingsStore::new(config.email.settings_path.clone()));
        let log: Arc<dyn DeliveryLog> = Arc::new(db.clone());
        let dispatcher = Dispatcher::new(settings, transport, log);

        Self {
            db,
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            dispatcher,
        }
    }

    /// The email settings document
    pub fn email_settings(&self) -> &SettingsStore {
        self.dispatcher.settings()
    }

    /// Whether cookies should carry the `Secure` attribute
    pub fn secure_cookies(&self) -> bool {
        self.config.api.production
    }
}

/// State handed to the session guard of one route group
#[derive(Clone)]
struct GuardState {
    app: AppState,
    access: Access,
}

/// Wraps a route group in the session guard for `access`
///
/// Public groups are returned untouched.
fn guarded(routes: Router<AppState>, state: &AppState, access: Access) -> Router<AppState> {
    if !access.requires_session() {
        return routes;
    }

    routes.route_layer(from_fn_with_state(
        GuardState {
            app: state.clone(),
            access,
        },
        session_guard,
    ))
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// Routes are grouped by the access level they require; each group gets
/// its own session guard. Paths match what the tracker front-end calls.
///
/// ```text
/// Public
///   GET  /health
///   POST /login, /logout, /confirm_passcode, /verify_password
///   GET  /get_locations, /get_location/:id
///   GET  /api/forms, /api/forms/:id
///   POST /api/forms/:id/submit
///   GET  /api/appointment-status      POST /api/appointment-status
/// Authenticated
///   GET  /get_current_user, /get_history
///   POST /change_passcode, /save_tracking_data, /save_tracking_with_email
///   POST /send_appointment_email, /send_simple_email
/// ManagerOrAdmin
///   POST /create_user, /update_user, /remove_user     GET /get_users
///   POST /api/forms   PUT|DELETE /api/forms/:id       GET /api/forms/:id/responses
///   GET  /api/form_responses/:id (same listing)
///   GET  /get_email_settings, /get_email_logs         POST /send_test_email
/// AdminOnly
///   POST /add_location, /update_location, /remove_location
///   POST /update_email_setting                         GET /get_auth_audit
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Session guard (per route group)
/// 2. Logging (tower-http TraceLayer)
/// 3. Compression
/// 4. CORS (tower-http CorsLayer)
/// 5. Security headers
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{appointments, auth, email, forms, health, locations, tracking, users};

    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/confirm_passcode", post(auth::confirm_passcode))
        .route("/verify_password", post(auth::verify_password))
        .route("/get_locations", get(locations::get_locations))
        .route("/get_location/:id", get(locations::get_location))
        .route("/api/forms", get(forms::list_forms))
        .route("/api/forms/:id", get(forms::get_form))
        .route("/api/forms/:id/submit", post(forms::submit_response))
        .route(
            "/api/appointment-status",
            get(appointments::get_status).post(appointments::record_status),
        );

    let authenticated = Router::new()
        .route("/get_current_user", get(auth::current_user))
        .route("/change_passcode", post(auth::change_passcode))
        .route("/get_history", get(tracking::get_history))
        .route("/save_tracking_data", post(tracking::save_tracking_data))
        .route("/save_tracking_with_email", post(tracking::save_tracking_data))
        .route("/send_appointment_email", post(email::send_appointment_email))
        .route("/send_simple_email", post(email::send_simple_email));

    let manager = Router::new()
        .route("/create_user", post(users::create_user))
        .route("/update_user", post(users::update_user))
        .route("/remove_user", post(users::remove_user))
        .route("/get_users", get(users::get_users))
        .route("/api/forms", post(forms::create_form))
        .route(
            "/api/forms/:id",
            axum::routing::put(forms::update_form).delete(forms::delete_form),
        )
        .route("/api/forms/:id/responses", get(forms::list_responses))
        .route("/api/form_responses/:id", get(forms::list_responses))
        .route("/get_email_settings", get(email::get_email_settings))
        .route("/get_email_logs", get(email::get_email_logs))
        .route("/send_test_email", post(email::send_test_email));

    let admin = Router::new()
        .route("/add_location", post(locations::add_location))
        .route("/update_location", post(locations::update_location))
        .route("/remove_location", post(locations::remove_location))
        .route("/update_email_setting", post(email::update_email_setting))
        .route("/get_auth_audit", get(auth::get_auth_audit));

    let cors = if state.config.cors_permissive() {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600))
    };

    Router::new()
        .merge(guarded(public, &state, Access::Public))
        .merge(guarded(authenticated, &state, Access::Authenticated))
        .merge(guarded(manager, &state, Access::ManagerOrAdmin))
        .merge(guarded(admin, &state, Access::AdminOnly))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Session guard middleware
///
/// Resolves the caller from the bearer token or session cookie, checks
/// the group's access level, then injects `SessionContext` into request
/// extensions. Denials are persisted to `auth_audit_events`.
async fn session_guard(
    State(guard): State<GuardState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let db = &guard.app.db;

    let ctx = match authenticate_request(db, &guard.app.sessions, req.headers()).await {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::warn!(
                method = %req.method(),
                path = %req.uri().path(),
                error = %e,
                "Rejected request without a valid session"
            );
            return Err(e.into());
        }
    };

    if let Err(e) = require_access(&ctx, guard.access) {
        let detail = format!("{} {}", req.method(), req.uri().path());
        tracing::warn!(
            user_id = ctx.user_id,
            username = %ctx.username,
            role = %ctx.role,
            required = guard.access.as_str(),
            %detail,
            "Access denied"
        );
        AuthAuditEvent::record_quietly(
            db,
            AuthEventKind::AccessDenied,
            Some(&ctx.username),
            Some(ctx.user_id),
            Some(&detail),
        )
        .await;
        return Err(e.into());
    }

    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}
