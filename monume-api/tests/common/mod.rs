//! Common test utilities for integration tests
//!
//! Integration tests need a PostgreSQL database named by `DATABASE_URL`.
//! When it is unset, `TestContext::try_new` returns `None` and the test
//! returns early.
//!
//! Email goes to an in-memory transport so no SMTP server is needed.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use monume_api::{
    app::{build_router, AppState},
    config::{ApiConfig, Config, DatabaseConfig, EmailConfig, SessionConfig},
};
use monume_shared::{
    auth::password::hash_password,
    db::migrations::run_migrations,
    email::{
        settings::EmailSettings,
        transport::{MailTransport, OutgoingEmail, TransportError},
    },
    models::user::{CreateUser, User, UserRole},
};
use serde_json::Value;
use sqlx::PgPool;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const TEST_PASSCODE: &str = "test-passcode";

/// Transport that keeps messages in memory
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(
        &self,
        _settings: &EmailSettings,
        email: &OutgoingEmail,
    ) -> Result<(), TransportError> {
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
    pub transport: Arc<RecordingTransport>,
    pub settings_path: PathBuf,
    pub staff_email: String,
    /// Unique per test so manager scoping never sees other tests' users
    pub location: String,
    created_users: Mutex<Vec<i64>>,
}

impl TestContext {
    /// Connects, migrates and builds the router, or `None` without a database
    pub async fn try_new() -> Option<Self> {
        dotenvy::dotenv().ok();
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping integration test");
            return None;
        };

        let db = PgPool::connect(&url).await.expect("connect to test database");
        run_migrations(&db).await.expect("run migrations");

        let suffix = Uuid::new_v4().simple().to_string();
        let settings_path = std::env::temp_dir().join(format!("monume-settings-{}.json", suffix));
        let staff_email = format!("staff-{}@example.com", suffix);

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url,
                max_connections: 5,
            },
            session: SessionConfig {
                secret: TEST_SECRET.to_string(),
                idle_timeout_minutes: 60,
                max_age_hours: 12,
            },
            email: EmailConfig {
                settings_path: settings_path.clone(),
                staff_notification_email: Some(staff_email.clone()),
                public_base_url: "http://localhost:8080".to_string(),
                smtp_timeout_seconds: 5,
            },
            bootstrap_admin_password: "ori3".to_string(),
        };

        let transport = Arc::new(RecordingTransport::default());
        let state = AppState::with_transport(db.clone(), config, transport.clone());

        Some(Self {
            db,
            app: build_router(state),
            transport,
            settings_path,
            staff_email,
            location: format!("Test Store {}", suffix),
            created_users: Mutex::new(Vec::new()),
        })
    }

    /// Creates a user with `TEST_PASSCODE` at this context's location
    pub async fn create_user(&self, role: UserRole) -> User {
        self.create_user_at(role, Some(self.location.clone())).await
    }

    pub async fn create_user_at(&self, role: UserRole, location: Option<String>) -> User {
        let username = format!("{}-{}", role, Uuid::new_v4().simple());
        let user = User::create(
            &self.db,
            CreateUser {
                email: Some(format!("{}@example.com", username)),
                name: None,
                username,
                password_hash: hash_password(TEST_PASSCODE).expect("hash"),
                role,
                location,
            },
        )
        .await
        .expect("create user");

        self.created_users.lock().await.push(user.id);
        user
    }

    /// Logs in and returns the bearer token
    pub async fn login(&self, user: &User) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/login",
                None,
                Some(serde_json::json!({
                    "username": user.username,
                    "password": TEST_PASSCODE,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().expect("token in body").to_string()
    }

    /// Creates a user and logs them in
    pub async fn session(&self, role: UserRole) -> (User, String) {
        let user = self.create_user(role).await;
        let token = self.login(&user).await;
        (user, token)
    }

    /// Sends a JSON request through the router
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self.app.clone().oneshot(request).await.expect("call router");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    /// Email log rows for a recipient
    pub async fn email_log_count(&self, recipient: &str) -> i64 {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM email_logs WHERE recipient = $1")
                .bind(recipient)
                .fetch_one(&self.db)
                .await
                .expect("count email logs");
        count
    }

    /// Removes users created by this context and the settings file
    pub async fn cleanup(&self) {
        for id in self.created_users.lock().await.drain(..) {
            let _ = User::delete(&self.db, id).await;
        }
        let _ = tokio::fs::remove_file(&self.settings_path).await;
    }
}
