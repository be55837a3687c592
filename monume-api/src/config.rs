/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: *)
/// - `PRODUCTION`: Enables HSTS and secure cookies (default: false)
/// - `JWT_SECRET`: Secret key for session token signing (required, 32+ chars)
/// - `SESSION_IDLE_TIMEOUT_MINUTES`: Idle timeout (default: 60)
/// - `SESSION_MAX_AGE_HOURS`: Absolute token lifetime (default: 12)
/// - `EMAIL_SETTINGS_PATH`: Email settings JSON file (default: email_settings.json)
/// - `STAFF_NOTIFICATION_EMAIL`: Recipient of appointment status notices (optional)
/// - `PUBLIC_BASE_URL`: Base URL used in emailed links (default: http://localhost:8080)
/// - `SMTP_TIMEOUT_SECONDS`: SMTP connect/read timeout (default: 30)
/// - `BOOTSTRAP_ADMIN_PASSWORD`: Passcode of the seeded admin (default: ori3)
/// - `RUST_LOG`: Log level (default: monume_api=debug,tower_http=debug)
///
/// # Example
///
/// ```no_run
/// use monume_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Session configuration
    pub session: SessionConfig,

    /// Email configuration
    pub email: EmailConfig,

    /// Passcode given to the seeded `admin` account on an empty store
    #[serde(skip_serializing)]
    pub bootstrap_admin_password: String,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins (`*` means permissive)
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS, `Secure` cookies)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Secret key for session token signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,

    /// Minutes of inactivity after which a session is dropped
    pub idle_timeout_minutes: i64,

    /// Hours after which a token expires regardless of activity
    pub max_age_hours: i64,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Where the email settings document lives
    pub settings_path: PathBuf,

    /// Who hears about appointment status changes
    pub staff_notification_email: Option<String>,

    /// Base URL for links inside emails
    pub public_base_url: String,

    /// SMTP connect/read timeout in seconds
    pub smtp_timeout_seconds: u64,
}

/// Reads an optional variable, parsing it when present
fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
        _ => Ok(default),
    }
}

fn parse_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    /// - `JWT_SECRET` is shorter than 32 characters
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = parse_var("API_PORT", 8080u16)?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = parse_var("DATABASE_MAX_CONNECTIONS", 10u32)?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let idle_timeout_minutes = parse_var("SESSION_IDLE_TIMEOUT_MINUTES", 60i64)?;
        let max_age_hours = parse_var("SESSION_MAX_AGE_HOURS", 12i64)?;

        if idle_timeout_minutes <= 0 || max_age_hours <= 0 {
            anyhow::bail!("Session timeouts must be positive");
        }

        let staff_notification_email = env::var("STAFF_NOTIFICATION_EMAIL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
                production: parse_flag("PRODUCTION"),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            session: SessionConfig {
                secret: jwt_secret,
                idle_timeout_minutes,
                max_age_hours,
            },
            email: EmailConfig {
                settings_path: env::var("EMAIL_SETTINGS_PATH")
                    .unwrap_or_else(|_| "email_settings.json".to_string())
                    .into(),
                staff_notification_email,
                public_base_url: env::var("PUBLIC_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:8080".to_string())
                    .trim_end_matches('/')
                    .to_string(),
                smtp_timeout_seconds: parse_var("SMTP_TIMEOUT_SECONDS", 30u64)?,
            },
            bootstrap_admin_password: env::var("BOOTSTRAP_ADMIN_PASSWORD")
                .unwrap_or_else(|_| "ori3".to_string()),
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Whether CORS should allow any origin
    pub fn cors_permissive(&self) -> bool {
        self.api.cors_origins.iter().any(|o| o == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["https://tracker.example.com".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/test".to_string(),
                max_connections: 10,
            },
            session: SessionConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
                idle_timeout_minutes: 60,
                max_age_hours: 12,
            },
            email: EmailConfig {
                settings_path: "email_settings.json".into(),
                staff_notification_email: None,
                public_base_url: "http://localhost:8080".to_string(),
                smtp_timeout_seconds: 30,
            },
            bootstrap_admin_password: "ori3".to_string(),
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(sample().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_cors_permissive() {
        let mut config = sample();
        assert!(!config.cors_permissive());

        config.api.cors_origins.push("*".to_string());
        assert!(config.cors_permissive());
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(!json.contains("test-secret-key"));
        assert!(!json.contains("ori3"));
    }
}
