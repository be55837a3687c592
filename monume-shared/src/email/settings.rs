/// Email settings store
///
/// A single JSON document on disk holds the SMTP connection details and the
/// per-category on/off switches. Reads return a copy with the SMTP password
/// masked. Writes go through an async mutex and replace the file atomically
/// (write to a temp file, then rename), so concurrent updates never
/// interleave and readers never see a half-written file.
///
/// # Example
///
/// ```no_run
/// use monume_shared::email::settings::SettingsStore;
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = SettingsStore::new("config/email_settings.json");
/// store.update("daily_email_enabled", &json!("yes")).await?;
///
/// let settings = store.load().await?;
/// assert!(settings.daily_email_enabled);
/// # Ok(())
/// # }
/// ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

/// Shown in place of a configured SMTP password
pub const PASSWORD_MASK: &str = "********";

/// Error type for the settings store
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Setting name is not on the allow-list
    #[error("Unknown or read-only setting: {0}")]
    UnknownSetting(String),

    /// Value has the wrong shape for the setting
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("Failed to access settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// SMTP connection details and category switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    /// Gates `performance` emails
    #[serde(deserialize_with = "lenient_bool")]
    pub auto_email_enabled: bool,

    /// Gates `daily` emails
    #[serde(deserialize_with = "lenient_bool")]
    pub daily_email_enabled: bool,

    /// Gates `weekly` emails
    #[serde(deserialize_with = "lenient_bool")]
    pub weekly_email_enabled: bool,

    pub smtp_server: String,

    pub smtp_port: u16,

    /// Upgrade the connection with STARTTLS
    #[serde(deserialize_with = "lenient_bool")]
    pub use_tls: bool,

    pub sender_email: String,

    pub sender_name: String,

    /// SMTP password; empty means no authentication
    pub password: String,

    /// Public domain used in links
    pub domain: String,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            auto_email_enabled: true,
            daily_email_enabled: false,
            weekly_email_enabled: true,
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            use_tls: true,
            sender_email: "monume.tracker@gmail.com".to_string(),
            sender_name: "MonuMe Tracker".to_string(),
            password: String::new(),
            domain: String::new(),
        }
    }
}

impl EmailSettings {
    /// Copy safe to return to clients
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        if !copy.password.is_empty() {
            copy.password = PASSWORD_MASK.to_string();
        }
        copy
    }

    /// `From` header value, e.g. `MonuMe Tracker <monume.tracker@gmail.com>`
    pub fn from_header(&self) -> String {
        if self.sender_name.trim().is_empty() {
            self.sender_email.clone()
        } else {
            format!("{} <{}>", self.sender_name, self.sender_email)
        }
    }
}

/// Settings that may be changed at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingName {
    AutoEmailEnabled,
    DailyEmailEnabled,
    WeeklyEmailEnabled,
    Domain,
}

impl SettingName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingName::AutoEmailEnabled => "auto_email_enabled",
            SettingName::DailyEmailEnabled => "daily_email_enabled",
            SettingName::WeeklyEmailEnabled => "weekly_email_enabled",
            SettingName::Domain => "domain",
        }
    }

    /// Writes `value` into `settings`
    pub fn apply(&self, settings: &mut EmailSettings, value: &Value) -> Result<(), SettingsError> {
        let invalid = |reason: &str| SettingsError::InvalidValue {
            name: self.as_str().to_string(),
            reason: reason.to_string(),
        };

        match self {
            SettingName::Domain => {
                let domain = value.as_str().ok_or_else(|| invalid("expected a string"))?;
                settings.domain = domain.trim().to_string();
            }
            flag => {
                let enabled = parse_bool(value).ok_or_else(|| invalid("expected a boolean"))?;
                match flag {
                    SettingName::AutoEmailEnabled => settings.auto_email_enabled = enabled,
                    SettingName::DailyEmailEnabled => settings.daily_email_enabled = enabled,
                    SettingName::WeeklyEmailEnabled => settings.weekly_email_enabled = enabled,
                    SettingName::Domain => {}
                }
            }
        }

        Ok(())
    }
}

impl FromStr for SettingName {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto_email_enabled" => Ok(SettingName::AutoEmailEnabled),
            "daily_email_enabled" => Ok(SettingName::DailyEmailEnabled),
            "weekly_email_enabled" => Ok(SettingName::WeeklyEmailEnabled),
            "domain" => Ok(SettingName::Domain),
            other => Err(SettingsError::UnknownSetting(other.to_string())),
        }
    }
}

/// Accepts JSON booleans and the strings/numbers the settings UI sends
///
/// `"true"`, `"1"`, `"yes"`, `1` are true; `"false"`, `"0"`, `"no"`, `0`
/// are false (case-insensitive). Anything else is `None`.
pub fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    parse_bool(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected a boolean, got {}", value)))
}

/// File-backed settings with serialised writes
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current settings
    ///
    /// A missing file is created with defaults.
    pub async fn load(&self) -> Result<EmailSettings, SettingsError> {
        let _guard = self.lock.lock().await;
        self.read_or_init().await
    }

    /// Reads the current settings with the password masked
    pub async fn load_masked(&self) -> Result<EmailSettings, SettingsError> {
        Ok(self.load().await?.masked())
    }

    /// Changes one allow-listed setting and persists the document
    ///
    /// # Errors
    ///
    /// - `UnknownSetting` if `name` is not on the allow-list
    /// - `InvalidValue` if the value has the wrong shape
    /// - `Io` / `Malformed` if the file cannot be read or written
    ///
    /// Returns the updated settings, masked.
    pub async fn update(&self, name: &str, value: &Value) -> Result<EmailSettings, SettingsError> {
        let setting: SettingName = name.parse()?;

        let _guard = self.lock.lock().await;
        let mut settings = self.read_or_init().await?;
        setting.apply(&mut settings, value)?;
        self.write(&settings).await?;

        tracing::info!(setting = setting.as_str(), "Email setting updated");

        Ok(settings.masked())
    }

    async fn read_or_init(&self) -> Result<EmailSettings, SettingsError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "Email settings file missing; writing defaults");
                let settings = EmailSettings::default();
                self.write(&settings).await?;
                Ok(settings)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, settings: &EmailSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let body = serde_json::to_vec_pretty(settings)?;
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        Ok(())
    }
}
