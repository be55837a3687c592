/// Notification dispatcher
///
/// The single entry point for outbound email. Every call produces exactly
/// one audit row and a [`DeliveryOutcome`]; delivery failures are returned
/// as data and never surface as errors.
///
/// # Gating
///
/// ```text
/// performance  -> auto_email_enabled
/// daily        -> daily_email_enabled
/// weekly       -> weekly_email_enabled
/// test, appointment, notification, other -> always sent
/// ```
///
/// A gated category that is switched off is not handed to the transport;
/// it is logged with status `skipped`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use monume_shared::email::dispatcher::Dispatcher;
/// use monume_shared::email::settings::SettingsStore;
/// use monume_shared::email::transport::SmtpMailer;
/// use monume_shared::models::email_log::EmailCategory;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) {
/// let dispatcher = Dispatcher::new(
///     Arc::new(SettingsStore::new("config/email_settings.json")),
///     Arc::new(SmtpMailer::new(Duration::from_secs(30))),
///     Arc::new(pool),
/// );
///
/// let outcome = dispatcher
///     .send_email("staff@example.com", "Hello", "<p>Hi</p>", None, EmailCategory::Other)
///     .await;
/// if !outcome.success {
///     eprintln!("not sent: {:?}", outcome.error);
/// }
/// # }
/// ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::settings::{EmailSettings, SettingsStore};
use super::templates::RenderedEmail;
use super::transport::{Attachment, MailTransport, OutgoingEmail};
use crate::models::email_log::{EmailCategory, EmailLog, EmailStatus, NewEmailLog};

/// Where delivery attempts are recorded
#[async_trait]
pub trait DeliveryLog: Send + Sync {
    async fn record(&self, entry: NewEmailLog) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl DeliveryLog for PgPool {
    async fn record(&self, entry: NewEmailLog) -> Result<(), sqlx::Error> {
        EmailLog::create(self, entry).await.map(|_| ())
    }
}

/// Result of a send, as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Status written to the audit log
    #[serde(skip)]
    pub status: Option<EmailStatus>,
}

impl DeliveryOutcome {
    fn sent() -> Self {
        Self {
            success: true,
            error: None,
            status: Some(EmailStatus::Success),
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
            status: Some(EmailStatus::Failed),
        }
    }

    fn skipped(error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
            status: Some(EmailStatus::Skipped),
        }
    }

    pub fn was_skipped(&self) -> bool {
        self.status == Some(EmailStatus::Skipped)
    }
}

/// Label of the settings switch gating a category, if any
fn gate_label(category: EmailCategory) -> Option<&'static str> {
    match category {
        EmailCategory::Performance => Some("Automatic"),
        EmailCategory::Daily => Some("Daily"),
        EmailCategory::Weekly => Some("Weekly"),
        EmailCategory::Test
        | EmailCategory::Appointment
        | EmailCategory::Notification
        | EmailCategory::Other => None,
    }
}

/// Whether `settings` allow sending a `category` email
pub fn category_enabled(settings: &EmailSettings, category: EmailCategory) -> bool {
    match category {
        EmailCategory::Performance => settings.auto_email_enabled,
        EmailCategory::Daily => settings.daily_email_enabled,
        EmailCategory::Weekly => settings.weekly_email_enabled,
        _ => true,
    }
}

/// Sends email and records every attempt
#[derive(Clone)]
pub struct Dispatcher {
    settings: Arc<SettingsStore>,
    transport: Arc<dyn MailTransport>,
    log: Arc<dyn DeliveryLog>,
}

impl Dispatcher {
    pub fn new(
        settings: Arc<SettingsStore>,
        transport: Arc<dyn MailTransport>,
        log: Arc<dyn DeliveryLog>,
    ) -> Self {
        Self {
            settings,
            transport,
            log,
        }
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Sends one email
    ///
    /// Never fails: transport, settings and logging problems are folded
    /// into the returned outcome or logged.
    pub async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        html: &str,
        attachment: Option<Attachment>,
        category: EmailCategory,
    ) -> DeliveryOutcome {
        let outcome = self
            .deliver(recipient, subject, html, attachment, category)
            .await;

        let entry = NewEmailLog {
            recipient: recipient.to_string(),
            subject: Some(subject.to_string()),
            category,
            status: outcome.status.unwrap_or(EmailStatus::Failed),
            error_message: outcome.error.clone(),
        };

        if let Err(e) = self.log.record(entry).await {
            tracing::error!(error = %e, %recipient, %category, "Failed to write email log entry");
        }

        outcome
    }

    /// Sends a rendered template
    pub async fn send_rendered(
        &self,
        recipient: &str,
        email: &RenderedEmail,
        category: EmailCategory,
    ) -> DeliveryOutcome {
        self.send_email(recipient, &email.subject, &email.html, None, category)
            .await
    }

    async fn deliver(
        &self,
        recipient: &str,
        subject: &str,
        html: &str,
        attachment: Option<Attachment>,
        category: EmailCategory,
    ) -> DeliveryOutcome {
        let settings = match self.settings.load().await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!(error = %e, "Email settings unavailable");
                return DeliveryOutcome::failed(format!("Email settings unavailable: {}", e));
            }
        };

        if !category_enabled(&settings, category) {
            let label = gate_label(category).unwrap_or("These");
            tracing::info!(%recipient, %category, "{} emails disabled; skipping", label);
            return DeliveryOutcome::skipped(format!("{} emails are disabled", label));
        }

        let mut email = OutgoingEmail::new(recipient.trim(), subject, html);
        if let Some(attachment) = attachment {
            email = email.with_attachment(attachment);
        }

        match self.transport.send(&settings, &email).await {
            Ok(()) => DeliveryOutcome::sent(),
            Err(e) => {
                tracing::error!(%recipient, %category, error = %e, "Failed to send email");
                DeliveryOutcome::failed(e.to_string())
            }
        }
    }
}
