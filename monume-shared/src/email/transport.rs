/// Mail transport
///
/// [`MailTransport`] is the seam between the dispatcher and the outside
/// world. Production uses [`SmtpMailer`] (lettre over STARTTLS); tests plug
/// in an in-memory fake.

use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::{authentication::Credentials, Error as SmtpError},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::settings::EmailSettings;

/// Errors that can occur when delivering email
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    MessageBuild(String),

    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),
}

impl From<lettre::error::Error> for TransportError {
    fn from(e: lettre::error::Error) -> Self {
        TransportError::MessageBuild(e.to_string())
    }
}

/// File attached to an outgoing email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A fully rendered email, ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub recipient: String,
    pub subject: String,
    pub html: String,
    pub attachment: Option<Attachment>,
}

impl OutgoingEmail {
    pub fn new(recipient: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            html: html.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// Delivers rendered emails
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Sends one email using the given connection settings
    async fn send(&self, settings: &EmailSettings, email: &OutgoingEmail) -> Result<(), TransportError>;
}

/// SMTP delivery via lettre
///
/// A connection is built per send from the current settings, so changes to
/// the settings file apply to the next email without a restart.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn mailer(&self, settings: &EmailSettings) -> Result<AsyncSmtpTransport<Tokio1Executor>, SmtpError> {
        let mut builder = if settings.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_server)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.smtp_server)
        };

        builder = builder.port(settings.smtp_port).timeout(Some(self.timeout));

        if !settings.password.is_empty() {
            builder = builder.credentials(Credentials::new(
                settings.sender_email.clone(),
                settings.password.clone(),
            ));
        }

        Ok(builder.build())
    }
}

/// Builds the MIME message for an outgoing email
pub fn build_message(settings: &EmailSettings, email: &OutgoingEmail) -> Result<Message, TransportError> {
    let from_header = settings.from_header();
    let from: Mailbox = from_header
        .parse()
        .map_err(|_| TransportError::InvalidAddress(from_header.clone()))?;
    let to: Mailbox = email
        .recipient
        .parse()
        .map_err(|_| TransportError::InvalidAddress(email.recipient.clone()))?;

    let builder = Message::builder().from(from).to(to).subject(email.subject.clone());

    let html = SinglePart::builder()
        .header(ContentType::TEXT_HTML)
        .body(email.html.clone());

    let message = match &email.attachment {
        None => builder.singlepart(html)?,
        Some(attachment) => {
            let content_type = ContentType::parse(&attachment.content_type)
                .map_err(|e| TransportError::MessageBuild(format!("Bad content type: {}", e)))?;
            let part = MimeAttachment::new(attachment.filename.clone())
                .body(attachment.data.clone(), content_type);

            builder.multipart(MultiPart::mixed().singlepart(html).singlepart(part))?
        }
    };

    Ok(message)
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, settings: &EmailSettings, email: &OutgoingEmail) -> Result<(), TransportError> {
        let message = build_message(settings, email)?;
        let mailer = self.mailer(settings)?;

        mailer.send(message).await?;

        tracing::info!(to = %email.recipient, subject = %email.subject, "Email sent successfully");
        Ok(())
    }
}
