/// Outbound email
///
/// # Modules
///
/// - [`settings`]: File-backed SMTP settings and category switches
/// - [`transport`]: `MailTransport` trait and the lettre SMTP implementation
/// - [`templates`]: HTML builders for each kind of email
/// - [`dispatcher`]: Gating, delivery and audit logging

pub mod dispatcher;
pub mod settings;
pub mod templates;
pub mod transport;
