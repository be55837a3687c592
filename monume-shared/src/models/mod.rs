/// Database models for the MonuMe tracker
///
/// Each model owns its table's queries. Models never check permissions;
/// route handlers decide who may call them.
///
/// # Models
///
/// - `user`: Staff accounts and roles
/// - `location`: Store locations
/// - `tracking`: Daily performance ledger
/// - `form`: Dynamic forms and their responses
/// - `email_log`: Outbound email audit log
/// - `appointment`: Appointment status changes
/// - `session`: Server-side login sessions
/// - `auth_audit`: Failed authentication and authorization attempts

pub mod appointment;
pub mod auth_audit;
pub mod email_log;
pub mod form;
pub mod location;
pub mod session;
pub mod tracking;
pub mod user;
