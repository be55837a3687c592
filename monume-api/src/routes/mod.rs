/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Login, logout and credential checks
/// - `users`: Staff directory management
/// - `locations`: Store locations
/// - `tracking`: Daily performance entries
/// - `forms`: Form definitions and submissions
/// - `email`: Email settings, logs and manual sends
/// - `appointments`: Appointment status changes
/// - `input`: Lenient decoders shared by request bodies

pub mod appointments;
pub mod auth;
pub mod email;
pub mod forms;
pub mod health;
pub mod input;
pub mod locations;
pub mod tracking;
pub mod users;

use serde::Serialize;

/// Body of endpoints that only report what happened
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
