/// Appointment status endpoints
///
/// Public: customers reach them from the link in their confirmation email.
/// Changes are correlated by the token printed in that link.
///
/// # Endpoints
///
/// - `GET /api/appointment-status?token=...` - Latest status and history
/// - `POST /api/appointment-status` - Record a change and notify staff

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::input,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use monume_shared::{
    email::templates::{self, StatusNotification},
    models::{
        appointment::{AppointmentStatus, AppointmentStatusChange, NewStatusChange},
        email_log::EmailCategory,
    },
};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct StatusChangeRequest {
    #[validate(length(min = 1, max = 128, message = "Token is required"))]
    pub token: String,

    pub status: AppointmentStatus,

    /// New time; required when `status` is `rescheduled`
    ///
    /// RFC 3339, or a `datetime-local` value taken as UTC.
    #[serde(default, deserialize_with = "input::flexible_datetime")]
    pub datetime: Option<DateTime<Utc>>,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

impl StatusChangeRequest {
    fn check_reschedule(&self) -> Result<(), ApiError> {
        if self.status == AppointmentStatus::Rescheduled && self.datetime.is_none() {
            return Err(ApiError::field(
                "datetime",
                "A new date and time is required to reschedule",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct StatusChangeResponse {
    pub success: bool,
    pub change: AppointmentStatusChange,
    pub notification_sent: bool,
}

/// Records a status change
///
/// Staff are notified when `STAFF_NOTIFICATION_EMAIL` is configured; a
/// failed notification does not fail the request.
pub async fn record_status(
    State(state): State<AppState>,
    Json(req): Json<StatusChangeRequest>,
) -> ApiResult<(StatusCode, Json<StatusChangeResponse>)> {
    req.validate()?;
    req.check_reschedule()?;

    let change = AppointmentStatusChange::record(
        &state.db,
        NewStatusChange {
            token: req.token.trim().to_string(),
            status: req.status,
            rescheduled_for: req.datetime.filter(|_| req.status == AppointmentStatus::Rescheduled),
            notes: req.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        },
    )
    .await?;

    tracing::info!(token = %change.token, status = %change.status, "Appointment status changed");

    let notification_sent = match state.config.email.staff_notification_email.as_deref() {
        Some(staff) => {
            let email = templates::staff_notification(&StatusNotification {
                token: change.token.clone(),
                status: change.status,
                rescheduled_for: change.rescheduled_for,
                notes: change.notes.clone(),
                changed_at: change.created_at,
            });
            state
                .dispatcher
                .send_rendered(staff, &email, EmailCategory::Notification)
                .await
                .success
        }
        None => {
            tracing::debug!("No staff notification address configured");
            false
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(StatusChangeResponse {
            success: true,
            change,
            notification_sent,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub token: String,
    pub current: AppointmentStatusChange,
    pub history: Vec<AppointmentStatusChange>,
}

/// Returns the latest status for a token plus every change, newest first
///
/// # Errors
///
/// - `404 Not Found`: No changes recorded for the token
pub async fn get_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<StatusResponse>> {
    let token = query.token.trim();
    let history = AppointmentStatusChange::history(&state.db, token).await?;

    let current = history
        .first()
        .cloned()
        .ok_or_else(|| ApiError::NotFound("No appointment found for this token".to_string()))?;

    Ok(Json(StatusResponse {
        token: token.to_string(),
        current,
        history,
    }))
}
