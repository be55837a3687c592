/// Tracking ledger endpoints
///
/// # Endpoints
///
/// - `GET /get_history` - Every entry joined with its owner
/// - `POST /save_tracking_data` - Append an entry for the caller
/// - `POST /save_tracking_with_email` - Same handler, kept for older pages

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Extension, Json};
use monume_shared::{
    auth::session::SessionContext,
    email::templates,
    models::{
        email_log::EmailCategory,
        tracking::{HistoryRow, NewTrackingEntry, TrackingEntry},
        user::User,
    },
};
use serde::Serialize;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryRow>,
}

/// Lists the whole ledger, newest date first
pub async fn get_history(State(state): State<AppState>) -> ApiResult<Json<HistoryResponse>> {
    let history = TrackingEntry::list_history(&state.db).await?;
    Ok(Json(HistoryResponse { history }))
}

#[derive(Debug, Serialize)]
pub struct SaveTrackingResponse {
    pub message: String,
    pub entry: TrackingEntry,

    /// Whether the performance summary went out
    pub email_sent: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_error: Option<String>,
}

/// Appends a tracking entry for the session's user
///
/// Any `user_id` in the body is ignored. When the user has an email
/// address a performance summary is sent afterwards; delivery problems
/// show up in `email_sent`/`email_error`, never as an error status.
pub async fn save_tracking_data(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<NewTrackingEntry>,
) -> ApiResult<(StatusCode, Json<SaveTrackingResponse>)> {
    req.validate()?;

    let entry = TrackingEntry::record(&state.db, ctx.user_id, req).await?;

    tracing::info!(
        user_id = ctx.user_id,
        entry_id = entry.id,
        date = %entry.date,
        "Tracking entry saved"
    );

    let user = User::find_by_id(&state.db, ctx.user_id).await?;
    let recipient = user
        .as_ref()
        .and_then(|u| u.email.as_deref())
        .map(str::trim)
        .filter(|e| !e.is_empty());

    let (email_sent, email_error) = match (user.as_ref(), recipient) {
        (Some(user), Some(recipient)) => {
            let email = templates::performance_summary(user.display_name(), &entry);
            let outcome = state
                .dispatcher
                .send_rendered(recipient, &email, EmailCategory::Performance)
                .await;
            (outcome.success, outcome.error)
        }
        _ => (false, Some("No email address on file".to_string())),
    };

    Ok((
        StatusCode::CREATED,
        Json(SaveTrackingResponse {
            message: "Tracking data saved successfully".to_string(),
            entry,
            email_sent,
            email_error,
        }),
    ))
}
