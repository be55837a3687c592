/// Email settings, audit log and manual send endpoints
///
/// # Endpoints
///
/// - `GET /get_email_settings` - Settings with the password masked (manager or admin)
/// - `POST /update_email_setting` - Change one allow-listed setting (admin)
/// - `GET /get_email_logs?limit=N` - Most recent send attempts and outcome totals (manager or admin)
/// - `POST /send_test_email` - Fixed test message (manager or admin)
/// - `POST /send_appointment_email` - Appointment confirmation (authenticated)
/// - `POST /send_simple_email` - Free-form message (authenticated)
///
/// Send endpoints answer `200` with `{success, error?}` whatever the SMTP
/// server does; the attempt is in `email_logs` either way.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::input,
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{Datelike, Utc};
use monume_shared::{
    auth::session::SessionContext,
    email::{
        dispatcher::DeliveryOutcome,
        settings::{EmailSettings, SettingName},
        templates::{self, AppointmentDetails},
    },
    models::{
        appointment::{AppointmentStatus, AppointmentStatusChange, NewStatusChange},
        email_log::{EmailCategory, EmailLog, EmailStatus, DEFAULT_LOG_LIMIT},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;
use uuid::Uuid;
use validator::Validate;

/// Upper bound on `limit` for log listings
const MAX_LOG_LIMIT: i64 = 500;

pub async fn get_email_settings(State(state): State<AppState>) -> ApiResult<Json<EmailSettings>> {
    Ok(Json(state.email_settings().load_masked().await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingRequest {
    pub setting: String,
    pub value: Value,
}

#[derive(Debug, Serialize)]
pub struct UpdateSettingResponse {
    pub message: String,
    pub settings: EmailSettings,
}

fn readable_name(name: &str) -> &str {
    match name.parse::<SettingName>() {
        Ok(SettingName::AutoEmailEnabled) => "Automatic emails",
        Ok(SettingName::DailyEmailEnabled) => "Daily emails",
        Ok(SettingName::WeeklyEmailEnabled) => "Weekly emails",
        Ok(SettingName::Domain) => "Domain",
        Err(_) => name,
    }
}

fn readable_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Changes one allow-listed setting
///
/// # Errors
///
/// - `400 Bad Request`: Unknown or read-only setting, or a value of the wrong shape
pub async fn update_email_setting(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<UpdateSettingRequest>,
) -> ApiResult<Json<UpdateSettingResponse>> {
    let settings = state
        .email_settings()
        .update(req.setting.trim(), &req.value)
        .await?;

    tracing::info!(
        setting = %req.setting,
        updated_by = ctx.user_id,
        "Email setting updated"
    );

    Ok(Json(UpdateSettingResponse {
        message: format!(
            "{} has been set to {}",
            readable_name(req.setting.trim()),
            readable_value(&req.value)
        ),
        settings,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub limit: Option<i64>,
}

/// Totals over the whole log, by outcome
#[derive(Debug, Serialize)]
pub struct LogCounts {
    pub success: i64,
    pub failed: i64,
    pub skipped: i64,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<EmailLog>,
    pub counts: LogCounts,
}

pub async fn get_email_logs(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> ApiResult<Json<LogsResponse>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LOG_LIMIT)
        .clamp(1, MAX_LOG_LIMIT);

    let logs = EmailLog::list_recent(&state.db, limit).await?;
    let counts = LogCounts {
        success: EmailLog::count_by_status(&state.db, EmailStatus::Success).await?,
        failed: EmailLog::count_by_status(&state.db, EmailStatus::Failed).await?,
        skipped: EmailLog::count_by_status(&state.db, EmailStatus::Skipped).await?,
    };

    Ok(Json(LogsResponse { logs, counts }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct TestEmailRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

pub async fn send_test_email(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<TestEmailRequest>,
) -> ApiResult<Json<DeliveryOutcome>> {
    req.validate()?;

    tracing::info!(recipient = %req.email, requested_by = ctx.user_id, "Sending test email");

    let email = templates::test_email(Utc::now());
    let outcome = state
        .dispatcher
        .send_rendered(&req.email, &email, EmailCategory::Test)
        .await;

    Ok(Json(outcome))
}

/// Appointment fields as the share dialog nests them under `appointmentData`
#[derive(Debug, Default, Deserialize)]
pub struct AppointmentData {
    #[serde(default, alias = "appointment_title", deserialize_with = "input::blank_as_none")]
    pub title: Option<String>,

    #[serde(default, alias = "appointment_date", deserialize_with = "input::blank_as_none")]
    pub date: Option<String>,

    #[serde(default, alias = "appointment_time", deserialize_with = "input::blank_as_none")]
    pub time: Option<String>,

    #[serde(default, alias = "customerName", deserialize_with = "input::blank_as_none")]
    pub customer_name: Option<String>,

    #[serde(default, alias = "salesRepName", deserialize_with = "input::blank_as_none")]
    pub sales_rep_name: Option<String>,

    #[serde(default, deserialize_with = "input::blank_as_none")]
    pub location: Option<String>,
}

/// Appointment confirmation request
///
/// Accepts the fields flat at the top level or nested under
/// `appointmentData`; nested values win.
#[derive(Debug, Deserialize, Validate)]
pub struct AppointmentEmailRequest {
    #[serde(alias = "to", deserialize_with = "input::trimmed")]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Replaces the generated subject line
    #[serde(default, deserialize_with = "input::blank_as_none")]
    #[validate(length(max = 200, message = "Subject must be at most 200 characters"))]
    pub subject: Option<String>,

    #[serde(default, alias = "customerName", deserialize_with = "input::blank_as_none")]
    pub customer_name: Option<String>,

    #[serde(default, alias = "title", deserialize_with = "input::blank_as_none")]
    pub appointment_title: Option<String>,

    #[serde(default, alias = "date", deserialize_with = "input::blank_as_none")]
    pub appointment_date: Option<String>,

    #[serde(default, alias = "time", deserialize_with = "input::blank_as_none")]
    pub appointment_time: Option<String>,

    #[serde(default, alias = "salesRepName", deserialize_with = "input::blank_as_none")]
    pub sales_rep_name: Option<String>,

    #[serde(default, deserialize_with = "input::blank_as_none")]
    pub location: Option<String>,

    #[serde(default, alias = "appointmentData")]
    pub appointment_data: Option<AppointmentData>,

    /// Status page link built by the caller; used as-is in the email
    #[serde(default, alias = "confirmationLink", deserialize_with = "input::blank_as_none")]
    #[validate(url(message = "Confirmation link must be a valid URL"))]
    pub confirmation_link: Option<String>,

    /// Correlates later status changes; generated when absent
    #[serde(default, deserialize_with = "input::blank_as_none")]
    pub token: Option<String>,
}

/// Greeting used when no customer name was given
const DEFAULT_CUSTOMER_NAME: &str = "there";

impl AppointmentEmailRequest {
    /// Merges nested and flat fields into the template input
    ///
    /// # Errors
    ///
    /// - `422 Unprocessable Entity`: Title, date or time missing from both shapes
    fn details(&mut self, status_url: String) -> ApiResult<AppointmentDetails> {
        let nested = self.appointment_data.take().unwrap_or_default();

        let title = nested.title.or_else(|| self.appointment_title.take());
        let date = nested.date.or_else(|| self.appointment_date.take());
        let time = nested.time.or_else(|| self.appointment_time.take());

        Ok(AppointmentDetails {
            customer_name: nested
                .customer_name
                .or_else(|| self.customer_name.take())
                .unwrap_or_else(|| DEFAULT_CUSTOMER_NAME.to_string()),
            title: title.ok_or_else(|| ApiError::field("title", "Appointment title is required"))?,
            date: date.ok_or_else(|| ApiError::field("date", "Appointment date is required"))?,
            time: time.ok_or_else(|| ApiError::field("time", "Appointment time is required"))?,
            location: nested.location.or_else(|| self.location.take()),
            sales_rep: nested.sales_rep_name.or_else(|| self.sales_rep_name.take()),
            status_url,
        })
    }

    /// Token named in the request, or carried in the confirmation link
    fn supplied_token(&self) -> Option<String> {
        self.token.clone().or_else(|| {
            self.confirmation_link
                .as_deref()
                .and_then(token_from_link)
        })
    }
}

/// Reads the `token` query parameter of a status link
fn token_from_link(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Serialize)]
pub struct AppointmentEmailResponse {
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
    pub token: String,
}

/// Sends an appointment confirmation
///
/// Records the appointment as `scheduled` under its token so the status
/// link in the email has something to show. A supplied confirmation link
/// is used as the email's link, and its `token` parameter as the token.
pub async fn send_appointment_email(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Json(mut req): Json<AppointmentEmailRequest>,
) -> ApiResult<Json<AppointmentEmailResponse>> {
    req.validate()?;

    let token = req
        .supplied_token()
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    let status_url = req.confirmation_link.take().unwrap_or_else(|| {
        format!(
            "{}/appointment-status?token={}",
            state.config.email.public_base_url, token
        )
    });

    let mut details = req.details(status_url)?;
    if details.location.is_none() {
        details.location = ctx.location.clone();
    }

    AppointmentStatusChange::record(
        &state.db,
        NewStatusChange {
            token: token.clone(),
            status: AppointmentStatus::Scheduled,
            rescheduled_for: None,
            notes: None,
        },
    )
    .await?;

    let mut email = templates::appointment_confirmation(&details, Utc::now().year());
    if let Some(subject) = req.subject.take() {
        email.subject = subject;
    }

    let outcome = state
        .dispatcher
        .send_rendered(&req.email, &email, EmailCategory::Appointment)
        .await;

    tracing::info!(
        sent_by = ctx.user_id,
        %token,
        success = outcome.success,
        "Appointment confirmation dispatched"
    );

    Ok(Json(AppointmentEmailResponse { outcome, token }))
}

/// Free-form message; `to` and `body` are accepted for `email` and `message`
#[derive(Debug, Deserialize, Validate)]
pub struct SimpleEmailRequest {
    #[serde(alias = "to", deserialize_with = "input::trimmed")]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 200, message = "Subject must be 1-200 characters"))]
    pub subject: String,

    #[serde(alias = "body")]
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
}

pub async fn send_simple_email(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<SimpleEmailRequest>,
) -> ApiResult<Json<DeliveryOutcome>> {
    req.validate()?;

    let email = templates::simple(&req.subject, &req.message, Utc::now().year());
    let outcome = state
        .dispatcher
        .send_rendered(&req.email, &email, EmailCategory::Other)
        .await;

    tracing::info!(sent_by = ctx.user_id, success = outcome.success, "Simple email dispatched");

    Ok(Json(outcome))
}
