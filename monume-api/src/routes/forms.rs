/// Form and form-response endpoints
///
/// # Endpoints
///
/// - `GET /api/forms` - List forms (public)
/// - `GET /api/forms/:id` - Fetch one form (public)
/// - `POST /api/forms` - Create a form (manager or admin)
/// - `PUT /api/forms/:id` - Partial update (manager or admin)
/// - `DELETE /api/forms/:id` - Delete with its responses (manager or admin)
/// - `POST /api/forms/:id/submit` - Submit answers (public)
/// - `GET /api/forms/:id/responses` - List answers (manager or admin)
///
/// Answers are stored as sent. Their keys are not checked against the
/// form's question ids.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::MessageResponse,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use monume_shared::{
    auth::session::SessionContext,
    models::form::{CreateForm, Form, FormResponse, FormResponseView, UpdateForm},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn form_not_found() -> ApiError {
    ApiError::NotFound("Form not found".to_string())
}

pub async fn list_forms(State(state): State<AppState>) -> ApiResult<Json<Vec<Form>>> {
    Ok(Json(Form::list(&state.db).await?))
}

pub async fn get_form(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Form>> {
    let form = Form::find_by_id(&state.db, id)
        .await?
        .ok_or_else(form_not_found)?;

    Ok(Json(form))
}

/// Creates a form
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Empty title, blank or duplicate question
///   ids, or a choice question without options
pub async fn create_form(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<CreateForm>,
) -> ApiResult<(StatusCode, Json<Form>)> {
    req.validate()?;

    let form = Form::create(&state.db, req).await?;

    tracing::info!(
        form_id = form.id,
        questions = form.questions.len(),
        created_by = ctx.user_id,
        "Form created"
    );

    Ok((StatusCode::CREATED, Json(form)))
}

pub async fn update_form(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateForm>,
) -> ApiResult<Json<Form>> {
    req.validate()?;

    let form = Form::update(&state.db, id, req)
        .await?
        .ok_or_else(form_not_found)?;

    tracing::info!(form_id = form.id, updated_by = ctx.user_id, "Form updated");

    Ok(Json(form))
}

/// Deletes a form; its responses go with it
pub async fn delete_form(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    if !Form::delete(&state.db, id).await? {
        return Err(form_not_found());
    }

    tracing::info!(form_id = id, deleted_by = ctx.user_id, "Form deleted");

    Ok(Json(MessageResponse::new("Form deleted successfully")))
}

/// Submission body
///
/// `responses` maps question id to answer.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default = "empty_answers")]
    pub responses: Value,

    pub submitted_by: Option<String>,
}

fn empty_answers() -> Value {
    Value::Object(Map::new())
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub message: String,
    pub response_id: i64,
}

/// Stores a submission for an existing form
///
/// # Errors
///
/// - `404 Not Found`: Unknown form
pub async fn submit_response(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<SubmitRequest>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    if Form::find_by_id(&state.db, id).await?.is_none() {
        return Err(form_not_found());
    }

    let response =
        FormResponse::submit(&state.db, id, req.responses, req.submitted_by.as_deref()).await?;

    tracing::info!(form_id = id, response_id = response.id, "Form response submitted");

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            message: "Response submitted successfully".to_string(),
            response_id: response.id,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct ResponsesListing {
    pub form_id: i64,
    pub title: String,
    pub responses: Vec<FormResponseView>,
}

/// Lists the answers submitted for a form, newest first
///
/// # Errors
///
/// - `404 Not Found`: Unknown or deleted form
pub async fn list_responses(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ResponsesListing>> {
    let form = Form::find_by_id(&state.db, id)
        .await?
        .ok_or_else(form_not_found)?;

    let responses = FormResponse::list_for_form(&state.db, id)
        .await?
        .into_iter()
        .map(FormResponseView::from)
        .collect();

    Ok(Json(ResponsesListing {
        form_id: form.id,
        title: form.title,
        responses,
    }))
}
