/// Store location endpoints
///
/// Reads are public (the login and tracking pages list stores before
/// anyone signs in); every mutation, including create, is admin-only.
///
/// # Endpoints
///
/// - `GET /get_locations`
/// - `GET /get_location/:id`
/// - `POST /add_location` (admin)
/// - `POST /update_location` (admin)
/// - `POST /remove_location` (admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{input, MessageResponse},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use monume_shared::{
    auth::session::SessionContext,
    models::location::{CreateLocation, Location, UpdateLocation},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct LocationsResponse {
    pub locations: Vec<Location>,
}

pub async fn get_locations(State(state): State<AppState>) -> ApiResult<Json<LocationsResponse>> {
    let locations = Location::list(&state.db).await?;
    Ok(Json(LocationsResponse { locations }))
}

pub async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Location>> {
    let location = Location::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Location not found".to_string()))?;

    Ok(Json(location))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddLocationRequest {
    #[serde(deserialize_with = "input::trimmed")]
    #[validate(length(min = 1, max = 100, message = "Location name must be 1-100 characters"))]
    pub location_name: String,

    #[serde(default, deserialize_with = "input::blank_as_none")]
    #[validate(length(max = 100, message = "Mall must be at most 100 characters"))]
    pub mall: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub message: String,
    pub location: Location,
}

pub async fn add_location(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<AddLocationRequest>,
) -> ApiResult<(StatusCode, Json<LocationResponse>)> {
    req.validate()?;

    let location = Location::create(
        &state.db,
        CreateLocation {
            location_name: req.location_name,
            mall: req.mall,
        },
    )
    .await?;

    tracing::info!(location_id = location.id, created_by = ctx.user_id, "Location added");

    Ok((
        StatusCode::CREATED,
        Json(LocationResponse {
            message: "Location added successfully".to_string(),
            location,
        }),
    ))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLocationRequest {
    pub location_id: i64,

    /// Trimmed but kept when blank, so a blank rename is rejected
    #[serde(default, deserialize_with = "input::trimmed_opt")]
    #[validate(length(min = 1, max = 100, message = "Location name must be 1-100 characters"))]
    pub location_name: Option<String>,

    #[serde(default, deserialize_with = "input::trimmed_opt")]
    #[validate(length(max = 100, message = "Mall must be at most 100 characters"))]
    pub mall: Option<String>,
}

/// Renames a location or moves it to another mall
///
/// Users whose free-text `location` matched the old name are not touched.
pub async fn update_location(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<UpdateLocationRequest>,
) -> ApiResult<Json<LocationResponse>> {
    req.validate()?;

    let location = Location::update(
        &state.db,
        req.location_id,
        UpdateLocation {
            location_name: req.location_name,
            mall: req.mall,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Location not found".to_string()))?;

    tracing::info!(location_id = location.id, updated_by = ctx.user_id, "Location updated");

    Ok(Json(LocationResponse {
        message: "Location updated successfully".to_string(),
        location,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RemoveLocationRequest {
    pub location_id: i64,
}

pub async fn remove_location(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<RemoveLocationRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if !Location::delete(&state.db, req.location_id).await? {
        return Err(ApiError::NotFound("Location not found".to_string()));
    }

    tracing::info!(location_id = req.location_id, removed_by = ctx.user_id, "Location removed");

    Ok(Json(MessageResponse::new("Location removed successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_whitespace_location_name_rejected() {
        let add: AddLocationRequest =
            serde_json::from_value(json!({"location_name": "   ", "mall": ""})).unwrap();
        assert!(add.validate().is_err());

        let rename: UpdateLocationRequest =
            serde_json::from_value(json!({"location_id": 3, "location_name": "  "})).unwrap();
        assert!(rename.validate().is_err());
    }

    #[test]
    fn test_location_name_is_trimmed() {
        let add: AddLocationRequest =
            serde_json::from_value(json!({"location_name": "  Westfield ", "mall": " "})).unwrap();
        assert!(add.validate().is_ok());
        assert_eq!(add.location_name, "Westfield");
        assert_eq!(add.mall, None);

        let update: UpdateLocationRequest =
            serde_json::from_value(json!({"location_id": 3, "mall": " Galleria "})).unwrap();
        assert!(update.validate().is_ok());
        assert_eq!(update.location_name, None);
        assert_eq!(update.mall.as_deref(), Some("Galleria"));
    }
}
