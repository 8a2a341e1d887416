use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::info;

use crate::{
    api::{
        dto::{CreatePlantRequest, MessageResponse, PlantDto, PlantProfileDto},
        errors::{ApiJson, AppError},
        AppState,
    },
    auth::AuthUser,
    db::{self, is_unique_violation},
};

const SENSOR_IN_USE: &str = "Sensor ID already in use";

#[utoipa::path(
    get,
    path = "/api/plants",
    responses(
        (status = 200, description = "The user's plants", body = Vec<PlantDto>),
        (status = 401, description = "Not logged in"),
    ),
    security(("session_cookie" = [])),
    tag = "plants"
)]
pub async fn list_plants(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<PlantDto>>, AppError> {
    let plants = db::plants::list_for_user(&state.pool, user_id).await?;
    Ok(Json(plants.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/plants",
    request_body = CreatePlantRequest,
    responses(
        (status = 201, description = "Plant created", body = PlantDto),
        (status = 400, description = "Missing fields, invalid profile or sensor already in use"),
        (status = 401, description = "Not logged in"),
    ),
    security(("session_cookie" = [])),
    tag = "plants"
)]
pub async fn create_plant(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<CreatePlantRequest>,
) -> Result<(StatusCode, Json<PlantDto>), AppError> {
    let name = req.name.as_deref().map(str::trim).unwrap_or_default();
    let sensor_id = req.sensor_id.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() || sensor_id.is_empty() {
        return Err(AppError::BadRequest("Name and sensor_id required".into()));
    }
    let profile = req
        .profile
        .unwrap_or_default()
        .into_columns()
        .map_err(AppError::BadRequest)?;

    if db::plants::find_by_sensor_id(&state.pool, sensor_id).await?.is_some() {
        return Err(AppError::BadRequest(SENSOR_IN_USE.into()));
    }
    let plant = db::plants::insert(&state.pool, user_id, name, sensor_id, &profile)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "plants_sensor_id_key") {
                AppError::BadRequest(SENSOR_IN_USE.into())
            } else {
                e.into()
            }
        })?;

    info!(user_id, plant_id = plant.id, sensor_id = %plant.sensor_id, "Created plant");
    Ok((StatusCode::CREATED, Json(plant.into())))
}

/// Delete a plant together with its readings.
#[utoipa::path(
    delete,
    path = "/api/plants/{id}",
    params(("id" = i64, Path, description = "Plant id")),
    responses(
        (status = 200, description = "Plant deleted", body = MessageResponse),
        (status = 404, description = "Plant not found"),
    ),
    security(("session_cookie" = [])),
    tag = "plants"
)]
pub async fn delete_plant(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    if !db::plants::delete_owned(&state.pool, id, user_id).await? {
        return Err(AppError::plant_not_found());
    }
    info!(user_id, plant_id = id, "Deleted plant");
    Ok(Json(MessageResponse::new("Plant deleted successfully")))
}

/// Replace every care attribute of a plant. Omitted fields are cleared.
#[utoipa::path(
    put,
    path = "/api/plants/{id}/profile",
    params(("id" = i64, Path, description = "Plant id")),
    request_body = PlantProfileDto,
    responses(
        (status = 200, description = "Updated plant", body = PlantDto),
        (status = 400, description = "Invalid profile"),
        (status = 404, description = "Plant not found"),
    ),
    security(("session_cookie" = [])),
    tag = "plants"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    ApiJson(profile): ApiJson<PlantProfileDto>,
) -> Result<Json<PlantDto>, AppError> {
    let columns = profile.into_columns().map_err(AppError::BadRequest)?;
    let plant = db::plants::update_profile(&state.pool, id, user_id, &columns)
        .await?
        .ok_or_else(AppError::plant_not_found)?;
    Ok(Json(plant.into()))
}

#[utoipa::path(
    post,
    path = "/api/plants/{id}/watered",
    params(("id" = i64, Path, description = "Plant id")),
    responses(
        (status = 200, description = "Plant with `last_watered_at` set to now", body = PlantDto),
        (status = 404, description = "Plant not found"),
    ),
    security(("session_cookie" = [])),
    tag = "plants"
)]
pub async fn mark_watered(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<PlantDto>, AppError> {
    let plant = db::plants::mark_watered(&state.pool, id, user_id, Utc::now())
        .await?
        .ok_or_else(AppError::plant_not_found)?;
    info!(user_id, plant_id = id, "Plant watered");
    Ok(Json(plant.into()))
}
