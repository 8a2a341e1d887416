use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use tracing::info;

use super::{auth::valid_coordinates, load_user, owned_plant};
use crate::{
    analysis::{
        round_to,
        service::ModelStatus,
        types::{HealthResult, SensorSample, WeatherSnapshot, RECENT_READINGS},
        watering::{self, PredictInputs},
    },
    api::{
        dto::{
            HealthCheckResponse, PredictRequest, PredictResponse, WateringScheduleResponse,
            WeatherQuery,
        },
        errors::{ApiJson, AppError},
        AppState,
    },
    auth::AuthUser,
    db,
};

#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Server is up", body = HealthCheckResponse)),
    tag = "insights"
)]
pub async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "ok".into(),
        message: "Server is running".into(),
    })
}

/// Current conditions at the given coordinates, or at the user's location.
/// Upstream failures yield the fallback snapshot, marked with `note`.
#[utoipa::path(
    get,
    path = "/api/weather",
    params(WeatherQuery),
    responses(
        (status = 200, description = "Current weather", body = WeatherSnapshot),
        (status = 400, description = "Invalid coordinates"),
    ),
    security(("session_cookie" = [])),
    tag = "insights"
)]
pub async fn weather(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<WeatherSnapshot>, AppError> {
    let (lat, lon) = match (query.lat, query.lon) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => {
            let user = load_user(&state.pool, user_id).await?;
            (user.latitude, user.longitude)
        }
    };
    if !valid_coordinates(lat, lon) {
        return Err(AppError::BadRequest("Invalid coordinates".into()));
    }
    Ok(Json(state.weather.current(lat, lon).await))
}

/// Linear-sigmoid watering estimate from explicit sensor and weather values.
/// Missing values take their defaults.
#[utoipa::path(
    post,
    path = "/api/predict",
    request_body = PredictRequest,
    responses((status = 200, description = "Watering estimate", body = PredictResponse)),
    security(("session_cookie" = [])),
    tag = "insights"
)]
pub async fn predict(
    _auth: AuthUser,
    ApiJson(req): ApiJson<PredictRequest>,
) -> Json<PredictResponse> {
    let estimate = watering::linear_sigmoid(&PredictInputs::from_parts(&req.sensor, &req.weather));
    Json(PredictResponse {
        hours_until_watering: round_to(estimate.hours_until_watering, 1),
        confidence: round_to(estimate.confidence, 2),
        recommendation: estimate.recommendation.as_str().to_owned(),
        timestamp: Utc::now(),
    })
}

#[utoipa::path(
    get,
    path = "/api/plant-health/{id}",
    params(("id" = i64, Path, description = "Plant id")),
    responses(
        (status = 200, description = "Health assessment of the latest readings", body = HealthResult),
        (status = 404, description = "Plant not found"),
    ),
    security(("session_cookie" = [])),
    tag = "insights"
)]
pub async fn plant_health(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<HealthResult>, AppError> {
    let plant = owned_plant(&state.pool, id, user_id).await?;
    let readings = db::readings::recent(&state.pool, plant.id, RECENT_READINGS as i64).await?;
    let samples: Vec<SensorSample> = readings.iter().map(Into::into).collect();
    let profile = plant.profile.to_profile(Utc::now());

    // Weather only feeds the classifier.
    let weather = if state.models.has_health_model() && !samples.is_empty() {
        let user = load_user(&state.pool, user_id).await?;
        Some(state.weather.current(user.latitude, user.longitude).await)
    } else {
        None
    };

    let result = state
        .models
        .assess_health(&samples, weather.as_ref(), Some(&profile));
    Ok(Json(result))
}

/// Evapotranspiration watering schedule for a plant at the user's location.
#[utoipa::path(
    get,
    path = "/api/watering-schedule/{id}",
    params(("id" = i64, Path, description = "Plant id")),
    responses(
        (status = 200, description = "Watering frequency and hours until next watering", body = WateringScheduleResponse),
        (status = 404, description = "Plant not found"),
    ),
    security(("session_cookie" = [])),
    tag = "insights"
)]
pub async fn watering_schedule(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<WateringScheduleResponse>, AppError> {
    let plant = owned_plant(&state.pool, id, user_id).await?;
    let user = load_user(&state.pool, user_id).await?;
    let moisture = db::readings::latest(&state.pool, plant.id)
        .await?
        .map(|r| r.moisture);

    let weather = state.weather.current(user.latitude, user.longitude).await;
    let schedule = state.models.predict_watering(&weather, moisture);
    Ok(Json(WateringScheduleResponse {
        plant_id: plant.id,
        schedule,
        weather,
    }))
}

#[utoipa::path(
    get,
    path = "/api/models",
    responses((status = 200, description = "Which trained models are loaded", body = ModelStatus)),
    security(("session_cookie" = [])),
    tag = "insights"
)]
pub async fn model_status(State(state): State<AppState>, _auth: AuthUser) -> Json<ModelStatus> {
    Json(state.models.status())
}

/// Re-read the model files from disk.
#[utoipa::path(
    post,
    path = "/api/models/reload",
    responses((status = 200, description = "Model status after reloading", body = ModelStatus)),
    security(("session_cookie" = [])),
    tag = "insights"
)]
pub async fn reload_models(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ModelStatus>, AppError> {
    let models = Arc::clone(&state.models);
    let status = tokio::task::spawn_blocking(move || models.reload())
        .await
        .context("model reload task panicked")?;
    info!(
        user_id,
        watering = status.watering.loaded,
        health = status.health.loaded,
        "Reloaded models"
    );
    Ok(Json(status))
}
