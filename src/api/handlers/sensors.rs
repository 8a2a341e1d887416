use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;

use super::owned_plant;
use crate::{
    api::{
        dto::{
            HistoryPoint, HistoryQuery, PostReadingRequest, PostReadingResponse, ReadingDto,
            SensorDataQuery,
        },
        errors::{ApiJson, AppError},
        AppState,
    },
    auth::AuthUser,
    db,
    sensors::{simulated_reading, ReadingInput, ReadingTarget, SensorService},
};

const DEFAULT_HISTORY_LIMIT: i64 = 20;
const MAX_HISTORY_LIMIT: i64 = 1000;

/// Latest reading of one plant, or of the user's first plant. Plants that
/// have never reported get a simulated reading.
#[utoipa::path(
    get,
    path = "/api/sensor-data",
    params(SensorDataQuery),
    responses(
        (status = 200, description = "Latest reading", body = ReadingDto),
        (status = 404, description = "Plant not found, or the user has no plants"),
    ),
    security(("session_cookie" = [])),
    tag = "sensors"
)]
pub async fn latest_reading(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<SensorDataQuery>,
) -> Result<Json<ReadingDto>, AppError> {
    let plant = match query.plant_id {
        Some(id) => owned_plant(&state.pool, id, user_id).await?,
        None => db::plants::first_for_user(&state.pool, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("No plants found. Please add a plant first.".into()))?,
    };

    let dto = match db::readings::latest(&state.pool, plant.id).await? {
        Some(reading) => ReadingDto::from_reading(&plant, &reading),
        None => {
            let now = Utc::now();
            let sim = simulated_reading(now, &mut rand::thread_rng());
            ReadingDto {
                plant_id: plant.id,
                plant_name: plant.name,
                light: sim.light,
                moisture: sim.moisture,
                temperature: sim.temperature,
                timestamp: now,
                simulated: true,
            }
        }
    };
    Ok(Json(dto))
}

/// Store a reading for one of the user's plants, addressed by sensor id or plant id.
#[utoipa::path(
    post,
    path = "/api/sensor-data",
    request_body = PostReadingRequest,
    responses(
        (status = 200, description = "Reading stored", body = PostReadingResponse),
        (status = 400, description = "No target plant or invalid values"),
        (status = 404, description = "Plant not found"),
    ),
    security(("session_cookie" = [])),
    tag = "sensors"
)]
pub async fn post_reading(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<PostReadingRequest>,
) -> Result<Json<PostReadingResponse>, AppError> {
    let target = match (req.sensor_id.filter(|s| !s.trim().is_empty()), req.plant_id) {
        (Some(sensor_id), _) => ReadingTarget::Sensor(sensor_id.trim().to_owned()),
        (None, Some(plant_id)) => ReadingTarget::Plant(plant_id),
        (None, None) => return Err(AppError::BadRequest("sensor_id or plant_id required".into())),
    };
    let (Some(light), Some(moisture), Some(temperature)) = (req.light, req.moisture, req.temperature)
    else {
        return Err(AppError::BadRequest(
            "light, moisture and temperature required".into(),
        ));
    };

    let service = SensorService::new(state.pool.clone());
    let (plant, reading) = service
        .record(
            &target,
            Some(user_id),
            ReadingInput {
                light,
                moisture,
                temperature,
            },
        )
        .await?;

    Ok(Json(PostReadingResponse {
        status: "success".into(),
        data: ReadingDto::from_reading(&plant, &reading),
    }))
}

/// Most recent readings of a plant, oldest first.
#[utoipa::path(
    get,
    path = "/api/sensor-data/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Readings in ascending time order", body = Vec<HistoryPoint>),
        (status = 400, description = "plant_id missing"),
        (status = 404, description = "Plant not found"),
    ),
    security(("session_cookie" = [])),
    tag = "sensors"
)]
pub async fn reading_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryPoint>>, AppError> {
    let plant_id = query
        .plant_id
        .ok_or_else(|| AppError::BadRequest("plant_id required".into()))?;
    let plant = owned_plant(&state.pool, plant_id, user_id).await?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let mut readings = db::readings::recent(&state.pool, plant.id, limit).await?;
    readings.reverse();
    Ok(Json(readings.into_iter().map(Into::into).collect()))
}
