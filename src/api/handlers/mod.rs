pub mod auth;
pub mod insights;
pub mod plants;
pub mod sensors;

use sqlx::PgPool;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

use super::{dto::*, errors::AppError};
use crate::{
    analysis::{
        types::{
            ComponentScores, CurrentValues, EstimateSource, HealthResult, OptimalRange,
            WateringEstimate, WateringSchedule, WeatherSnapshot,
        },
        watering::{SensorInputs, WeatherInputs},
        service::{ModelStatus, SlotStatus},
    },
    auth::COOKIE_NAME,
    db::{
        self,
        models::{Plant, User},
    },
};

/// The logged-in user's row. A valid cookie for a deleted user is treated
/// as no session.
pub(crate) async fn load_user(pool: &PgPool, user_id: i64) -> Result<User, AppError> {
    db::users::find_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))
}

pub(crate) async fn owned_plant(pool: &PgPool, id: i64, user_id: i64) -> Result<Plant, AppError> {
    db::plants::find_owned(pool, id, user_id)
        .await?
        .ok_or_else(AppError::plant_not_found)
}

// ---------------------------------------------------------------------------
// OpenAPI spec struct (used in api/mod.rs)
// ---------------------------------------------------------------------------

struct SessionCookie;

impl Modify for SessionCookie {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(COOKIE_NAME))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        auth::logout,
        auth::current_user,
        auth::update_location,
        plants::list_plants,
        plants::create_plant,
        plants::delete_plant,
        plants::update_profile,
        plants::mark_watered,
        sensors::latest_reading,
        sensors::post_reading,
        sensors::reading_history,
        insights::health_check,
        insights::weather,
        insights::predict,
        insights::plant_health,
        insights::watering_schedule,
        insights::model_status,
        insights::reload_models,
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        UserDto,
        AuthResponse,
        LocationRequest,
        LocationResponse,
        MessageResponse,
        HealthCheckResponse,
        PlantProfileDto,
        CreatePlantRequest,
        PlantDto,
        ReadingDto,
        PostReadingRequest,
        PostReadingResponse,
        HistoryPoint,
        PredictRequest,
        PredictResponse,
        WateringScheduleResponse,
        SensorInputs,
        WeatherInputs,
        WeatherSnapshot,
        WateringEstimate,
        WateringSchedule,
        HealthResult,
        ComponentScores,
        CurrentValues,
        EstimateSource,
        OptimalRange,
        ModelStatus,
        SlotStatus,
    )),
    modifiers(&SessionCookie),
    tags(
        (name = "auth", description = "Registration, login and the current user"),
        (name = "plants", description = "Plant management"),
        (name = "sensors", description = "Sensor reading ingestion and history"),
        (name = "insights", description = "Weather, watering estimates and plant health"),
    ),
    info(
        title = "Plant Care Service API",
        version = "0.1.0",
        description = "REST API for plant sensor data, weather and care estimates"
    )
)]
pub struct ApiDoc;
