pub mod dto;
pub mod errors;
pub mod handlers;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::{analysis::ModelService, auth::SessionSigner, config::Config, weather::WeatherClient};

use handlers::{auth, insights, plants, sensors, ApiDoc};

/// Shared handler state. Every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub weather: WeatherClient,
    pub models: Arc<ModelService>,
    pub sessions: SessionSigner,
}

impl FromRef<AppState> for SessionSigner {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/api/health", get(insights::health_check))
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/user", get(auth::current_user))
        .route("/api/user/location", put(auth::update_location))
        .route("/api/plants", get(plants::list_plants).post(plants::create_plant))
        .route("/api/plants/{id}", delete(plants::delete_plant))
        .route("/api/plants/{id}/profile", put(plants::update_profile))
        .route("/api/plants/{id}/watered", post(plants::mark_watered))
        .route(
            "/api/sensor-data",
            get(sensors::latest_reading).post(sensors::post_reading),
        )
        .route("/api/sensor-data/history", get(sensors::reading_history))
        .route("/api/weather", get(insights::weather))
        .route("/api/predict", post(insights::predict))
        .route("/api/plant-health/{id}", get(insights::plant_health))
        .route("/api/watering-schedule/{id}", get(insights::watering_schedule))
        .route("/api/models", get(insights::model_status))
        .route("/api/models/reload", post(insights::reload_models))
        .with_state(state)
        .split_for_parts();

    router
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Credentialed CORS for the configured origins. Unparseable origins are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
