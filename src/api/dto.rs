use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    analysis::{
        types::{CareLevel, NativeClimate, WeatherSnapshot, WateringSchedule},
        watering::{SensorInputs, WeatherInputs},
    },
    db::models::{Plant, ProfileColumns, SensorReading, User},
};

// ---------------------------------------------------------------------------
// Users & sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// Place name to geocode, e.g. `"Nashville, TN"`. Preferred over coordinates.
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            location: u.location,
            latitude: u.latitude,
            longitude: u.longitude,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub message: String,
    pub user: UserDto,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LocationRequest {
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LocationResponse {
    pub message: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthCheckResponse {
    pub status: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Plants
// ---------------------------------------------------------------------------

/// Care attributes of a plant. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PlantProfileDto {
    /// Free-form family, e.g. `succulent`, `herb`, `vegetable`.
    pub plant_type: Option<String>,
    pub planted_at: Option<DateTime<Utc>>,
    pub last_watered_at: Option<DateTime<Utc>>,
    pub optimal_moisture_min: Option<f64>,
    pub optimal_moisture_max: Option<f64>,
    pub optimal_temp_min: Option<f64>,
    pub optimal_temp_max: Option<f64>,
    pub optimal_light_min: Option<f64>,
    pub optimal_light_max: Option<f64>,
    pub watering_frequency_days: Option<f64>,
    /// `low`, `medium` or `high`.
    pub care_level: Option<String>,
    /// `arid`, `temperate`, `subtropical` or `tropical`.
    pub native_climate: Option<String>,
}

impl PlantProfileDto {
    /// Checked conversion to storable columns. The error is a client-facing message.
    pub fn into_columns(self) -> Result<ProfileColumns, String> {
        if let Some(level) = &self.care_level {
            level.parse::<CareLevel>().map_err(|e| format!("Invalid profile: {e}"))?;
        }
        if let Some(climate) = &self.native_climate {
            climate
                .parse::<NativeClimate>()
                .map_err(|e| format!("Invalid profile: {e}"))?;
        }
        for (name, min, max) in [
            ("moisture", self.optimal_moisture_min, self.optimal_moisture_max),
            ("temperature", self.optimal_temp_min, self.optimal_temp_max),
            ("light", self.optimal_light_min, self.optimal_light_max),
        ] {
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(format!("Invalid profile: optimal {name} min exceeds max"));
                }
            }
        }
        if self.watering_frequency_days.is_some_and(|d| d <= 0.0) {
            return Err("Invalid profile: watering_frequency_days must be positive".into());
        }

        Ok(ProfileColumns {
            plant_type: self.plant_type.filter(|s| !s.trim().is_empty()),
            planted_at: self.planted_at,
            last_watered_at: self.last_watered_at,
            optimal_moisture_min: self.optimal_moisture_min,
            optimal_moisture_max: self.optimal_moisture_max,
            optimal_temp_min: self.optimal_temp_min,
            optimal_temp_max: self.optimal_temp_max,
            optimal_light_min: self.optimal_light_min,
            optimal_light_max: self.optimal_light_max,
            watering_frequency_days: self.watering_frequency_days,
            care_level: self.care_level.map(|s| s.trim().to_ascii_lowercase()),
            native_climate: self.native_climate.map(|s| s.trim().to_ascii_lowercase()),
        })
    }
}

impl From<ProfileColumns> for PlantProfileDto {
    fn from(c: ProfileColumns) -> Self {
        Self {
            plant_type: c.plant_type,
            planted_at: c.planted_at,
            last_watered_at: c.last_watered_at,
            optimal_moisture_min: c.optimal_moisture_min,
            optimal_moisture_max: c.optimal_moisture_max,
            optimal_temp_min: c.optimal_temp_min,
            optimal_temp_max: c.optimal_temp_max,
            optimal_light_min: c.optimal_light_min,
            optimal_light_max: c.optimal_light_max,
            watering_frequency_days: c.watering_frequency_days,
            care_level: c.care_level,
            native_climate: c.native_climate,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreatePlantRequest {
    pub name: Option<String>,
    pub sensor_id: Option<String>,
    #[serde(default)]
    pub profile: Option<PlantProfileDto>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlantDto {
    pub id: i64,
    pub name: String,
    pub sensor_id: String,
    pub created_at: DateTime<Utc>,
    pub profile: PlantProfileDto,
}

impl From<Plant> for PlantDto {
    fn from(p: Plant) -> Self {
        Self {
            id: p.id,
            name: p.name,
            sensor_id: p.sensor_id,
            created_at: p.created_at,
            profile: p.profile.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor data
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SensorDataQuery {
    /// Defaults to the user's first plant.
    pub plant_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    pub plant_id: Option<i64>,
    /// Number of most recent readings, default 20.
    pub limit: Option<i64>,
}

/// Latest reading of one plant.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadingDto {
    pub plant_id: i64,
    pub plant_name: String,
    /// Lux.
    pub light: f64,
    /// Soil moisture percentage.
    pub moisture: f64,
    /// Degrees Fahrenheit.
    pub temperature: f64,
    pub timestamp: DateTime<Utc>,
    /// True when the plant has never reported and the values are generated.
    pub simulated: bool,
}

impl ReadingDto {
    pub fn from_reading(plant: &Plant, r: &SensorReading) -> Self {
        Self {
            plant_id: plant.id,
            plant_name: plant.name.clone(),
            light: r.light,
            moisture: r.moisture,
            temperature: r.temperature,
            timestamp: r.recorded_at,
            simulated: false,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PostReadingRequest {
    pub sensor_id: Option<String>,
    pub plant_id: Option<i64>,
    pub light: Option<f64>,
    pub moisture: Option<f64>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PostReadingResponse {
    pub status: String,
    pub data: ReadingDto,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryPoint {
    pub light: f64,
    pub moisture: f64,
    pub temperature: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<SensorReading> for HistoryPoint {
    fn from(r: SensorReading) -> Self {
        Self {
            light: r.light,
            moisture: r.moisture,
            temperature: r.temperature,
            timestamp: r.recorded_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Weather & estimates
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WeatherQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PredictRequest {
    #[serde(default)]
    pub sensor: SensorInputs,
    #[serde(default)]
    pub weather: WeatherInputs,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PredictResponse {
    pub hours_until_watering: f64,
    pub confidence: f64,
    pub recommendation: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WateringScheduleResponse {
    pub plant_id: i64,
    pub schedule: WateringSchedule,
    pub weather: WeatherSnapshot,
}
