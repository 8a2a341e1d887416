use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Sensor readings
// ---------------------------------------------------------------------------

/// Most readings the scorer and the feature extractor look at.
pub const RECENT_READINGS: usize = 5;

/// One sensor sample. Slices of samples are always ordered newest first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    /// Soil moisture percentage (0-100).
    pub moisture: f64,
    /// Degrees Fahrenheit.
    pub temperature: f64,
    /// Lux.
    pub light: f64,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

/// Marker stored in [`WeatherSnapshot::note`] when the upstream API failed.
pub const FALLBACK_NOTE: &str = "fallback_data";

/// Current conditions at the user's location. Fetched per request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    /// Degrees Fahrenheit.
    pub temperature: f64,
    /// Relative humidity percentage.
    pub humidity: f64,
    /// Probability of precipitation percentage.
    #[serde(rename = "precipitation")]
    pub precipitation_probability: f64,
    /// Miles per hour.
    pub wind_speed: f64,
    #[serde(rename = "forecast")]
    pub forecast_text: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl WeatherSnapshot {
    /// Hardcoded values served whenever the weather service cannot be reached.
    pub fn fallback(timestamp: DateTime<Utc>) -> Self {
        Self {
            temperature: 72.0,
            humidity: 65.0,
            precipitation_probability: 0.0,
            wind_speed: 8.0,
            forecast_text: "Partly Cloudy".to_owned(),
            description: "Weather data temporarily unavailable. Using default values.".to_owned(),
            timestamp,
            note: Some(FALLBACK_NOTE.to_owned()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.note.as_deref() == Some(FALLBACK_NOTE)
    }
}

// ---------------------------------------------------------------------------
// Plant profile
// ---------------------------------------------------------------------------

pub const DEFAULT_AGE_DAYS: f64 = 30.0;
pub const DEFAULT_DAYS_SINCE_WATERING: f64 = 3.0;
pub const DEFAULT_WATERING_FREQUENCY_DAYS: f64 = 3.0;

/// Inclusive optimal band for one sensor quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OptimalRange {
    pub min: f64,
    pub max: f64,
}

impl OptimalRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Build a range only when both bounds are known.
    pub fn from_bounds(min: Option<f64>, max: Option<f64>) -> Option<Self> {
        Some(Self::new(min?, max?))
    }

    pub fn center(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    /// 1.0 inside the band, decaying linearly to 0.0 one band-width outside it.
    pub fn compliance(&self, value: f64) -> f64 {
        if self.contains(value) {
            return 1.0;
        }
        let distance = if value < self.min {
            self.min - value
        } else {
            value - self.max
        };
        let width = self.max - self.min;
        if width <= 0.0 {
            return 0.0;
        }
        (1.0 - distance / width).max(0.0)
    }
}

/// Broad plant family. Unrecognised names are kept as `Other` and encoded
/// as a neutral midpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlantType {
    Succulent,
    Cactus,
    Herb,
    Flower,
    Vegetable,
    Tree,
    Other(String),
}

impl PlantType {
    pub fn code(&self) -> f64 {
        match self {
            PlantType::Succulent | PlantType::Cactus => 0.0,
            PlantType::Herb => 0.33,
            PlantType::Flower => 0.5,
            PlantType::Vegetable => 0.66,
            PlantType::Tree => 0.83,
            PlantType::Other(_) => 0.5,
        }
    }
}

impl FromStr for PlantType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "succulent" => Self::Succulent,
            "cactus" => Self::Cactus,
            "herb" => Self::Herb,
            "flower" => Self::Flower,
            "vegetable" => Self::Vegetable,
            "tree" => Self::Tree,
            other => Self::Other(other.to_owned()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CareLevel {
    Low,
    Medium,
    High,
}

impl CareLevel {
    pub fn code(self) -> f64 {
        match self {
            CareLevel::Low => 0.0,
            CareLevel::Medium => 0.5,
            CareLevel::High => 1.0,
        }
    }
}

impl FromStr for CareLevel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(UnknownVariant::new("care level", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeClimate {
    Arid,
    Temperate,
    Subtropical,
    Tropical,
}

impl NativeClimate {
    pub fn code(self) -> f64 {
        match self {
            NativeClimate::Arid => 0.0,
            NativeClimate::Temperate => 0.5,
            NativeClimate::Subtropical => 0.75,
            NativeClimate::Tropical => 1.0,
        }
    }
}

impl FromStr for NativeClimate {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arid" => Ok(Self::Arid),
            "temperate" => Ok(Self::Temperate),
            "subtropical" => Ok(Self::Subtropical),
            "tropical" => Ok(Self::Tropical),
            other => Err(UnknownVariant::new("native climate", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Per-plant care attributes. Every field is optional; the accessors apply
/// the documented defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlantProfile {
    pub plant_type: Option<PlantType>,
    pub age_days: Option<f64>,
    pub optimal_moisture: Option<OptimalRange>,
    pub optimal_temperature: Option<OptimalRange>,
    pub optimal_light: Option<OptimalRange>,
    pub watering_frequency_days: Option<f64>,
    pub days_since_last_watering: Option<f64>,
    pub care_level: Option<CareLevel>,
    pub native_climate: Option<NativeClimate>,
}

impl PlantProfile {
    pub fn age_days(&self) -> f64 {
        self.age_days.unwrap_or(DEFAULT_AGE_DAYS)
    }

    pub fn days_since_last_watering(&self) -> f64 {
        self.days_since_last_watering
            .unwrap_or(DEFAULT_DAYS_SINCE_WATERING)
    }

    pub fn watering_frequency_days(&self) -> f64 {
        self.watering_frequency_days
            .unwrap_or(DEFAULT_WATERING_FREQUENCY_DAYS)
    }

    /// Defaults to `herb` when unset.
    pub fn plant_type_code(&self) -> f64 {
        self.plant_type
            .as_ref()
            .map_or(PlantType::Herb.code(), PlantType::code)
    }

    pub fn care_level_code(&self) -> f64 {
        self.care_level.unwrap_or(CareLevel::Medium).code()
    }

    pub fn native_climate_code(&self) -> f64 {
        self.native_climate.unwrap_or(NativeClimate::Temperate).code()
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HealthCategory {
    Critical,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl HealthCategory {
    pub const ALL: [HealthCategory; 5] = [
        HealthCategory::Critical,
        HealthCategory::Poor,
        HealthCategory::Fair,
        HealthCategory::Good,
        HealthCategory::Excellent,
    ];

    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Excellent
        } else if score >= 65.0 {
            Self::Good
        } else if score >= 50.0 {
            Self::Fair
        } else if score >= 30.0 {
            Self::Poor
        } else {
            Self::Critical
        }
    }

    /// Midpoint of the category's score band, used when a classifier only
    /// yields a label.
    pub fn band_midpoint(self) -> f64 {
        match self {
            Self::Critical => 14.5,
            Self::Poor => 39.5,
            Self::Fair => 57.0,
            Self::Good => 72.0,
            Self::Excellent => 90.0,
        }
    }

    /// Position in [`HealthCategory::ALL`]; also the classifier's class index.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::Poor => "Poor",
            Self::Fair => "Fair",
            Self::Good => "Good",
            Self::Excellent => "Excellent",
        }
    }
}

/// Either a rated category or the no-data sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Rated(HealthCategory),
    Unknown,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Rated(category) => category.as_str(),
            HealthStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for HealthStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct ComponentScores {
    /// 0-30
    pub moisture_score: f64,
    /// 0-25
    pub temperature_score: f64,
    /// 0-25
    pub light_score: f64,
    /// 0-20
    pub trend_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct CurrentValues {
    pub moisture: f64,
    pub temperature: f64,
    pub light: f64,
}

/// Which code path produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSource {
    RuleBased,
    TrainedModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct HealthResult {
    pub score: f64,
    /// `Critical`, `Poor`, `Fair`, `Good`, `Excellent` or `Unknown`.
    #[schema(value_type = String)]
    pub status: HealthStatus,
    pub details: ComponentScores,
    pub factors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_values: Option<CurrentValues>,
    pub confidence: f64,
    pub source: EstimateSource,
}

// ---------------------------------------------------------------------------
// Watering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    WaterSoon,
    WithinTwoDays,
    WithinThreeDays,
    NotNeeded,
}

impl Recommendation {
    pub fn from_hours(hours: f64) -> Self {
        if hours < 24.0 {
            Self::WaterSoon
        } else if hours < 48.0 {
            Self::WithinTwoDays
        } else if hours < 72.0 {
            Self::WithinThreeDays
        } else {
            Self::NotNeeded
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WaterSoon => "Water soon",
            Self::WithinTwoDays => "Water within 2 days",
            Self::WithinThreeDays => "Water within 3 days",
            Self::NotNeeded => "Watering not needed yet",
        }
    }
}

impl Serialize for Recommendation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Output of the linear-sigmoid estimator behind `/api/predict`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WateringEstimate {
    /// 6-168
    pub hours_until_watering: f64,
    /// 0.5-1
    pub confidence: f64,
    #[schema(value_type = String)]
    pub recommendation: Recommendation,
}

/// Output of the evapotranspiration estimator or the regressor replacing it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WateringSchedule {
    /// 1-7
    pub frequency_days: f64,
    /// 6-168, absent without a moisture reading.
    pub hours_until: Option<f64>,
    pub confidence: f64,
    pub source: EstimateSource,
}
