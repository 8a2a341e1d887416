use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::analysis::types::{OptimalRange, PlantProfile, SensorSample};

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

/// Care attributes stored on a plant row. All optional.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ProfileColumns {
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
    pub care_level: Option<String>,
    pub native_climate: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Plant {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub sensor_id: String,
    #[sqlx(flatten)]
    pub profile: ProfileColumns,
    pub created_at: DateTime<Utc>,
}

impl ProfileColumns {
    /// Typed profile as of `now`. Unparseable care level or climate strings
    /// are treated as unset.
    pub fn to_profile(&self, now: DateTime<Utc>) -> PlantProfile {
        let days_since = |t: DateTime<Utc>| ((now - t).num_seconds() as f64 / 86_400.0).max(0.0);
        PlantProfile {
            plant_type: self.plant_type.as_deref().and_then(|s| s.parse().ok()),
            age_days: self.planted_at.map(days_since),
            optimal_moisture: OptimalRange::from_bounds(
                self.optimal_moisture_min,
                self.optimal_moisture_max,
            ),
            optimal_temperature: OptimalRange::from_bounds(
                self.optimal_temp_min,
                self.optimal_temp_max,
            ),
            optimal_light: OptimalRange::from_bounds(self.optimal_light_min, self.optimal_light_max),
            watering_frequency_days: self.watering_frequency_days,
            days_since_last_watering: self.last_watered_at.map(days_since),
            care_level: self.care_level.as_deref().and_then(|s| s.parse().ok()),
            native_climate: self.native_climate.as_deref().and_then(|s| s.parse().ok()),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SensorReading {
    pub id: i64,
    pub plant_id: i64,
    /// Lux.
    pub light: f64,
    /// Soil moisture percentage.
    pub moisture: f64,
    /// Degrees Fahrenheit.
    pub temperature: f64,
    pub recorded_at: DateTime<Utc>,
}

impl From<&SensorReading> for SensorSample {
    fn from(r: &SensorReading) -> Self {
        Self {
            moisture: r.moisture,
            temperature: r.temperature,
            light: r.light,
            timestamp: r.recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::analysis::types::{CareLevel, PlantType};

    #[test]
    fn profile_from_columns() {
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let columns = ProfileColumns {
            plant_type: Some("Cactus".into()),
            planted_at: Some(now - Duration::days(100)),
            last_watered_at: Some(now - Duration::hours(36)),
            optimal_moisture_min: Some(20.0),
            optimal_moisture_max: Some(40.0),
            optimal_temp_min: Some(60.0),
            optimal_temp_max: None,
            care_level: Some("low".into()),
            native_climate: Some("jungle".into()),
            ..Default::default()
        };
        let profile = columns.to_profile(now);
        assert_eq!(profile.plant_type, Some(PlantType::Cactus));
        assert_eq!(profile.age_days, Some(100.0));
        assert_eq!(profile.days_since_last_watering, Some(1.5));
        assert_eq!(profile.optimal_moisture, Some(OptimalRange::new(20.0, 40.0)));
        assert_eq!(profile.optimal_temperature, None);
        assert_eq!(profile.care_level, Some(CareLevel::Low));
        assert_eq!(profile.native_climate, None);
    }

    #[test]
    fn future_dates_clamp_to_zero() {
        let now = Utc::now();
        let columns = ProfileColumns {
            last_watered_at: Some(now + Duration::days(2)),
            ..Default::default()
        };
        assert_eq!(columns.to_profile(now).days_since_last_watering, Some(0.0));
    }
}
