use std::f64::consts::PI;

use chrono::{DateTime, Timelike, Utc};
use rand::Rng;
use sqlx::PgPool;
use tracing::info;

use crate::db::{
    self,
    models::{Plant, SensorReading},
};

/// Which plant a reading belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadingTarget {
    Sensor(String),
    Plant(i64),
}

/// One measurement as sent by a sensor client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadingInput {
    pub light: f64,
    pub moisture: f64,
    pub temperature: f64,
}

impl ReadingInput {
    pub fn validate(&self) -> Result<(), IngestError> {
        let fields = [
            ("light", self.light),
            ("moisture", self.moisture),
            ("temperature", self.temperature),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(IngestError::Invalid(format!("{name} must be a finite number")));
        }
        if !(0.0..=100.0).contains(&self.moisture) {
            return Err(IngestError::Invalid("moisture must be between 0 and 100".into()));
        }
        if self.light < 0.0 {
            return Err(IngestError::Invalid("light must not be negative".into()));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("{0}")]
    Invalid(String),
    #[error("Plant not found")]
    PlantNotFound,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

pub struct SensorService {
    pool: PgPool,
}

impl SensorService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolve `target`, restricted to plants of `owner` when given.
    pub async fn resolve(
        &self,
        target: &ReadingTarget,
        owner: Option<i64>,
    ) -> Result<Plant, IngestError> {
        let plant = match target {
            ReadingTarget::Sensor(sensor_id) => {
                db::plants::find_by_sensor_id(&self.pool, sensor_id).await?
            }
            ReadingTarget::Plant(id) => db::plants::find_by_id(&self.pool, *id).await?,
        };
        plant
            .filter(|p| owner.map_or(true, |user_id| p.user_id == user_id))
            .ok_or(IngestError::PlantNotFound)
    }

    /// Validate and persist one reading. Returns the plant and the stored row.
    pub async fn record(
        &self,
        target: &ReadingTarget,
        owner: Option<i64>,
        input: ReadingInput,
    ) -> Result<(Plant, SensorReading), IngestError> {
        input.validate()?;
        let plant = self.resolve(target, owner).await?;
        let reading = db::readings::insert(
            &self.pool,
            plant.id,
            input.light,
            input.moisture,
            input.temperature,
        )
        .await?;

        info!(
            plant_id = plant.id,
            moisture = reading.moisture,
            temperature = reading.temperature,
            light = reading.light,
            "Recorded sensor reading"
        );
        Ok((plant, reading))
    }
}

/// Plausible reading for a plant that has never reported, following the
/// daylight curve of the current hour.
pub fn simulated_reading(now: DateTime<Utc>, rng: &mut impl Rng) -> ReadingInput {
    let daylight = ((now.hour() as f64 - 6.0) * PI / 12.0).sin();
    ReadingInput {
        light: (400.0 + daylight * 300.0 + rng.gen_range(-25.0..25.0)).max(0.0),
        moisture: (45.0_f64 + rng.gen_range(-2.0..1.0)).clamp(0.0, 100.0),
        temperature: 72.0 + daylight * 8.0 + rng.gen_range(-2.0..2.0),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn input(light: f64, moisture: f64, temperature: f64) -> ReadingInput {
        ReadingInput {
            light,
            moisture,
            temperature,
        }
    }

    #[test]
    fn valid_reading_passes() {
        assert!(input(500.0, 45.0, 72.0).validate().is_ok());
        assert!(input(0.0, 0.0, -10.0).validate().is_ok());
        assert!(input(0.0, 100.0, 120.0).validate().is_ok());
    }

    #[test]
    fn out_of_range_moisture_fails() {
        let err = input(500.0, 101.0, 72.0).validate().unwrap_err();
        assert_eq!(err.to_string(), "moisture must be between 0 and 100");
        assert!(input(500.0, -1.0, 72.0).validate().is_err());
    }

    #[test]
    fn non_finite_values_fail() {
        let err = input(f64::NAN, 50.0, 72.0).validate().unwrap_err();
        assert_eq!(err.to_string(), "light must be a finite number");
        assert!(input(500.0, 50.0, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn negative_light_fails() {
        assert!(input(-5.0, 50.0, 72.0).validate().is_err());
    }

    #[test]
    fn simulated_noon_is_bright_and_warm() {
        let noon = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let r = simulated_reading(noon, &mut rng);
            assert!((675.0..=725.0).contains(&r.light), "{r:?}");
            assert!((43.0..=46.0).contains(&r.moisture));
            assert!((78.0..=82.0).contains(&r.temperature));
        }
    }

    #[test]
    fn simulated_midnight_is_dark() {
        let midnight = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let r = simulated_reading(midnight, &mut rng);
        assert!((75.0..=125.0).contains(&r.light));
        assert!(r.validate().is_ok());
    }
}
