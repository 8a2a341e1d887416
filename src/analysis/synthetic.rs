//! Seeded synthetic training sets for the two forests.

use chrono::{Duration, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;

use super::{
    features::{self, FeatureVector},
    types::{
        CareLevel, HealthCategory, NativeClimate, OptimalRange, PlantProfile, PlantType,
        SensorSample, WeatherSnapshot,
    },
    watering::{self, MAX_FREQUENCY_DAYS, MAX_HOURS, MIN_FREQUENCY_DAYS, MIN_HOURS},
};

pub const DEFAULT_SAMPLES: usize = 500;
pub const DEFAULT_SEED: u64 = 42;

fn normal(rng: &mut StdRng, std_dev: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    z * std_dev
}

/// Rows of `[moisture, T, H, P]` labelled with hours until watering, or
/// `[T, H, P]` labelled with frequency in days when `include_moisture` is
/// false. Targets come from the weather-based estimator plus 10 % noise.
pub fn watering_samples(
    n: usize,
    include_moisture: bool,
    seed: u64,
) -> (Vec<Vec<f64>>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);

    for _ in 0..n {
        let temperature = rng.gen_range(60.0..85.0);
        let humidity = rng.gen_range(30.0..80.0);
        let precipitation = rng.gen_range(0.0..50.0);

        let (row, target, bounds) = if include_moisture {
            let moisture = rng.gen_range(20.0..80.0);
            let schedule =
                watering::weather_based(temperature, humidity, precipitation, Some(moisture));
            (
                vec![moisture, temperature, humidity, precipitation],
                schedule.hours_until.unwrap_or(MAX_HOURS),
                (MIN_HOURS, MAX_HOURS),
            )
        } else {
            (
                vec![temperature, humidity, precipitation],
                watering::frequency_days(temperature, humidity, precipitation),
                (MIN_FREQUENCY_DAYS, MAX_FREQUENCY_DAYS),
            )
        };

        let noisy = target + normal(&mut rng, target * 0.1);
        x.push(row);
        y.push(noisy.clamp(bounds.0, bounds.1));
    }
    (x, y)
}

/// Labelling score for synthetic plants. Deliberately simpler than the
/// rule-based scorer so the classifier learns its own boundaries.
fn label_score(
    moisture: f64,
    temperature: f64,
    light: f64,
    moisture_trend: f64,
    weather_temp: f64,
    weather_humidity: f64,
) -> f64 {
    let mut score: f64 = 50.0;

    if (40.0..=70.0).contains(&moisture) {
        score += 20.0;
    } else if (30.0..=80.0).contains(&moisture) {
        score += 10.0;
    } else if !(20.0..=90.0).contains(&moisture) {
        score -= 20.0;
    }

    if (65.0..=80.0).contains(&temperature) {
        score += 15.0;
    } else if (60.0..=85.0).contains(&temperature) {
        score += 8.0;
    } else if !(55.0..=90.0).contains(&temperature) {
        score -= 15.0;
    }

    if (300.0..=800.0).contains(&light) {
        score += 15.0;
    } else if (200.0..=1000.0).contains(&light) {
        score += 8.0;
    } else if !(100.0..=1500.0).contains(&light) {
        score -= 15.0;
    }

    if moisture_trend < -5.0 {
        score -= 10.0;
    } else if moisture_trend > 2.0 {
        score += 5.0;
    }

    if weather_temp > 80.0 && weather_humidity < 40.0 {
        score -= 5.0;
    } else if weather_temp < 65.0 && weather_humidity > 75.0 {
        score -= 3.0;
    }

    score.clamp(0.0, 100.0)
}

fn random_profile(rng: &mut StdRng) -> PlantProfile {
    const TYPES: [PlantType; 5] = [
        PlantType::Succulent,
        PlantType::Herb,
        PlantType::Vegetable,
        PlantType::Flower,
        PlantType::Tree,
    ];
    const CARE: [CareLevel; 3] = [CareLevel::Low, CareLevel::Medium, CareLevel::High];
    const CLIMATES: [NativeClimate; 4] = [
        NativeClimate::Arid,
        NativeClimate::Temperate,
        NativeClimate::Tropical,
        NativeClimate::Subtropical,
    ];

    PlantProfile {
        age_days: Some(rng.gen_range(1..365) as f64),
        plant_type: Some(TYPES[rng.gen_range(0..TYPES.len())].clone()),
        optimal_moisture: Some(OptimalRange::new(
            rng.gen_range(30.0..50.0),
            rng.gen_range(50.0..80.0),
        )),
        optimal_temperature: Some(OptimalRange::new(
            rng.gen_range(60.0..70.0),
            rng.gen_range(75.0..85.0),
        )),
        optimal_light: Some(OptimalRange::new(
            rng.gen_range(200.0..400.0),
            rng.gen_range(600.0..1000.0),
        )),
        watering_frequency_days: Some(rng.gen_range(1.0..7.0)),
        days_since_last_watering: Some(rng.gen_range(0.0..7.0)),
        care_level: Some(CARE[rng.gen_range(0..CARE.len())]),
        native_climate: Some(CLIMATES[rng.gen_range(0..CLIMATES.len())]),
    }
}

/// Feature vectors of random plants with their health category.
pub fn health_samples(n: usize, seed: u64) -> (Vec<FeatureVector>, Vec<HealthCategory>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let now = Utc::now();
    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);

    for _ in 0..n {
        let moisture = rng.gen_range(10.0..90.0);
        let temperature = rng.gen_range(55.0..90.0);
        let light = rng.gen_range(50.0..1500.0);

        let weather = WeatherSnapshot {
            temperature: rng.gen_range(60.0..85.0),
            humidity: rng.gen_range(30.0..80.0),
            precipitation_probability: rng.gen_range(0.0..50.0),
            wind_speed: 5.0,
            forecast_text: String::new(),
            description: String::new(),
            timestamp: now,
            note: None,
        };

        let readings: Vec<SensorSample> = (0..5)
            .map(|i| SensorSample {
                moisture: moisture + normal(&mut rng, 5.0),
                temperature: temperature + normal(&mut rng, 2.0),
                light: light + normal(&mut rng, 50.0),
                timestamp: now - Duration::minutes(i * 10),
            })
            .collect();

        let moisture_trend = normal(&mut rng, 3.0);
        let score = label_score(
            moisture,
            temperature,
            light,
            moisture_trend,
            weather.temperature,
            weather.humidity,
        );

        let profile = random_profile(&mut rng);
        x.push(features::extract(&readings, Some(&weather), Some(&profile)));
        y.push(HealthCategory::from_score(score));
    }
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::features::FEATURE_COUNT;

    #[test]
    fn watering_rows_have_expected_shape() {
        let (x, y) = watering_samples(50, true, DEFAULT_SEED);
        assert_eq!(x.len(), 50);
        assert!(x.iter().all(|row| row.len() == 4));
        assert!(y.iter().all(|h| (MIN_HOURS..=MAX_HOURS).contains(h)));

        let (x, y) = watering_samples(50, false, DEFAULT_SEED);
        assert!(x.iter().all(|row| row.len() == 3));
        assert!(y
            .iter()
            .all(|d| (MIN_FREQUENCY_DAYS..=MAX_FREQUENCY_DAYS).contains(d)));
    }

    #[test]
    fn generation_is_seeded() {
        assert_eq!(watering_samples(20, true, 7), watering_samples(20, true, 7));
        assert_ne!(watering_samples(20, true, 7).1, watering_samples(20, true, 8).1);
        assert_eq!(health_samples(10, 3).1, health_samples(10, 3).1);
    }

    #[test]
    fn health_rows_are_full_vectors() {
        let (x, y) = health_samples(40, DEFAULT_SEED);
        assert_eq!(x.len(), 40);
        assert_eq!(y.len(), 40);
        assert!(x.iter().all(|row| row.len() == FEATURE_COUNT));
        assert!(x.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn label_score_extremes() {
        assert_eq!(label_score(55.0, 72.0, 500.0, 3.0, 70.0, 50.0), 100.0);
        assert_eq!(label_score(5.0, 95.0, 2000.0, -6.0, 85.0, 30.0), 0.0);
        assert_eq!(label_score(25.0, 57.0, 150.0, 0.0, 70.0, 50.0), 50.0);
    }
}
