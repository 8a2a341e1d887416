//! Fixed-order numeric encoding of readings, weather and plant profile.
//!
//! The vector layout is part of the on-disk model contract: a classifier
//! trained against [`FEATURE_COUNT`] inputs expects slots in exactly the
//! order of [`FEATURE_NAMES`].

use statrs::statistics::Statistics;

use super::types::{PlantProfile, SensorSample, WeatherSnapshot, RECENT_READINGS};

pub const FEATURE_COUNT: usize = 21;

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "moisture",
    "temperature",
    "light",
    "weather_temp",
    "weather_humidity",
    "weather_precip",
    "moisture_trend",
    "temp_stability",
    "light_consistency",
    "moisture_deviation",
    "temp_deviation",
    "light_deviation",
    "weather_stress",
    "moisture_status_code",
    "age_normalized",
    "days_since_watering_normalized",
    "watering_frequency_normalized",
    "care_level_code",
    "native_climate_code",
    "plant_type_code",
    "optimal_compliance",
];

pub type FeatureVector = [f64; FEATURE_COUNT];

const DEFAULT_MOISTURE: f64 = 50.0;
const DEFAULT_TEMPERATURE: f64 = 72.0;
const DEFAULT_LIGHT: f64 = 500.0;

const DEFAULT_WEATHER_TEMPERATURE: f64 = 72.0;
const DEFAULT_WEATHER_HUMIDITY: f64 = 60.0;

const DEFAULT_TEMP_STABILITY: f64 = 5.0;
const DEFAULT_LIGHT_CONSISTENCY: f64 = 100.0;

const MOISTURE_CENTER: f64 = 50.0;
const TEMPERATURE_CENTER: f64 = 72.5;
const LIGHT_CENTER: f64 = 550.0;

/// Pairs of consecutive readings considered for the moisture trend.
const TREND_PAIRS: usize = 4;

pub(crate) fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Mean of `newer - older` over consecutive pairs of `values` (newest first).
pub(crate) fn mean_delta(values: &[f64]) -> f64 {
    values.windows(2).map(|w| w[0] - w[1]).mean()
}

/// Encode the inputs into a [`FeatureVector`]. Never fails; absent inputs
/// take the documented defaults.
pub fn extract(
    readings: &[SensorSample],
    weather: Option<&WeatherSnapshot>,
    profile: Option<&PlantProfile>,
) -> FeatureVector {
    let recent = &readings[..readings.len().min(RECENT_READINGS)];
    let default_profile = PlantProfile::default();
    let profile = profile.unwrap_or(&default_profile);

    let (moisture, temperature, light) = match recent.first() {
        Some(r) => (r.moisture, r.temperature, r.light),
        None => (DEFAULT_MOISTURE, DEFAULT_TEMPERATURE, DEFAULT_LIGHT),
    };

    let (weather_temp, weather_humidity, weather_precip) = match weather {
        Some(w) => (w.temperature, w.humidity, w.precipitation_probability),
        None => (DEFAULT_WEATHER_TEMPERATURE, DEFAULT_WEATHER_HUMIDITY, 0.0),
    };

    let (moisture_trend, temp_stability, light_consistency) = if recent.len() >= 3 {
        let moistures: Vec<f64> = recent
            .iter()
            .take(TREND_PAIRS + 1)
            .map(|r| r.moisture)
            .collect();
        (
            mean_delta(&moistures),
            recent.iter().map(|r| r.temperature).population_std_dev(),
            recent.iter().map(|r| r.light).population_std_dev(),
        )
    } else {
        (0.0, DEFAULT_TEMP_STABILITY, DEFAULT_LIGHT_CONSISTENCY)
    };

    let moisture_center = profile
        .optimal_moisture
        .map_or(MOISTURE_CENTER, |r| r.center());
    let temp_center = profile
        .optimal_temperature
        .map_or(TEMPERATURE_CENTER, |r| r.center());
    let light_center = profile.optimal_light.map_or(LIGHT_CENTER, |r| r.center());

    let heat = clamp01((weather_temp - 70.0) / 20.0);
    let dryness = clamp01((40.0 - weather_humidity) / 40.0);
    let weather_stress = clamp01((heat + dryness) / 2.0);

    let compliance = [
        profile.optimal_moisture.map_or(1.0, |r| r.compliance(moisture)),
        profile
            .optimal_temperature
            .map_or(1.0, |r| r.compliance(temperature)),
        profile.optimal_light.map_or(1.0, |r| r.compliance(light)),
    ]
    .mean();

    [
        moisture,
        temperature,
        light,
        weather_temp,
        weather_humidity,
        weather_precip,
        moisture_trend,
        temp_stability,
        light_consistency,
        (moisture - moisture_center).abs(),
        (temperature - temp_center).abs(),
        (light - light_center).abs(),
        weather_stress,
        moisture_status_code(moisture),
        (profile.age_days() / 365.0).min(1.0),
        (profile.days_since_last_watering() / 14.0).min(1.0),
        clamp01((profile.watering_frequency_days() - 1.0) / 6.0),
        profile.care_level_code(),
        profile.native_climate_code(),
        profile.plant_type_code(),
        compliance,
    ]
}

fn moisture_status_code(moisture: f64) -> f64 {
    if moisture < 30.0 {
        0.0
    } else if moisture < 50.0 {
        1.0
    } else if moisture < 70.0 {
        2.0
    } else {
        3.0
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::analysis::types::{CareLevel, NativeClimate, OptimalRange, PlantType};

    fn slot(name: &str) -> usize {
        FEATURE_NAMES.iter().position(|n| *n == name).unwrap()
    }

    fn samples(values: &[(f64, f64, f64)]) -> Vec<SensorSample> {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &(moisture, temperature, light))| SensorSample {
                moisture,
                temperature,
                light,
                timestamp: start - Duration::minutes(i as i64 * 10),
            })
            .collect()
    }

    fn weather(temperature: f64, humidity: f64, precip: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            temperature,
            humidity,
            precipitation_probability: precip,
            wind_speed: 5.0,
            forecast_text: "Sunny".into(),
            description: String::new(),
            timestamp: Utc::now(),
            note: None,
        }
    }

    #[test]
    fn empty_inputs_use_defaults() {
        let v = extract(&[], None, None);
        assert_eq!(v[slot("moisture")], 50.0);
        assert_eq!(v[slot("temperature")], 72.0);
        assert_eq!(v[slot("light")], 500.0);
        assert_eq!(v[slot("weather_temp")], 72.0);
        assert_eq!(v[slot("weather_humidity")], 60.0);
        assert_eq!(v[slot("weather_precip")], 0.0);
        assert_eq!(v[slot("moisture_trend")], 0.0);
        assert_eq!(v[slot("temp_stability")], 5.0);
        assert_eq!(v[slot("light_consistency")], 100.0);
        assert_eq!(v[slot("moisture_deviation")], 0.0);
        assert_eq!(v[slot("temp_deviation")], 0.5);
        assert_eq!(v[slot("light_deviation")], 50.0);
        assert_eq!(v[slot("moisture_status_code")], 2.0);
        assert!((v[slot("age_normalized")] - 30.0 / 365.0).abs() < 1e-12);
        assert!((v[slot("days_since_watering_normalized")] - 3.0 / 14.0).abs() < 1e-12);
        assert!((v[slot("watering_frequency_normalized")] - 2.0 / 6.0).abs() < 1e-12);
        assert_eq!(v[slot("care_level_code")], 0.5);
        assert_eq!(v[slot("native_climate_code")], 0.5);
        assert_eq!(v[slot("plant_type_code")], 0.33);
        assert_eq!(v[slot("optimal_compliance")], 1.0);
    }

    #[test]
    fn fewer_than_three_readings_skip_trend() {
        let v = extract(&samples(&[(40.0, 70.0, 300.0), (60.0, 80.0, 900.0)]), None, None);
        assert_eq!(v[slot("moisture")], 40.0);
        assert_eq!(v[slot("moisture_trend")], 0.0);
        assert_eq!(v[slot("temp_stability")], 5.0);
        assert_eq!(v[slot("light_consistency")], 100.0);
    }

    #[test]
    fn trend_and_spread_over_recent_readings() {
        // Newest first: moisture falling by 5 per reading.
        let readings = samples(&[
            (40.0, 70.0, 500.0),
            (45.0, 74.0, 500.0),
            (50.0, 70.0, 500.0),
            (55.0, 74.0, 500.0),
        ]);
        let v = extract(&readings, None, None);
        assert!((v[slot("moisture_trend")] + 5.0).abs() < 1e-12);
        assert!((v[slot("temp_stability")] - 2.0).abs() < 1e-12);
        assert_eq!(v[slot("light_consistency")], 0.0);
    }

    #[test]
    fn only_five_readings_are_considered() {
        let mut values = vec![(50.0, 72.0, 500.0); 5];
        values.push((0.0, 0.0, 0.0));
        let v = extract(&samples(&values), None, None);
        assert_eq!(v[slot("moisture_trend")], 0.0);
        assert_eq!(v[slot("temp_stability")], 0.0);
    }

    #[test]
    fn weather_stress_is_bounded() {
        let hot_dry = extract(&[], Some(&weather(110.0, 0.0, 0.0)), None);
        assert_eq!(hot_dry[slot("weather_stress")], 1.0);

        let mild = extract(&[], Some(&weather(60.0, 80.0, 0.0)), None);
        assert_eq!(mild[slot("weather_stress")], 0.0);

        let hot_humid = extract(&[], Some(&weather(90.0, 80.0, 0.0)), None);
        assert!((hot_humid[slot("weather_stress")] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn moisture_status_bands() {
        assert_eq!(moisture_status_code(29.9), 0.0);
        assert_eq!(moisture_status_code(30.0), 1.0);
        assert_eq!(moisture_status_code(50.0), 2.0);
        assert_eq!(moisture_status_code(70.0), 3.0);
    }

    #[test]
    fn profile_fields_are_encoded() {
        let profile = PlantProfile {
            plant_type: Some(PlantType::Succulent),
            age_days: Some(730.0),
            optimal_moisture: Some(OptimalRange::new(20.0, 40.0)),
            optimal_temperature: Some(OptimalRange::new(60.0, 80.0)),
            optimal_light: Some(OptimalRange::new(400.0, 600.0)),
            watering_frequency_days: Some(10.0),
            days_since_last_watering: Some(7.0),
            care_level: Some(CareLevel::High),
            native_climate: Some(NativeClimate::Arid),
        };
        let v = extract(&samples(&[(50.0, 70.0, 500.0)]), None, Some(&profile));
        assert_eq!(v[slot("moisture_deviation")], 20.0);
        assert_eq!(v[slot("temp_deviation")], 0.0);
        assert_eq!(v[slot("light_deviation")], 0.0);
        assert_eq!(v[slot("age_normalized")], 1.0);
        assert_eq!(v[slot("days_since_watering_normalized")], 0.5);
        assert_eq!(v[slot("watering_frequency_normalized")], 1.0);
        assert_eq!(v[slot("care_level_code")], 1.0);
        assert_eq!(v[slot("native_climate_code")], 0.0);
        assert_eq!(v[slot("plant_type_code")], 0.0);
        // Moisture 10 over a 20-wide band: 0.5; the rest are inside.
        assert!((v[slot("optimal_compliance")] - 2.5 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn extraction_is_deterministic() {
        let readings = samples(&[(41.0, 71.0, 450.0), (43.0, 73.0, 470.0), (44.0, 69.0, 430.0)]);
        let w = weather(85.0, 35.0, 20.0);
        assert_eq!(
            extract(&readings, Some(&w), None),
            extract(&readings, Some(&w), None)
        );
    }
}
