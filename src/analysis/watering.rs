//! Watering estimators.
//!
//! Two independent strategies live here:
//!
//! * [`weather_based`]: evapotranspiration-style frequency in days, turned
//!   into hours until the next watering when a moisture reading is known.
//!   A trained regressor may replace it (see `analysis::service`).
//! * [`linear_sigmoid`]: a fixed-weight linear model squashed through a
//!   sigmoid, served by `POST /api/predict`.

use serde::Deserialize;
use utoipa::ToSchema;

use super::{
    features::clamp01,
    types::{EstimateSource, Recommendation, WateringEstimate, WateringSchedule},
};

pub const MIN_HOURS: f64 = 6.0;
pub const MAX_HOURS: f64 = 168.0;
pub const MIN_FREQUENCY_DAYS: f64 = 1.0;
pub const MAX_FREQUENCY_DAYS: f64 = 7.0;

pub const RULE_BASED_CONFIDENCE: f64 = 0.7;

// ---------------------------------------------------------------------------
// Weather-based estimator
// ---------------------------------------------------------------------------

/// Days between waterings for the given conditions, in `[1, 7]`.
///
/// Hot, dry air dries the soil fastest (1 day); cool saturated air slowest
/// (5 days). Rain chance stretches the interval by up to 50 %.
pub fn frequency_days(temperature: f64, humidity: f64, precipitation: f64) -> f64 {
    let temp_factor = clamp01((temperature - 60.0) / 30.0);
    let humidity_factor = clamp01((100.0 - humidity) / 70.0);
    let et_rate = 0.6 * temp_factor + 0.4 * humidity_factor;
    let base_days = 1.0 + (1.0 - et_rate) * 4.0;
    let precip_adjustment = 1.0 + (precipitation / 100.0) * 0.5;
    (base_days * precip_adjustment).clamp(MIN_FREQUENCY_DAYS, MAX_FREQUENCY_DAYS)
}

/// Fraction of the regular interval left at a given soil moisture.
fn moisture_urgency(moisture: f64) -> f64 {
    if moisture < 30.0 {
        0.3
    } else if moisture < 40.0 {
        0.5
    } else if moisture < 50.0 {
        0.7
    } else {
        1.0
    }
}

pub fn weather_based(
    temperature: f64,
    humidity: f64,
    precipitation: f64,
    moisture: Option<f64>,
) -> WateringSchedule {
    let frequency = frequency_days(temperature, humidity, precipitation);
    let hours_until = moisture
        .map(|m| (frequency * 24.0 * moisture_urgency(m)).clamp(MIN_HOURS, MAX_HOURS));
    WateringSchedule {
        frequency_days: frequency,
        hours_until,
        confidence: RULE_BASED_CONFIDENCE,
        source: EstimateSource::RuleBased,
    }
}

// ---------------------------------------------------------------------------
// Linear-sigmoid estimator
// ---------------------------------------------------------------------------

const WEIGHTS: [f64; 7] = [-0.3, -0.8, -0.2, -0.1, 0.4, -0.15, -0.5];
const SCALES: [f64; 7] = [100.0, 100.0, 1000.0, 100.0, 100.0, 20.0, 10.0];
const BIAS: f64 = 0.6;

/// Inputs of the linear-sigmoid estimator. Missing request fields take the
/// defaults of [`PredictInputs::default`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictInputs {
    pub moisture: f64,
    pub temperature: f64,
    pub light: f64,
    pub humidity: f64,
    pub precipitation: f64,
    pub wind_speed: f64,
}

impl Default for PredictInputs {
    fn default() -> Self {
        Self {
            moisture: 45.0,
            temperature: 72.0,
            light: 400.0,
            humidity: 60.0,
            precipitation: 0.0,
            wind_speed: 5.0,
        }
    }
}

/// Sensor half of a `/api/predict` body.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SensorInputs {
    pub moisture: Option<f64>,
    pub temperature: Option<f64>,
    pub light: Option<f64>,
}

/// Weather half of a `/api/predict` body.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeatherInputs {
    pub humidity: Option<f64>,
    pub precipitation: Option<f64>,
    pub wind_speed: Option<f64>,
}

impl PredictInputs {
    pub fn from_parts(sensor: &SensorInputs, weather: &WeatherInputs) -> Self {
        let d = Self::default();
        Self {
            moisture: sensor.moisture.unwrap_or(d.moisture),
            temperature: sensor.temperature.unwrap_or(d.temperature),
            light: sensor.light.unwrap_or(d.light),
            humidity: weather.humidity.unwrap_or(d.humidity),
            precipitation: weather.precipitation.unwrap_or(d.precipitation),
            wind_speed: weather.wind_speed.unwrap_or(d.wind_speed),
        }
    }

    pub fn evapotranspiration(&self) -> f64 {
        self.temperature * 0.05 + self.wind_speed * 0.1 - self.humidity * 0.02
    }

    fn as_array(&self) -> [f64; 7] {
        [
            self.moisture,
            self.temperature,
            self.light,
            self.humidity,
            self.precipitation,
            self.wind_speed,
            self.evapotranspiration(),
        ]
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Sigmoid output in `(0, 1)` before scaling to hours.
pub fn linear_sigmoid_raw(inputs: &PredictInputs) -> f64 {
    let z = inputs
        .as_array()
        .iter()
        .zip(SCALES)
        .zip(WEIGHTS)
        .map(|((x, scale), w)| x / scale * w)
        .sum::<f64>()
        + BIAS;
    sigmoid(z)
}

pub fn linear_sigmoid(inputs: &PredictInputs) -> WateringEstimate {
    let s = linear_sigmoid_raw(inputs);
    let hours = (s * MAX_HOURS).clamp(MIN_HOURS, MAX_HOURS);
    WateringEstimate {
        hours_until_watering: hours,
        confidence: ((s - 0.5).abs() * 2.0).max(0.5),
        recommendation: Recommendation::from_hours(hours),
    }
}
