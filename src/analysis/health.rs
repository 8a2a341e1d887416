//! Rule-based 0-100 health score.
//!
//! | Component   | Max | Optimal     | Good (-)                 | Fair                      |
//! |-------------|-----|-------------|--------------------------|---------------------------|
//! | Moisture    | 30  | 40-70 %     | 30-40, 70-80 → 20        | 20-30, 80-90 → 10         |
//! | Temperature | 25  | 65-80 °F    | 60-65, 80-85 → 18        | 55-60, 85-90 → 10         |
//! | Light       | 25  | 300-800 lux | 200-300, 800-1000 → 18   | 100-200, 1000-1500 → 10   |
//! | Trend       | 20  | stable      | see [`trend_score`]      |                           |

use super::{
    features::mean_delta,
    round_to,
    types::{
        ComponentScores, CurrentValues, EstimateSource, HealthCategory, HealthResult,
        HealthStatus, SensorSample, RECENT_READINGS,
    },
};

pub const RULE_BASED_CONFIDENCE: f64 = 0.65;

const MAX_TREND: f64 = 20.0;
const NO_DATA_SCORE: f64 = 50.0;
const NO_DATA_TREND: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    Optimal,
    Good,
    Fair,
    Poor,
}

/// Nested inclusive bands: `optimal` inside `good` inside `fair`.
struct Bands {
    optimal: (f64, f64),
    good: (f64, f64),
    fair: (f64, f64),
    points: [f64; 3],
}

impl Bands {
    fn classify(&self, value: f64) -> Band {
        let within = |(lo, hi): (f64, f64)| lo <= value && value <= hi;
        if within(self.optimal) {
            Band::Optimal
        } else if within(self.good) {
            Band::Good
        } else if within(self.fair) {
            Band::Fair
        } else {
            Band::Poor
        }
    }

    fn points(&self, band: Band) -> f64 {
        match band {
            Band::Optimal => self.points[0],
            Band::Good => self.points[1],
            Band::Fair => self.points[2],
            Band::Poor => 0.0,
        }
    }
}

const MOISTURE: Bands = Bands {
    optimal: (40.0, 70.0),
    good: (30.0, 80.0),
    fair: (20.0, 90.0),
    points: [30.0, 20.0, 10.0],
};

const TEMPERATURE: Bands = Bands {
    optimal: (65.0, 80.0),
    good: (60.0, 85.0),
    fair: (55.0, 90.0),
    points: [25.0, 18.0, 10.0],
};

const LIGHT: Bands = Bands {
    optimal: (300.0, 800.0),
    good: (200.0, 1000.0),
    fair: (100.0, 1500.0),
    points: [25.0, 18.0, 10.0],
};

/// Score the newest-first `readings`; only the first five are used.
pub fn score(readings: &[SensorSample]) -> HealthResult {
    let recent = &readings[..readings.len().min(RECENT_READINGS)];
    let Some(latest) = recent.first() else {
        return no_data();
    };

    let moisture_band = MOISTURE.classify(latest.moisture);
    let temp_band = TEMPERATURE.classify(latest.temperature);
    let light_band = LIGHT.classify(latest.light);

    let components = ComponentScores {
        moisture_score: MOISTURE.points(moisture_band),
        temperature_score: TEMPERATURE.points(temp_band),
        light_score: LIGHT.points(light_band),
        trend_score: trend_score(recent),
    };

    let total = (components.moisture_score
        + components.temperature_score
        + components.light_score
        + components.trend_score)
        .clamp(0.0, 100.0);

    let mut factors = Vec::new();
    match moisture_band {
        Band::Poor if latest.moisture < 20.0 => factors.push("Soil moisture is too low"),
        Band::Poor => factors.push("Soil moisture is too high"),
        Band::Fair => factors.push("Soil moisture is suboptimal"),
        _ => {}
    }
    match temp_band {
        Band::Poor if latest.temperature < 55.0 => factors.push("Temperature is too low"),
        Band::Poor => factors.push("Temperature is too high"),
        Band::Fair => factors.push("Temperature is outside optimal range"),
        _ => {}
    }
    match light_band {
        Band::Poor if latest.light < 100.0 => factors.push("Light levels are too low"),
        Band::Poor => factors.push("Light levels are too high"),
        Band::Fair => factors.push("Light levels are suboptimal"),
        _ => {}
    }
    if components.trend_score < 15.0 {
        factors.push("Recent readings show declining conditions");
    }
    if factors.is_empty() {
        factors.push("All conditions are optimal");
    }

    let total = round_to(total, 1);
    HealthResult {
        score: total,
        status: HealthStatus::Rated(HealthCategory::from_score(total)),
        details: components,
        factors: factors.into_iter().map(str::to_owned).collect(),
        current_values: Some(CurrentValues {
            moisture: round_to(latest.moisture, 1),
            temperature: round_to(latest.temperature, 1),
            light: round_to(latest.light, 1),
        }),
        confidence: RULE_BASED_CONFIDENCE,
        source: EstimateSource::RuleBased,
    }
}

/// Starts at 20 and loses points for falling moisture or swinging
/// temperature. Needs at least three readings.
fn trend_score(recent: &[SensorSample]) -> f64 {
    if recent.len() < 3 {
        return MAX_TREND;
    }
    let moistures: Vec<f64> = recent.iter().map(|r| r.moisture).collect();
    let moisture_change = mean_delta(&moistures);
    let temp_swing = recent
        .windows(2)
        .map(|w| (w[0].temperature - w[1].temperature).abs())
        .sum::<f64>()
        / (recent.len() - 1) as f64;

    let mut trend = MAX_TREND;
    if moisture_change < -5.0 {
        trend -= 10.0;
    } else if moisture_change < -2.0 {
        trend -= 5.0;
    }
    if 10.0 - temp_swing < 5.0 {
        trend -= 5.0;
    }
    trend.clamp(0.0, MAX_TREND)
}

fn no_data() -> HealthResult {
    HealthResult {
        score: NO_DATA_SCORE,
        status: HealthStatus::Unknown,
        details: ComponentScores {
            moisture_score: 0.0,
            temperature_score: 0.0,
            light_score: 0.0,
            trend_score: NO_DATA_TREND,
        },
        factors: vec!["No sensor data available".to_owned()],
        current_values: None,
        confidence: 0.0,
        source: EstimateSource::RuleBased,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn reading(moisture: f64, temperature: f64, light: f64) -> SensorSample {
        SensorSample {
            moisture,
            temperature,
            light,
            timestamp: Utc::now(),
        }
    }

    fn series(values: &[(f64, f64, f64)]) -> Vec<SensorSample> {
        let now = Utc::now();
        values
            .iter()
            .enumerate()
            .map(|(i, &(m, t, l))| SensorSample {
                moisture: m,
                temperature: t,
                light: l,
                timestamp: now - Duration::hours(i as i64),
            })
            .collect()
    }

    fn moisture_points(m: f64) -> f64 {
        score(&[reading(m, 72.0, 500.0)]).details.moisture_score
    }

    #[test]
    fn no_readings_is_unknown() {
        let result = score(&[]);
        assert_eq!(result.score, 50.0);
        assert_eq!(result.status, HealthStatus::Unknown);
        assert_eq!(result.details.trend_score, 10.0);
        assert_eq!(result.details.moisture_score, 0.0);
        assert_eq!(result.factors, vec!["No sensor data available"]);
        assert_eq!(result.confidence, 0.0);
        assert!(result.current_values.is_none());
    }

    #[test]
    fn single_optimal_reading_is_excellent() {
        let result = score(&[reading(45.0, 72.0, 500.0)]);
        assert_eq!(result.details.moisture_score, 30.0);
        assert_eq!(result.details.temperature_score, 25.0);
        assert_eq!(result.details.light_score, 25.0);
        assert_eq!(result.details.trend_score, 20.0);
        assert_eq!(result.score, 100.0);
        assert_eq!(result.status, HealthStatus::Rated(HealthCategory::Excellent));
        assert_eq!(result.factors, vec!["All conditions are optimal"]);
        assert_eq!(result.confidence, RULE_BASED_CONFIDENCE);
    }

    #[test]
    fn moisture_band_edges() {
        assert_eq!(moisture_points(40.0), 30.0);
        assert_eq!(moisture_points(70.0), 30.0);
        assert_eq!(moisture_points(39.9), 20.0);
        assert_eq!(moisture_points(80.0), 20.0);
        assert_eq!(moisture_points(80.1), 10.0);
        assert_eq!(moisture_points(29.9), 10.0);
        assert_eq!(moisture_points(19.9), 0.0);
        assert_eq!(moisture_points(90.1), 0.0);
    }

    #[test]
    fn temperature_and_light_bands() {
        let t = |v: f64| score(&[reading(50.0, v, 500.0)]).details.temperature_score;
        assert_eq!(t(64.9), 18.0);
        assert_eq!(t(85.0), 18.0);
        assert_eq!(t(57.0), 10.0);
        assert_eq!(t(91.0), 0.0);

        let l = |v: f64| score(&[reading(50.0, 72.0, v)]).details.light_score;
        assert_eq!(l(250.0), 18.0);
        assert_eq!(l(1200.0), 10.0);
        assert_eq!(l(50.0), 0.0);
        assert_eq!(l(2000.0), 0.0);
    }

    #[test]
    fn dry_and_hot_produces_factors() {
        let result = score(&[reading(15.0, 95.0, 500.0)]);
        assert_eq!(result.details.moisture_score, 0.0);
        assert_eq!(result.details.temperature_score, 0.0);
        assert!(result.factors.contains(&"Soil moisture is too low".to_owned()));
        assert!(result.factors.contains(&"Temperature is too high".to_owned()));
        assert_eq!(result.score, 45.0);
        assert_eq!(result.status, HealthStatus::Rated(HealthCategory::Poor));
    }

    #[test]
    fn fair_bands_report_suboptimal() {
        let result = score(&[reading(25.0, 57.0, 150.0)]);
        assert_eq!(
            result.factors,
            vec![
                "Soil moisture is suboptimal",
                "Temperature is outside optimal range",
                "Light levels are suboptimal",
            ]
        );
    }

    #[test]
    fn falling_moisture_lowers_trend() {
        // Newest first, dropping 6 points per reading.
        let rapid = series(&[(40.0, 72.0, 500.0), (46.0, 72.0, 500.0), (52.0, 72.0, 500.0)]);
        let result = score(&rapid);
        assert_eq!(result.details.trend_score, 10.0);
        assert!(result
            .factors
            .contains(&"Recent readings show declining conditions".to_owned()));

        let slight = series(&[(40.0, 72.0, 500.0), (43.0, 72.0, 500.0), (46.0, 72.0, 500.0)]);
        assert_eq!(score(&slight).details.trend_score, 15.0);
    }

    #[test]
    fn unstable_temperature_lowers_trend() {
        let swinging = series(&[(50.0, 66.0, 500.0), (50.0, 78.0, 500.0), (50.0, 66.0, 500.0)]);
        assert_eq!(score(&swinging).details.trend_score, 15.0);

        let both = series(&[
            (40.0, 66.0, 500.0),
            (50.0, 78.0, 500.0),
            (60.0, 66.0, 500.0),
        ]);
        assert_eq!(score(&both).details.trend_score, 5.0);
    }

    #[test]
    fn total_stays_within_bounds() {
        let moisture = [10.0, 25.0, 35.0, 50.0, 75.0, 85.0, 95.0];
        let temperature = [50.0, 57.0, 62.0, 72.0, 82.0, 87.0, 95.0];
        let light = [50.0, 150.0, 250.0, 500.0, 900.0, 1200.0, 2000.0];
        for &m in &moisture {
            for &t in &temperature {
                for &l in &light {
                    let result = score(&series(&[(m, t, l), (m + 8.0, t + 12.0, l), (m + 16.0, t, l)]));
                    assert!((0.0..=100.0).contains(&result.score));
                }
            }
        }
    }

    #[test]
    fn current_values_are_rounded() {
        let result = score(&[reading(45.26, 72.04, 500.56)]);
        let current = result.current_values.unwrap();
        assert_eq!(current.moisture, 45.3);
        assert_eq!(current.temperature, 72.0);
        assert_eq!(current.light, 500.6);
    }
}
