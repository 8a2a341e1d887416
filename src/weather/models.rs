//! Subsets of the NWS and Nominatim JSON documents the client reads.

use serde::Deserialize;

// ---------------------------------------------------------------------------
// NWS
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PointsResponse {
    pub properties: PointsProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsProperties {
    pub forecast: String,
    pub observation_stations: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub properties: ForecastProperties,
}

#[derive(Debug, Deserialize)]
pub struct ForecastProperties {
    pub periods: Vec<ForecastPeriod>,
}

/// A quantity with optional value, e.g. `{"unitCode": "wmoUnit:percent", "value": 40}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    pub value: Option<f64>,
    #[serde(default)]
    pub unit_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPeriod {
    pub temperature: f64,
    #[serde(default)]
    pub temperature_unit: Option<String>,
    #[serde(default)]
    pub relative_humidity: Option<Measure>,
    #[serde(default)]
    pub probability_of_precipitation: Option<Measure>,
    #[serde(default)]
    pub wind_speed: Option<String>,
    #[serde(default)]
    pub short_forecast: Option<String>,
    #[serde(default)]
    pub detailed_forecast: Option<String>,
}

impl ForecastPeriod {
    pub fn temperature_f(&self) -> f64 {
        match self.temperature_unit.as_deref() {
            Some("C") => celsius_to_fahrenheit(self.temperature),
            _ => self.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StationsResponse {
    #[serde(default)]
    pub features: Vec<StationFeature>,
}

#[derive(Debug, Deserialize)]
pub struct StationFeature {
    pub properties: StationProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationProperties {
    pub station_identifier: String,
}

#[derive(Debug, Deserialize)]
pub struct ObservationResponse {
    pub properties: ObservationProperties,
}

/// Observation temperatures are reported in degrees Celsius.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationProperties {
    #[serde(default)]
    pub temperature: Option<Measure>,
    #[serde(default)]
    pub relative_humidity: Option<Measure>,
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

// ---------------------------------------------------------------------------
// Nominatim
// ---------------------------------------------------------------------------

/// Nominatim returns coordinates as strings.
#[derive(Debug, Deserialize)]
pub struct GeocodeHit {
    pub lat: String,
    pub lon: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_period_parses_nws_shape() {
        let json = r#"{
            "number": 1,
            "name": "Tonight",
            "temperature": 58,
            "temperatureUnit": "F",
            "probabilityOfPrecipitation": {"unitCode": "wmoUnit:percent", "value": null},
            "relativeHumidity": {"unitCode": "wmoUnit:percent", "value": 82},
            "windSpeed": "5 to 10 mph",
            "shortForecast": "Mostly Clear",
            "detailedForecast": "Mostly clear, with a low around 58."
        }"#;
        let period: ForecastPeriod = serde_json::from_str(json).unwrap();
        assert_eq!(period.temperature_f(), 58.0);
        assert_eq!(period.relative_humidity.unwrap().value, Some(82.0));
        assert_eq!(period.probability_of_precipitation.unwrap().value, None);
        assert_eq!(period.wind_speed.as_deref(), Some("5 to 10 mph"));
    }

    #[test]
    fn celsius_periods_are_converted() {
        let json = r#"{"temperature": 20, "temperatureUnit": "C"}"#;
        let period: ForecastPeriod = serde_json::from_str(json).unwrap();
        assert_eq!(period.temperature_f(), 68.0);
    }

    #[test]
    fn geocode_hit_parses() {
        let json = r#"[{"place_id": 1, "lat": "39.7392", "lon": "-104.9903", "display_name": "Denver"}]"#;
        let hits: Vec<GeocodeHit> = serde_json::from_str(json).unwrap();
        assert_eq!(hits[0].lat, "39.7392");
    }
}
