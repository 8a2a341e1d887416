pub mod models;

use std::{
    sync::{Arc, LazyLock},
    time::Duration,
};

use anyhow::{Context, Result};
use chrono::Utc;
use regex::Regex;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{analysis::round_to, analysis::types::WeatherSnapshot, config::Config};

use self::models::{
    celsius_to_fahrenheit, ForecastResponse, GeocodeHit, ObservationProperties,
    ObservationResponse, PointsResponse, StationsResponse,
};

const DEFAULT_HUMIDITY: f64 = 60.0;
const DEFAULT_WIND_MPH: f64 = 5.0;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid number pattern"));

/// NWS forecast and Nominatim geocoding client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    http: Client,
    nws_base_url: String,
    geocoder_url: String,
}

impl WeatherClient {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_endpoints(
            &config.nws_base_url,
            &config.geocoder_url,
            &config.nws_user_agent,
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    pub fn with_endpoints(
        nws_base_url: &str,
        geocoder_url: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                nws_base_url: nws_base_url.trim_end_matches('/').to_owned(),
                geocoder_url: geocoder_url.to_owned(),
            }),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url = %url, "GET");
        self.inner
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("{url} returned error status"))?
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode response from {url}"))
    }

    /// Current conditions, or the fallback snapshot if anything upstream fails.
    pub async fn current(&self, lat: f64, lon: f64) -> WeatherSnapshot {
        match self.fetch(lat, lon).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(lat, lon, error = %format!("{e:#}"), "Weather fetch failed, serving fallback");
                WeatherSnapshot::fallback(Utc::now())
            }
        }
    }

    /// Forecast period 0, refined by the nearest station's latest observation
    /// when one is available.
    pub async fn fetch(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot> {
        let points_url = format!("{}/points/{lat:.4},{lon:.4}", self.inner.nws_base_url);
        let points: PointsResponse = self.get_json(&points_url).await?;

        let forecast: ForecastResponse = self.get_json(&points.properties.forecast).await?;
        let period = forecast
            .properties
            .periods
            .into_iter()
            .next()
            .context("forecast has no periods")?;

        let observation = match &points.properties.observation_stations {
            Some(url) => self.latest_observation(url).await.unwrap_or_else(|e| {
                debug!(error = %format!("{e:#}"), "No station observation");
                None
            }),
            None => None,
        };

        let mut temperature = period.temperature_f();
        let mut humidity = period.relative_humidity.as_ref().and_then(|m| m.value);
        if let Some(obs) = observation {
            if let Some(c) = obs.temperature.and_then(|m| m.value) {
                temperature = celsius_to_fahrenheit(c);
            }
            if let Some(h) = obs.relative_humidity.and_then(|m| m.value) {
                humidity = Some(h);
            }
        }

        Ok(WeatherSnapshot {
            temperature: round_to(temperature, 1),
            humidity: round_to(humidity.unwrap_or(DEFAULT_HUMIDITY), 1),
            precipitation_probability: period
                .probability_of_precipitation
                .and_then(|m| m.value)
                .unwrap_or(0.0),
            wind_speed: round_to(parse_wind_speed(period.wind_speed.as_deref()), 1),
            forecast_text: period.short_forecast.unwrap_or_else(|| "Unknown".to_owned()),
            description: period.detailed_forecast.unwrap_or_default(),
            timestamp: Utc::now(),
            note: None,
        })
    }

    async fn latest_observation(&self, stations_url: &str) -> Result<Option<ObservationProperties>> {
        let stations: StationsResponse = self.get_json(stations_url).await?;
        let Some(station) = stations.features.into_iter().next() else {
            return Ok(None);
        };
        let url = format!(
            "{}/stations/{}/observations/latest",
            self.inner.nws_base_url, station.properties.station_identifier
        );
        let obs: ObservationResponse = self.get_json(&url).await?;
        Ok(Some(obs.properties))
    }

    /// Coordinates of the best match for a free-text place name.
    pub async fn geocode(&self, query: &str) -> Option<(f64, f64)> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        match self.try_geocode(query).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(query, error = %format!("{e:#}"), "Geocoding failed");
                None
            }
        }
    }

    async fn try_geocode(&self, query: &str) -> Result<Option<(f64, f64)>> {
        let url = Url::parse_with_params(
            &self.inner.geocoder_url,
            &[("q", query), ("format", "json"), ("limit", "1")],
        )
        .context("invalid geocoder URL")?;
        let hits: Vec<GeocodeHit> = self.get_json(url.as_str()).await?;
        let Some(hit) = hits.into_iter().next() else {
            return Ok(None);
        };
        let lat = hit.lat.parse().context("bad latitude in geocoder response")?;
        let lon = hit.lon.parse().context("bad longitude in geocoder response")?;
        Ok(Some((lat, lon)))
    }
}

/// Miles per hour from NWS strings like `"8 mph"`, `"5 to 10 mph"` or
/// `"Calm"`. Ranges average their two ends.
pub fn parse_wind_speed(raw: Option<&str>) -> f64 {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() || raw.eq_ignore_ascii_case("calm") || raw.eq_ignore_ascii_case("none") {
        return 0.0;
    }
    let numbers = extract_numbers(raw);
    match numbers.as_slice() {
        [a, b, ..] => (a + b) / 2.0,
        [a] => *a,
        [] => DEFAULT_WIND_MPH,
    }
}

fn extract_numbers(s: &str) -> Vec<f64> {
    NUMBER_RE
        .find_iter(s)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Client whose upstreams refuse connections.
    fn unreachable_client() -> WeatherClient {
        WeatherClient::with_endpoints(
            "http://127.0.0.1:9",
            "http://127.0.0.1:9/search",
            "PlantCareService tests",
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[test]
    fn wind_speed_formats() {
        assert_eq!(parse_wind_speed(Some("8 mph")), 8.0);
        assert_eq!(parse_wind_speed(Some("5 to 10 mph")), 7.5);
        assert_eq!(parse_wind_speed(Some("5-10 mph")), 7.5);
        assert_eq!(parse_wind_speed(Some("12.5 mph")), 12.5);
        assert_eq!(parse_wind_speed(Some("Calm")), 0.0);
        assert_eq!(parse_wind_speed(Some("")), 0.0);
        assert_eq!(parse_wind_speed(None), 0.0);
        assert_eq!(parse_wind_speed(Some("breezy")), 5.0);
    }

    #[test]
    fn numbers_are_split_on_non_digits() {
        assert_eq!(extract_numbers("from 3. to 4.5, gusts 20"), vec![3.0, 4.5, 20.0]);
        assert_eq!(extract_numbers("5.5.5"), vec![5.5, 5.0]);
        assert_eq!(extract_numbers("gusts to 25mph"), vec![25.0]);
        assert!(extract_numbers("n/a").is_empty());
    }

    #[tokio::test]
    async fn unreachable_weather_service_serves_fallback() {
        let snapshot = unreachable_client().current(40.7128, -74.006).await;
        assert!(snapshot.is_fallback());
        assert_eq!(snapshot.temperature, 72.0);
        assert_eq!(snapshot.humidity, 65.0);
        assert_eq!(snapshot.wind_speed, 8.0);
        assert_eq!(snapshot.forecast_text, "Partly Cloudy");
    }

    #[tokio::test]
    async fn unreachable_geocoder_yields_none() {
        assert_eq!(unreachable_client().geocode("Denver, CO").await, None);
        assert_eq!(unreachable_client().geocode("   ").await, None);
    }
}
