use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

/// Signing key used when `SECRET_KEY` is unset. Never use it in production.
pub const DEV_SECRET_KEY: &str = "dev-secret-key-change-in-production";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// HMAC key for session cookies.
    pub secret_key: String,
    pub server_host: String,
    pub server_port: u16,
    /// Origins allowed to make credentialed cross-origin requests.
    /// Format: `"http://a:3000,http://b:3001"`.
    pub cors_origins: Vec<String>,
    pub nws_base_url: String,
    pub nws_user_agent: String,
    pub geocoder_url: String,
    /// Timeout for every outbound HTTP call, in seconds.
    pub http_timeout_secs: u64,
    /// Directory holding `watering_model.json` and `health_model.json`.
    pub model_dir: PathBuf,
    pub session_ttl_secs: i64,
    pub session_cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("SECRET_KEY").unwrap_or_else(|_| {
            warn!("SECRET_KEY not set, using the development key");
            DEV_SECRET_KEY.to_owned()
        });

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            secret_key,
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "5001")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            cors_origins: parse_origins(&optional(
                "CORS_ORIGINS",
                "http://localhost:3000,http://localhost:3001",
            )),
            nws_base_url: optional("NWS_BASE_URL", "https://api.weather.gov"),
            nws_user_agent: optional("NWS_USER_AGENT", "PlantCareService (contact@example.com)"),
            geocoder_url: optional("GEOCODER_URL", "https://nominatim.openstreetmap.org/search"),
            http_timeout_secs: optional("HTTP_TIMEOUT_SECS", "10")
                .parse()
                .context("HTTP_TIMEOUT_SECS must be a positive integer")?,
            model_dir: PathBuf::from(optional("MODEL_DIR", "models")),
            session_ttl_secs: optional("SESSION_TTL_SECS", "86400")
                .parse()
                .context("SESSION_TTL_SECS must be an integer")?,
            session_cookie_secure: parse_bool(&optional("SESSION_COOKIE_SECURE", "false"))
                .context("SESSION_COOKIE_SECURE must be true or false")?,
        })
    }
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(anyhow::anyhow!("not a boolean: {other:?}")),
    }
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required env var: {key}"))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_origins_empty() {
        assert!(parse_origins("").is_empty());
        assert!(parse_origins(" , ").is_empty());
    }

    #[test]
    fn parse_origins_trims_entries() {
        let origins = parse_origins("http://localhost:3000/, https://plants.example.com ");
        assert_eq!(
            origins,
            vec!["http://localhost:3000", "https://plants.example.com"]
        );
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert!(parse_bool("true").unwrap());
        assert!(parse_bool("YES").unwrap());
        assert!(parse_bool("1").unwrap());
        assert!(!parse_bool("false").unwrap());
        assert!(!parse_bool("").unwrap());
    }

    #[test]
    fn parse_bool_rejects_garbage() {
        let err = parse_bool("maybe").unwrap_err();
        assert!(err.to_string().contains("not a boolean"));
    }
}
