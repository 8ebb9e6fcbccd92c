use std::env;

use crate::engine::candidates::DEFAULT_RADIUS_KM;
use crate::error::AppError;

pub const DEFAULT_PUSH_ENDPOINT: &str = "https://exp.host/--/api/v2/push/send";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub event_buffer_size: usize,
    /// Radius around an order's destination inside which drivers receive system claims.
    pub candidate_radius_km: f64,
    pub push_enabled: bool,
    pub push_endpoint: String,
    pub push_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            event_buffer_size: 1024,
            candidate_radius_km: DEFAULT_RADIUS_KM,
            push_enabled: false,
            push_endpoint: DEFAULT_PUSH_ENDPOINT.to_string(),
            push_timeout_ms: 5_000,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let log_format = match env::var("LOG_FORMAT") {
            Ok(raw) if raw.eq_ignore_ascii_case("json") => LogFormat::Json,
            Ok(raw) if raw.eq_ignore_ascii_case("compact") => LogFormat::Compact,
            Ok(raw) => {
                return Err(AppError::Internal(format!(
                    "invalid LOG_FORMAT: {raw}, expected compact or json"
                )));
            }
            Err(_) => defaults.log_format,
        };

        let candidate_radius_km: f64 =
            parse_or_default("CANDIDATE_RADIUS_KM", defaults.candidate_radius_km)?;
        if !candidate_radius_km.is_finite() || candidate_radius_km < 0.0 {
            return Err(AppError::Internal(format!(
                "invalid CANDIDATE_RADIUS_KM: {candidate_radius_km}"
            )));
        }

        let event_buffer_size: usize =
            parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?;
        if event_buffer_size == 0 {
            return Err(AppError::Internal(
                "EVENT_BUFFER_SIZE must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format,
            event_buffer_size,
            candidate_radius_km,
            push_enabled: parse_or_default("PUSH_ENABLED", defaults.push_enabled)?,
            push_endpoint: env::var("PUSH_ENDPOINT").unwrap_or(defaults.push_endpoint),
            push_timeout_ms: parse_or_default("PUSH_TIMEOUT_MS", defaults.push_timeout_ms)?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
