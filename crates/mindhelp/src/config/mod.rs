use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use chrono::FixedOffset;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub assessment: AssessmentConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let assessment = AssessmentConfig::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            assessment,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Static assessment settings, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentConfig {
    pub wellness_time_limit_secs: u32,
    pub certification_time_limit_secs: u32,
    /// Fraction of certification questions that must be answered correctly.
    pub passing_score: f64,
    /// Directory holding replacement question CSVs; the embedded bank is used when unset.
    pub question_bank_dir: Option<PathBuf>,
    /// JSON file backing per-user storage; in-memory storage is used when unset.
    pub store_path: Option<PathBuf>,
    /// Offset from UTC, in minutes, that decides the calendar day of booked sessions.
    pub session_utc_offset_minutes: i32,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            wellness_time_limit_secs: 300,
            certification_time_limit_secs: 15 * 60,
            passing_score: 0.8,
            question_bank_dir: None,
            store_path: None,
            session_utc_offset_minutes: 0,
        }
    }
}

impl AssessmentConfig {
    /// Offset used for "today" and "tomorrow" when booking sessions. Falls back to UTC.
    pub fn session_utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.session_utc_offset_minutes * 60)
            .unwrap_or_else(|| chrono::Offset::fix(&chrono::Utc))
    }

    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let wellness_time_limit_secs = parse_seconds(
            "APP_WELLNESS_TIME_LIMIT_SECS",
            defaults.wellness_time_limit_secs,
        )?;
        let certification_time_limit_secs = parse_seconds(
            "APP_CERTIFICATION_TIME_LIMIT_SECS",
            defaults.certification_time_limit_secs,
        )?;

        let passing_score = match env::var("APP_PASSING_SCORE") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| (0.0..=1.0).contains(value))
                .ok_or(ConfigError::InvalidPassingScore { value: raw })?,
            Err(_) => defaults.passing_score,
        };

        let question_bank_dir = non_empty_var("APP_QUESTION_BANK_DIR").map(PathBuf::from);
        let store_path = non_empty_var("APP_STORE_PATH").map(PathBuf::from);

        let session_utc_offset_minutes = match env::var("APP_SESSION_UTC_OFFSET_MINUTES") {
            Ok(raw) => raw
                .trim()
                .parse::<i32>()
                .ok()
                .filter(|minutes| minutes.abs() <= MAX_UTC_OFFSET_MINUTES)
                .ok_or(ConfigError::InvalidUtcOffset { value: raw })?,
            Err(_) => defaults.session_utc_offset_minutes,
        };

        Ok(Self {
            wellness_time_limit_secs,
            certification_time_limit_secs,
            passing_score,
            question_bank_dir,
            store_path,
            session_utc_offset_minutes,
        })
    }
}

const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

fn parse_seconds(name: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidTimeLimit { variable: name }),
        Err(_) => Ok(default),
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeLimit { variable: &'static str },
    InvalidPassingScore { value: String },
    InvalidUtcOffset { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeLimit { variable } => {
                write!(f, "{variable} must be a positive number of seconds")
            }
            ConfigError::InvalidPassingScore { value } => write!(
                f,
                "APP_PASSING_SCORE must be a fraction between 0 and 1 (got '{value}')"
            ),
            ConfigError::InvalidUtcOffset { value } => write!(
                f,
                "APP_SESSION_UTC_OFFSET_MINUTES must be whole minutes within +/-840 (got '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeLimit { .. }
            | ConfigError::InvalidPassingScore { .. }
            | ConfigError::InvalidUtcOffset { .. } => None,
        }
    }
}
