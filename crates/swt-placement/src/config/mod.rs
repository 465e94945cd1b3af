use std::env;
use std::fmt;
use std::time::Duration;

use crate::placement::{CapacityPolicy, LedgerPolicy, DEFAULT_VERIFICATION_CODE};

const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;

/// Distinguishes runtime behavior for different stages of the console.
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
    pub telemetry: TelemetryConfig,
    pub ledger: LedgerPolicy,
    pub content: ContentConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );
        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let capacity = match env::var("PLACEMENT_CAPACITY_POLICY") {
            Ok(value) => value
                .parse::<CapacityPolicy>()
                .map_err(|_| ConfigError::InvalidCapacityPolicy(value))?,
            Err(_) => CapacityPolicy::default(),
        };
        let enforce_eligibility = match env::var("PLACEMENT_ENFORCE_ELIGIBILITY") {
            Ok(value) => parse_bool("PLACEMENT_ENFORCE_ELIGIBILITY", &value)?,
            Err(_) => true,
        };
        let verification_code = env::var("PLACEMENT_VERIFICATION_CODE")
            .ok()
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .unwrap_or_else(|| DEFAULT_VERIFICATION_CODE.to_string());

        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        let poll_secs = match env::var("CONTENT_POLL_INTERVAL_SECS") {
            Ok(value) => value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidPollInterval(value))?,
            Err(_) => DEFAULT_POLL_INTERVAL_SECS,
        };

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            ledger: LedgerPolicy {
                capacity,
                enforce_eligibility,
                verification_code,
            },
            content: ContentConfig {
                api_key,
                poll_interval: Duration::from_secs(poll_secs),
            },
        })
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Credentials and pacing for the generative content service.
#[derive(Clone)]
pub struct ContentConfig {
    pub api_key: Option<String>,
    pub poll_interval: Duration,
}

impl ContentConfig {
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }
}

impl fmt::Debug for ContentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    InvalidCapacityPolicy(String),
    InvalidBool { variable: &'static str, value: String },
    InvalidPollInterval(String),
    MissingApiKey,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidCapacityPolicy(value) => write!(
                f,
                "PLACEMENT_CAPACITY_POLICY must be 'enforced' or 'soft', got '{}'",
                value
            ),
            ConfigError::InvalidBool { variable, value } => {
                write!(f, "{} must be true or false, got '{}'", variable, value)
            }
            ConfigError::InvalidPollInterval(value) => write!(
                f,
                "CONTENT_POLL_INTERVAL_SECS must be a positive number of seconds, got '{}'",
                value
            ),
            ConfigError::MissingApiKey => {
                write!(f, "GEMINI_API_KEY (or API_KEY) must be set to generate content")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn parse_bool(variable: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            variable,
            value: value.to_string(),
        }),
    }
}
