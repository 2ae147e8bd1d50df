use crate::core::{AppError, Result};
use crate::modules::monitoring::models::MonitoringInterval;
use crate::modules::scoring::models::ScoringMethod;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub mod database;
pub mod server;

pub use database::DatabaseConfig;
pub use server::ServerConfig;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub scoring: ScoringConfig,
    pub events: EventConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Name stamped into `produced_by` of every published event
    pub service_name: String,
}

impl AppConfig {
    /// Tracing directives used when `RUST_LOG` is unset; `LOG_LEVEL` sets the crate's own level
    pub fn default_log_filter(&self) -> String {
        format!(
            "scorewatch={},actix_web=info",
            self.log_level.trim().to_lowercase()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// ML scoring service settings
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub ml_base_url: String,
    pub ml_api_key: Option<String>,
    /// Timeout for the scheduled feature-scoring path
    pub feature_timeout: Duration,
    /// Timeout for the synchronous API-facing calculation path
    pub api_timeout: Duration,
    pub scheduled_method: ScoringMethod,
}

#[derive(Debug, Clone)]
pub struct EventConfig {
    pub schema_version: String,
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    MySql,
    Memory,
}

#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    pub enabled_intervals: Vec<MonitoringInterval>,
    pub tick_every: Duration,
    pub storage: StorageBackend,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: FromStr>(key: &str, default: &str) -> Result<T> {
    var_or(key, default)
        .parse()
        .map_err(|_| AppError::Configuration(format!("Invalid {}", key)))
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let log_format = match var_or("LOG_FORMAT", "pretty").to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" | "text" => LogFormat::Pretty,
            other => {
                return Err(AppError::Configuration(format!(
                    "Invalid LOG_FORMAT '{}'",
                    other
                )))
            }
        };

        let storage = match var_or("STORAGE_BACKEND", "mysql").to_lowercase().as_str() {
            "mysql" => StorageBackend::MySql,
            "memory" => StorageBackend::Memory,
            other => {
                return Err(AppError::Configuration(format!(
                    "Invalid STORAGE_BACKEND '{}'",
                    other
                )))
            }
        };

        let database = match storage {
            StorageBackend::MySql => DatabaseConfig::from_env()?,
            StorageBackend::Memory => DatabaseConfig::unused(),
        };

        let enabled_intervals = var_or("MONITORING_INTERVALS", "daily,weekly,monthly")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<MonitoringInterval>()
                    .map_err(AppError::Configuration)
            })
            .collect::<Result<Vec<_>>>()?;

        let config = Config {
            app: AppConfig {
                env: var_or("APP_ENV", "development"),
                log_level: var_or("LOG_LEVEL", "info"),
                log_format,
                service_name: var_or("SERVICE_NAME", "credit-score-service"),
            },
            database,
            server: ServerConfig::from_env()?,
            scoring: ScoringConfig {
                ml_base_url: var_or("ML_SCORING_URL", "http://localhost:8000"),
                ml_api_key: env::var("ML_SCORING_API_KEY").ok(),
                feature_timeout: Duration::from_secs(parse_var(
                    "ML_FEATURE_TIMEOUT_SECS",
                    "10",
                )?),
                api_timeout: Duration::from_secs(parse_var("ML_API_TIMEOUT_SECS", "30")?),
                scheduled_method: var_or("SCHEDULED_SCORING_METHOD", "hybrid")
                    .parse()
                    .map_err(AppError::Configuration)?,
            },
            events: EventConfig {
                schema_version: var_or("EVENT_SCHEMA_VERSION", "1.0"),
                channel_capacity: parse_var("EVENT_CHANNEL_CAPACITY", "1024")?,
            },
            monitoring: MonitoringConfig {
                enabled_intervals,
                tick_every: Duration::from_secs(parse_var("MONITORING_TICK_SECS", "3600")?),
                storage,
            },
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.app.service_name.trim().is_empty() {
            return Err(AppError::Configuration(
                "SERVICE_NAME must not be empty".to_string(),
            ));
        }

        if self.scoring.feature_timeout.is_zero() || self.scoring.api_timeout.is_zero() {
            return Err(AppError::Configuration(
                "ML timeouts must be greater than 0".to_string(),
            ));
        }

        if self.events.channel_capacity == 0 {
            return Err(AppError::Configuration(
                "Event channel capacity must be greater than 0".to_string(),
            ));
        }

        if self.monitoring.tick_every.is_zero() {
            return Err(AppError::Configuration(
                "Monitoring tick must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
