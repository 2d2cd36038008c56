use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use repitis_algo::{MemoryError, MemoryParams};
use thiserror::Error;

use crate::db::retry::RetryPolicy;
use crate::services::mastery::MasteryPolicy;
use crate::services::session::SessionPolicy;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_DATABASE_URL: &str = "sqlite:./data/repitis.db?mode=rwc";
const DEFAULT_UTC_OFFSET_MINUTES: i32 = -360;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid memory parameters: {0}")]
    MemoryParams(#[from] MemoryError),
    #[error("failed to read {path}: {source}")]
    ParamsFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid memory parameters file: {0}")]
    ParamsJson(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    /// Set when ENABLE_FILE_LOGS is on
    pub log_dir: Option<PathBuf>,
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub catalog_path: Option<PathBuf>,
    /// Without a secret, bearer tokens are decoded but not verified.
    pub jwt_secret: Option<String>,
    pub memory_params: MemoryParams,
    pub mastery: MasteryPolicy,
    pub session: SessionPolicy,
    /// Fixed offset used to cut calendar days for streaks and daily counters
    pub day_offset: FixedOffset,
    pub storage_retry: RetryPolicy,
    pub stats_cache_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: DEFAULT_PORT,
            log_level: "info".to_string(),
            log_dir: None,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            database_max_connections: 5,
            redis_url: None,
            catalog_path: None,
            jwt_secret: None,
            memory_params: MemoryParams::default(),
            mastery: MasteryPolicy::default(),
            session: SessionPolicy::default(),
            day_offset: default_day_offset(),
            storage_retry: RetryPolicy::default(),
            stats_cache_ttl: Duration::from_secs(30),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = env_parse("HOST", defaults.host);
        let port = env_parse("PORT", defaults.port);
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let log_dir = if env_bool("ENABLE_FILE_LOGS").unwrap_or(false) {
            Some(PathBuf::from(
                env_string("LOG_DIR").unwrap_or_else(|| "./logs".to_string()),
            ))
        } else {
            None
        };

        let memory_params = load_memory_params()?;

        let mastery = MasteryPolicy {
            min_stability_days: env_parse(
                "MASTERY_MIN_STABILITY_DAYS",
                defaults.mastery.min_stability_days,
            ),
            min_reviews: env_parse("MASTERY_MIN_REVIEWS", defaults.mastery.min_reviews),
        };

        let session = SessionPolicy {
            new_cards_per_sitting: env_parse(
                "NEW_CARDS_PER_SITTING",
                defaults.session.new_cards_per_sitting,
            ),
            new_cards_per_day: env_parse("NEW_CARDS_PER_DAY", defaults.session.new_cards_per_day),
            idle_timeout: Duration::from_secs(env_parse(
                "SESSION_IDLE_TIMEOUT_SECS",
                defaults.session.idle_timeout.as_secs(),
            )),
        };

        let offset_minutes: i32 = env_parse("UTC_OFFSET_MINUTES", DEFAULT_UTC_OFFSET_MINUTES);
        let day_offset = FixedOffset::east_opt(offset_minutes * 60).unwrap_or_else(|| {
            tracing::warn!(offset_minutes, "UTC_OFFSET_MINUTES out of range, using default");
            default_day_offset()
        });

        let storage_retry = RetryPolicy {
            attempts: env_parse("STORAGE_RETRY_ATTEMPTS", defaults.storage_retry.attempts).max(1),
            delay: Duration::from_millis(env_parse(
                "STORAGE_RETRY_DELAY_MS",
                defaults.storage_retry.delay.as_millis() as u64,
            )),
        };

        Ok(Self {
            host,
            port,
            log_level,
            log_dir,
            database_url: env_string("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections: env_parse(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )
            .max(1),
            redis_url: env_string("REDIS_URL"),
            catalog_path: env_string("CATALOG_PATH").map(PathBuf::from),
            jwt_secret: env_string("JWT_SECRET"),
            memory_params,
            mastery,
            session,
            day_offset,
            storage_retry,
            stats_cache_ttl: Duration::from_secs(env_parse(
                "STATS_CACHE_TTL_SECS",
                defaults.stats_cache_ttl.as_secs(),
            )),
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// False when bearer tokens are decoded without a signature check.
    pub fn verifies_tokens(&self) -> bool {
        self.jwt_secret.is_some()
    }
}

/// FSRS_PARAMS_PATH wins over FSRS_WEIGHTS; DESIRED_RETENTION overrides either.
fn load_memory_params() -> Result<MemoryParams, ConfigError> {
    let mut params = if let Some(path) = env_string("FSRS_PARAMS_PATH") {
        let path = PathBuf::from(path);
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::ParamsFile {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str::<MemoryParams>(&raw)?
    } else if let Some(raw) = env_string("FSRS_WEIGHTS") {
        let weights = parse_weights(&raw)?;
        MemoryParams::from_weights(&weights)?
    } else {
        MemoryParams::default()
    };

    if let Some(raw) = env_string("DESIRED_RETENTION") {
        match raw.parse::<f64>() {
            Ok(target) => params = params.with_target_retrievability(target),
            Err(_) => tracing::warn!(value = %raw, "DESIRED_RETENTION is not a number, ignoring"),
        }
    }

    params.validate()?;
    Ok(params)
}

fn parse_weights(raw: &str) -> Result<Vec<f64>, MemoryError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<f64>()
                .map_err(|_| MemoryError::InvalidParams(format!("weight {part:?} is not a number")))
        })
        .collect()
}

fn default_day_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_UTC_OFFSET_MINUTES * 60).unwrap_or_else(|| Utc.fix())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env_string(key) {
        Some(raw) => raw.parse::<T>().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "invalid value, using default");
            default
        }),
        None => default,
    }
}

fn env_bool(key: &str) -> Option<bool> {
    let value = env_string(key)?;
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_weights() {
        let weights = parse_weights("0.4, 1.2,3.1 ,15.5").unwrap();
        assert_eq!(weights, vec![0.4, 1.2, 3.1, 15.5]);
        assert!(parse_weights("0.4,abc").is_err());
    }

    #[test]
    fn test_default_day_offset_is_utc_minus_six() {
        assert_eq!(default_day_offset().local_minus_utc(), -6 * 3600);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:8000");
        assert!(config.jwt_secret.is_none());
        assert!(!config.verifies_tokens());
        assert!(config.memory_params.validate().is_ok());
        assert_eq!(config.session.new_cards_per_sitting, 10);
    }

    #[test]
    fn test_secret_enables_token_verification() {
        let config = Config {
            jwt_secret: Some("s3cret".to_string()),
            ..Config::default()
        };
        assert!(config.verifies_tokens());
    }
}
