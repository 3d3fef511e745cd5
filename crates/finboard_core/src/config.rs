//! Process configuration.
//!
//! # Responsibility
//! - Read deployment settings from environment-style key/value lookups.
//! - Fail startup with the offending variable named instead of guessing.
//!
//! # Invariants
//! - Unset variables take documented defaults; set-but-invalid ones error.
//! - Durations are configured in milliseconds and must be positive.

use crate::logging::default_log_level;
use crate::model::amount::AmountMode;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_DB_PATH: &str = "FINBOARD_DB_PATH";
pub const ENV_PORT: &str = "PORT";
pub const ENV_BIND: &str = "FINBOARD_BIND";
pub const ENV_LOG_LEVEL: &str = "FINBOARD_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "FINBOARD_LOG_DIR";
pub const ENV_AMOUNT_MODE: &str = "FINBOARD_AMOUNT_MODE";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "FINBOARD_REQUEST_TIMEOUT_MS";
pub const ENV_SHUTDOWN_GRACE_MS: &str = "FINBOARD_SHUTDOWN_GRACE_MS";
pub const ENV_SCHEDULER_TICK_MS: &str = "FINBOARD_SCHEDULER_TICK_MS";

// Relative to the working directory so data survives reboots.
const DEFAULT_DB_PATH: &str = "data/finboard.sqlite3";
const DEFAULT_PORT: u16 = 10_000;
const DEFAULT_BIND: &str = "0.0.0.0";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 5_000;
const DEFAULT_SCHEDULER_TICK_MS: u64 = 20_000;
// Longer ticks could step over a whole trigger minute.
const MAX_SCHEDULER_TICK_MS: u64 = 59_000;

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {}=`{}`: {}", self.key, self.value, self.reason)
    }
}

impl Error for ConfigError {}

/// Settings for one server process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub bind: String,
    pub port: u16,
    pub log_level: String,
    /// `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
    pub amount_mode: AmountMode,
    pub request_timeout: Duration,
    pub shutdown_grace: Duration,
    pub scheduler_tick: Duration,
}

impl AppConfig {
    /// Loads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = get(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let port = match get(ENV_PORT) {
            None => DEFAULT_PORT,
            Some(value) => value
                .parse::<u16>()
                .map_err(|err| invalid(ENV_PORT, &value, err.to_string()))?,
        };

        let log_dir = match get(ENV_LOG_DIR) {
            None => None,
            Some(value) if Path::new(&value).is_absolute() => Some(PathBuf::from(value)),
            Some(value) => {
                return Err(invalid(ENV_LOG_DIR, &value, "must be an absolute path"));
            }
        };

        let amount_mode = match get(ENV_AMOUNT_MODE) {
            None => AmountMode::default(),
            Some(value) => AmountMode::parse(&value)
                .ok_or_else(|| invalid(ENV_AMOUNT_MODE, &value, "expected integer|decimal"))?,
        };

        let scheduler_tick =
            millis(&get, ENV_SCHEDULER_TICK_MS, DEFAULT_SCHEDULER_TICK_MS)?;
        if scheduler_tick > Duration::from_millis(MAX_SCHEDULER_TICK_MS) {
            return Err(invalid(
                ENV_SCHEDULER_TICK_MS,
                &scheduler_tick.as_millis().to_string(),
                format!("must not exceed {MAX_SCHEDULER_TICK_MS}"),
            ));
        }

        Ok(Self {
            db_path,
            bind: get(ENV_BIND).unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port,
            log_level: get(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string()),
            log_dir,
            amount_mode,
            request_timeout: millis(&get, ENV_REQUEST_TIMEOUT_MS, DEFAULT_REQUEST_TIMEOUT_MS)?,
            shutdown_grace: millis(&get, ENV_SHUTDOWN_GRACE_MS, DEFAULT_SHUTDOWN_GRACE_MS)?,
            scheduler_tick,
        })
    }

    /// `bind:port` socket address string.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn millis(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default_ms: u64,
) -> Result<Duration, ConfigError> {
    let Some(value) = get(key) else {
        return Ok(Duration::from_millis(default_ms));
    };
    match value.parse::<u64>() {
        Ok(0) => Err(invalid(key, &value, "must be greater than zero")),
        Ok(ms) => Ok(Duration::from_millis(ms)),
        Err(err) => Err(invalid(key, &value, err.to_string())),
    }
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ENV_AMOUNT_MODE, ENV_LOG_DIR, ENV_PORT, ENV_REQUEST_TIMEOUT_MS};
    use crate::model::amount::AmountMode;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, super::ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 10_000);
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.amount_mode, AmountMode::Integer);
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.shutdown_grace, Duration::from_secs(5));
        assert_eq!(config.scheduler_tick, Duration::from_secs(20));
        assert!(config.log_dir.is_none());
        assert_eq!(config.db_path, PathBuf::from("data/finboard.sqlite3"));
        assert!(config.db_path.is_relative());
        assert_eq!(config.listen_addr(), "0.0.0.0:10000");
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = load(&[
            (ENV_PORT, "8080"),
            (ENV_AMOUNT_MODE, "Decimal"),
            (ENV_REQUEST_TIMEOUT_MS, "250"),
            ("FINBOARD_DB_PATH", "/var/lib/finboard/data.sqlite3"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.amount_mode, AmountMode::Decimal);
        assert_eq!(config.request_timeout, Duration::from_millis(250));
        assert_eq!(
            config.db_path.to_str(),
            Some("/var/lib/finboard/data.sqlite3")
        );
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = load(&[(ENV_PORT, "  ")]).unwrap();
        assert_eq!(config.port, 10_000);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = load(&[(ENV_PORT, "eighty")]).unwrap_err();
        assert_eq!(err.key, ENV_PORT);

        let err = load(&[(ENV_AMOUNT_MODE, "cents")]).unwrap_err();
        assert_eq!(err.key, ENV_AMOUNT_MODE);
        assert!(err.to_string().contains("FINBOARD_AMOUNT_MODE"));

        let err = load(&[(ENV_REQUEST_TIMEOUT_MS, "0")]).unwrap_err();
        assert_eq!(err.key, ENV_REQUEST_TIMEOUT_MS);

        let err = load(&[(ENV_LOG_DIR, "logs")]).unwrap_err();
        assert_eq!(err.key, ENV_LOG_DIR);

        let err = load(&[("FINBOARD_SCHEDULER_TICK_MS", "60000")]).unwrap_err();
        assert_eq!(err.key, "FINBOARD_SCHEDULER_TICK_MS");
    }
}
