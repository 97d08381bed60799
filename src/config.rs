use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::EtlError;
use crate::fetch::RetryPolicy;

pub const DEFAULT_API_URL: &str = "https://api.frankfurter.app/latest?from=USD";
pub const DEFAULT_CSV_PATH: &str = "exchange_rates.csv";
pub const DEFAULT_DB_PATH: &str = "exchange_rates.db";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything one pipeline run needs to know about the outside world.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub csv_path: PathBuf,
    pub db_path: PathBuf,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Reads `RATES_*` variables from the process environment.
    pub fn from_env() -> Result<Self, EtlError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, EtlError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(url) = lookup("RATES_API_URL") {
            config.api_url = url;
        }
        if let Some(path) = lookup("RATES_CSV_PATH") {
            config.csv_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("RATES_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "RATES_HTTP_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_var::<u32, _>(&lookup, "RATES_MAX_RETRIES")? {
            config.retry.max_retries = retries;
        }
        if let Some(factor) = parse_var::<f64, _>(&lookup, "RATES_BACKOFF_FACTOR")? {
            if !factor.is_finite() || factor < 0.0 {
                return Err(EtlError::Config(format!(
                    "RATES_BACKOFF_FACTOR must be a non-negative number, got {factor}"
                )));
            }
            config.retry.backoff_factor = factor;
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, EtlError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| EtlError::Config(format!("{key}={value:?}: {e}"))),
    }
}
