use aitrading_rs::backtest::DEFAULT_INITIAL_AMOUNT;
use aitrading_rs::collector::CollectorConfig;
use aitrading_rs::exchange::{ClientConfig, DEFAULT_BASE_URL, MAX_CANDLES_PER_REQUEST};
use anyhow::{anyhow, Context};
use chrono_tz::Tz;
use dotenv::dotenv;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://aitrading.db?mode=rwc";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bithumb_api_url: String,
    pub api_timeout_secs: u64,
    pub api_timezone: Tz,
    pub collect_batch_size: usize,
    pub collect_request_delay_ms: u64,
    pub collect_error_backoff_ms: u64,
    pub collect_max_failures: u32,
    pub backtest_initial_amount: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bithumb_api_url: DEFAULT_BASE_URL.to_string(),
            api_timeout_secs: 10,
            api_timezone: chrono_tz::Asia::Seoul,
            collect_batch_size: MAX_CANDLES_PER_REQUEST,
            collect_request_delay_ms: 100,
            collect_error_backoff_ms: 1000,
            collect_max_failures: 10,
            backtest_initial_amount: DEFAULT_INITIAL_AMOUNT,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenv().ok();
        let defaults = Self::default();

        let api_timezone = match std::env::var("API_TIMEZONE") {
            Ok(raw) => raw
                .parse::<Tz>()
                .map_err(|e| anyhow!("invalid API_TIMEZONE '{raw}': {e}"))?,
            Err(_) => defaults.api_timezone,
        };

        Ok(Config {
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            bithumb_api_url: std::env::var("BITHUMB_API_URL").unwrap_or(defaults.bithumb_api_url),
            api_timeout_secs: env_parse("API_TIMEOUT_SECS", defaults.api_timeout_secs)?,
            api_timezone,
            collect_batch_size: env_parse("COLLECT_BATCH_SIZE", defaults.collect_batch_size)?
                .clamp(1, MAX_CANDLES_PER_REQUEST),
            collect_request_delay_ms: env_parse(
                "COLLECT_REQUEST_DELAY_MS",
                defaults.collect_request_delay_ms,
            )?,
            collect_error_backoff_ms: env_parse(
                "COLLECT_ERROR_BACKOFF_MS",
                defaults.collect_error_backoff_ms,
            )?,
            collect_max_failures: env_parse("COLLECT_MAX_FAILURES", defaults.collect_max_failures)?,
            backtest_initial_amount: env_parse(
                "BACKTEST_INITIAL_AMOUNT",
                defaults.backtest_initial_amount,
            )?,
        })
    }

    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig::default()
            .with_batch_size(self.collect_batch_size)
            .with_request_delay(Duration::from_millis(self.collect_request_delay_ms))
            .with_error_backoff(Duration::from_millis(self.collect_error_backoff_ms))
            .with_max_consecutive_failures(self.collect_max_failures)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.bithumb_api_url.clone(),
            timeout: Duration::from_secs(self.api_timeout_secs),
            timezone: self.api_timezone,
        }
    }
}

/// Parse an optional variable, keeping `default` when it is unset
fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: '{raw}'")),
        Err(_) => Ok(default),
    }
}
