//! Bithumb public REST client

use crate::data::{Candle, MINUTE_TIMEFRAME};
use crate::exchange::{
    timeframe_minutes, ApiErrorBody, CandleResponse, CandleSource, MarketInfo, SUPPORTED_UNITS,
};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Default Bithumb v1 endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.bithumb.com/v1";

/// Largest `count` the candle endpoint accepts
pub const MAX_CANDLES_PER_REQUEST: usize = 200;

/// Format of the `to` query parameter, in exchange local time
pub const REQUEST_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Client settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Per-request transport timeout
    pub timeout: Duration,
    /// Zone the `to` parameter is rendered in
    pub timezone: Tz,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            timezone: chrono_tz::Asia::Seoul,
        }
    }
}

/// Bithumb client
#[derive(Debug, Clone)]
pub struct BithumbClient {
    client: Client,
    config: ClientConfig,
}

impl BithumbClient {
    /// Create new client
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Render an instant as the `to` parameter
    pub fn format_to(&self, to: DateTime<Utc>) -> String {
        to.with_timezone(&self.config.timezone)
            .format(REQUEST_TIME_FORMAT)
            .to_string()
    }

    /// Raw `unit`-minute candles ending at `to` (latest when `None`), newest first
    pub async fn fetch_candle_responses(
        &self,
        market: &str,
        unit: u32,
        to: Option<DateTime<Utc>>,
        count: usize,
    ) -> Result<Vec<CandleResponse>> {
        if !SUPPORTED_UNITS.contains(&unit) {
            return Err(Error::Config(format!("unsupported candle unit: {unit}")));
        }
        let endpoint = format!("/candles/minutes/{unit}");
        let count = count.clamp(1, MAX_CANDLES_PER_REQUEST).to_string();
        let to = to.map(|to| self.format_to(to));

        let mut query = vec![("market", market), ("count", count.as_str())];
        if let Some(to) = &to {
            query.push(("to", to.as_str()));
        }
        self.get(&endpoint, &query).await
    }

    /// Candles of a timeframe label (`"1m"` .. `"4h"`), newest first
    pub async fn fetch_candles(
        &self,
        market: &str,
        timeframe: &str,
        to: Option<DateTime<Utc>>,
        count: usize,
    ) -> Result<Vec<Candle>> {
        let unit = timeframe_minutes(timeframe)
            .ok_or_else(|| Error::Config(format!("unsupported timeframe: '{timeframe}'")))?;
        self.fetch_candle_responses(market, unit, to, count)
            .await?
            .into_iter()
            .map(|mut response| {
                response.unit.get_or_insert(unit);
                response.into_candle()
            })
            .collect()
    }

    /// All listed markets
    pub async fn fetch_markets(&self) -> Result<Vec<MarketInfo>> {
        self.get("/market/all", &[]).await
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        debug!(url = %url, ?query, "GET");

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        // error bodies may arrive with any status
        if let Ok(body) = serde_json::from_str::<ApiErrorBody>(&text) {
            let err = Error::from(body);
            warn!(%status, error = %err, "Bithumb API error");
            return Err(err);
        }
        if !status.is_success() {
            return Err(Error::Server {
                code: i64::from(status.as_u16()),
                message: truncate(&text, 200),
            });
        }

        serde_json::from_str::<T>(&text).map_err(|e| {
            Error::Decoding(format!(
                "failed to parse Bithumb response: {}. Body: {}",
                e,
                truncate(&text, 200)
            ))
        })
    }
}

#[async_trait]
impl CandleSource for BithumbClient {
    async fn fetch_minute_candles(
        &self,
        market: &str,
        to: DateTime<Utc>,
        count: usize,
    ) -> Result<Vec<Candle>> {
        self.fetch_candles(market, MINUTE_TIMEFRAME, Some(to), count)
            .await
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
