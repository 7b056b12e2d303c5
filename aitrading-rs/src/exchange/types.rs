//! Bithumb v1 REST payloads

use crate::data::Candle;
use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Candle units served by `GET /candles/minutes/{unit}`
pub const SUPPORTED_UNITS: [u32; 8] = [1, 3, 5, 10, 15, 30, 60, 240];

/// Minutes per candle for a timeframe label such as `"5m"` or `"4h"`
pub fn timeframe_minutes(timeframe: &str) -> Option<u32> {
    match timeframe.to_ascii_lowercase().as_str() {
        "1m" => Some(1),
        "3m" => Some(3),
        "5m" => Some(5),
        "10m" => Some(10),
        "15m" => Some(15),
        "30m" => Some(30),
        "1h" => Some(60),
        "4h" => Some(240),
        _ => None,
    }
}

/// Timeframe label for a candle unit
pub fn unit_timeframe(unit: u32) -> String {
    match unit {
        60 => "1h".to_string(),
        240 => "4h".to_string(),
        n => format!("{n}m"),
    }
}

/// One candle as returned by `GET /candles/minutes/{unit}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleResponse {
    pub market: String,
    /// Candle start, UTC, `yyyy-MM-ddTHH:mm:ss` with optional fraction
    pub candle_date_time_utc: String,
    /// Candle start, exchange local time
    pub candle_date_time_kst: String,
    pub opening_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    /// Close price
    pub trade_price: f64,
    /// Last trade time, epoch millis
    pub timestamp: i64,
    pub candle_acc_trade_price: f64,
    pub candle_acc_trade_volume: f64,
    /// Minutes per candle
    #[serde(default)]
    pub unit: Option<u32>,
}

impl CandleResponse {
    /// Candle start time
    pub fn start_time(&self) -> Result<DateTime<Utc>> {
        parse_utc_timestamp(&self.candle_date_time_utc)
    }

    /// Convert into the stored candle form
    pub fn into_candle(self) -> Result<Candle> {
        let timestamp = self.start_time()?;
        let timeframe = unit_timeframe(self.unit.unwrap_or(1));
        Ok(Candle::new(
            self.market,
            timestamp,
            self.opening_price,
            self.high_price,
            self.low_price,
            self.trade_price,
            self.candle_acc_trade_volume,
            self.candle_acc_trade_price,
        )
        .with_timeframe(timeframe))
    }
}

/// Entry of `GET /market/all`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketInfo {
    pub market: String,
    pub korean_name: String,
    pub english_name: String,
    #[serde(default)]
    pub market_warning: Option<String>,
}

/// `{"error": {"name": ..., "message": ...}}`
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    /// Usually an integer code; anything else maps to 0
    pub name: serde_json::Value,
    #[serde(default)]
    pub message: String,
}

impl From<ApiErrorBody> for Error {
    fn from(body: ApiErrorBody) -> Self {
        let code = match &body.error.name {
            serde_json::Value::Number(n) => n.as_i64().unwrap_or(0),
            _ => 0,
        };
        Error::Server {
            code,
            message: body.error.message,
        }
    }
}

/// Parse `candle_date_time_utc`; accepts RFC 3339 strings as well
pub fn parse_utc_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Decoding(format!("invalid candle time '{raw}': {e}")))
}
