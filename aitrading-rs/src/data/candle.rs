//! OHLCV candle data structures

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Two candles of the same market closer than this are the same candle.
pub const DUPLICATE_WINDOW_SECS: i64 = 60;

/// Timeframe label stored with collected minute candles
pub const MINUTE_TIMEFRAME: &str = "1m";

/// OHLCV candle data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Market code (e.g., "KRW-BTC")
    pub market: String,
    /// Candle start time
    pub timestamp: DateTime<Utc>,
    /// Opening price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Accumulated trade volume
    pub volume: f64,
    /// Accumulated trade value (quote currency)
    pub acc_trade_value: f64,
    /// Timeframe (e.g., "1m")
    pub timeframe: String,
}

impl Candle {
    /// Create a new minute candle
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        market: impl Into<String>,
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        acc_trade_value: f64,
    ) -> Self {
        Self {
            market: market.into(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            acc_trade_value,
            timeframe: MINUTE_TIMEFRAME.to_string(),
        }
    }

    /// Override the timeframe label
    pub fn with_timeframe(mut self, timeframe: impl Into<String>) -> Self {
        self.timeframe = timeframe.into();
        self
    }

    /// Get typical price (HLC/3)
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Typical price weighted by volume
    pub fn money_flow(&self) -> f64 {
        self.typical_price() * self.volume
    }

    /// True when both candles belong to the same market and sit inside the duplicate window
    pub fn is_duplicate_of(&self, other: &Candle) -> bool {
        self.market == other.market && within_duplicate_window(self.timestamp, other.timestamp)
    }
}

/// `|a - b| < 60s`
pub fn within_duplicate_window(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    (a - b).num_milliseconds().abs() < Duration::seconds(DUPLICATE_WINDOW_SECS).num_milliseconds()
}

/// Extract close prices in order
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}
