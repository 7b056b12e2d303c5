//! Exchange integration module
//!
//! Bithumb public REST client and the candle source seam used by the collector.

pub mod client;
pub mod types;

pub use client::*;
pub use types::*;

use crate::data::Candle;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Remote source of historical minute candles
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Up to `count` candles ending at or before `to`, in any order
    async fn fetch_minute_candles(
        &self,
        market: &str,
        to: DateTime<Utc>,
        count: usize,
    ) -> Result<Vec<Candle>>;
}
