//! Candle store abstraction and the in-memory implementation

use crate::data::{Candle, DUPLICATE_WINDOW_SECS};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound::Excluded;
use tokio::sync::RwLock;

/// Durable candle storage keyed by `(market, timestamp)`.
///
/// Implementations must keep at most one candle per market inside any
/// 60-second window and must apply each `insert_batch` call as a whole:
/// either every accepted candle becomes visible or none does.
#[async_trait]
pub trait CandleStore: Send + Sync {
    /// Insert one candle, returns `false` if it was a duplicate
    async fn insert(&self, candle: Candle) -> Result<bool> {
        Ok(self.insert_batch(vec![candle]).await? == 1)
    }

    /// Insert candles atomically, skipping duplicates. Returns how many were stored.
    async fn insert_batch(&self, candles: Vec<Candle>) -> Result<usize>;

    /// Candles of `market` with `start <= timestamp <= end`, oldest first
    async fn query(
        &self,
        market: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Candle>>;

    /// Number of stored candles for a market
    async fn count(&self, market: &str) -> Result<u64>;

    /// Oldest stored timestamp
    async fn first_timestamp(&self, market: &str) -> Result<Option<DateTime<Utc>>>;

    /// Newest stored timestamp
    async fn last_timestamp(&self, market: &str) -> Result<Option<DateTime<Utc>>>;

    /// Markets with any data, sorted
    async fn list_markets(&self) -> Result<Vec<String>>;

    /// Delete candles with `start <= timestamp <= end`
    async fn delete_range(
        &self,
        market: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64>;

    /// Delete every candle of a market
    async fn delete_all(&self, market: &str) -> Result<u64>;

    /// Delete the `count` oldest candles of a market
    async fn delete_oldest(&self, market: &str, count: u64) -> Result<u64>;

    /// Delete the candles of every market
    async fn delete_all_markets(&self) -> Result<u64>;
}

/// Reject malformed candles before any of the batch is applied
pub fn validate_batch(candles: &[Candle]) -> Result<()> {
    for candle in candles {
        if candle.market.is_empty() {
            return Err(Error::Store(format!(
                "candle at {} has an empty market code",
                candle.timestamp
            )));
        }
        let values = [candle.open, candle.high, candle.low, candle.close, candle.volume];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::Store(format!(
                "candle {} at {} has a non-finite value",
                candle.market, candle.timestamp
            )));
        }
        let prices = [candle.open, candle.high, candle.low, candle.close];
        if prices.iter().any(|p| *p <= 0.0) || candle.volume < 0.0 {
            return Err(Error::Store(format!(
                "candle {} at {} has a non-positive price or negative volume",
                candle.market, candle.timestamp
            )));
        }
    }
    Ok(())
}

/// In-memory candle storage
#[derive(Debug, Default)]
pub struct MemoryCandleStore {
    /// Candles by market, ordered by timestamp
    candles: RwLock<HashMap<String, BTreeMap<DateTime<Utc>, Candle>>>,
}

impl MemoryCandleStore {
    /// Create new storage
    pub fn new() -> Self {
        Self {
            candles: RwLock::new(HashMap::new()),
        }
    }

    /// Whether any stored candle of the same market sits inside the duplicate window
    fn has_neighbour(series: &BTreeMap<DateTime<Utc>, Candle>, timestamp: DateTime<Utc>) -> bool {
        let window = Duration::seconds(DUPLICATE_WINDOW_SECS);
        series
            .range((Excluded(timestamp - window), Excluded(timestamp + window)))
            .next()
            .is_some()
    }

    /// Get number of stored candles across all markets
    pub async fn len(&self) -> usize {
        self.candles.read().await.values().map(|s| s.len()).sum()
    }

    /// Check if storage is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CandleStore for MemoryCandleStore {
    async fn insert_batch(&self, candles: Vec<Candle>) -> Result<usize> {
        validate_batch(&candles)?;

        let mut guard = self.candles.write().await;
        let mut inserted = 0;
        for candle in candles {
            let series = guard.entry(candle.market.clone()).or_default();
            if Self::has_neighbour(series, candle.timestamp) {
                continue;
            }
            series.insert(candle.timestamp, candle);
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn query(
        &self,
        market: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Candle>> {
        let guard = self.candles.read().await;
        let Some(series) = guard.get(market) else {
            return Ok(Vec::new());
        };
        Ok(series
            .values()
            .filter(|c| start.map_or(true, |s| c.timestamp >= s))
            .filter(|c| end.map_or(true, |e| c.timestamp <= e))
            .cloned()
            .collect())
    }

    async fn count(&self, market: &str) -> Result<u64> {
        let guard = self.candles.read().await;
        Ok(guard.get(market).map_or(0, |s| s.len() as u64))
    }

    async fn first_timestamp(&self, market: &str) -> Result<Option<DateTime<Utc>>> {
        let guard = self.candles.read().await;
        Ok(guard.get(market).and_then(|s| s.keys().next().copied()))
    }

    async fn last_timestamp(&self, market: &str) -> Result<Option<DateTime<Utc>>> {
        let guard = self.candles.read().await;
        Ok(guard.get(market).and_then(|s| s.keys().next_back().copied()))
    }

    async fn list_markets(&self) -> Result<Vec<String>> {
        let guard = self.candles.read().await;
        let mut markets: Vec<String> = guard
            .iter()
            .filter(|(_, s)| !s.is_empty())
            .map(|(m, _)| m.clone())
            .collect();
        markets.sort();
        Ok(markets)
    }

    async fn delete_range(
        &self,
        market: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64> {
        let mut guard = self.candles.write().await;
        let Some(series) = guard.get_mut(market) else {
            return Ok(0);
        };
        let before = series.len();
        series.retain(|ts, _| *ts < start || *ts > end);
        let removed = (before - series.len()) as u64;
        if series.is_empty() {
            guard.remove(market);
        }
        Ok(removed)
    }

    async fn delete_all(&self, market: &str) -> Result<u64> {
        let mut guard = self.candles.write().await;
        Ok(guard.remove(market).map_or(0, |s| s.len() as u64))
    }

    async fn delete_oldest(&self, market: &str, count: u64) -> Result<u64> {
        let mut guard = self.candles.write().await;
        let Some(series) = guard.get_mut(market) else {
            return Ok(0);
        };
        let mut removed = 0;
        while removed < count {
            if series.pop_first().is_none() {
                break;
            }
            removed += 1;
        }
        if series.is_empty() {
            guard.remove(market);
        }
        Ok(removed)
    }

    async fn delete_all_markets(&self) -> Result<u64> {
        let mut guard = self.candles.write().await;
        let removed = guard.values().map(|s| s.len() as u64).sum();
        guard.clear();
        Ok(removed)
    }
}

/// True when no two neighbouring candles are duplicates of each other.
/// Expects candles ordered by timestamp, as `query` returns them.
pub fn is_deduplicated(candles: &[Candle]) -> bool {
    candles.windows(2).all(|pair| !pair[0].is_duplicate_of(&pair[1]))
}
