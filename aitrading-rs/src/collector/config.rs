//! Collector settings

use crate::exchange::MAX_CANDLES_PER_REQUEST;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Default history fetched when no start is known
pub const DEFAULT_LOOKBACK_DAYS: i64 = 2 * 365;

/// Collector settings
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Candles per request, also the window length in minutes
    pub batch_size: usize,
    /// Pause between successful batches
    pub request_delay: Duration,
    /// Pause before retrying a failed batch
    pub error_backoff: Duration,
    /// Consecutive failed attempts that end the run
    pub max_consecutive_failures: u32,
    /// History requested when neither a start nor stored data exists
    pub default_lookback: chrono::Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            batch_size: MAX_CANDLES_PER_REQUEST,
            request_delay: Duration::from_millis(100),
            error_backoff: Duration::from_secs(1),
            max_consecutive_failures: 10,
            default_lookback: chrono::Duration::days(DEFAULT_LOOKBACK_DAYS),
        }
    }
}

impl CollectorConfig {
    /// Set the batch size, clamped to what the API accepts
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_CANDLES_PER_REQUEST);
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    pub fn with_max_consecutive_failures(mut self, failures: u32) -> Self {
        self.max_consecutive_failures = failures.max(1);
        self
    }

    /// Window covered by one batch
    pub fn batch_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.batch_size.max(1) as i64)
    }
}

/// `max(1, total_minutes / batch_size)`
pub fn estimated_batches(start: DateTime<Utc>, end: DateTime<Utc>, batch_size: usize) -> u64 {
    let minutes = (end - start).num_minutes().max(0) as u64;
    (minutes / batch_size.max(1) as u64).max(1)
}
