//! Observable collection state and run results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Progress reported while a run is still going
pub const MAX_RUNNING_PROGRESS: f64 = 0.99;

/// Lifecycle of a collection run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionPhase {
    Idle,
    Collecting,
    Completed,
    Cancelled,
    /// Gave up after repeated batch failures
    Failed,
}

/// Snapshot published by the collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionState {
    pub phase: CollectionPhase,
    pub market: Option<String>,
    pub is_collecting: bool,
    /// 0.0..=1.0, exactly 1.0 only after a completed run
    pub progress: f64,
    pub progress_message: String,
    /// Most recent batch error
    pub error_message: Option<String>,
    pub is_cancelled: bool,
    pub batches_done: u64,
    pub estimated_batches: u64,
    pub candles_inserted: u64,
}

impl Default for CollectionState {
    fn default() -> Self {
        Self {
            phase: CollectionPhase::Idle,
            market: None,
            is_collecting: false,
            progress: 0.0,
            progress_message: "Ready".to_string(),
            error_message: None,
            is_cancelled: false,
            batches_done: 0,
            estimated_batches: 0,
            candles_inserted: 0,
        }
    }
}

impl CollectionState {
    /// Fresh state for a run that is starting
    pub fn starting(market: &str) -> Self {
        Self {
            phase: CollectionPhase::Collecting,
            market: Some(market.to_string()),
            is_collecting: true,
            progress_message: format!("Preparing collection for {market}"),
            ..Self::default()
        }
    }

    /// Whether the run ended (successfully or not)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.phase,
            CollectionPhase::Completed | CollectionPhase::Cancelled | CollectionPhase::Failed
        )
    }
}

/// Parameters of one collection run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRequest {
    pub market: String,
    /// Explicit start, wins over `resume`
    pub start: Option<DateTime<Utc>>,
    /// Defaults to now
    pub end: Option<DateTime<Utc>>,
    /// Continue from the newest stored candle
    pub resume: bool,
}

impl CollectionRequest {
    /// Collect the default lookback window
    pub fn new(market: impl Into<String>) -> Self {
        Self {
            market: market.into(),
            start: None,
            end: None,
            resume: false,
        }
    }

    /// Continue from the newest stored candle
    pub fn resume(market: impl Into<String>) -> Self {
        Self {
            resume: true,
            ..Self::new(market)
        }
    }

    /// Collect from an explicit start
    pub fn starting_at(market: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            ..Self::new(market)
        }
    }

    /// Stop at `end` instead of now
    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }
}

/// Totals of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSummary {
    pub market: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Where the next run would pick up
    pub cursor: DateTime<Utc>,
    pub batches_done: u64,
    pub candles_inserted: u64,
    pub failed_attempts: u64,
    pub last_error: Option<String>,
    pub elapsed: Duration,
}

impl CollectionSummary {
    /// Log the run totals
    pub fn log_summary(&self, outcome: &str) {
        tracing::info!(
            outcome = outcome,
            market = %self.market,
            start = %self.start,
            end = %self.end,
            cursor = %self.cursor,
            batches = self.batches_done,
            inserted = self.candles_inserted,
            failed_attempts = self.failed_attempts,
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "Collection finished"
        );
    }
}

/// How a call to `collect` ended
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionOutcome {
    /// The window was covered or the API ran out of data
    Completed(CollectionSummary),
    Cancelled(CollectionSummary),
    /// Too many consecutive batch failures
    Failed(CollectionSummary),
    /// Another run was active; nothing happened
    AlreadyRunning,
}

impl CollectionOutcome {
    pub fn summary(&self) -> Option<&CollectionSummary> {
        match self {
            Self::Completed(s) | Self::Cancelled(s) | Self::Failed(s) => Some(s),
            Self::AlreadyRunning => None,
        }
    }
}
