//! Resumable, cancellable minute candle collection

use crate::collector::{
    estimated_batches, CollectionOutcome, CollectionPhase, CollectionRequest, CollectionState,
    CollectionSummary, CollectorConfig, MAX_RUNNING_PROGRESS,
};
use crate::data::{Candle, CandleStore};
use crate::exchange::CandleSource;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Walks a market's history forward in fixed windows and fills a candle store.
///
/// The upstream API only answers "the N candles ending at `to`", so each
/// window `[cursor, boundary)` is fetched with `to = boundary` and anything
/// outside the window is dropped. Windows are processed oldest first, which
/// makes an interrupted run resumable from the newest stored candle.
pub struct DataCollector<S: ?Sized, F> {
    store: Arc<S>,
    source: F,
    config: CollectorConfig,
    state: watch::Sender<CollectionState>,
    cancel: Mutex<CancellationToken>,
}

enum BatchOutcome {
    /// The API returned nothing for this window
    Exhausted,
    Stored {
        received: usize,
        accepted: usize,
        inserted: usize,
    },
}

impl<S, F> DataCollector<S, F>
where
    S: CandleStore + ?Sized,
    F: CandleSource,
{
    /// Create new collector
    pub fn new(store: Arc<S>, source: F, config: CollectorConfig) -> Self {
        let (state, _) = watch::channel(CollectionState::default());
        Self {
            store,
            source,
            config,
            state,
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Current state snapshot
    pub fn status(&self) -> CollectionState {
        self.state.borrow().clone()
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<CollectionState> {
        self.state.subscribe()
    }

    /// Ask the active run to stop at its next checkpoint
    pub fn cancel(&self) {
        // held across the check so a starting run has already installed its token
        let token = self.cancel_token();
        let active = self.state.borrow().is_collecting;
        if !active {
            return;
        }
        token.cancel();
        self.state.send_modify(|state| {
            state.is_cancelled = true;
            state.progress_message = "Cancelling collection...".to_string();
        });
        info!("Collection cancellation requested");
    }

    /// Run one collection. Returns `AlreadyRunning` without side effects if a run is active.
    pub async fn collect(&self, request: CollectionRequest) -> CollectionOutcome {
        let market = request.market.clone();
        let token = CancellationToken::new();
        let started = {
            let mut installed = self.cancel_token();
            let started = self.state.send_if_modified(|state| {
                if state.is_collecting {
                    return false;
                }
                *state = CollectionState::starting(&market);
                true
            });
            if started {
                *installed = token.clone();
            }
            started
        };
        if !started {
            warn!(market = %market, "Collection already running, request ignored");
            return CollectionOutcome::AlreadyRunning;
        }

        let timer = Instant::now();
        let end = request.end.unwrap_or_else(Utc::now);
        let start = match self.resolve_start(&request, end).await {
            Ok(start) => start,
            Err(e) => {
                error!(market = %market, error = %e, "Failed to resolve collection start");
                let summary = CollectionSummary {
                    market,
                    start: end,
                    end,
                    cursor: end,
                    batches_done: 0,
                    candles_inserted: 0,
                    failed_attempts: 1,
                    last_error: Some(e.to_string()),
                    elapsed: timer.elapsed(),
                };
                self.finish(CollectionPhase::Failed, &summary);
                return CollectionOutcome::Failed(summary);
            }
        };

        let estimated = estimated_batches(start, end, self.config.batch_size);
        self.state.send_modify(|state| {
            state.estimated_batches = estimated;
            state.progress_message = format!("Collecting {market} from {start}");
        });
        info!(
            market = %market,
            start = %start,
            end = %end,
            estimated_batches = estimated,
            resume = request.resume,
            "Starting candle collection"
        );

        let mut summary = CollectionSummary {
            market: market.clone(),
            start,
            end,
            cursor: start,
            batches_done: 0,
            candles_inserted: 0,
            failed_attempts: 0,
            last_error: None,
            elapsed: Duration::ZERO,
        };
        let mut consecutive_failures = 0u32;

        let phase = loop {
            if summary.cursor >= end {
                break CollectionPhase::Completed;
            }
            if token.is_cancelled() {
                break CollectionPhase::Cancelled;
            }

            let boundary = (summary.cursor + self.config.batch_window()).min(end);
            match self.collect_batch(&market, summary.cursor, boundary).await {
                Ok(BatchOutcome::Exhausted) => {
                    info!(market = %market, cursor = %summary.cursor, "No more candles available");
                    break CollectionPhase::Completed;
                }
                Ok(BatchOutcome::Stored {
                    received,
                    accepted,
                    inserted,
                }) => {
                    consecutive_failures = 0;
                    summary.cursor = boundary;
                    summary.batches_done += 1;
                    summary.candles_inserted += inserted as u64;
                    debug!(
                        market = %market,
                        batch = summary.batches_done,
                        received,
                        accepted,
                        inserted,
                        boundary = %boundary,
                        "Batch stored"
                    );

                    let progress =
                        (summary.batches_done as f64 / estimated as f64).min(MAX_RUNNING_PROGRESS);
                    self.state.send_modify(|state| {
                        state.batches_done = summary.batches_done;
                        state.candles_inserted = summary.candles_inserted;
                        state.progress = progress;
                        state.error_message = None;
                        state.progress_message = format!(
                            "{market}: {}/{} batches, {} candles (up to {boundary})",
                            summary.batches_done, estimated, summary.candles_inserted
                        );
                    });

                    if token.is_cancelled() {
                        break CollectionPhase::Cancelled;
                    }
                    pause(&token, self.config.request_delay).await;
                }
                Err(e) => {
                    consecutive_failures += 1;
                    summary.failed_attempts += 1;
                    summary.last_error = Some(e.to_string());
                    log_batch_error(&market, summary.cursor, consecutive_failures, &e);

                    let message = e.to_string();
                    self.state.send_modify(|state| {
                        state.error_message = Some(message);
                    });

                    if !e.is_retryable()
                        || consecutive_failures >= self.config.max_consecutive_failures
                    {
                        break CollectionPhase::Failed;
                    }
                    pause(&token, self.config.error_backoff).await;
                }
            }
        };

        summary.elapsed = timer.elapsed();
        self.finish(phase, &summary);
        match phase {
            CollectionPhase::Completed => {
                summary.log_summary("completed");
                CollectionOutcome::Completed(summary)
            }
            CollectionPhase::Cancelled => {
                summary.log_summary("cancelled");
                CollectionOutcome::Cancelled(summary)
            }
            _ => {
                summary.log_summary("failed");
                CollectionOutcome::Failed(summary)
            }
        }
    }

    /// Explicit start, else the newest stored candle when resuming, else the default lookback
    async fn resolve_start(
        &self,
        request: &CollectionRequest,
        end: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        if let Some(start) = request.start {
            return Ok(start);
        }
        let fallback = end - self.config.default_lookback;
        if request.resume {
            let last = self.store.last_timestamp(&request.market).await?;
            return Ok(last.unwrap_or(fallback));
        }
        Ok(fallback)
    }

    /// Fetch the window ending at `boundary` and store what falls in `[cursor, boundary)`
    async fn collect_batch(
        &self,
        market: &str,
        cursor: DateTime<Utc>,
        boundary: DateTime<Utc>,
    ) -> Result<BatchOutcome> {
        let fetched = self
            .source
            .fetch_minute_candles(market, boundary, self.config.batch_size)
            .await?;
        if fetched.is_empty() {
            return Ok(BatchOutcome::Exhausted);
        }

        let received = fetched.len();
        let mut window: Vec<Candle> = fetched
            .into_iter()
            .filter(|c| c.market == market && c.timestamp >= cursor && c.timestamp < boundary)
            .collect();
        window.sort_by_key(|c| c.timestamp);

        let accepted = window.len();
        let inserted = if window.is_empty() {
            0
        } else {
            self.store.insert_batch(window).await?
        };

        Ok(BatchOutcome::Stored {
            received,
            accepted,
            inserted,
        })
    }

    fn finish(&self, phase: CollectionPhase, summary: &CollectionSummary) {
        let _token = self.cancel_token();
        self.state.send_modify(|state| {
            state.phase = phase;
            state.is_collecting = false;
            state.batches_done = summary.batches_done;
            state.candles_inserted = summary.candles_inserted;
            match phase {
                CollectionPhase::Completed => {
                    // a cancel that arrived after the last window changes nothing
                    state.is_cancelled = false;
                    state.progress = 1.0;
                    state.error_message = None;
                    state.progress_message = format!(
                        "Collection completed: {} candles in {} batches",
                        summary.candles_inserted, summary.batches_done
                    );
                }
                CollectionPhase::Cancelled => {
                    state.is_cancelled = true;
                    state.progress_message = format!(
                        "Collection cancelled after {} batches ({} candles)",
                        summary.batches_done, summary.candles_inserted
                    );
                }
                _ => {
                    state.error_message = summary.last_error.clone();
                    state.progress_message = format!(
                        "Collection failed after {} attempts",
                        summary.failed_attempts
                    );
                }
            }
        });
    }

    fn cancel_token(&self) -> MutexGuard<'_, CancellationToken> {
        self.cancel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored candles for a market
    pub async fn candle_count(&self, market: &str) -> Result<u64> {
        self.store.count(market).await
    }

    pub async fn first_timestamp(&self, market: &str) -> Result<Option<DateTime<Utc>>> {
        self.store.first_timestamp(market).await
    }

    pub async fn last_timestamp(&self, market: &str) -> Result<Option<DateTime<Utc>>> {
        self.store.last_timestamp(market).await
    }

    pub async fn has_data(&self, market: &str) -> Result<bool> {
        Ok(self.store.count(market).await? > 0)
    }

    /// Markets with stored data, sorted
    pub async fn collected_markets(&self) -> Result<Vec<String>> {
        self.store.list_markets().await
    }

    /// Stored candles in `[start, end]`, oldest first
    pub async fn candles(
        &self,
        market: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Candle>> {
        self.store.query(market, start, end).await
    }

    pub async fn delete_all(&self, market: &str) -> Result<u64> {
        let removed = self.store.delete_all(market).await?;
        info!(market = %market, removed, "Deleted all candles");
        Ok(removed)
    }

    pub async fn delete_range(
        &self,
        market: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64> {
        let removed = self.store.delete_range(market, start, end).await?;
        info!(market = %market, start = %start, end = %end, removed, "Deleted candle range");
        Ok(removed)
    }

    /// Wipe every market's candles
    pub async fn delete_all_markets(&self) -> Result<u64> {
        let removed = self.store.delete_all_markets().await?;
        info!(removed, "Deleted candles of every market");
        Ok(removed)
    }

    pub async fn delete_oldest(&self, market: &str, count: u64) -> Result<u64> {
        let removed = self.store.delete_oldest(market, count).await?;
        info!(market = %market, removed, "Deleted oldest candles");
        Ok(removed)
    }
}

/// Sleep unless cancelled first
async fn pause(token: &CancellationToken, duration: Duration) {
    if duration.is_zero() {
        return;
    }
    tokio::select! {
        _ = token.cancelled() => {}
        _ = tokio::time::sleep(duration) => {}
    }
}

fn log_batch_error(market: &str, cursor: DateTime<Utc>, attempt: u32, err: &Error) {
    match err {
        Error::Decoding(_) => error!(
            market = %market,
            cursor = %cursor,
            attempt,
            error = %err,
            "Candle response did not match the expected schema"
        ),
        _ if !err.is_retryable() => error!(
            market = %market,
            cursor = %cursor,
            attempt,
            error = %err,
            "Batch failed with a non-retryable error"
        ),
        _ => warn!(
            market = %market,
            cursor = %cursor,
            attempt,
            error = %err,
            "Batch failed, retrying after backoff"
        ),
    }
}
