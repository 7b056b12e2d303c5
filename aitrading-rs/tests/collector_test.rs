//! Collector tests against a scripted candle source

use aitrading_rs::collector::{
    CollectionOutcome, CollectionPhase, CollectionRequest, CollectorConfig, DataCollector,
};
use aitrading_rs::data::{is_deduplicated, Candle, CandleStore, MemoryCandleStore};
use aitrading_rs::exchange::CandleSource;
use aitrading_rs::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, DurationRound, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

const MARKET: &str = "KRW-BTC";

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn minutes(n: i64) -> DateTime<Utc> {
    t0() + Duration::minutes(n)
}

/// Answers like the real endpoint: up to `count` minute candles before `to`, newest first
#[derive(Clone, Default)]
struct ScriptedSource {
    requests: Arc<Mutex<Vec<DateTime<Utc>>>>,
    failures: Arc<Mutex<VecDeque<Error>>>,
    always_fail: Option<Error>,
    /// Shifts every candle by this many seconds
    offset_secs: i64,
    /// Nothing exists at or after this time
    data_end: Option<DateTime<Utc>>,
    /// Also returns the same candles for this market
    extra_market: Option<&'static str>,
}

impl ScriptedSource {
    fn failing_first(errors: Vec<Error>) -> Self {
        Self {
            failures: Arc::new(Mutex::new(errors.into())),
            ..Self::default()
        }
    }

    fn requests(&self) -> Vec<DateTime<Utc>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CandleSource for ScriptedSource {
    async fn fetch_minute_candles(
        &self,
        market: &str,
        to: DateTime<Utc>,
        count: usize,
    ) -> Result<Vec<Candle>> {
        self.requests.lock().unwrap().push(to);
        if let Some(err) = &self.always_fail {
            return Err(err.clone());
        }
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        // `to` is exclusive
        let newest = (to - Duration::seconds(1))
            .duration_trunc(Duration::minutes(1))
            .unwrap();
        let candles: Vec<Candle> = (0..count as i64)
            .map(|i| newest - Duration::minutes(i) + Duration::seconds(self.offset_secs))
            .filter(|ts| *ts < to && self.data_end.map_or(true, |end| *ts < end))
            .map(|ts| {
                let price = 50_000_000.0 + (ts.timestamp() / 60 % 13) as f64 * 1_000.0;
                Candle::new(
                    market,
                    ts,
                    price,
                    price + 500.0,
                    price - 500.0,
                    price,
                    0.5,
                    price * 0.5,
                )
            })
            .collect();
        let extra: Vec<Candle> = match self.extra_market {
            Some(other) => candles
                .iter()
                .map(|c| Candle {
                    market: other.to_string(),
                    ..c.clone()
                })
                .collect(),
            None => Vec::new(),
        };
        Ok(candles.into_iter().chain(extra).collect())
    }
}

fn fast_config() -> CollectorConfig {
    CollectorConfig::default()
        .with_batch_size(200)
        .with_request_delay(std::time::Duration::ZERO)
        .with_error_backoff(std::time::Duration::ZERO)
}

fn paced_config() -> CollectorConfig {
    CollectorConfig::default()
        .with_request_delay(std::time::Duration::from_secs(1))
        .with_error_backoff(std::time::Duration::from_secs(1))
}

#[tokio::test]
async fn test_collects_contiguous_history() {
    let store = Arc::new(MemoryCandleStore::new());
    let source = ScriptedSource::default();
    let collector = DataCollector::new(store.clone(), source.clone(), fast_config());

    let outcome = collector
        .collect(CollectionRequest::starting_at(MARKET, t0()).until(minutes(1000)))
        .await;

    let CollectionOutcome::Completed(summary) = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(summary.batches_done, 5);
    assert_eq!(summary.candles_inserted, 1000);
    assert_eq!(summary.cursor, minutes(1000));

    assert_eq!(store.count(MARKET).await.unwrap(), 1000);
    assert_eq!(store.first_timestamp(MARKET).await.unwrap(), Some(t0()));
    assert_eq!(store.last_timestamp(MARKET).await.unwrap(), Some(minutes(999)));

    // one request per window, each ending at the window boundary
    let expected: Vec<_> = (1..=5).map(|b| minutes(b * 200)).collect();
    assert_eq!(source.requests(), expected);

    let status = collector.status();
    assert_eq!(status.phase, CollectionPhase::Completed);
    assert_eq!(status.progress, 1.0);
    assert!(!status.is_collecting);
    assert_eq!(status.estimated_batches, 5);
    assert!(status.error_message.is_none());
}

#[tokio::test]
async fn test_empty_response_completes_the_run() {
    let store = Arc::new(MemoryCandleStore::new());
    let source = ScriptedSource {
        data_end: Some(minutes(500)),
        ..ScriptedSource::default()
    };
    let collector = DataCollector::new(store.clone(), source.clone(), fast_config());

    let outcome = collector
        .collect(CollectionRequest::starting_at(MARKET, t0()).until(minutes(1000)))
        .await;

    let CollectionOutcome::Completed(summary) = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    // the partial third window counts, the empty fourth one stops the run
    assert_eq!(summary.batches_done, 3);
    assert_eq!(summary.cursor, minutes(600));
    assert_eq!(summary.candles_inserted, 500);
    assert_eq!(source.requests().len(), 4);
    assert_eq!(store.count(MARKET).await.unwrap(), 500);
    assert_eq!(store.last_timestamp(MARKET).await.unwrap(), Some(minutes(499)));

    let status = collector.status();
    assert_eq!(status.phase, CollectionPhase::Completed);
    assert_eq!(status.progress, 1.0);
}

#[tokio::test]
async fn test_other_market_candles_are_dropped() {
    let store = Arc::new(MemoryCandleStore::new());
    let source = ScriptedSource {
        extra_market: Some("KRW-ETH"),
        ..ScriptedSource::default()
    };
    let collector = DataCollector::new(store.clone(), source, fast_config());

    let outcome = collector
        .collect(CollectionRequest::starting_at(MARKET, t0()).until(minutes(400)))
        .await;

    assert_eq!(outcome.summary().unwrap().candles_inserted, 400);
    assert_eq!(store.count(MARKET).await.unwrap(), 400);
    assert_eq!(store.count("KRW-ETH").await.unwrap(), 0);
    assert_eq!(store.list_markets().await.unwrap(), vec![MARKET.to_string()]);
}

#[tokio::test]
async fn test_resume_continues_after_last_stored_candle() {
    let store = Arc::new(MemoryCandleStore::new());
    let first = DataCollector::new(store.clone(), ScriptedSource::default(), fast_config());
    first
        .collect(CollectionRequest::starting_at(MARKET, t0()).until(minutes(1000)))
        .await;
    let last_stored = store.last_timestamp(MARKET).await.unwrap().unwrap();

    let source = ScriptedSource::default();
    let resumed = DataCollector::new(store.clone(), source.clone(), fast_config());
    let outcome = resumed
        .collect(CollectionRequest::resume(MARKET).until(minutes(1500)))
        .await;

    let summary = outcome.summary().unwrap();
    assert_eq!(summary.start, last_stored);
    assert_eq!(summary.candles_inserted, 500);

    let requests = source.requests();
    assert!(!requests.is_empty());
    assert!(requests.iter().all(|to| *to > last_stored));
    assert_eq!(requests[0], last_stored + Duration::minutes(200));

    let stored = store.query(MARKET, None, None).await.unwrap();
    assert_eq!(stored.len(), 1500);
    assert!(is_deduplicated(&stored));
}

#[tokio::test]
async fn test_overlapping_runs_stay_deduplicated() {
    let store = Arc::new(MemoryCandleStore::new());

    let aligned = DataCollector::new(store.clone(), ScriptedSource::default(), fast_config());
    aligned
        .collect(CollectionRequest::starting_at(MARKET, t0()).until(minutes(600)))
        .await;

    // same minutes re-fetched 30 seconds off
    let shifted = ScriptedSource {
        offset_secs: 30,
        ..ScriptedSource::default()
    };
    let overlapping = DataCollector::new(store.clone(), shifted, fast_config());
    let outcome = overlapping
        .collect(CollectionRequest::starting_at(MARKET, minutes(300)).until(minutes(900)))
        .await;

    assert_eq!(outcome.summary().unwrap().candles_inserted, 300);

    let stored = store.query(MARKET, None, None).await.unwrap();
    assert_eq!(stored.len(), 900);
    assert!(is_deduplicated(&stored));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_keeps_completed_batches() {
    let store = Arc::new(MemoryCandleStore::new());
    let source = ScriptedSource::default();
    let collector = Arc::new(DataCollector::new(store.clone(), source.clone(), paced_config()));

    let mut rx = collector.subscribe();
    let handle = tokio::spawn({
        let collector = collector.clone();
        async move {
            collector
                .collect(CollectionRequest::starting_at(MARKET, t0()).until(minutes(2000)))
                .await
        }
    });

    loop {
        rx.changed().await.unwrap();
        if rx.borrow_and_update().batches_done >= 2 {
            break;
        }
    }
    collector.cancel();

    let outcome = handle.await.unwrap();
    let CollectionOutcome::Cancelled(summary) = outcome else {
        panic!("expected cancellation, got {outcome:?}");
    };
    assert_eq!(summary.batches_done, 2);
    assert_eq!(source.requests().len(), 2);
    assert_eq!(store.count(MARKET).await.unwrap(), 400);
    assert_eq!(store.last_timestamp(MARKET).await.unwrap(), Some(minutes(399)));

    let status = collector.status();
    assert_eq!(status.phase, CollectionPhase::Cancelled);
    assert!(status.is_cancelled);
    assert!(!status.is_collecting);
    assert!(status.progress < 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_after_last_window_still_completes() {
    let store = Arc::new(MemoryCandleStore::new());
    let collector = Arc::new(DataCollector::new(
        store.clone(),
        ScriptedSource::default(),
        paced_config(),
    ));

    let mut rx = collector.subscribe();
    let handle = tokio::spawn({
        let collector = collector.clone();
        async move {
            collector
                .collect(CollectionRequest::starting_at(MARKET, t0()).until(minutes(200)))
                .await
        }
    });
    loop {
        rx.changed().await.unwrap();
        if rx.borrow_and_update().batches_done >= 1 {
            break;
        }
    }

    // the only window is stored and the run is in its request pause
    collector.cancel();

    let outcome = handle.await.unwrap();
    assert!(matches!(outcome, CollectionOutcome::Completed(_)), "{outcome:?}");
    assert_eq!(store.count(MARKET).await.unwrap(), 200);

    let status = collector.status();
    assert_eq!(status.phase, CollectionPhase::Completed);
    assert!(!status.is_cancelled);
    assert!(!status.is_collecting);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_right_after_start_stops_the_run() {
    let store = Arc::new(MemoryCandleStore::new());
    let config = fast_config().with_request_delay(std::time::Duration::from_millis(50));
    let collector = Arc::new(DataCollector::new(store.clone(), ScriptedSource::default(), config));

    let mut rx = collector.subscribe();
    let watcher = tokio::spawn({
        let collector = collector.clone();
        async move {
            while !rx.borrow_and_update().is_collecting {
                rx.changed().await.unwrap();
            }
            collector.cancel();
        }
    });

    let outcome = collector
        .collect(CollectionRequest::starting_at(MARKET, t0()).until(minutes(2000)))
        .await;
    watcher.await.unwrap();

    let CollectionOutcome::Cancelled(summary) = outcome else {
        panic!("expected cancellation, got {outcome:?}");
    };
    assert!(summary.batches_done < 10);
    assert!(collector.status().is_cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_second_start_is_ignored_while_running() {
    let store = Arc::new(MemoryCandleStore::new());
    let collector = Arc::new(DataCollector::new(
        store.clone(),
        ScriptedSource::default(),
        paced_config(),
    ));

    let mut rx = collector.subscribe();
    let handle = tokio::spawn({
        let collector = collector.clone();
        async move {
            collector
                .collect(CollectionRequest::starting_at(MARKET, t0()).until(minutes(2000)))
                .await
        }
    });
    loop {
        rx.changed().await.unwrap();
        if rx.borrow_and_update().batches_done >= 1 {
            break;
        }
    }

    let second = collector
        .collect(CollectionRequest::starting_at("KRW-ETH", t0()).until(minutes(200)))
        .await;
    assert_eq!(second, CollectionOutcome::AlreadyRunning);
    assert_eq!(collector.status().market.as_deref(), Some(MARKET));

    collector.cancel();
    assert!(matches!(handle.await.unwrap(), CollectionOutcome::Cancelled(_)));
    assert_eq!(store.count("KRW-ETH").await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_batch_is_retried() {
    let store = Arc::new(MemoryCandleStore::new());
    let source = ScriptedSource::failing_first(vec![
        Error::Network("connection reset".into()),
        Error::Server {
            code: 500,
            message: "temporarily unavailable".into(),
        },
    ]);
    let collector = DataCollector::new(store.clone(), source.clone(), paced_config());

    let outcome = collector
        .collect(CollectionRequest::starting_at(MARKET, t0()).until(minutes(400)))
        .await;

    let CollectionOutcome::Completed(summary) = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(summary.failed_attempts, 2);
    assert_eq!(summary.batches_done, 2);
    assert_eq!(store.count(MARKET).await.unwrap(), 400);

    // the failed window is requested again, not skipped
    let requests = source.requests();
    assert_eq!(requests[..3], [minutes(200), minutes(200), minutes(200)]);
    assert_eq!(requests[3], minutes(400));
    assert!(collector.status().error_message.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_run_fails_after_repeated_errors() {
    let store = Arc::new(MemoryCandleStore::new());
    let source = ScriptedSource {
        always_fail: Some(Error::Server {
            code: 500,
            message: "maintenance".into(),
        }),
        ..ScriptedSource::default()
    };
    let collector = DataCollector::new(
        store.clone(),
        source.clone(),
        paced_config().with_max_consecutive_failures(3),
    );

    let outcome = collector
        .collect(CollectionRequest::starting_at(MARKET, t0()).until(minutes(400)))
        .await;

    assert!(matches!(outcome, CollectionOutcome::Failed(_)));
    assert_eq!(source.requests().len(), 3);

    let status = collector.status();
    assert_eq!(status.phase, CollectionPhase::Failed);
    assert!(!status.is_collecting);
    assert_eq!(status.error_message.as_deref(), Some("API error 500: maintenance"));
    assert!(store.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_error_fails_at_once() {
    let store = Arc::new(MemoryCandleStore::new());
    let source = ScriptedSource {
        always_fail: Some(Error::Config("unsupported candle unit: 2".into())),
        ..ScriptedSource::default()
    };
    let collector = DataCollector::new(
        store.clone(),
        source.clone(),
        paced_config().with_max_consecutive_failures(5),
    );

    let outcome = collector
        .collect(CollectionRequest::starting_at(MARKET, t0()).until(minutes(400)))
        .await;

    let CollectionOutcome::Failed(summary) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(summary.failed_attempts, 1);
    assert_eq!(source.requests().len(), 1);
    assert_eq!(collector.status().phase, CollectionPhase::Failed);
    assert!(store.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_progress_hits_one_only_on_completion() {
    let store = Arc::new(MemoryCandleStore::new());
    let collector = DataCollector::new(store, ScriptedSource::default(), paced_config());

    let mut rx = collector.subscribe();
    let recorder = tokio::spawn(async move {
        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            let done = state.is_terminal();
            seen.push(state);
            if done {
                break;
            }
        }
        seen
    });

    // 450 minutes: estimated 2 batches, actually 3
    collector
        .collect(CollectionRequest::starting_at(MARKET, t0()).until(minutes(450)))
        .await;
    let seen = recorder.await.unwrap();

    let (last, running) = seen.split_last().unwrap();
    assert_eq!(last.phase, CollectionPhase::Completed);
    assert_eq!(last.progress, 1.0);
    assert_eq!(last.batches_done, 3);
    assert_eq!(last.estimated_batches, 2);
    assert!(running.iter().all(|s| s.progress < 1.0 && s.is_collecting));
    assert!(running.windows(2).all(|w| w[0].progress <= w[1].progress));
}

#[tokio::test]
async fn test_auxiliary_operations() {
    let store = Arc::new(MemoryCandleStore::new());
    let collector = DataCollector::new(store.clone(), ScriptedSource::default(), fast_config());
    collector
        .collect(CollectionRequest::starting_at(MARKET, t0()).until(minutes(600)))
        .await;

    assert!(collector.has_data(MARKET).await.unwrap());
    assert!(!collector.has_data("KRW-XRP").await.unwrap());
    assert_eq!(collector.collected_markets().await.unwrap(), vec![MARKET.to_string()]);
    assert_eq!(collector.candle_count(MARKET).await.unwrap(), 600);

    let range = collector
        .candles(MARKET, Some(minutes(10)), Some(minutes(19)))
        .await
        .unwrap();
    assert_eq!(range.len(), 10);

    assert_eq!(collector.delete_range(MARKET, minutes(0), minutes(99)).await.unwrap(), 100);
    assert_eq!(collector.delete_oldest(MARKET, 50).await.unwrap(), 50);
    assert_eq!(collector.first_timestamp(MARKET).await.unwrap(), Some(minutes(150)));
    assert_eq!(collector.delete_all(MARKET).await.unwrap(), 450);
    assert_eq!(collector.last_timestamp(MARKET).await.unwrap(), None);

    for market in [MARKET, "KRW-ETH"] {
        collector
            .collect(CollectionRequest::starting_at(market, t0()).until(minutes(200)))
            .await;
    }
    assert_eq!(collector.collected_markets().await.unwrap().len(), 2);
    assert_eq!(collector.delete_all_markets().await.unwrap(), 400);
    assert!(collector.collected_markets().await.unwrap().is_empty());
}
