//! AITrading-RS: minute candle collection and strategy backtesting
//!
//! This crate provides the engine behind the AITrading app:
//! - [reqwest](https://github.com/seanmonstar/reqwest) based Bithumb REST client
//! - [ta-rs](https://github.com/greyblake/ta-rs) for moving averages
//!
//! # Features
//!
//! - **Data Management**: OHLCV candle model and the `CandleStore` abstraction
//! - **Data Collection**: resumable, cancellable, rate-limited minute candle ingestion
//! - **Technical Indicators**: MFI, RSI, EMA, MACD, SMA
//! - **Strategies**: threshold strategies over MFI/RSI/MACD with templates
//! - **Backtesting**: single-position replay with trade log and drawdown tracking
//!
//! # Example
//!
//! ```no_run
//! use aitrading_rs::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store = Arc::new(MemoryCandleStore::new());
//!     let client = BithumbClient::new(ClientConfig::default())?;
//!     let collector = DataCollector::new(store.clone(), client, CollectorConfig::default());
//!
//!     collector.collect(CollectionRequest::resume("KRW-BTC")).await;
//!
//!     let candles = store.query("KRW-BTC", None, None).await?;
//!     let result = BacktestEngine::new(10_000_000.0).run(&Strategy::conservative(), &candles)?;
//!     println!("{}", BacktestReport::new(result).format());
//!     Ok(())
//! }
//! ```

pub mod backtest;
pub mod collector;
pub mod data;
pub mod error;
pub mod exchange;
pub mod indicators;
pub mod portfolio;
pub mod strategy;

// Re-export commonly used types
pub mod prelude {
    pub use crate::backtest::*;
    pub use crate::collector::*;
    pub use crate::data::*;
    pub use crate::error::{Error, Result};
    pub use crate::exchange::*;
    pub use crate::indicators::*;
    pub use crate::portfolio::*;
    pub use crate::strategy::*;
}

pub use error::{Error, Result};
