//! Data management module
//!
//! OHLCV candle model and the candle store the collector writes into.

pub mod candle;
pub mod storage;

pub use candle::*;
pub use storage::*;
