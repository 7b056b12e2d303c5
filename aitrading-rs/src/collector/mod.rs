//! Data collection module
//!
//! Paginated, resumable, rate-limited ingestion of minute candles into a
//! [`CandleStore`](crate::data::CandleStore).

#[allow(clippy::module_inception)]
pub mod collector;
pub mod config;
pub mod state;

pub use collector::*;
pub use config::*;
pub use state::*;
