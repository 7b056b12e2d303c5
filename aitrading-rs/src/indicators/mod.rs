//! Technical indicators module
//!
//! Every indicator exists in two forms: a streaming struct implementing
//! [`Indicator`] and a `calculate_*` function that folds the streaming form
//! over a slice. Batch outputs are aligned index-for-index with the input and
//! hold `None` wherever the history is still too short.

pub mod ema;
pub mod macd;
pub mod mfi;
pub mod rsi;
pub mod series;
pub mod sma;

pub use ema::*;
pub use macd::*;
pub use mfi::*;
pub use rsi::*;
pub use series::*;
pub use sma::*;

/// Indicator trait for all indicators
pub trait Indicator<I = f64> {
    /// Get the name of the indicator
    fn name(&self) -> &str;

    /// Update indicator with new input
    fn update(&mut self, input: I);

    /// Get current indicator value
    fn value(&self) -> Option<f64>;

    /// Check if indicator is ready (has enough data)
    fn is_ready(&self) -> bool;
}

/// Fold an indicator over a series, collecting its value after every input
pub(crate) fn fold_series<I, T, It>(mut indicator: T, inputs: It) -> Vec<Option<f64>>
where
    T: Indicator<I>,
    It: IntoIterator<Item = I>,
{
    inputs
        .into_iter()
        .map(|input| {
            indicator.update(input);
            indicator.value()
        })
        .collect()
}
