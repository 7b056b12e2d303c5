//! Indicator series aligned with a candle sequence

use crate::data::{closes, Candle};
use crate::indicators::{calculate_macd, calculate_mfi, calculate_rsi};
use serde::{Deserialize, Serialize};

/// Periods used to annotate a candle series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub mfi_period: usize,
    pub rsi_period: usize,
    pub macd_short_period: usize,
    pub macd_long_period: usize,
    pub macd_signal_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            mfi_period: 14,
            rsi_period: 14,
            macd_short_period: 12,
            macd_long_period: 26,
            macd_signal_period: 9,
        }
    }
}

/// Indicator values at a single candle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub mfi: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
}

/// Parallel indicator arrays, index-for-index with the input candles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSeries {
    pub mfi: Vec<Option<f64>>,
    pub rsi: Vec<Option<f64>>,
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

impl IndicatorSeries {
    /// Compute every indicator over `candles` (oldest first)
    pub fn compute(candles: &[Candle], params: &IndicatorParams) -> Self {
        let closes = closes(candles);
        let macd = calculate_macd(
            &closes,
            params.macd_short_period,
            params.macd_long_period,
            params.macd_signal_period,
        );

        Self {
            mfi: calculate_mfi(candles, params.mfi_period),
            rsi: calculate_rsi(&closes, params.rsi_period),
            macd: macd.macd,
            signal: macd.signal,
            histogram: macd.histogram,
        }
    }

    /// Number of positions
    pub fn len(&self) -> usize {
        self.mfi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mfi.is_empty()
    }

    /// Values at index `i`; all `None` past the end
    pub fn at(&self, i: usize) -> IndicatorSnapshot {
        let get = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
        IndicatorSnapshot {
            mfi: get(&self.mfi),
            rsi: get(&self.rsi),
            macd: get(&self.macd),
            signal: get(&self.signal),
            histogram: get(&self.histogram),
        }
    }
}
