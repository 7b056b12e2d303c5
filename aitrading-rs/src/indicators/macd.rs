//! MACD (Moving Average Convergence Divergence) indicator

use crate::indicators::{Indicator, EMA};
use serde::{Deserialize, Serialize};

/// MACD built from two EMAs with a signal EMA over the defined MACD values
#[derive(Debug, Clone)]
pub struct MACD {
    fast: EMA,
    slow: EMA,
    signal_ema: EMA,
    last_output: MACDResult,
}

impl MACD {
    /// Create new MACD indicator
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        Self {
            fast: EMA::new(fast_period),
            slow: EMA::new(slow_period),
            signal_ema: EMA::new(signal_period),
            last_output: MACDResult::default(),
        }
    }

    /// Get MACD line value
    pub fn macd(&self) -> Option<f64> {
        self.last_output.macd
    }

    /// Get signal line value
    pub fn signal(&self) -> Option<f64> {
        self.last_output.signal
    }

    /// Get histogram value (MACD - Signal)
    pub fn histogram(&self) -> Option<f64> {
        self.last_output.histogram
    }

    /// Latest output
    pub fn output(&self) -> MACDResult {
        self.last_output
    }
}

impl Indicator for MACD {
    fn name(&self) -> &str {
        "MACD"
    }

    fn update(&mut self, value: f64) {
        self.fast.update(value);
        self.slow.update(value);

        let macd = match (self.fast.value(), self.slow.value()) {
            (Some(fast), Some(slow)) => Some(fast - slow),
            _ => None,
        };
        // the signal EMA only ever sees defined MACD values
        let signal = match macd {
            Some(m) => {
                self.signal_ema.update(m);
                self.signal_ema.value()
            }
            None => None,
        };
        let histogram = match (macd, signal) {
            (Some(m), Some(s)) => Some(m - s),
            _ => None,
        };

        self.last_output = MACDResult {
            macd,
            signal,
            histogram,
        };
    }

    fn value(&self) -> Option<f64> {
        self.macd()
    }

    fn is_ready(&self) -> bool {
        self.last_output.histogram.is_some()
    }
}

/// MACD values at one index
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MACDResult {
    pub macd: Option<f64>,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
}

/// MACD output aligned with the input closes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// Calculate MACD, signal and histogram from a series of closes
pub fn calculate_macd(
    values: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> MacdSeries {
    let mut macd = MACD::new(fast_period, slow_period, signal_period);
    let mut series = MacdSeries {
        macd: Vec::with_capacity(values.len()),
        signal: Vec::with_capacity(values.len()),
        histogram: Vec::with_capacity(values.len()),
    };

    for &value in values {
        macd.update(value);
        let output = macd.output();
        series.macd.push(output.macd);
        series.signal.push(output.signal);
        series.histogram.push(output.histogram);
    }

    series
}
