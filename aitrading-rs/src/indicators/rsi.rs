//! RSI (Relative Strength Index) indicator

use crate::indicators::{fold_series, Indicator};

/// RSI with Wilder smoothing
#[derive(Debug, Clone)]
pub struct RSI {
    period: usize,
    prev_close: Option<f64>,
    deltas_seen: usize,
    gain_sum: f64,
    loss_sum: f64,
    avg_gain: f64,
    avg_loss: f64,
    last_value: Option<f64>,
}

impl RSI {
    /// Create new RSI indicator
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev_close: None,
            deltas_seen: 0,
            gain_sum: 0.0,
            loss_sum: 0.0,
            avg_gain: 0.0,
            avg_loss: 0.0,
            last_value: None,
        }
    }

    /// Get RSI period
    pub fn period(&self) -> usize {
        self.period
    }

    fn current(&self) -> f64 {
        if self.avg_loss == 0.0 {
            return 100.0;
        }
        let rs = self.avg_gain / self.avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

impl Indicator for RSI {
    fn name(&self) -> &str {
        "RSI"
    }

    fn update(&mut self, value: f64) {
        if self.period == 0 {
            return;
        }
        let Some(prev) = self.prev_close.replace(value) else {
            return;
        };

        let change = value - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        self.deltas_seen += 1;

        let period = self.period as f64;
        if self.deltas_seen < self.period {
            self.gain_sum += gain;
            self.loss_sum += loss;
            return;
        }
        if self.deltas_seen == self.period {
            self.avg_gain = (self.gain_sum + gain) / period;
            self.avg_loss = (self.loss_sum + loss) / period;
        } else {
            self.avg_gain = (self.avg_gain * (period - 1.0) + gain) / period;
            self.avg_loss = (self.avg_loss * (period - 1.0) + loss) / period;
        }
        self.last_value = Some(self.current());
    }

    fn value(&self) -> Option<f64> {
        self.last_value
    }

    fn is_ready(&self) -> bool {
        // needs period+1 closes
        self.last_value.is_some()
    }
}

/// Calculate RSI from a series of closes
pub fn calculate_rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    fold_series(RSI::new(period), values.iter().copied())
}
