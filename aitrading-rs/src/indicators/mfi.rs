//! MFI (Money Flow Index) indicator

use crate::data::Candle;
use crate::indicators::{fold_series, Indicator};
use std::collections::VecDeque;

/// MFI over windows of `period + 1` candles
#[derive(Debug, Clone)]
pub struct MFI {
    period: usize,
    /// (typical price, money flow) of the most recent `period + 1` candles
    window: VecDeque<(f64, f64)>,
    last_value: Option<f64>,
}

impl MFI {
    /// Create new MFI indicator
    pub fn new(period: usize) -> Self {
        Self {
            period,
            window: VecDeque::with_capacity(period + 1),
            last_value: None,
        }
    }

    /// Get MFI period
    pub fn period(&self) -> usize {
        self.period
    }

    fn current(&self) -> f64 {
        let mut positive = 0.0;
        let mut negative = 0.0;
        for (prev, next) in self.window.iter().zip(self.window.iter().skip(1)) {
            if next.0 > prev.0 {
                positive += next.1;
            } else if next.0 < prev.0 {
                negative += next.1;
            }
        }

        let ratio = if negative == 0.0 { 0.0 } else { positive / negative };
        100.0 - 100.0 / (1.0 + ratio)
    }
}

impl Indicator<&Candle> for MFI {
    fn name(&self) -> &str {
        "MFI"
    }

    fn update(&mut self, candle: &Candle) {
        if self.period == 0 {
            return;
        }
        if self.window.len() == self.period + 1 {
            self.window.pop_front();
        }
        self.window.push_back((candle.typical_price(), candle.money_flow()));
        if self.window.len() == self.period + 1 {
            self.last_value = Some(self.current());
        }
    }

    fn value(&self) -> Option<f64> {
        self.last_value
    }

    fn is_ready(&self) -> bool {
        self.last_value.is_some()
    }
}

/// Calculate MFI from a candle series
pub fn calculate_mfi(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    fold_series(MFI::new(period), candles.iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn candles(closes: &[(f64, f64)]) -> Vec<Candle> {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &(close, volume))| {
                Candle::new(
                    "KRW-BTC",
                    start + Duration::minutes(i as i64),
                    close,
                    close,
                    close,
                    close,
                    volume,
                    close * volume,
                )
            })
            .collect()
    }

    #[test]
    fn test_mfi_positive_and_negative_flow() {
        // up 20 (flow 20), down 10 (flow 20)
        let series = candles(&[(10.0, 1.0), (20.0, 1.0), (10.0, 2.0)]);
        let mfi = calculate_mfi(&series, 2);

        assert_eq!(mfi[0], None);
        assert_eq!(mfi[1], None);
        assert!((mfi[2].unwrap() - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_mfi_without_negative_flow_is_zero() {
        let series = candles(&[(10.0, 1.0), (11.0, 1.0), (11.0, 1.0), (12.0, 1.0)]);
        let mfi = calculate_mfi(&series, 3);
        assert_eq!(mfi[3], Some(0.0));
    }

    #[test]
    fn test_mfi_window_slides() {
        let series = candles(&[(10.0, 1.0), (9.0, 1.0), (10.0, 1.0), (11.0, 1.0)]);
        let mfi = calculate_mfi(&series, 2);
        // window [9, 10, 11] is all positive flow
        assert_eq!(mfi[3], Some(0.0));
        // window [10, 9, 10]: positive 10, negative 9
        let expected = 100.0 - 100.0 / (1.0 + 10.0 / 9.0);
        assert!((mfi[2].unwrap() - expected).abs() < 1e-12);
    }
}
