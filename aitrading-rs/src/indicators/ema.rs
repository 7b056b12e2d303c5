//! EMA (Exponential Moving Average) indicator

use crate::indicators::{fold_series, Indicator};

/// EMA seeded with the simple mean of its first `period` inputs
#[derive(Debug, Clone)]
pub struct EMA {
    period: usize,
    multiplier: f64,
    update_count: usize,
    seed_sum: f64,
    last_value: Option<f64>,
}

impl EMA {
    /// Create new EMA indicator
    pub fn new(period: usize) -> Self {
        Self {
            period,
            multiplier: 2.0 / (period as f64 + 1.0),
            update_count: 0,
            seed_sum: 0.0,
            last_value: None,
        }
    }

    /// Get EMA period
    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for EMA {
    fn name(&self) -> &str {
        "EMA"
    }

    fn update(&mut self, value: f64) {
        if self.period == 0 {
            return;
        }
        self.update_count += 1;

        match self.last_value {
            Some(prev) => {
                self.last_value = Some(value * self.multiplier + prev * (1.0 - self.multiplier));
            }
            None => {
                self.seed_sum += value;
                if self.update_count == self.period {
                    self.last_value = Some(self.seed_sum / self.period as f64);
                }
            }
        }
    }

    fn value(&self) -> Option<f64> {
        self.last_value
    }

    fn is_ready(&self) -> bool {
        self.last_value.is_some()
    }
}

/// Calculate EMA from a series of values
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    fold_series(EMA::new(period), values.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_seeded_with_sma() {
        let values = vec![2.0, 4.0, 6.0, 8.0, 10.0];
        let ema = calculate_ema(&values, 3);

        assert_eq!(ema[0], None);
        assert_eq!(ema[1], None);
        assert_eq!(ema[2], Some(4.0));
        // k = 0.5
        assert_eq!(ema[3], Some(6.0));
        assert_eq!(ema[4], Some(8.0));
    }

    #[test]
    fn test_ema_zero_period() {
        let ema = calculate_ema(&[1.0, 2.0, 3.0], 0);
        assert_eq!(ema, vec![None, None, None]);
    }
}
