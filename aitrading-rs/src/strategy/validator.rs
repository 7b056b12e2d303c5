//! Strategy validation

use crate::strategy::Strategy;
use crate::{Error, Result};

/// Strategy validator
pub struct StrategyValidator;

impl StrategyValidator {
    /// Validate strategy configuration
    pub fn validate(strategy: &Strategy) -> Result<()> {
        if strategy.name.trim().is_empty() {
            return Err(invalid("strategy name cannot be empty"));
        }
        if strategy.indicators.is_empty() {
            return Err(invalid("at least one indicator must be enabled"));
        }

        let periods = [
            ("MFI period", strategy.mfi_period),
            ("RSI period", strategy.rsi_period),
            ("MACD short period", strategy.macd_short_period),
            ("MACD long period", strategy.macd_long_period),
            ("MACD signal period", strategy.macd_signal_period),
        ];
        if let Some((label, _)) = periods.iter().find(|(_, p)| *p == 0) {
            return Err(invalid(&format!("{label} must be greater than zero")));
        }
        if strategy.macd_short_period >= strategy.macd_long_period {
            return Err(invalid("MACD short period must be less than the long period"));
        }

        check_thresholds("MFI", strategy.mfi_buy_threshold, strategy.mfi_sell_threshold)?;
        check_thresholds("RSI", strategy.rsi_buy_threshold, strategy.rsi_sell_threshold)?;

        if !(strategy.stop_loss_percent > 0.0) {
            return Err(invalid("stop loss must be positive"));
        }
        if !(strategy.take_profit_percent > 0.0) {
            return Err(invalid("take profit must be positive"));
        }
        if !(strategy.allocation_percent > 0.0 && strategy.allocation_percent <= 100.0) {
            return Err(invalid("allocation must be in (0, 100]"));
        }

        Ok(())
    }
}

impl Strategy {
    /// Validate this strategy
    pub fn validate(&self) -> Result<()> {
        StrategyValidator::validate(self)
    }
}

fn check_thresholds(label: &str, buy: f64, sell: f64) -> Result<()> {
    let in_range = |v: f64| (0.0..=100.0).contains(&v);
    if !in_range(buy) || !in_range(sell) {
        return Err(invalid(&format!("{label} thresholds must be within 0..=100")));
    }
    if buy >= sell {
        return Err(invalid(&format!("{label} buy threshold must be below the sell threshold")));
    }
    Ok(())
}

fn invalid(reason: &str) -> Error {
    Error::InvalidStrategy(reason.to_string())
}
