//! Built-in strategy templates

use crate::strategy::{IndicatorKind, Strategy};

impl Strategy {
    /// MFI 20/80, stop-loss 5%, take-profit 10%, allocation 10%
    pub fn conservative() -> Self {
        Self {
            mfi_buy_threshold: 20.0,
            mfi_sell_threshold: 80.0,
            stop_loss_percent: 5.0,
            take_profit_percent: 10.0,
            allocation_percent: 10.0,
            ..Self::new("Conservative MFI", [IndicatorKind::Mfi])
        }
    }

    /// MFI 30/70, stop-loss 10%, take-profit 15%, allocation 20%
    pub fn aggressive() -> Self {
        Self {
            mfi_buy_threshold: 30.0,
            mfi_sell_threshold: 70.0,
            stop_loss_percent: 10.0,
            take_profit_percent: 15.0,
            allocation_percent: 20.0,
            ..Self::new("Aggressive MFI", [IndicatorKind::Mfi])
        }
    }

    /// MACD crossover, stop-loss 5%, take-profit 10%, allocation 15%
    pub fn macd_basic() -> Self {
        Self {
            stop_loss_percent: 5.0,
            take_profit_percent: 10.0,
            allocation_percent: 15.0,
            ..Self::new("MACD Crossover", [IndicatorKind::Macd])
        }
    }

    /// MFI 25/75 with RSI 35/65, stop-loss 7%, take-profit 12%, allocation 15%
    pub fn combined() -> Self {
        Self {
            mfi_buy_threshold: 25.0,
            mfi_sell_threshold: 75.0,
            rsi_buy_threshold: 35.0,
            rsi_sell_threshold: 65.0,
            stop_loss_percent: 7.0,
            take_profit_percent: 12.0,
            allocation_percent: 15.0,
            ..Self::new("MFI + RSI Combined", [IndicatorKind::Mfi, IndicatorKind::Rsi])
        }
    }

    /// All built-in templates
    pub fn templates() -> Vec<Self> {
        vec![
            Self::conservative(),
            Self::aggressive(),
            Self::macd_basic(),
            Self::combined(),
        ]
    }

    /// Look up a template by its short key
    pub fn template(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "conservative" => Some(Self::conservative()),
            "aggressive" => Some(Self::aggressive()),
            "macd" => Some(Self::macd_basic()),
            "combined" => Some(Self::combined()),
            _ => None,
        }
    }
}
