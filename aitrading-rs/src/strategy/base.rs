//! Threshold strategy over MFI, RSI and MACD

use crate::indicators::{IndicatorParams, IndicatorSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Indicators a strategy can enable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndicatorKind {
    Mfi,
    Rsi,
    Macd,
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mfi => write!(f, "MFI"),
            Self::Rsi => write!(f, "RSI"),
            Self::Macd => write!(f, "MACD"),
        }
    }
}

/// Named trading strategy: enabled indicators, thresholds and risk settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: Uuid,
    /// Strategy name
    pub name: String,
    /// Enabled indicators
    pub indicators: BTreeSet<IndicatorKind>,

    /// Buy when MFI <= this
    pub mfi_buy_threshold: f64,
    /// Sell when MFI >= this
    pub mfi_sell_threshold: f64,
    pub mfi_period: usize,

    /// Buy when RSI <= this
    pub rsi_buy_threshold: f64,
    /// Sell when RSI >= this
    pub rsi_sell_threshold: f64,
    pub rsi_period: usize,

    pub macd_short_period: usize,
    pub macd_long_period: usize,
    pub macd_signal_period: usize,

    /// Exit when the open position loses this many percent
    pub stop_loss_percent: f64,
    /// Exit when the open position gains this many percent
    pub take_profit_percent: f64,
    /// Share of cash invested per entry, in percent
    pub allocation_percent: f64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Default for Strategy {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: "New Strategy".to_string(),
            indicators: BTreeSet::from([IndicatorKind::Mfi]),
            mfi_buy_threshold: 20.0,
            mfi_sell_threshold: 80.0,
            mfi_period: 14,
            rsi_buy_threshold: 30.0,
            rsi_sell_threshold: 70.0,
            rsi_period: 14,
            macd_short_period: 12,
            macd_long_period: 26,
            macd_signal_period: 9,
            stop_loss_percent: 5.0,
            take_profit_percent: 10.0,
            allocation_percent: 10.0,
            created_at: now,
            updated_at: now,
            is_active: false,
        }
    }
}

impl Strategy {
    /// Create new strategy with default thresholds
    pub fn new(name: impl Into<String>, indicators: impl IntoIterator<Item = IndicatorKind>) -> Self {
        Self {
            name: name.into(),
            indicators: indicators.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Independent copy with a fresh identity, inactive
    pub fn duplicate(&self) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: format!("{} Copy", self.name),
            created_at: now,
            updated_at: now,
            is_active: false,
            ..self.clone()
        }
    }

    /// Mark as modified
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Check if an indicator is enabled
    pub fn uses(&self, kind: IndicatorKind) -> bool {
        self.indicators.contains(&kind)
    }

    /// Periods needed to annotate candles for this strategy
    pub fn indicator_params(&self) -> IndicatorParams {
        IndicatorParams {
            mfi_period: self.mfi_period,
            rsi_period: self.rsi_period,
            macd_short_period: self.macd_short_period,
            macd_long_period: self.macd_long_period,
            macd_signal_period: self.macd_signal_period,
        }
    }

    /// Entry rule: every evaluated indicator must agree.
    ///
    /// An indicator is evaluated when it is enabled and its input is present
    /// (MACD needs both the line and the signal). Returns `false` when
    /// nothing could be evaluated.
    pub fn should_buy(
        &self,
        mfi: Option<f64>,
        rsi: Option<f64>,
        macd: Option<f64>,
        signal: Option<f64>,
    ) -> bool {
        let votes = self.votes(
            mfi,
            rsi,
            macd,
            signal,
            |v| v <= self.mfi_buy_threshold,
            |v| v <= self.rsi_buy_threshold,
            |m, s| m > s,
        );
        !votes.is_empty() && votes.iter().all(|&v| v)
    }

    /// Exit rule: any evaluated indicator is enough
    pub fn should_sell(
        &self,
        mfi: Option<f64>,
        rsi: Option<f64>,
        macd: Option<f64>,
        signal: Option<f64>,
    ) -> bool {
        self.votes(
            mfi,
            rsi,
            macd,
            signal,
            |v| v >= self.mfi_sell_threshold,
            |v| v >= self.rsi_sell_threshold,
            |m, s| m < s,
        )
        .into_iter()
        .any(|v| v)
    }

    /// `should_buy` over an indicator snapshot
    pub fn should_buy_at(&self, snapshot: &IndicatorSnapshot) -> bool {
        self.should_buy(snapshot.mfi, snapshot.rsi, snapshot.macd, snapshot.signal)
    }

    /// `should_sell` over an indicator snapshot
    pub fn should_sell_at(&self, snapshot: &IndicatorSnapshot) -> bool {
        self.should_sell(snapshot.mfi, snapshot.rsi, snapshot.macd, snapshot.signal)
    }

    #[allow(clippy::too_many_arguments)]
    fn votes(
        &self,
        mfi: Option<f64>,
        rsi: Option<f64>,
        macd: Option<f64>,
        signal: Option<f64>,
        mfi_rule: impl Fn(f64) -> bool,
        rsi_rule: impl Fn(f64) -> bool,
        macd_rule: impl Fn(f64, f64) -> bool,
    ) -> Vec<bool> {
        let mut votes = Vec::with_capacity(3);
        if let (true, Some(v)) = (self.uses(IndicatorKind::Mfi), mfi) {
            votes.push(mfi_rule(v));
        }
        if let (true, Some(v)) = (self.uses(IndicatorKind::Rsi), rsi) {
            votes.push(rsi_rule(v));
        }
        if let (true, Some(m), Some(s)) = (self.uses(IndicatorKind::Macd), macd, signal) {
            votes.push(macd_rule(m, s));
        }
        votes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let strategy = Strategy::default();
        assert_eq!(strategy.indicators, BTreeSet::from([IndicatorKind::Mfi]));
        assert_eq!(strategy.mfi_period, 14);
        assert_eq!(strategy.macd_long_period, 26);
        assert_eq!(strategy.allocation_percent, 10.0);
        assert!(!strategy.is_active);
    }

    #[test]
    fn test_buy_requires_all_evaluated() {
        let strategy = Strategy::new("combo", [IndicatorKind::Mfi, IndicatorKind::Rsi]);

        assert!(strategy.should_buy(Some(15.0), Some(25.0), None, None));
        assert!(!strategy.should_buy(Some(15.0), Some(45.0), None, None));
        // RSI missing: only MFI is evaluated
        assert!(strategy.should_buy(Some(15.0), None, None, None));
        assert!(!strategy.should_buy(None, None, None, None));
    }

    #[test]
    fn test_disabled_indicators_are_ignored() {
        let strategy = Strategy::new("mfi only", [IndicatorKind::Mfi]);
        assert!(!strategy.should_buy(None, Some(5.0), Some(2.0), Some(1.0)));
        assert!(!strategy.should_sell(None, Some(95.0), Some(1.0), Some(2.0)));
    }

    #[test]
    fn test_sell_on_any_signal() {
        let strategy = Strategy::new(
            "all",
            [IndicatorKind::Mfi, IndicatorKind::Rsi, IndicatorKind::Macd],
        );
        assert!(strategy.should_sell(Some(50.0), Some(50.0), Some(1.0), Some(2.0)));
        assert!(strategy.should_sell(Some(85.0), Some(50.0), Some(3.0), Some(2.0)));
        assert!(!strategy.should_sell(Some(50.0), Some(50.0), Some(3.0), Some(2.0)));
    }

    #[test]
    fn test_macd_needs_signal() {
        let strategy = Strategy::new("macd", [IndicatorKind::Macd]);
        assert!(!strategy.should_buy(None, None, Some(3.0), None));
        assert!(strategy.should_buy(None, None, Some(3.0), Some(2.0)));
        assert!(!strategy.should_buy(None, None, Some(2.0), Some(2.0)));
    }

    #[test]
    fn test_duplicate_is_independent() {
        let mut original = Strategy::new("Scalper", [IndicatorKind::Rsi]);
        original.is_active = true;
        let copy = original.duplicate();

        assert_ne!(copy.id, original.id);
        assert_eq!(copy.name, "Scalper Copy");
        assert_eq!(copy.indicators, original.indicators);
        assert_eq!(copy.rsi_buy_threshold, original.rsi_buy_threshold);
        assert!(!copy.is_active);
    }
}
