//! Position tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Open long position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Market code (e.g., "KRW-BTC")
    pub market: String,
    /// Entry price
    pub entry_price: f64,
    /// Current price
    pub current_price: f64,
    /// Quantity
    pub quantity: f64,
    /// Cash spent on entry
    pub invested: f64,
    /// Entry time
    pub entry_time: DateTime<Utc>,
}

impl Position {
    /// Open a position by spending `invested` at `entry_price`
    pub fn open(
        market: impl Into<String>,
        entry_price: f64,
        invested: f64,
        entry_time: DateTime<Utc>,
    ) -> Self {
        Self {
            market: market.into(),
            entry_price,
            current_price: entry_price,
            quantity: invested / entry_price,
            invested,
            entry_time,
        }
    }

    /// Update current price
    pub fn update_price(&mut self, price: f64) {
        self.current_price = price;
    }

    /// Get position value
    pub fn value(&self) -> f64 {
        self.current_price * self.quantity
    }

    /// Unrealized P&L
    pub fn unrealized_pnl(&self) -> f64 {
        self.value() - self.invested
    }

    /// Unrealized P&L relative to the invested amount, in percent
    pub fn unrealized_pnl_percent(&self) -> f64 {
        if self.invested == 0.0 {
            return 0.0;
        }
        self.unrealized_pnl() / self.invested * 100.0
    }

    /// Loss reached `stop_loss_percent`
    pub fn is_stop_loss_hit(&self, stop_loss_percent: f64) -> bool {
        self.unrealized_pnl_percent() <= -stop_loss_percent
    }

    /// Gain reached `take_profit_percent`
    pub fn is_take_profit_hit(&self, take_profit_percent: f64) -> bool {
        self.unrealized_pnl_percent() >= take_profit_percent
    }
}
