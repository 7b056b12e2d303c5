//! Backtesting engine

use crate::data::{Candle, CandleStore};
use crate::indicators::{IndicatorSeries, IndicatorSnapshot};
use crate::portfolio::Position;
use crate::strategy::Strategy;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Fewest candles a backtest will run on
pub const MIN_BACKTEST_CANDLES: usize = 100;

/// Default starting cash (KRW)
pub const DEFAULT_INITIAL_AMOUNT: f64 = 10_000_000.0;

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Strategy sell rule fired
    Signal,
    StopLoss,
    TakeProfit,
    /// Liquidated at the last candle
    EndOfData,
}

/// Trade record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub side: TradeSide,
    pub price: f64,
    /// Quantity bought or sold
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
    pub mfi: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    /// Realized return of the round trip, sells only
    pub profit_percent: Option<f64>,
    /// Sells only
    pub exit_reason: Option<ExitReason>,
}

impl Trade {
    fn buy(candle: &Candle, amount: f64, snapshot: &IndicatorSnapshot) -> Self {
        Self {
            side: TradeSide::Buy,
            price: candle.close,
            amount,
            timestamp: candle.timestamp,
            mfi: snapshot.mfi,
            rsi: snapshot.rsi,
            macd: snapshot.macd,
            profit_percent: None,
            exit_reason: None,
        }
    }

    fn sell(
        candle: &Candle,
        amount: f64,
        snapshot: &IndicatorSnapshot,
        profit_percent: f64,
        reason: ExitReason,
    ) -> Self {
        Self {
            side: TradeSide::Sell,
            price: candle.close,
            amount,
            timestamp: candle.timestamp,
            mfi: snapshot.mfi,
            rsi: snapshot.rsi,
            macd: snapshot.macd,
            profit_percent: Some(profit_percent),
            exit_reason: Some(reason),
        }
    }
}

/// Backtest result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub strategy_name: String,
    /// Starting cash
    pub initial_amount: f64,
    /// Cash after the final liquidation
    pub final_amount: f64,
    pub total_return_percent: f64,
    /// Largest peak-to-trough equity decline
    pub max_drawdown_percent: f64,
    /// Number of entries
    pub total_trades: usize,
    /// Exits with a positive return
    pub winning_trades: usize,
    pub win_rate_percent: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Buys and sells in execution order
    pub trades: Vec<Trade>,
}

impl BacktestResult {
    /// Sell trades only
    pub fn exits(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(|t| t.side == TradeSide::Sell)
    }
}

/// Backtesting engine
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    /// Initial balance
    pub initial_amount: f64,
}

impl Default for BacktestEngine {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_AMOUNT)
    }
}

impl BacktestEngine {
    /// Create new backtest engine
    pub fn new(initial_amount: f64) -> Self {
        Self { initial_amount }
    }

    /// Replay `candles` (oldest first) through `strategy`
    pub fn run(&self, strategy: &Strategy, candles: &[Candle]) -> Result<BacktestResult> {
        if candles.len() < MIN_BACKTEST_CANDLES {
            return Err(Error::InsufficientData {
                required: MIN_BACKTEST_CANDLES,
                available: candles.len(),
            });
        }
        strategy.validate()?;
        let (Some(first), Some(last)) = (candles.first(), candles.last()) else {
            return Err(Error::InsufficientData {
                required: MIN_BACKTEST_CANDLES,
                available: 0,
            });
        };

        info!(
            strategy = %strategy.name,
            candles = candles.len(),
            initial_amount = self.initial_amount,
            "Starting backtest"
        );

        let series = IndicatorSeries::compute(candles, &strategy.indicator_params());
        let mut cash = self.initial_amount;
        let mut position: Option<Position> = None;
        let mut trades = Vec::new();
        let mut total_trades = 0;
        let mut winning_trades = 0;
        let mut peak = self.initial_amount;
        let mut max_drawdown = 0.0_f64;

        for (i, candle) in candles.iter().enumerate() {
            let snapshot = series.at(i);

            match position.as_mut() {
                None => {
                    if strategy.should_buy_at(&snapshot) {
                        let invest = cash * strategy.allocation_percent / 100.0;
                        // no quantity can be bought at a non-positive price
                        if invest > 0.0 && candle.close > 0.0 {
                            let opened = Position::open(
                                &candle.market,
                                candle.close,
                                invest,
                                candle.timestamp,
                            );
                            cash -= invest;
                            debug!(price = candle.close, quantity = opened.quantity, "Buy");
                            trades.push(Trade::buy(candle, opened.quantity, &snapshot));
                            total_trades += 1;
                            position = Some(opened);
                        }
                    }
                }
                Some(open) => {
                    open.update_price(candle.close);
                    if let Some(reason) = exit_reason(strategy, open, &snapshot) {
                        let profit = open.unrealized_pnl_percent();
                        cash += open.value();
                        if profit > 0.0 {
                            winning_trades += 1;
                        }
                        debug!(price = candle.close, profit, ?reason, "Sell");
                        trades.push(Trade::sell(candle, open.quantity, &snapshot, profit, reason));
                        position = None;
                    }
                }
            }

            let equity = cash + position.as_ref().map_or(0.0, Position::value);
            if equity > peak {
                peak = equity;
            }
            if peak > 0.0 {
                max_drawdown = max_drawdown.max((peak - equity) / peak * 100.0);
            }
        }

        if let Some(open) = position.take() {
            let profit = open.unrealized_pnl_percent();
            cash += open.value();
            if profit > 0.0 {
                winning_trades += 1;
            }
            let snapshot = series.at(candles.len() - 1);
            trades.push(Trade::sell(last, open.quantity, &snapshot, profit, ExitReason::EndOfData));
        }

        let total_return_percent = if self.initial_amount == 0.0 {
            0.0
        } else {
            (cash - self.initial_amount) / self.initial_amount * 100.0
        };
        let win_rate_percent = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };

        info!(
            strategy = %strategy.name,
            final_amount = cash,
            total_return_percent,
            total_trades,
            "Backtest finished"
        );

        Ok(BacktestResult {
            strategy_name: strategy.name.clone(),
            initial_amount: self.initial_amount,
            final_amount: cash,
            total_return_percent,
            max_drawdown_percent: max_drawdown,
            total_trades,
            winning_trades,
            win_rate_percent,
            start_date: first.timestamp,
            end_date: last.timestamp,
            trades,
        })
    }

    /// Load `market` candles from a store and run
    pub async fn run_for_market<S>(
        &self,
        store: &S,
        market: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        strategy: &Strategy,
    ) -> Result<BacktestResult>
    where
        S: CandleStore + ?Sized,
    {
        let candles = store.query(market, start, end).await?;
        self.run(strategy, &candles)
    }
}

/// Stop-loss first, then take-profit, then the strategy's sell rule
fn exit_reason(
    strategy: &Strategy,
    position: &Position,
    snapshot: &IndicatorSnapshot,
) -> Option<ExitReason> {
    if position.is_stop_loss_hit(strategy.stop_loss_percent) {
        Some(ExitReason::StopLoss)
    } else if position.is_take_profit_hit(strategy.take_profit_percent) {
        Some(ExitReason::TakeProfit)
    } else if strategy.should_sell_at(snapshot) {
        Some(ExitReason::Signal)
    } else {
        None
    }
}
