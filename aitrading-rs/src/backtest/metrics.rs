//! Backtest performance metrics

use crate::backtest::{BacktestResult, TradeSide};
use serde::{Deserialize, Serialize};

/// Per-exit statistics derived from a trade log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub losing_trades: usize,
    /// Mean return of winning exits, percent
    pub avg_win_percent: f64,
    /// Mean return of losing exits, percent (negative)
    pub avg_loss_percent: f64,
    pub profit_factor: f64,
    /// Expected return per exit, percent
    pub expectancy_percent: f64,
    /// Mean time between entry and exit
    pub avg_holding_minutes: f64,
}

/// Calculate additional metrics from backtest result
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Compute every metric
    pub fn calculate(result: &BacktestResult) -> BacktestMetrics {
        let returns = Self::exit_returns(result);
        let wins: Vec<f64> = returns.iter().copied().filter(|r| *r > 0.0).collect();
        let losses: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();

        BacktestMetrics {
            losing_trades: losses.len(),
            avg_win_percent: mean(&wins),
            avg_loss_percent: mean(&losses),
            profit_factor: Self::profit_factor(result),
            expectancy_percent: Self::expectancy(result),
            avg_holding_minutes: Self::avg_trade_duration(result),
        }
    }

    /// Gross winning return over gross losing return
    pub fn profit_factor(result: &BacktestResult) -> f64 {
        let returns = Self::exit_returns(result);
        let gross_win: f64 = returns.iter().filter(|r| **r > 0.0).sum();
        let gross_loss: f64 = returns.iter().filter(|r| **r < 0.0).sum::<f64>().abs();
        if gross_loss == 0.0 {
            return 0.0;
        }
        gross_win / gross_loss
    }

    /// Mean return per exit
    pub fn expectancy(result: &BacktestResult) -> f64 {
        mean(&Self::exit_returns(result))
    }

    /// Average minutes between each buy and the sell that closes it
    pub fn avg_trade_duration(result: &BacktestResult) -> f64 {
        let mut entry = None;
        let mut durations = Vec::new();
        for trade in &result.trades {
            match trade.side {
                TradeSide::Buy => entry = Some(trade.timestamp),
                TradeSide::Sell => {
                    if let Some(opened) = entry.take() {
                        durations.push((trade.timestamp - opened).num_seconds() as f64 / 60.0);
                    }
                }
            }
        }
        mean(&durations)
    }

    fn exit_returns(result: &BacktestResult) -> Vec<f64> {
        result.exits().filter_map(|t| t.profit_percent).collect()
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::{ExitReason, Trade};
    use chrono::{Duration, TimeZone, Utc};

    fn trade(side: TradeSide, minute: i64, profit: Option<f64>) -> Trade {
        Trade {
            side,
            price: 100.0,
            amount: 1.0,
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::minutes(minute),
            mfi: None,
            rsi: None,
            macd: None,
            profit_percent: profit,
            exit_reason: profit.map(|_| ExitReason::Signal),
        }
    }

    #[test]
    fn test_metrics_from_trade_log() {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let result = BacktestResult {
            strategy_name: "test".into(),
            initial_amount: 1_000.0,
            final_amount: 1_010.0,
            total_return_percent: 1.0,
            max_drawdown_percent: 0.5,
            total_trades: 2,
            winning_trades: 1,
            win_rate_percent: 50.0,
            start_date: start,
            end_date: start + Duration::minutes(100),
            trades: vec![
                trade(TradeSide::Buy, 0, None),
                trade(TradeSide::Sell, 10, Some(6.0)),
                trade(TradeSide::Buy, 20, None),
                trade(TradeSide::Sell, 50, Some(-2.0)),
            ],
        };

        let metrics = MetricsCalculator::calculate(&result);
        assert_eq!(metrics.losing_trades, 1);
        assert_eq!(metrics.avg_win_percent, 6.0);
        assert_eq!(metrics.avg_loss_percent, -2.0);
        assert_eq!(metrics.profit_factor, 3.0);
        assert_eq!(metrics.expectancy_percent, 2.0);
        assert_eq!(metrics.avg_holding_minutes, 20.0);
    }
}
