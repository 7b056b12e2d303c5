//! Backtest report generation

use crate::backtest::{BacktestMetrics, BacktestResult, MetricsCalculator};

/// Backtest report
#[derive(Debug)]
pub struct BacktestReport {
    result: BacktestResult,
    metrics: BacktestMetrics,
}

impl BacktestReport {
    /// Create new report from result
    pub fn new(result: BacktestResult) -> Self {
        let metrics = MetricsCalculator::calculate(&result);
        Self { result, metrics }
    }

    /// Format report as string
    pub fn format(&self) -> String {
        format!(
            r#"
Backtest Results: {}
================
Period: {} ~ {}
Initial Amount: ₩{:.0}
Final Amount: ₩{:.0}
Total Return: {:.2}%
Maximum Drawdown: {:.2}%
Number of Trades: {}
Winning Trades: {}
Losing Trades: {}
Win Rate: {:.2}%
Average Win: {:.2}%
Average Loss: {:.2}%
Profit Factor: {:.2}
Expectancy: {:.2}%
Average Holding: {:.1} min
"#,
            self.result.strategy_name,
            self.result.start_date.format("%Y-%m-%d %H:%M"),
            self.result.end_date.format("%Y-%m-%d %H:%M"),
            self.result.initial_amount,
            self.result.final_amount,
            self.result.total_return_percent,
            self.result.max_drawdown_percent,
            self.result.total_trades,
            self.result.winning_trades,
            self.metrics.losing_trades,
            self.result.win_rate_percent,
            self.metrics.avg_win_percent,
            self.metrics.avg_loss_percent,
            self.metrics.profit_factor,
            self.metrics.expectancy_percent,
            self.metrics.avg_holding_minutes,
        )
    }

    /// Get result reference
    pub fn result(&self) -> &BacktestResult {
        &self.result
    }

    /// Get metrics reference
    pub fn metrics(&self) -> &BacktestMetrics {
        &self.metrics
    }
}
