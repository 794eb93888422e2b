//! Single-window backtest loop.
//!
//! BacktestConfig carries the trading parameters shared with the
//! walk-forward runner.

use crate::domain::cost::{CostModelRef, LinearBorrowingCostModel, LinearTransactionCostModel, zero_cost};
use crate::domain::error::TradebenchError;
use crate::domain::num::Num;
use crate::domain::order::{Order, OrderType};
use crate::domain::series::BarSeries;
use crate::domain::strategy::Strategy;
use crate::domain::trading_record::TradingRecord;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub starting_type: OrderType,
    pub amount: f64,
    /// Fraction of traded value charged per order.
    pub transaction_fee: f64,
    /// Fraction of short entry value charged per bar held.
    pub borrowing_fee: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            starting_type: OrderType::Buy,
            amount: 1.0,
            transaction_fee: 0.0,
            borrowing_fee: 0.0,
        }
    }
}

impl BacktestConfig {
    pub fn transaction_cost_model<N: Num>(&self) -> CostModelRef<N> {
        if self.transaction_fee == 0.0 {
            zero_cost()
        } else {
            Arc::new(LinearTransactionCostModel::new(N::num_of(self.transaction_fee)))
        }
    }

    pub fn holding_cost_model<N: Num>(&self) -> CostModelRef<N> {
        if self.borrowing_fee == 0.0 {
            zero_cost()
        } else {
            Arc::new(LinearBorrowingCostModel::new(N::num_of(self.borrowing_fee)))
        }
    }

    /// An empty record wired with this configuration's cost models.
    pub fn new_record<N: Num>(&self) -> TradingRecord<N> {
        TradingRecord::with_cost_models(
            self.starting_type,
            self.transaction_cost_model(),
            self.holding_cost_model(),
        )
    }
}

/// Consults the strategy at `index` and, on a signal, trades the configured
/// amount at the bar close.
pub(crate) fn step<N: Num>(
    series: &BarSeries<N>,
    strategy: &Strategy<N>,
    record: &mut TradingRecord<N>,
    index: usize,
    amount: N,
) -> Result<Option<Order<N>>, TradebenchError> {
    if !strategy.should_operate(index, record) {
        return Ok(None);
    }
    let order = record.operate(index, series.bar(index).close, amount)?;
    tracing::debug!(
        strategy = strategy.name(),
        index,
        side = %order.order_type(),
        price = %order.price_per_asset(),
        "order filled"
    );
    Ok(Some(order))
}

/// Runs `strategy` over the whole window of `series`.
///
/// A position still open at the end of the window stays open in the
/// returned record.
pub fn run_backtest<N: Num>(
    series: &BarSeries<N>,
    strategy: &Strategy<N>,
    config: &BacktestConfig,
) -> Result<TradingRecord<N>, TradebenchError> {
    let mut record = config.new_record();
    let amount = N::num_of(config.amount);
    for index in series.indices() {
        step(series, strategy, &mut record, index, amount)?;
    }
    tracing::info!(
        strategy = strategy.name(),
        series = series.name(),
        bars = series.len(),
        positions = record.position_count(),
        open = !record.is_closed(),
        "backtest complete"
    );
    Ok(record)
}
