//! Transaction and holding cost models.
//!
//! A position carries two models: one charged per order (transaction) and
//! one accrued while the position is held (borrowing). Both are shared
//! between the positions of a trading record.

use crate::domain::num::Num;
use crate::domain::order::OrderType;
use crate::domain::position::Position;
use std::fmt;
use std::sync::Arc;

pub trait CostModel<N: Num>: fmt::Debug + Send + Sync {
    /// Cost of `position` as of `current_index`, open or closed.
    fn calculate_open(&self, position: &Position<N>, current_index: usize) -> N;

    /// Cost of a closed position.
    fn calculate_closed(&self, position: &Position<N>) -> N;

    /// Cost of a single order of `amount` at `price`.
    fn calculate(&self, price: N, amount: N) -> N;
}

pub type CostModelRef<N> = Arc<dyn CostModel<N>>;

#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroCostModel;

impl<N: Num> CostModel<N> for ZeroCostModel {
    fn calculate_open(&self, _position: &Position<N>, _current_index: usize) -> N {
        N::zero()
    }

    fn calculate_closed(&self, _position: &Position<N>) -> N {
        N::zero()
    }

    fn calculate(&self, _price: N, _amount: N) -> N {
        N::zero()
    }
}

pub fn zero_cost<N: Num>() -> CostModelRef<N> {
    Arc::new(ZeroCostModel)
}

/// Fee proportional to traded value: `fee × price × amount` per order.
#[derive(Debug, Clone, Copy)]
pub struct LinearTransactionCostModel<N: Num> {
    fee_per_trade: N,
}

impl<N: Num> LinearTransactionCostModel<N> {
    pub fn new(fee_per_trade: N) -> Self {
        LinearTransactionCostModel { fee_per_trade }
    }

    pub fn fee_per_trade(&self) -> N {
        self.fee_per_trade
    }
}

impl<N: Num> CostModel<N> for LinearTransactionCostModel<N> {
    /// Entry cost, plus the exit cost once the position is closed.
    fn calculate_open(&self, position: &Position<N>, _current_index: usize) -> N {
        let Some(entry) = position.entry() else {
            return N::zero();
        };
        match position.exit() {
            Some(exit) => entry.cost().plus(exit.cost()),
            None => entry.cost(),
        }
    }

    fn calculate_closed(&self, position: &Position<N>) -> N {
        self.calculate_open(position, 0)
    }

    fn calculate(&self, price: N, amount: N) -> N {
        self.fee_per_trade.multiplied_by(price).multiplied_by(amount)
    }
}

/// Borrowing fee on short positions: `entry value × fee × elapsed bars`.
///
/// Long positions and single orders cost nothing.
#[derive(Debug, Clone, Copy)]
pub struct LinearBorrowingCostModel<N: Num> {
    fee_per_period: N,
}

impl<N: Num> LinearBorrowingCostModel<N> {
    pub fn new(fee_per_period: N) -> Self {
        LinearBorrowingCostModel { fee_per_period }
    }

    pub fn fee_per_period(&self) -> N {
        self.fee_per_period
    }

    fn cost_for_periods(&self, periods: usize, value: N) -> N {
        value.multiplied_by(self.fee_per_period.multiplied_by(N::num_of(periods as f64)))
    }
}

impl<N: Num> CostModel<N> for LinearBorrowingCostModel<N> {
    fn calculate_open(&self, position: &Position<N>, current_index: usize) -> N {
        let Some(entry) = position.entry() else {
            return N::zero();
        };
        if entry.order_type() != OrderType::Sell {
            return N::zero();
        }
        let until = position.exit().map_or(current_index, |exit| exit.index());
        self.cost_for_periods(until.saturating_sub(entry.index()), entry.value())
    }

    /// Zero for a position that is not closed yet.
    fn calculate_closed(&self, position: &Position<N>) -> N {
        match position.exit() {
            Some(exit) => self.calculate_open(position, exit.index()),
            None => N::zero(),
        }
    }

    fn calculate(&self, _price: N, _amount: N) -> N {
        N::zero()
    }
}
