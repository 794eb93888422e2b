//! Position lifecycle: one entry and one exit order.
//!
//! A position moves `New → Opened → Closed`. The entry order has the
//! position's starting type and the exit order the complementary type.

use crate::domain::cost::{CostModelRef, zero_cost};
use crate::domain::error::TradebenchError;
use crate::domain::num::Num;
use crate::domain::order::{Order, OrderType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    New,
    Opened,
    Closed,
}

#[derive(Debug, Clone)]
pub struct Position<N: Num> {
    entry: Option<Order<N>>,
    exit: Option<Order<N>>,
    starting_type: OrderType,
    transaction_cost_model: CostModelRef<N>,
    holding_cost_model: CostModelRef<N>,
}

impl<N: Num> Position<N> {
    pub fn new(starting_type: OrderType) -> Self {
        Self::with_cost_models(starting_type, zero_cost(), zero_cost())
    }

    pub fn with_cost_models(
        starting_type: OrderType,
        transaction_cost_model: CostModelRef<N>,
        holding_cost_model: CostModelRef<N>,
    ) -> Self {
        Position {
            entry: None,
            exit: None,
            starting_type,
            transaction_cost_model,
            holding_cost_model,
        }
    }

    pub fn state(&self) -> PositionState {
        match (&self.entry, &self.exit) {
            (None, _) => PositionState::New,
            (Some(_), None) => PositionState::Opened,
            (Some(_), Some(_)) => PositionState::Closed,
        }
    }

    pub fn is_new(&self) -> bool {
        self.state() == PositionState::New
    }

    pub fn is_opened(&self) -> bool {
        self.state() == PositionState::Opened
    }

    pub fn is_closed(&self) -> bool {
        self.state() == PositionState::Closed
    }

    pub fn entry(&self) -> Option<&Order<N>> {
        self.entry.as_ref()
    }

    pub fn exit(&self) -> Option<&Order<N>> {
        self.exit.as_ref()
    }

    pub fn starting_type(&self) -> OrderType {
        self.starting_type
    }

    pub fn transaction_cost_model(&self) -> &CostModelRef<N> {
        &self.transaction_cost_model
    }

    pub fn holding_cost_model(&self) -> &CostModelRef<N> {
        &self.holding_cost_model
    }

    /// Advances the lifecycle by one order and returns it.
    ///
    /// Fails with `PositionClosed` on a closed position and with
    /// `ExitBeforeEntry` when `index` precedes the entry.
    pub fn operate(&mut self, index: usize, price: N, amount: N) -> Result<Order<N>, TradebenchError> {
        let order_type = match (&self.entry, &self.exit) {
            (None, _) => self.starting_type,
            (Some(entry), None) => {
                if index < entry.index() {
                    return Err(TradebenchError::ExitBeforeEntry {
                        entry: entry.index(),
                        exit: index,
                    });
                }
                self.starting_type.complement()
            }
            (Some(_), Some(_)) => return Err(TradebenchError::PositionClosed),
        };
        let cost = self.transaction_cost_model.calculate(price, amount);
        let order = Order::new(index, order_type, price, amount, cost);
        if self.entry.is_none() {
            self.entry = Some(order);
        } else {
            self.exit = Some(order);
        }
        Ok(order)
    }

    fn closed_orders(&self) -> Result<(&Order<N>, &Order<N>), TradebenchError> {
        match (&self.entry, &self.exit) {
            (Some(entry), Some(exit)) => Ok((entry, exit)),
            _ => Err(TradebenchError::PositionNotClosed),
        }
    }

    fn signed(&self, gross: N) -> N {
        match self.starting_type {
            OrderType::Buy => gross,
            OrderType::Sell => gross.negate(),
        }
    }

    /// Profit before costs.
    pub fn gross_profit(&self) -> Result<N, TradebenchError> {
        let (entry, exit) = self.closed_orders()?;
        Ok(self.signed(exit.value().minus(entry.value())))
    }

    /// Profit after transaction and holding costs.
    pub fn profit(&self) -> Result<N, TradebenchError> {
        Ok(self.gross_profit()?.minus(self.position_cost()))
    }

    /// Price ratio of the round trip: `exit / entry` for a long position,
    /// `2 - exit / entry` for a short one.
    pub fn gross_return(&self) -> Result<N, TradebenchError> {
        let (entry, exit) = self.closed_orders()?;
        let ratio = exit.price_per_asset().divided_by(entry.price_per_asset());
        Ok(match self.starting_type {
            OrderType::Buy => ratio,
            OrderType::Sell => N::one().plus(N::one()).minus(ratio),
        })
    }

    /// Holding cost accrued up to `current_index`.
    pub fn holding_cost(&self, current_index: usize) -> N {
        self.holding_cost_model.calculate_open(self, current_index)
    }

    /// Transaction plus holding cost of a closed position. Zero when new.
    pub fn position_cost(&self) -> N {
        self.transaction_cost_model
            .calculate_closed(self)
            .plus(self.holding_cost_model.calculate_closed(self))
    }

    /// Transaction plus holding cost as of `current_index`.
    pub fn position_cost_at(&self, current_index: usize) -> N {
        self.transaction_cost_model
            .calculate_open(self, current_index)
            .plus(self.holding_cost(current_index))
    }

    /// Mark-to-market profit of an opened position at `current_price`.
    ///
    /// A closed position reports its realised profit.
    pub fn unrealized_profit(&self, current_index: usize, current_price: N) -> Result<N, TradebenchError> {
        let entry = self.entry.as_ref().ok_or(TradebenchError::PositionNotOpened)?;
        if self.exit.is_some() {
            return self.profit();
        }
        let gross = self.signed(entry.amount().multiplied_by(current_price).minus(entry.value()));
        Ok(gross.minus(self.position_cost_at(current_index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cost::{LinearBorrowingCostModel, LinearTransactionCostModel};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    #[test]
    fn lifecycle_buy() {
        let mut position = Position::new(OrderType::Buy);
        assert!(position.is_new());

        let entry = position.operate(1, 10.0, 2.0).unwrap();
        assert!(position.is_opened());
        assert_eq!(entry.order_type(), OrderType::Buy);

        let exit = position.operate(4, 12.0, 2.0).unwrap();
        assert!(position.is_closed());
        assert_eq!(exit.order_type(), OrderType::Sell);

        assert!(matches!(
            position.operate(5, 13.0, 2.0),
            Err(TradebenchError::PositionClosed)
        ));
    }

    #[test]
    fn lifecycle_sell() {
        let mut position = Position::new(OrderType::Sell);
        assert_eq!(position.operate(0, 10.0, 1.0).unwrap().order_type(), OrderType::Sell);
        assert_eq!(position.operate(1, 8.0, 1.0).unwrap().order_type(), OrderType::Buy);
        assert_eq!(position.state(), PositionState::Closed);
    }

    #[test]
    fn exit_before_entry_rejected() {
        let mut position = Position::new(OrderType::Buy);
        position.operate(5, 10.0, 1.0).unwrap();
        let err = position.operate(3, 11.0, 1.0).unwrap_err();
        assert!(matches!(err, TradebenchError::ExitBeforeEntry { entry: 5, exit: 3 }));
        assert!(position.is_opened());
    }

    #[test]
    fn exit_on_entry_bar_allowed() {
        let mut position = Position::new(OrderType::Buy);
        position.operate(5, 10.0, 1.0).unwrap();
        assert!(position.operate(5, 10.0, 1.0).is_ok());
    }

    #[test]
    fn profit_requires_closed() {
        let mut position = Position::new(OrderType::Buy);
        assert!(matches!(position.profit(), Err(TradebenchError::PositionNotClosed)));
        position.operate(0, 10.0, 1.0).unwrap();
        assert!(matches!(position.profit(), Err(TradebenchError::PositionNotClosed)));
        assert!(position.gross_return().is_err());
    }

    #[test]
    fn long_and_short_profit() {
        let mut long = Position::new(OrderType::Buy);
        long.operate(0, 10.0, 3.0).unwrap();
        long.operate(1, 12.0, 3.0).unwrap();
        assert_relative_eq!(long.profit().unwrap(), 6.0);
        assert_relative_eq!(long.gross_return().unwrap(), 1.2);

        let mut short = Position::new(OrderType::Sell);
        short.operate(0, 10.0, 3.0).unwrap();
        short.operate(1, 12.0, 3.0).unwrap();
        assert_relative_eq!(short.profit().unwrap(), -6.0);
        assert_relative_eq!(short.gross_return().unwrap(), 0.8, epsilon = 1e-12);
    }

    #[test]
    fn profit_deducts_costs() {
        let mut position = Position::with_cost_models(
            OrderType::Sell,
            Arc::new(LinearTransactionCostModel::new(0.01)),
            Arc::new(LinearBorrowingCostModel::new(0.001)),
        );
        position.operate(0, 100.0, 1.0).unwrap();
        // entry fee 1.0, borrowing 100 * 0.001 * 10
        assert_relative_eq!(position.holding_cost(10), 1.0, epsilon = 1e-9);
        assert_relative_eq!(position.position_cost_at(10), 2.0, epsilon = 1e-9);
        assert_relative_eq!(
            position.unrealized_profit(10, 90.0).unwrap(),
            8.0,
            epsilon = 1e-9
        );

        position.operate(10, 90.0, 1.0).unwrap();
        // gross 10, fees 1.0 + 0.9, borrowing 1.0
        assert_relative_eq!(position.gross_profit().unwrap(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(position.profit().unwrap(), 7.1, epsilon = 1e-9);
    }

    #[test]
    fn unrealized_profit_requires_entry() {
        let position: Position<f64> = Position::new(OrderType::Buy);
        assert!(matches!(
            position.unrealized_profit(0, 1.0),
            Err(TradebenchError::PositionNotOpened)
        ));
    }

    #[test]
    fn order_cost_comes_from_transaction_model() {
        let mut position = Position::with_cost_models(
            OrderType::Buy,
            Arc::new(LinearTransactionCostModel::new(0.5)),
            zero_cost(),
        );
        let entry = position.operate(0, 4.0, 2.0).unwrap();
        assert_relative_eq!(entry.cost(), 4.0);
        assert_relative_eq!(entry.net_price(), 6.0);
    }
}
