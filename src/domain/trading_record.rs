//! Ordered history of positions and orders.

use crate::domain::cost::{CostModelRef, zero_cost};
use crate::domain::error::TradebenchError;
use crate::domain::num::Num;
use crate::domain::order::{Order, OrderType};
use crate::domain::position::Position;
use std::sync::Arc;

/// Closed positions in entry order, at most one current position, and every
/// order in the sequence it was executed.
#[derive(Debug, Clone)]
pub struct TradingRecord<N: Num> {
    starting_type: OrderType,
    positions: Vec<Position<N>>,
    current: Position<N>,
    orders: Vec<Order<N>>,
    transaction_cost_model: CostModelRef<N>,
    holding_cost_model: CostModelRef<N>,
}

impl<N: Num> TradingRecord<N> {
    pub fn new(starting_type: OrderType) -> Self {
        Self::with_cost_models(starting_type, zero_cost(), zero_cost())
    }

    pub fn with_cost_models(
        starting_type: OrderType,
        transaction_cost_model: CostModelRef<N>,
        holding_cost_model: CostModelRef<N>,
    ) -> Self {
        let current = Position::with_cost_models(
            starting_type,
            Arc::clone(&transaction_cost_model),
            Arc::clone(&holding_cost_model),
        );
        TradingRecord {
            starting_type,
            positions: Vec::new(),
            current,
            orders: Vec::new(),
            transaction_cost_model,
            holding_cost_model,
        }
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

    /// Applies one order to the current position. A position closed by
    /// this order is appended to the history and replaced by a new one.
    /// Entries may not precede the last order.
    pub fn operate(&mut self, index: usize, price: N, amount: N) -> Result<Order<N>, TradebenchError> {
        if self.current.is_new() {
            if let Some(last) = self.orders.last().map(Order::index).filter(|&last| index < last) {
                return Err(TradebenchError::EntryBeforeLastExit { last, entry: index });
            }
        }
        let order = self.current.operate(index, price, amount)?;
        self.orders.push(order);
        if self.current.is_closed() {
            let fresh = Position::with_cost_models(
                self.starting_type,
                Arc::clone(&self.transaction_cost_model),
                Arc::clone(&self.holding_cost_model),
            );
            let closed = std::mem::replace(&mut self.current, fresh);
            self.positions.push(closed);
        }
        Ok(order)
    }

    /// Opens a position if none is open. Returns whether an order was placed.
    pub fn enter(&mut self, index: usize, price: N, amount: N) -> Result<bool, TradebenchError> {
        if !self.current.is_new() {
            return Ok(false);
        }
        self.operate(index, price, amount)?;
        Ok(true)
    }

    /// Closes the current position if one is open. Returns whether an order
    /// was placed.
    pub fn exit(&mut self, index: usize, price: N, amount: N) -> Result<bool, TradebenchError> {
        if !self.current.is_opened() {
            return Ok(false);
        }
        self.operate(index, price, amount)?;
        Ok(true)
    }

    /// True when no position is open.
    pub fn is_closed(&self) -> bool {
        !self.current.is_opened()
    }

    pub fn current_position(&self) -> &Position<N> {
        &self.current
    }

    pub fn positions(&self) -> &[Position<N>] {
        &self.positions
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn last_position(&self) -> Option<&Position<N>> {
        self.positions.last()
    }

    pub fn orders(&self) -> &[Order<N>] {
        &self.orders
    }

    pub fn last_order(&self) -> Option<&Order<N>> {
        self.orders.last()
    }

    pub fn last_order_of(&self, order_type: OrderType) -> Option<&Order<N>> {
        self.orders.iter().rev().find(|o| o.order_type() == order_type)
    }

    pub fn last_entry(&self) -> Option<&Order<N>> {
        self.last_order_of(self.starting_type)
    }

    pub fn last_exit(&self) -> Option<&Order<N>> {
        self.last_order_of(self.starting_type.complement())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_empty() {
        let record: TradingRecord<f64> = TradingRecord::new(OrderType::Buy);
        assert!(record.is_closed());
        assert_eq!(record.position_count(), 0);
        assert!(record.last_order().is_none());
        assert!(record.current_position().is_new());
    }

    #[test]
    fn operate_closes_and_renews_position() {
        let mut record = TradingRecord::new(OrderType::Buy);
        record.operate(0, 3.0, 1.0).unwrap();
        assert!(!record.is_closed());
        assert!(record.current_position().is_opened());

        record.operate(1, 5.0, 1.0).unwrap();
        assert!(record.is_closed());
        assert_eq!(record.position_count(), 1);
        assert!(record.current_position().is_new());
        assert_eq!(record.orders().len(), 2);
    }

    #[test]
    fn enter_only_when_flat() {
        let mut record = TradingRecord::new(OrderType::Buy);
        assert!(record.enter(0, 3.0, 1.0).unwrap());
        assert!(!record.enter(1, 4.0, 1.0).unwrap());
        assert!(record.exit(2, 5.0, 1.0).unwrap());
        assert!(!record.exit(3, 6.0, 1.0).unwrap());
        assert_eq!(record.position_count(), 1);
    }

    #[test]
    fn last_orders_by_type() {
        let mut record = TradingRecord::new(OrderType::Sell);
        record.enter(0, 10.0, 1.0).unwrap();
        record.exit(2, 9.0, 1.0).unwrap();
        record.enter(4, 8.0, 1.0).unwrap();

        assert_eq!(record.last_order().unwrap().index(), 4);
        assert_eq!(record.last_entry().unwrap().index(), 4);
        assert_eq!(record.last_exit().unwrap().index(), 2);
        assert_eq!(record.last_order_of(OrderType::Buy).unwrap().index(), 2);
    }

    #[test]
    fn positions_keep_entry_order() {
        let mut record = TradingRecord::new(OrderType::Buy);
        for (entry, exit) in [(0, 1), (2, 3), (5, 9)] {
            record.enter(entry, 1.0, 1.0).unwrap();
            record.exit(exit, 1.0, 1.0).unwrap();
        }
        let entries: Vec<usize> = record
            .positions()
            .iter()
            .map(|p| p.entry().unwrap().index())
            .collect();
        assert_eq!(entries, vec![0, 2, 5]);
    }

    #[test]
    fn failed_exit_leaves_record_untouched() {
        let mut record = TradingRecord::new(OrderType::Buy);
        record.enter(5, 1.0, 1.0).unwrap();
        assert!(record.exit(2, 1.0, 1.0).is_err());
        assert_eq!(record.orders().len(), 1);
        assert!(record.current_position().is_opened());
    }

    #[test]
    fn entries_stay_in_order() {
        let mut record = TradingRecord::new(OrderType::Buy);
        record.enter(10, 1.0, 1.0).unwrap();
        record.exit(12, 1.0, 1.0).unwrap();
        assert!(matches!(
            record.enter(3, 1.0, 1.0),
            Err(TradebenchError::EntryBeforeLastExit { last: 12, entry: 3 })
        ));
        assert_eq!(record.orders().len(), 2);
        assert!(record.current_position().is_new());

        assert!(record.enter(12, 1.0, 1.0).unwrap());
        record.exit(14, 1.0, 1.0).unwrap();
        let entries: Vec<usize> = record
            .positions()
            .iter()
            .map(|p| p.entry().unwrap().index())
            .collect();
        assert_eq!(entries, vec![10, 12]);
    }
}
