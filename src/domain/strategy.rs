//! Strategy: an entry rule, an exit rule and a warm-up length.

use crate::domain::num::Num;
use crate::domain::rule::Rule;
use crate::domain::trading_record::TradingRecord;

#[derive(Debug, Clone)]
pub struct Strategy<N: Num> {
    name: String,
    entry_rule: Rule<N>,
    exit_rule: Rule<N>,
    unstable_bars: usize,
}

impl<N: Num> Strategy<N> {
    pub fn new(name: impl Into<String>, entry_rule: Rule<N>, exit_rule: Rule<N>) -> Self {
        Strategy {
            name: name.into(),
            entry_rule,
            exit_rule,
            unstable_bars: 0,
        }
    }

    /// Bars with an absolute index below `bars` never trigger an order.
    pub fn with_unstable_bars(mut self, bars: usize) -> Self {
        self.unstable_bars = bars;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry_rule(&self) -> &Rule<N> {
        &self.entry_rule
    }

    pub fn exit_rule(&self) -> &Rule<N> {
        &self.exit_rule
    }

    pub fn unstable_bars(&self) -> usize {
        self.unstable_bars
    }

    pub fn is_unstable_at(&self, index: usize) -> bool {
        index < self.unstable_bars
    }

    pub fn should_enter(&self, index: usize, record: &TradingRecord<N>) -> bool {
        !self.is_unstable_at(index) && self.entry_rule.is_satisfied(index, record)
    }

    pub fn should_exit(&self, index: usize, record: &TradingRecord<N>) -> bool {
        !self.is_unstable_at(index) && self.exit_rule.is_satisfied(index, record)
    }

    /// Consults the entry rule when flat and the exit rule when a position
    /// is open.
    pub fn should_operate(&self, index: usize, record: &TradingRecord<N>) -> bool {
        let position = record.current_position();
        if position.is_new() {
            self.should_enter(index, record)
        } else if position.is_opened() {
            self.should_exit(index, record)
        } else {
            false
        }
    }

    /// Entry and exit rules swapped.
    pub fn opposite(&self) -> Self {
        Strategy {
            name: format!("opposite({})", self.name),
            entry_rule: self.exit_rule.clone(),
            exit_rule: self.entry_rule.clone(),
            unstable_bars: self.unstable_bars,
        }
    }

    /// Enters when both strategies would enter and exits when both would exit.
    pub fn and(&self, other: &Strategy<N>) -> Self {
        Strategy {
            name: format!("and({}, {})", self.name, other.name),
            entry_rule: self.entry_rule.clone().and(other.entry_rule.clone()),
            exit_rule: self.exit_rule.clone().and(other.exit_rule.clone()),
            unstable_bars: self.unstable_bars.max(other.unstable_bars),
        }
    }

    /// Enters when either strategy would enter and exits when either would exit.
    pub fn or(&self, other: &Strategy<N>) -> Self {
        Strategy {
            name: format!("or({}, {})", self.name, other.name),
            entry_rule: self.entry_rule.clone().or(other.entry_rule.clone()),
            exit_rule: self.exit_rule.clone().or(other.exit_rule.clone()),
            unstable_bars: self.unstable_bars.max(other.unstable_bars),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderType;

    fn fixed_strategy() -> Strategy<f64> {
        Strategy::new("fixed", Rule::fixed([0, 2, 4]), Rule::fixed([1, 3, 5]))
    }

    #[test]
    fn strategy_fields() {
        let s = fixed_strategy().with_unstable_bars(2);
        assert_eq!(s.name(), "fixed");
        assert_eq!(s.unstable_bars(), 2);
        assert!(s.is_unstable_at(1));
        assert!(!s.is_unstable_at(2));
    }

    #[test]
    fn should_operate_follows_position_state() {
        let s = fixed_strategy();
        let mut record = TradingRecord::new(OrderType::Buy);
        assert!(s.should_operate(0, &record));
        assert!(!s.should_operate(1, &record));

        record.enter(0, 1.0, 1.0).unwrap();
        assert!(!s.should_operate(2, &record));
        assert!(s.should_operate(1, &record));
    }

    #[test]
    fn unstable_bars_suppress_signals() {
        let s = fixed_strategy().with_unstable_bars(3);
        let record = TradingRecord::new(OrderType::Buy);
        assert!(!s.should_enter(0, &record));
        assert!(!s.should_enter(2, &record));
        assert!(s.should_enter(4, &record));
    }

    #[test]
    fn opposite_swaps_rules() {
        let s = fixed_strategy().opposite();
        let record = TradingRecord::new(OrderType::Buy);
        assert!(s.should_enter(1, &record));
        assert!(!s.should_enter(0, &record));
        assert_eq!(s.name(), "opposite(fixed)");
    }

    #[test]
    fn combined_strategies() {
        let a: Strategy<f64> = Strategy::new("a", Rule::fixed([1, 2]), Rule::fixed([5]));
        let b = Strategy::new("b", Rule::fixed([2, 3]), Rule::fixed([6])).with_unstable_bars(2);
        let record = TradingRecord::new(OrderType::Buy);

        let both = a.and(&b);
        assert!(both.should_enter(2, &record));
        assert!(!both.should_enter(3, &record));
        assert_eq!(both.unstable_bars(), 2);

        let either = a.or(&b);
        assert!(either.should_enter(3, &record));
        assert!(!either.should_enter(1, &record));
    }
}
