//! Rule evaluation.
//!
//! # Evaluation Semantics
//!
//! - Comparisons read both indicators at the same index; a NaN side is false
//! - `CrossedUp`/`CrossedDown`: false at the first bar of the left series
//! - `StopLoss`/`StopGain`/`OpenedPosition`: false without an open position
//! - `WaitFor`: false until an order of the given type exists
//! - `And`: short-circuits on first `false`
//! - `Or`: short-circuits on first `true`
//! - `Consecutive(rule, N)`: child true for N consecutive bars ending at current
//! - `AnyOf(rule, N)`: child true at least once in the last N bars

use crate::domain::indicator::IndicatorRef;
use crate::domain::num::Num;
use crate::domain::order::OrderType;
use crate::domain::rule::Rule;
use crate::domain::trading_record::TradingRecord;

impl<N: Num> Rule<N> {
    pub fn is_satisfied(&self, index: usize, record: &TradingRecord<N>) -> bool {
        evaluate(self, index, record)
    }
}

pub fn evaluate<N: Num>(rule: &Rule<N>, index: usize, record: &TradingRecord<N>) -> bool {
    match rule {
        Rule::Fixed(indices) => indices.contains(&index),
        Rule::Boolean(value) => *value,
        Rule::Over { left, right } => left.value(index).is_greater_than(right.value(index)),
        Rule::Under { left, right } => left.value(index).is_less_than(right.value(index)),
        Rule::CrossedUp { left, right } => crossed(left, right, index),
        Rule::CrossedDown { left, right } => crossed(right, left, index),
        Rule::InRange {
            indicator,
            lower,
            upper,
        } => {
            let value = indicator.value(index);
            let low = lower.value(index);
            let high = upper.value(index);
            !(value.is_nan() || low.is_nan() || high.is_nan())
                && !value.is_less_than(low)
                && !value.is_greater_than(high)
        }
        Rule::StopLoss { price, loss_pct } => stop_hit(record, price, index, *loss_pct, true),
        Rule::StopGain { price, gain_pct } => stop_hit(record, price, index, *gain_pct, false),
        Rule::WaitFor { order_type, bars } => record
            .last_order_of(*order_type)
            .is_some_and(|order| index.saturating_sub(order.index()) >= *bars),
        Rule::OpenedPosition => record.current_position().is_opened(),
        Rule::Predicate(predicate) => predicate.test(index, record),
        Rule::Consecutive { rule, count } => {
            if index + 1 < *count {
                return false;
            }
            for i in (index + 1 - *count)..=index {
                if !evaluate(rule, i, record) {
                    return false;
                }
            }
            true
        }
        Rule::AnyOf { rule, count } => {
            if *count == 0 {
                return false;
            }
            let start = index.saturating_sub(*count - 1);
            for i in start..=index {
                if evaluate(rule, i, record) {
                    return true;
                }
            }
            false
        }
        Rule::And(rules) => {
            for r in rules {
                if !evaluate(r, index, record) {
                    return false;
                }
            }
            true
        }
        Rule::Or(rules) => {
            for r in rules {
                if evaluate(r, index, record) {
                    return true;
                }
            }
            false
        }
        Rule::Not(rule) => !evaluate(rule, index, record),
    }
}

/// `upper` moved above `lower` at `index`: strictly above now, and at or
/// below on the previous bar.
fn crossed<N: Num>(upper: &IndicatorRef<N>, lower: &IndicatorRef<N>, index: usize) -> bool {
    if index <= upper.series().begin_index() {
        return false;
    }
    let now_above = upper.value(index).is_greater_than(lower.value(index));
    if !now_above {
        return false;
    }
    let prev_upper = upper.value(index - 1);
    let prev_lower = lower.value(index - 1);
    !prev_upper.is_nan() && !prev_lower.is_nan() && !prev_upper.is_greater_than(prev_lower)
}

/// Whether the current price passed a threshold `pct` percent away from the
/// entry net price. `loss` selects the adverse direction.
fn stop_hit<N: Num>(record: &TradingRecord<N>, price: &IndicatorRef<N>, index: usize, pct: N, loss: bool) -> bool {
    let position = record.current_position();
    let Some(entry) = position.entry().filter(|_| position.is_opened()) else {
        return false;
    };
    let hundred = N::num_of(100.0);
    let entry_price = entry.net_price();
    let current = price.value(index);
    let long = entry.order_type() == OrderType::Buy;
    // Long loss and short gain thresholds sit below the entry.
    let below = long == loss;
    let ratio = if below {
        hundred.minus(pct).divided_by(hundred)
    } else {
        hundred.plus(pct).divided_by(hundred)
    };
    let threshold = entry_price.multiplied_by(ratio);
    if below {
        !current.is_nan() && !current.is_greater_than(threshold)
    } else {
        !current.is_nan() && !current.is_less_than(threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::series_of_closes;
    use crate::domain::indicator::{close_price, constant};
    use std::cell::Cell;
    use std::rc::Rc;

    fn record() -> TradingRecord<f64> {
        TradingRecord::new(OrderType::Buy)
    }

    #[test]
    fn evaluate_fixed_and_boolean() {
        let r = record();
        let rule: Rule<f64> = Rule::fixed([1, 3]);
        assert!(!rule.is_satisfied(0, &r));
        assert!(rule.is_satisfied(3, &r));
        assert!(Rule::<f64>::Boolean(true).is_satisfied(7, &r));
    }

    #[test]
    fn evaluate_over_under() {
        let series = series_of_closes(&[1.0, 5.0]);
        let close = close_price(&series);
        let three = constant(&series, 3.0);
        let r = record();
        assert!(!Rule::over(&close, &three).is_satisfied(0, &r));
        assert!(Rule::over(&close, &three).is_satisfied(1, &r));
        assert!(Rule::under(&close, &three).is_satisfied(0, &r));
    }

    #[test]
    fn nan_comparisons_are_false() {
        let series = series_of_closes(&[1.0]);
        let close = close_price(&series);
        let nan = constant(&series, f64::NAN);
        let r = record();
        assert!(!Rule::over(&close, &nan).is_satisfied(0, &r));
        assert!(!Rule::under(&close, &nan).is_satisfied(0, &r));
        assert!(!Rule::in_range(&close, &nan, &nan).is_satisfied(0, &r));
    }

    #[test]
    fn evaluate_in_range_boundary() {
        let series = series_of_closes(&[2.0, 5.0]);
        let close = close_price(&series);
        let rule = Rule::in_range(&close, &constant(&series, 2.0), &constant(&series, 4.0));
        let r = record();
        assert!(rule.is_satisfied(0, &r));
        assert!(!rule.is_satisfied(1, &r));
    }

    #[test]
    fn evaluate_crosses() {
        let series = series_of_closes(&[1.0, 3.0, 4.0, 2.0]);
        let close = close_price(&series);
        let level = constant(&series, 2.5);
        let r = record();

        let up = Rule::crossed_up(&close, &level);
        assert!(!up.is_satisfied(0, &r));
        assert!(up.is_satisfied(1, &r));
        assert!(!up.is_satisfied(2, &r));

        let down = Rule::crossed_down(&close, &level);
        assert!(down.is_satisfied(3, &r));
        assert!(!down.is_satisfied(1, &r));
    }

    #[test]
    fn cross_from_touching() {
        let series = series_of_closes(&[2.5, 3.0]);
        let close = close_price(&series);
        let level = constant(&series, 2.5);
        assert!(Rule::crossed_up(&close, &level).is_satisfied(1, &record()));
    }

    #[test]
    fn cross_false_at_view_begin() {
        let series = series_of_closes(&[1.0, 3.0, 1.0]);
        let view = series.sub_series(1, 2).unwrap();
        let close = close_price(&view);
        let level = constant(&view, 2.0);
        assert!(!Rule::crossed_up(&close, &level).is_satisfied(1, &record()));
    }

    #[test]
    fn and_short_circuits() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let rule: Rule<f64> = Rule::Boolean(false).and(Rule::predicate("count", move |_, _| {
            counter.set(counter.get() + 1);
            true
        }));
        assert!(!rule.is_satisfied(0, &record()));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn or_short_circuits() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let rule: Rule<f64> = Rule::Boolean(true).or(Rule::predicate("count", move |_, _| {
            counter.set(counter.get() + 1);
            false
        }));
        assert!(rule.is_satisfied(0, &record()));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn evaluate_not() {
        let rule: Rule<f64> = Rule::Boolean(true).negate();
        assert!(!rule.is_satisfied(0, &record()));
    }

    #[test]
    fn evaluate_consecutive() {
        let rule: Rule<f64> = Rule::fixed([2, 3, 4]).consecutive(3);
        let r = record();
        assert!(rule.is_satisfied(4, &r));
        assert!(!rule.is_satisfied(3, &r));
        assert!(!Rule::<f64>::Boolean(true).consecutive(5).is_satisfied(3, &r));
    }

    #[test]
    fn evaluate_any_of() {
        let rule: Rule<f64> = Rule::fixed([2]).any_of(3);
        let r = record();
        assert!(rule.is_satisfied(4, &r));
        assert!(!rule.is_satisfied(5, &r));
        assert!(!rule.is_satisfied(1, &r));
    }

    #[test]
    fn opened_position_reads_record() {
        let mut r = record();
        assert!(!Rule::<f64>::OpenedPosition.is_satisfied(0, &r));
        r.enter(0, 10.0, 1.0).unwrap();
        assert!(Rule::<f64>::OpenedPosition.is_satisfied(1, &r));
    }

    #[test]
    fn wait_for_counts_bars_since_order() {
        let mut r = record();
        let rule: Rule<f64> = Rule::wait_for(OrderType::Buy, 2);
        assert!(!rule.is_satisfied(5, &r));
        r.enter(3, 10.0, 1.0).unwrap();
        assert!(!rule.is_satisfied(4, &r));
        assert!(rule.is_satisfied(5, &r));
    }

    #[test]
    fn stop_loss_long_and_short() {
        let series = series_of_closes(&[100.0, 96.0, 94.0, 106.0]);
        let close = close_price(&series);
        let stop = Rule::stop_loss(&close, 5.0);

        let mut long = record();
        assert!(!stop.is_satisfied(2, &long));
        long.enter(0, 100.0, 1.0).unwrap();
        assert!(!stop.is_satisfied(1, &long));
        assert!(stop.is_satisfied(2, &long));

        let mut short = TradingRecord::new(OrderType::Sell);
        short.enter(0, 100.0, 1.0).unwrap();
        assert!(!stop.is_satisfied(2, &short));
        assert!(stop.is_satisfied(3, &short));
    }

    #[test]
    fn stop_gain_long_and_short() {
        let series = series_of_closes(&[100.0, 104.0, 111.0, 89.0]);
        let close = close_price(&series);
        let take = Rule::stop_gain(&close, 10.0);

        let mut long = record();
        long.enter(0, 100.0, 1.0).unwrap();
        assert!(!take.is_satisfied(1, &long));
        assert!(take.is_satisfied(2, &long));

        let mut short = TradingRecord::new(OrderType::Sell);
        short.enter(0, 100.0, 1.0).unwrap();
        assert!(!take.is_satisfied(2, &short));
        assert!(take.is_satisfied(3, &short));
    }
}
