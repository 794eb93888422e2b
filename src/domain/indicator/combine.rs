//! Element-wise arithmetic between two indicators.

use super::{Formula, Indicator, IndicatorRef, cached};
use crate::domain::num::Num;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Multiply,
    Divide,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
        };
        write!(f, "{}", symbol)
    }
}

#[derive(Debug)]
pub struct Combine<N: Num> {
    left: IndicatorRef<N>,
    right: IndicatorRef<N>,
    op: BinaryOp,
}

impl<N: Num> Formula<N> for Combine<N> {
    fn calculate(&self, _this: &dyn Indicator<N>, index: usize) -> N {
        let l = self.left.value(index);
        let r = self.right.value(index);
        match self.op {
            BinaryOp::Plus => l.plus(r),
            BinaryOp::Minus => l.minus(r),
            BinaryOp::Multiply => l.multiplied_by(r),
            BinaryOp::Divide => l.divided_by(r),
        }
    }

    fn unstable_bars(&self) -> usize {
        self.left.unstable_bars().max(self.right.unstable_bars())
    }

    fn name(&self) -> String {
        format!("({} {} {})", self.left.name(), self.op, self.right.name())
    }
}

pub fn combine<N: Num>(left: &IndicatorRef<N>, op: BinaryOp, right: &IndicatorRef<N>) -> IndicatorRef<N> {
    cached(
        left.series(),
        Combine {
            left: Rc::clone(left),
            right: Rc::clone(right),
            op,
        },
    )
}

pub fn plus<N: Num>(left: &IndicatorRef<N>, right: &IndicatorRef<N>) -> IndicatorRef<N> {
    combine(left, BinaryOp::Plus, right)
}

pub fn minus<N: Num>(left: &IndicatorRef<N>, right: &IndicatorRef<N>) -> IndicatorRef<N> {
    combine(left, BinaryOp::Minus, right)
}

pub fn multiply<N: Num>(left: &IndicatorRef<N>, right: &IndicatorRef<N>) -> IndicatorRef<N> {
    combine(left, BinaryOp::Multiply, right)
}

pub fn divide<N: Num>(left: &IndicatorRef<N>, right: &IndicatorRef<N>) -> IndicatorRef<N> {
    combine(left, BinaryOp::Divide, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::series_of_closes;
    use crate::domain::indicator::{close_price, constant, sma};

    #[test]
    fn arithmetic() {
        let series = series_of_closes(&[4.0, 6.0]);
        let close = close_price(&series);
        let two = constant(&series, 2.0);

        assert_eq!(plus(&close, &two).value(1), 8.0);
        assert_eq!(minus(&close, &two).value(1), 4.0);
        assert_eq!(multiply(&close, &two).value(0), 8.0);
        assert_eq!(divide(&close, &two).value(0), 2.0);
    }

    #[test]
    fn divide_by_zero_is_nan() {
        let series = series_of_closes(&[4.0]);
        let zero = constant(&series, 0.0);
        assert!(divide(&close_price(&series), &zero).value(0).is_nan());
    }

    #[test]
    fn unstable_bars_is_max_of_operands() {
        let series = series_of_closes(&[1.0; 10]);
        let close = close_price(&series);
        let slow = sma(&close, 5).unwrap();
        let fast = sma(&close, 2).unwrap();
        let spread = minus(&fast, &slow);
        assert_eq!(spread.unstable_bars(), 4);
        assert_eq!(spread.name(), "(SMA(2, CLOSE) - SMA(5, CLOSE))");
    }
}
