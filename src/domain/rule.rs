//! Trading rule tree.
//!
//! - Comparison rules over two indicators (`Over`, `Under`, crosses, ranges)
//! - Position-aware rules reading the trading record (stops, waits)
//! - Temporal rules over a child rule (`Consecutive`, `AnyOf`)
//! - Composition (`And`, `Or`, `Not`) owning their children
//!
//! Evaluation lives in `rule_eval`.

use crate::domain::indicator::IndicatorRef;
use crate::domain::num::Num;
use crate::domain::order::OrderType;
use crate::domain::trading_record::TradingRecord;
use std::fmt;
use std::rc::Rc;

type PredicateFn<N> = dyn Fn(usize, &TradingRecord<N>) -> bool;

/// A named caller-supplied predicate.
#[derive(Clone)]
pub struct AtomicPredicate<N: Num> {
    name: String,
    test: Rc<PredicateFn<N>>,
}

impl<N: Num> AtomicPredicate<N> {
    pub fn new(name: impl Into<String>, test: impl Fn(usize, &TradingRecord<N>) -> bool + 'static) -> Self {
        AtomicPredicate {
            name: name.into(),
            test: Rc::new(test),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn test(&self, index: usize, record: &TradingRecord<N>) -> bool {
        (self.test)(index, record)
    }
}

impl<N: Num> fmt::Debug for AtomicPredicate<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicPredicate").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone)]
pub enum Rule<N: Num> {
    /// Satisfied exactly at the listed indices.
    Fixed(Vec<usize>),
    Boolean(bool),
    Over {
        left: IndicatorRef<N>,
        right: IndicatorRef<N>,
    },
    Under {
        left: IndicatorRef<N>,
        right: IndicatorRef<N>,
    },
    CrossedUp {
        left: IndicatorRef<N>,
        right: IndicatorRef<N>,
    },
    CrossedDown {
        left: IndicatorRef<N>,
        right: IndicatorRef<N>,
    },
    /// `lower <= indicator <= upper`.
    InRange {
        indicator: IndicatorRef<N>,
        lower: IndicatorRef<N>,
        upper: IndicatorRef<N>,
    },
    /// Price moved against the open position by at least `loss_pct` percent
    /// of the entry net price.
    StopLoss {
        price: IndicatorRef<N>,
        loss_pct: N,
    },
    StopGain {
        price: IndicatorRef<N>,
        gain_pct: N,
    },
    /// At least `bars` bars since the last order of `order_type`.
    WaitFor {
        order_type: OrderType,
        bars: usize,
    },
    OpenedPosition,
    Predicate(AtomicPredicate<N>),
    /// Child satisfied on each of the last `count` bars.
    Consecutive {
        rule: Box<Rule<N>>,
        count: usize,
    },
    /// Child satisfied on at least one of the last `count` bars.
    AnyOf {
        rule: Box<Rule<N>>,
        count: usize,
    },
    And(Vec<Rule<N>>),
    Or(Vec<Rule<N>>),
    Not(Box<Rule<N>>),
}

impl<N: Num> Rule<N> {
    pub fn fixed(indices: impl IntoIterator<Item = usize>) -> Self {
        Rule::Fixed(indices.into_iter().collect())
    }

    pub fn over(left: &IndicatorRef<N>, right: &IndicatorRef<N>) -> Self {
        Rule::Over {
            left: Rc::clone(left),
            right: Rc::clone(right),
        }
    }

    pub fn under(left: &IndicatorRef<N>, right: &IndicatorRef<N>) -> Self {
        Rule::Under {
            left: Rc::clone(left),
            right: Rc::clone(right),
        }
    }

    pub fn crossed_up(left: &IndicatorRef<N>, right: &IndicatorRef<N>) -> Self {
        Rule::CrossedUp {
            left: Rc::clone(left),
            right: Rc::clone(right),
        }
    }

    pub fn crossed_down(left: &IndicatorRef<N>, right: &IndicatorRef<N>) -> Self {
        Rule::CrossedDown {
            left: Rc::clone(left),
            right: Rc::clone(right),
        }
    }

    pub fn in_range(indicator: &IndicatorRef<N>, lower: &IndicatorRef<N>, upper: &IndicatorRef<N>) -> Self {
        Rule::InRange {
            indicator: Rc::clone(indicator),
            lower: Rc::clone(lower),
            upper: Rc::clone(upper),
        }
    }

    pub fn stop_loss(price: &IndicatorRef<N>, loss_pct: f64) -> Self {
        Rule::StopLoss {
            price: Rc::clone(price),
            loss_pct: N::num_of(loss_pct),
        }
    }

    pub fn stop_gain(price: &IndicatorRef<N>, gain_pct: f64) -> Self {
        Rule::StopGain {
            price: Rc::clone(price),
            gain_pct: N::num_of(gain_pct),
        }
    }

    pub fn wait_for(order_type: OrderType, bars: usize) -> Self {
        Rule::WaitFor { order_type, bars }
    }

    pub fn predicate(name: impl Into<String>, test: impl Fn(usize, &TradingRecord<N>) -> bool + 'static) -> Self {
        Rule::Predicate(AtomicPredicate::new(name, test))
    }

    pub fn consecutive(self, count: usize) -> Self {
        Rule::Consecutive {
            rule: Box::new(self),
            count,
        }
    }

    pub fn any_of(self, count: usize) -> Self {
        Rule::AnyOf {
            rule: Box::new(self),
            count,
        }
    }

    /// `self AND other`; chains flatten into one `And`.
    pub fn and(self, other: Rule<N>) -> Self {
        match self {
            Rule::And(mut rules) => {
                rules.push(other);
                Rule::And(rules)
            }
            rule => Rule::And(vec![rule, other]),
        }
    }

    /// `self OR other`; chains flatten into one `Or`.
    pub fn or(self, other: Rule<N>) -> Self {
        match self {
            Rule::Or(mut rules) => {
                rules.push(other);
                Rule::Or(rules)
            }
            rule => Rule::Or(vec![rule, other]),
        }
    }

    pub fn negate(self) -> Self {
        Rule::Not(Box::new(self))
    }
}

fn write_list<N: Num>(f: &mut fmt::Formatter<'_>, name: &str, rules: &[Rule<N>]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", rule)?;
    }
    write!(f, ")")
}

impl<N: Num> fmt::Display for Rule<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Fixed(indices) => write!(f, "Fixed({:?})", indices),
            Rule::Boolean(value) => write!(f, "Boolean({})", value),
            Rule::Over { left, right } => write!(f, "Over({}, {})", left.name(), right.name()),
            Rule::Under { left, right } => write!(f, "Under({}, {})", left.name(), right.name()),
            Rule::CrossedUp { left, right } => {
                write!(f, "CrossedUp({}, {})", left.name(), right.name())
            }
            Rule::CrossedDown { left, right } => {
                write!(f, "CrossedDown({}, {})", left.name(), right.name())
            }
            Rule::InRange {
                indicator,
                lower,
                upper,
            } => write!(
                f,
                "InRange({}, {}, {})",
                indicator.name(),
                lower.name(),
                upper.name()
            ),
            Rule::StopLoss { price, loss_pct } => {
                write!(f, "StopLoss({}, {}%)", price.name(), loss_pct)
            }
            Rule::StopGain { price, gain_pct } => {
                write!(f, "StopGain({}, {}%)", price.name(), gain_pct)
            }
            Rule::WaitFor { order_type, bars } => write!(f, "WaitFor({}, {})", order_type, bars),
            Rule::OpenedPosition => write!(f, "OpenedPosition"),
            Rule::Predicate(p) => write!(f, "Predicate({})", p.name()),
            Rule::Consecutive { rule, count } => write!(f, "Consecutive({}, {})", rule, count),
            Rule::AnyOf { rule, count } => write!(f, "AnyOf({}, {})", rule, count),
            Rule::And(rules) => write_list(f, "And", rules),
            Rule::Or(rules) => write_list(f, "Or", rules),
            Rule::Not(rule) => write!(f, "Not({})", rule),
        }
    }
}
