//! Exponential Moving Average.
//!
//! k = 2/(n+1), EMA[begin] = input[begin], then
//! EMA[i] = (input[i] - EMA[i-1]) * k + EMA[i-1].
//! Recursive: each value reads the previous one through the cache.

use super::{Formula, Indicator, IndicatorRef, cached, require_period};
use crate::domain::error::TradebenchError;
use crate::domain::num::Num;
use std::rc::Rc;

#[derive(Debug)]
pub struct Ema<N: Num> {
    input: IndicatorRef<N>,
    period: usize,
    multiplier: N,
}

impl<N: Num> Formula<N> for Ema<N> {
    fn calculate(&self, this: &dyn Indicator<N>, index: usize) -> N {
        let current = self.input.value(index);
        if index <= this.series().begin_index() {
            return current;
        }
        let prev = this.value(index - 1);
        current.minus(prev).multiplied_by(self.multiplier).plus(prev)
    }

    fn unstable_bars(&self) -> usize {
        self.input.unstable_bars() + self.period - 1
    }

    fn name(&self) -> String {
        format!("EMA({}, {})", self.period, self.input.name())
    }

    fn is_recursive(&self) -> bool {
        true
    }
}

pub fn ema<N: Num>(input: &IndicatorRef<N>, period: usize) -> Result<IndicatorRef<N>, TradebenchError> {
    require_period("EMA", period)?;
    let multiplier = N::num_of(2.0).divided_by(N::num_of((period + 1) as f64));
    Ok(cached(
        input.series(),
        Ema {
            input: Rc::clone(input),
            period,
            multiplier,
        },
    ))
}
