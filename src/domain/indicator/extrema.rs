//! Highest and lowest value over a trailing window.

use super::{Formula, Indicator, IndicatorRef, cached, require_period, window_start};
use crate::domain::error::TradebenchError;
use crate::domain::num::Num;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extreme {
    Highest,
    Lowest,
}

#[derive(Debug)]
pub struct Extremum<N: Num> {
    input: IndicatorRef<N>,
    period: usize,
    extreme: Extreme,
}

impl<N: Num> Formula<N> for Extremum<N> {
    fn calculate(&self, this: &dyn Indicator<N>, index: usize) -> N {
        let start = window_start(this.series(), index, self.period);
        let mut best = self.input.value(start);
        for i in start + 1..=index {
            let v = self.input.value(i);
            best = match self.extreme {
                Extreme::Highest => best.max(v),
                Extreme::Lowest => best.min(v),
            };
        }
        best
    }

    fn unstable_bars(&self) -> usize {
        self.input.unstable_bars() + self.period - 1
    }

    fn name(&self) -> String {
        let label = match self.extreme {
            Extreme::Highest => "HIGHEST",
            Extreme::Lowest => "LOWEST",
        };
        format!("{}({}, {})", label, self.period, self.input.name())
    }
}

fn extremum<N: Num>(
    input: &IndicatorRef<N>,
    period: usize,
    extreme: Extreme,
) -> Result<IndicatorRef<N>, TradebenchError> {
    require_period("extremum", period)?;
    Ok(cached(
        input.series(),
        Extremum {
            input: Rc::clone(input),
            period,
            extreme,
        },
    ))
}

pub fn highest<N: Num>(input: &IndicatorRef<N>, period: usize) -> Result<IndicatorRef<N>, TradebenchError> {
    extremum(input, period, Extreme::Highest)
}

pub fn lowest<N: Num>(input: &IndicatorRef<N>, period: usize) -> Result<IndicatorRef<N>, TradebenchError> {
    extremum(input, period, Extreme::Lowest)
}
