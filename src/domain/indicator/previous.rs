//! Value of an indicator `n` bars ago, clamped to the series begin.

use super::{Formula, Indicator, IndicatorRef, cached};
use crate::domain::num::Num;
use std::rc::Rc;

#[derive(Debug)]
pub struct Previous<N: Num> {
    input: IndicatorRef<N>,
    bars: usize,
}

impl<N: Num> Formula<N> for Previous<N> {
    fn calculate(&self, this: &dyn Indicator<N>, index: usize) -> N {
        let target = index.saturating_sub(self.bars).max(this.series().begin_index());
        self.input.value(target)
    }

    fn unstable_bars(&self) -> usize {
        self.input.unstable_bars() + self.bars
    }

    fn name(&self) -> String {
        format!("PREVIOUS({}, {})", self.bars, self.input.name())
    }
}

pub fn previous<N: Num>(input: &IndicatorRef<N>, bars: usize) -> IndicatorRef<N> {
    cached(
        input.series(),
        Previous {
            input: Rc::clone(input),
            bars,
        },
    )
}
