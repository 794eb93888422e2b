//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(input[i-n+1..=i]), with the window clamped to the series
//! begin so early values average whatever history exists.

use super::{Formula, Indicator, IndicatorRef, cached, require_period, window_start};
use crate::domain::error::TradebenchError;
use crate::domain::num::Num;
use std::rc::Rc;

#[derive(Debug)]
pub struct Sma<N: Num> {
    input: IndicatorRef<N>,
    period: usize,
}

impl<N: Num> Formula<N> for Sma<N> {
    fn calculate(&self, this: &dyn Indicator<N>, index: usize) -> N {
        let start = window_start(this.series(), index, self.period);
        let mut sum = N::zero();
        for i in start..=index {
            sum = sum.plus(self.input.value(i));
        }
        sum.divided_by(N::num_of((index - start + 1) as f64))
    }

    fn unstable_bars(&self) -> usize {
        self.input.unstable_bars() + self.period - 1
    }

    fn name(&self) -> String {
        format!("SMA({}, {})", self.period, self.input.name())
    }
}

pub fn sma<N: Num>(input: &IndicatorRef<N>, period: usize) -> Result<IndicatorRef<N>, TradebenchError> {
    require_period("SMA", period)?;
    Ok(cached(
        input.series(),
        Sma {
            input: Rc::clone(input),
            period,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::close_price;
    use crate::domain::indicator::test_support::series_of_closes;
    use approx::assert_relative_eq;

    #[test]
    fn sma_full_window() {
        let series = series_of_closes(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let ind = sma(&close_price(&series), 3).unwrap();

        assert_relative_eq!(ind.value(2), 20.0);
        assert_relative_eq!(ind.value(3), 30.0);
        assert_relative_eq!(ind.value(4), 40.0);
    }

    #[test]
    fn sma_warmup_averages_available_history() {
        let series = series_of_closes(&[10.0, 20.0, 30.0]);
        let ind = sma(&close_price(&series), 3).unwrap();

        assert_relative_eq!(ind.value(0), 10.0);
        assert_relative_eq!(ind.value(1), 15.0);
        assert_eq!(ind.unstable_bars(), 2);
    }

    #[test]
    fn sma_clamps_to_view_begin() {
        let series = series_of_closes(&[1000.0, 10.0, 20.0]);
        let view = series.sub_series(1, 2).unwrap();
        let ind = sma(&close_price(&view), 3).unwrap();

        assert_relative_eq!(ind.value(2), 15.0);
    }

    #[test]
    fn sma_period_0() {
        let series = series_of_closes(&[10.0]);
        assert!(sma(&close_price(&series), 0).is_err());
    }

    #[test]
    fn sma_unstable_bars_stack() {
        let series = series_of_closes(&[1.0; 10]);
        let inner = sma(&close_price(&series), 3).unwrap();
        let outer = sma(&inner, 4).unwrap();
        assert_eq!(outer.unstable_bars(), 5);
        assert!(outer.unstable_bars() >= inner.unstable_bars());
    }

    #[test]
    fn sma_name() {
        let series = series_of_closes(&[1.0]);
        let ind = sma(&close_price(&series), 20).unwrap();
        assert_eq!(ind.name(), "SMA(20, CLOSE)");
    }
}
