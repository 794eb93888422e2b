//! Williams %R.
//!
//! %R = (highest high - close) / (highest high - lowest low) * -100 over n
//! bars. A flat window (high == low) yields NaN.

use super::{
    Formula, Indicator, IndicatorRef, cached, close_price, high_price, highest, low_price, lowest,
    require_period,
};
use crate::domain::error::TradebenchError;
use crate::domain::num::Num;
use crate::domain::series::BarSeries;

#[derive(Debug)]
pub struct WilliamsR<N: Num> {
    close: IndicatorRef<N>,
    highest_high: IndicatorRef<N>,
    lowest_low: IndicatorRef<N>,
    period: usize,
}

impl<N: Num> Formula<N> for WilliamsR<N> {
    fn calculate(&self, _this: &dyn Indicator<N>, index: usize) -> N {
        let hh = self.highest_high.value(index);
        let ll = self.lowest_low.value(index);
        hh.minus(self.close.value(index))
            .divided_by(hh.minus(ll))
            .multiplied_by(N::num_of(-100.0))
    }

    fn unstable_bars(&self) -> usize {
        self.highest_high
            .unstable_bars()
            .max(self.lowest_low.unstable_bars())
    }

    fn name(&self) -> String {
        format!("WILLIAMS_R({})", self.period)
    }
}

pub fn williams_r<N: Num>(series: &BarSeries<N>, period: usize) -> Result<IndicatorRef<N>, TradebenchError> {
    require_period("Williams %R", period)?;
    Ok(cached(
        series,
        WilliamsR {
            close: close_price(series),
            highest_high: highest(&high_price(series), period)?,
            lowest_low: lowest(&low_price(series), period)?,
            period,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::bars_of;
    use approx::assert_relative_eq;

    #[test]
    fn williams_r_values() {
        let series = BarSeries::new(
            "t",
            bars_of(vec![(12.0, 8.0, 10.0), (14.0, 9.0, 13.0), (13.0, 10.0, 11.0)]),
        );
        let ind = williams_r(&series, 2).unwrap();

        // hh=14, ll=9, close=11 → (14-11)/(14-9) * -100 = -60
        assert_relative_eq!(ind.value(2), -60.0);
        // hh=14, ll=8, close=13 → (1/6) * -100
        assert_relative_eq!(ind.value(1), -100.0 / 6.0);
        assert_eq!(ind.unstable_bars(), 1);
    }

    #[test]
    fn flat_window_is_nan() {
        let series = BarSeries::new("t", bars_of(vec![(10.0, 10.0, 10.0), (10.0, 10.0, 10.0)]));
        let ind = williams_r(&series, 2).unwrap();
        assert!(ind.value(1).is_nan());
    }
}
