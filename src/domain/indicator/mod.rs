//! Technical indicators and the memoizing evaluation engine.
//!
//! - `Indicator`: anything that yields a value per bar index
//! - `Formula`: a pure per-index calculation, wrapped by [`CachedIndicator`]
//! - `IndicatorRef`: shared handle used to compose indicator graphs
//!
//! Graphs are built from `Rc` handles over `RefCell` caches, so a graph is
//! confined to the thread that built it. Running the same strategy on several
//! threads means building one graph per thread.

pub mod cached;
pub mod combine;
pub mod ema;
pub mod extrema;
pub mod previous;
pub mod price;
pub mod sma;
pub mod williams_r;

pub use cached::{CachedIndicator, RECURSION_THRESHOLD};
pub use combine::{divide, minus, multiply, plus};
pub use ema::ema;
pub use extrema::{highest, lowest};
pub use previous::previous;
pub use price::{close_price, constant, high_price, low_price, open_price, volume};
pub use sma::sma;
pub use williams_r::williams_r;

use crate::domain::error::TradebenchError;
use crate::domain::num::Num;
use crate::domain::series::BarSeries;
use std::fmt;
use std::rc::Rc;

pub trait Indicator<N: Num>: fmt::Debug {
    /// Value at absolute bar `index`.
    fn value(&self, index: usize) -> N;

    /// Number of leading bars whose values are defined but not meaningful.
    fn unstable_bars(&self) -> usize;

    fn series(&self) -> &BarSeries<N>;

    fn name(&self) -> String;
}

pub type IndicatorRef<N> = Rc<dyn Indicator<N>>;

/// A per-index calculation evaluated through a [`CachedIndicator`].
///
/// `this` is the caching wrapper around the formula itself, so recursive
/// formulas read their own earlier values through the cache.
pub trait Formula<N: Num>: fmt::Debug {
    fn calculate(&self, this: &dyn Indicator<N>, index: usize) -> N;

    fn unstable_bars(&self) -> usize;

    fn name(&self) -> String;

    /// Recursive formulas depend on their own value at `index - 1` and are
    /// forward-filled by the engine.
    fn is_recursive(&self) -> bool {
        false
    }
}

/// Wraps `formula` in a cache bound to `series`.
pub fn cached<N: Num, F: Formula<N> + 'static>(series: &BarSeries<N>, formula: F) -> IndicatorRef<N> {
    Rc::new(CachedIndicator::new(series.clone(), formula))
}

pub(crate) fn require_period(name: &str, period: usize) -> Result<(), TradebenchError> {
    if period == 0 {
        return Err(TradebenchError::InvalidArgument {
            reason: format!("{} period must be at least 1", name),
        });
    }
    Ok(())
}

/// First index of a `period`-long window ending at `index`, clamped to the
/// series begin.
pub(crate) fn window_start<N: Num>(series: &BarSeries<N>, index: usize, period: usize) -> usize {
    (index + 1).saturating_sub(period).max(series.begin_index())
}


#[cfg(test)]
mod tests {
    use super::test_support::series_of_closes;
    use super::*;

    #[test]
    fn window_start_clamps_to_begin() {
        let series = series_of_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(window_start(&series, 1, 3), 0);
        assert_eq!(window_start(&series, 4, 3), 2);

        let view = series.sub_series(2, 4).unwrap();
        assert_eq!(window_start(&view, 3, 3), 2);
    }

    #[test]
    fn zero_period_rejected() {
        assert!(require_period("SMA", 0).is_err());
        assert!(require_period("SMA", 1).is_ok());
    }
}
