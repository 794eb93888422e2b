//! Memoization layer for indicator formulas.
//!
//! Each [`CachedIndicator`] owns a private cache keyed by absolute bar index.
//! A value is calculated at most once; later reads return the stored value.
//! A formula may request its own earlier values or any upstream indicator
//! from inside `calculate`: no cache borrow is held across that call.
//!
//! Work over a forward sweep is linear in the number of (indicator, index)
//! pairs. Scattered access stays correct but each miss may recurse through
//! its whole unresolved prefix; recursive formulas are therefore filled
//! iteratively once the gap to the highest cached index passes
//! [`RECURSION_THRESHOLD`].

use super::{Formula, Indicator};
use crate::domain::num::Num;
use crate::domain::series::BarSeries;
use std::cell::{Cell, RefCell};
use std::fmt;

/// Largest gap a recursive formula may cover through call-stack recursion.
pub const RECURSION_THRESHOLD: usize = 100;

struct CacheState<N> {
    values: Vec<Option<N>>,
    highest: Option<usize>,
}

pub struct CachedIndicator<N: Num, F: Formula<N>> {
    series: BarSeries<N>,
    formula: F,
    cache: RefCell<CacheState<N>>,
    calculations: Cell<usize>,
}

impl<N: Num, F: Formula<N>> CachedIndicator<N, F> {
    pub fn new(series: BarSeries<N>, formula: F) -> Self {
        CachedIndicator {
            series,
            formula,
            cache: RefCell::new(CacheState {
                values: Vec::new(),
                highest: None,
            }),
            calculations: Cell::new(0),
        }
    }

    pub fn formula(&self) -> &F {
        &self.formula
    }

    /// Number of times the formula has been evaluated.
    pub fn calculations(&self) -> usize {
        self.calculations.get()
    }

    /// Highest index holding a cached value.
    pub fn highest_cached_index(&self) -> Option<usize> {
        self.cache.borrow().highest
    }

    pub fn is_cached(&self, index: usize) -> bool {
        self.cached(index).is_some()
    }

    fn cached(&self, index: usize) -> Option<N> {
        self.cache.borrow().values.get(index).copied().flatten()
    }

    fn store(&self, index: usize, value: N) {
        let mut cache = self.cache.borrow_mut();
        if cache.values.len() <= index {
            cache.values.resize(index + 1, None);
        }
        cache.values[index] = Some(value);
        if cache.highest.is_none_or(|h| index > h) {
            cache.highest = Some(index);
        }
    }

    fn compute(&self, index: usize) -> N {
        self.calculations.set(self.calculations.get() + 1);
        let value = self.formula.calculate(self, index);
        self.store(index, value);
        value
    }

    fn forward_fill(&self, index: usize) {
        let start = match self.highest_cached_index() {
            Some(highest) => highest + 1,
            None => self.series.begin_index(),
        };
        if index <= start || index - start <= RECURSION_THRESHOLD {
            return;
        }
        tracing::trace!(
            indicator = %self.formula.name(),
            from = start,
            to = index,
            "forward-filling recursive indicator"
        );
        for i in start..index {
            if !self.is_cached(i) {
                self.compute(i);
            }
        }
    }
}

impl<N: Num, F: Formula<N>> Indicator<N> for CachedIndicator<N, F> {
    fn value(&self, index: usize) -> N {
        if let Some(value) = self.cached(index) {
            return value;
        }
        if self.formula.is_recursive() {
            self.forward_fill(index);
        }
        self.compute(index)
    }

    fn unstable_bars(&self) -> usize {
        self.formula.unstable_bars()
    }

    fn series(&self) -> &BarSeries<N> {
        &self.series
    }

    fn name(&self) -> String {
        self.formula.name()
    }
}

impl<N: Num, F: Formula<N>> fmt::Debug for CachedIndicator<N, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedIndicator")
            .field("formula", &self.formula)
            .field("series", &self.series.name())
            .field("highest_cached_index", &self.highest_cached_index())
            .field("calculations", &self.calculations())
            .finish()
    }
}
