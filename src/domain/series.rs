//! Bar series and sub-series views.
//!
//! A series owns shared, immutable bar storage and an inclusive
//! `[begin, end]` window over it. Sub-series are views: they share the
//! storage and keep the parent's index numbering, so index `i` names the same
//! bar in a parent and in every view that contains it.

use crate::domain::bar::Bar;
use crate::domain::error::TradebenchError;
use crate::domain::num::Num;
use std::ops::Range;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct BarSeries<N: Num> {
    name: Arc<str>,
    bars: Arc<[Bar<N>]>,
    begin: usize,
    len: usize,
}

impl<N: Num> BarSeries<N> {
    pub fn new(name: impl Into<String>, bars: Vec<Bar<N>>) -> Self {
        let name: String = name.into();
        let len = bars.len();
        BarSeries {
            name: Arc::from(name),
            bars: Arc::from(bars),
            begin: 0,
            len,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bar at absolute `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the shared storage. Indices outside this
    /// view's window but inside the storage are allowed.
    pub fn bar(&self, index: usize) -> &Bar<N> {
        &self.bars[index]
    }

    pub fn try_bar(&self, index: usize) -> Option<&Bar<N>> {
        self.bars.get(index)
    }

    pub fn begin_index(&self) -> usize {
        self.begin
    }

    /// Inclusive end of the window, `None` when the window is empty.
    pub fn end_index(&self) -> Option<usize> {
        if self.len == 0 {
            None
        } else {
            Some(self.begin + self.len - 1)
        }
    }

    /// The window as a half-open range of absolute indices.
    pub fn indices(&self) -> Range<usize> {
        self.begin..self.begin + self.len
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices().contains(&index)
    }

    pub fn first_bar(&self) -> Option<&Bar<N>> {
        if self.is_empty() {
            None
        } else {
            self.try_bar(self.begin)
        }
    }

    pub fn last_bar(&self) -> Option<&Bar<N>> {
        self.end_index().and_then(|end| self.try_bar(end))
    }

    /// A view over `[begin, end]` sharing this series' storage.
    ///
    /// The range must be non-empty and lie within this window.
    pub fn sub_series(&self, begin: usize, end: usize) -> Result<Self, TradebenchError> {
        let within = match self.end_index() {
            Some(last) => begin >= self.begin && end <= last,
            None => false,
        };
        if begin > end || !within {
            return Err(TradebenchError::InvalidRange { begin, end });
        }
        Ok(BarSeries {
            name: Arc::clone(&self.name),
            bars: Arc::clone(&self.bars),
            begin,
            len: end - begin + 1,
        })
    }

    /// An empty view positioned at `begin`.
    pub fn empty_view(&self, begin: usize) -> Self {
        BarSeries {
            name: Arc::clone(&self.name),
            bars: Arc::clone(&self.bars),
            begin,
            len: 0,
        }
    }

    pub fn num_of(&self, value: f64) -> N {
        N::num_of(value)
    }

    /// True when both series read the same underlying storage.
    pub fn shares_storage_with(&self, other: &BarSeries<N>) -> bool {
        Arc::ptr_eq(&self.bars, &other.bars)
    }
}
