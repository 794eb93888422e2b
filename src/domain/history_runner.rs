//! Walk-forward runner over the slices of a [`Slicer`].
//!
//! Slices are scanned forward only, each index at most once. `run(k)`
//! returns the positions closed while slice `k` was scanned; a position
//! still open at the end of a slice is carried into the next call. Slices
//! are resolved in order: requesting `k` first resolves every earlier slice
//! not yet scanned. Results are memoized per slice.

use crate::domain::backtest::{BacktestConfig, step};
use crate::domain::error::TradebenchError;
use crate::domain::num::Num;
use crate::domain::position::Position;
use crate::domain::slicer::Slicer;
use crate::domain::strategy::Strategy;
use crate::domain::trading_record::TradingRecord;
use std::fmt;
use std::str::FromStr;

/// Whether a position open at the end of a slice may be closed by scanning
/// later slices during the same call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lookahead {
    /// The position stays open until a later call reaches its exit.
    #[default]
    None,
    /// Later slices are searched for the exit only, one slice at a time.
    KnownSlices,
}

impl fmt::Display for Lookahead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookahead::None => write!(f, "none"),
            Lookahead::KnownSlices => write!(f, "known-slices"),
        }
    }
}

impl FromStr for Lookahead {
    type Err = TradebenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "false" | "no" => Ok(Lookahead::None),
            "known-slices" | "known_slices" | "true" | "yes" => Ok(Lookahead::KnownSlices),
            other => Err(TradebenchError::InvalidArgument {
                reason: format!("unknown lookahead '{}'", other),
            }),
        }
    }
}

#[derive(Debug)]
pub struct HistoryRunner<N: Num> {
    slicer: Slicer<N>,
    strategy: Strategy<N>,
    lookahead: Lookahead,
    amount: N,
    record: TradingRecord<N>,
    results: Vec<Vec<Position<N>>>,
    /// Next absolute index not yet scanned.
    cursor: Option<usize>,
}

impl<N: Num> HistoryRunner<N> {
    /// Starts with [`Lookahead::None`]: each slice reports the positions
    /// whose exit it scans, so the per-slice results concatenate to the
    /// single-window backtest. [`Lookahead::KnownSlices`] reports a position
    /// in the slice that opened it.
    pub fn new(slicer: Slicer<N>, strategy: Strategy<N>, config: &BacktestConfig) -> Self {
        HistoryRunner {
            slicer,
            strategy,
            lookahead: Lookahead::default(),
            amount: N::num_of(config.amount),
            record: config.new_record(),
            results: Vec::new(),
            cursor: None,
        }
    }

    pub fn with_lookahead(mut self, lookahead: Lookahead) -> Self {
        self.lookahead = lookahead;
        self
    }

    pub fn slicer(&self) -> &Slicer<N> {
        &self.slicer
    }

    pub fn strategy(&self) -> &Strategy<N> {
        &self.strategy
    }

    pub fn lookahead(&self) -> Lookahead {
        self.lookahead
    }

    /// Number of slices scanned so far.
    pub fn resolved_slices(&self) -> usize {
        self.results.len()
    }

    /// Positions closed during the scan of slice `slice`.
    pub fn run(&mut self, slice: usize) -> Result<&[Position<N>], TradebenchError> {
        if slice >= self.slicer.len() {
            return Err(TradebenchError::SliceOutOfRange {
                index: slice,
                slices: self.slicer.len(),
            });
        }
        while self.results.len() <= slice {
            let next = self.results.len();
            let closed = self.scan(next)?;
            self.results.push(closed);
        }
        Ok(&self.results[slice])
    }

    /// Resolves every slice and returns all closed positions.
    pub fn run_all(&mut self) -> Result<&[Position<N>], TradebenchError> {
        if let Some(last) = self.slicer.len().checked_sub(1) {
            self.run(last)?;
        }
        Ok(self.record.positions())
    }

    pub fn closed_positions(&self) -> &[Position<N>] {
        self.record.positions()
    }

    pub fn open_position(&self) -> Option<&Position<N>> {
        let current = self.record.current_position();
        current.is_opened().then_some(current)
    }

    pub fn trading_record(&self) -> &TradingRecord<N> {
        &self.record
    }

    fn scan(&mut self, slice: usize) -> Result<Vec<Position<N>>, TradebenchError> {
        let series = self.slicer.slice(slice)?.clone();
        let Some(end) = series.end_index() else {
            return Ok(Vec::new());
        };
        let begin = match self.cursor {
            None => series.begin_index(),
            Some(cursor) => cursor.max(series.begin_index()),
        };
        if begin > end {
            tracing::debug!(slice, begin, end, "slice already covered");
            return Ok(Vec::new());
        }

        let closed_before = self.record.position_count();
        for index in begin..=end {
            step(&series, &self.strategy, &mut self.record, index, self.amount)?;
        }
        self.cursor = Some(end + 1);

        if self.lookahead == Lookahead::KnownSlices && !self.record.is_closed() {
            self.find_exit_after(slice)?;
        }

        let closed = self.record.positions()[closed_before..].to_vec();
        tracing::info!(
            strategy = self.strategy.name(),
            slice,
            begin,
            end,
            closed = closed.len(),
            open = !self.record.is_closed(),
            "slice scanned"
        );
        Ok(closed)
    }

    /// Scans the slices after `slice` for the exit of the open position,
    /// stopping at the first exit.
    fn find_exit_after(&mut self, slice: usize) -> Result<(), TradebenchError> {
        for later in slice + 1..self.slicer.len() {
            let series = self.slicer.slice(later)?.clone();
            let Some(end) = series.end_index() else {
                continue;
            };
            let cursor = self.cursor.unwrap_or(series.begin_index());
            let begin = cursor.max(series.begin_index());
            for index in begin..=end {
                self.cursor = Some(index + 1);
                if self.strategy.should_exit(index, &self.record) {
                    let order = self.record.operate(index, series.bar(index).close, self.amount)?;
                    tracing::debug!(
                        strategy = self.strategy.name(),
                        slice,
                        exit_slice = later,
                        index = order.index(),
                        "exit found in later slice"
                    );
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}
