//! Splits a series into ordered slices for walk-forward runs.
//!
//! Bars are grouped by the end time into half-open calendar intervals
//! `[start, start + period)`, beginning at the period begin (by default the
//! end time of the first bar). Intervals without bars are skipped and never
//! produce a slice. A rolling slicer widens each slice back over the
//! previous `periods_per_slice - 1` slice starts, so rolling slices overlap.

use crate::domain::error::TradebenchError;
use crate::domain::num::Num;
use crate::domain::series::BarSeries;
use chrono::{Months, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlicePeriod {
    Duration(chrono::Duration),
    Months(u32),
}

impl SlicePeriod {
    pub fn years(years: u32) -> Self {
        SlicePeriod::Months(years * 12)
    }

    pub fn days(days: i64) -> Self {
        SlicePeriod::Duration(chrono::Duration::days(days))
    }

    /// The instant one period after `start`.
    pub fn after(&self, start: NaiveDateTime) -> Result<NaiveDateTime, TradebenchError> {
        let next = match self {
            SlicePeriod::Duration(d) => start.checked_add_signed(*d),
            SlicePeriod::Months(m) => start.checked_add_months(Months::new(*m)),
        };
        next.ok_or_else(|| TradebenchError::InvalidArgument {
            reason: format!("period {} overflows after {}", self, start),
        })
    }

    fn validate(&self) -> Result<(), TradebenchError> {
        let positive = match self {
            SlicePeriod::Duration(d) => *d > chrono::Duration::zero(),
            SlicePeriod::Months(m) => *m > 0,
        };
        if !positive {
            return Err(TradebenchError::InvalidArgument {
                reason: "slice period must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for SlicePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlicePeriod::Months(m) if m % 12 == 0 => write!(f, "{}y", m / 12),
            SlicePeriod::Months(m) => write!(f, "{}m", m),
            SlicePeriod::Duration(d) => {
                if d.num_seconds() % 86_400 == 0 {
                    write!(f, "{}d", d.num_days())
                } else if d.num_seconds() % 3_600 == 0 {
                    write!(f, "{}h", d.num_hours())
                } else {
                    write!(f, "{}min", d.num_minutes())
                }
            }
        }
    }
}

/// Parses `<count><unit>` with units `y`, `m` (months), `w`, `d`, `h` and
/// `min`.
impl FromStr for SlicePeriod {
    type Err = TradebenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || TradebenchError::InvalidArgument {
            reason: format!("invalid slice period '{}'", s),
        };
        let split = s.find(|c: char| !c.is_ascii_digit()).ok_or_else(invalid)?;
        let (count, unit) = s.split_at(split);
        let count: u32 = count.parse().map_err(|_| invalid())?;
        let period = match unit.to_ascii_lowercase().as_str() {
            "y" => SlicePeriod::Months(count.checked_mul(12).ok_or_else(invalid)?),
            "m" => SlicePeriod::Months(count),
            "w" => SlicePeriod::Duration(chrono::Duration::weeks(count as i64)),
            "d" => SlicePeriod::Duration(chrono::Duration::days(count as i64)),
            "h" => SlicePeriod::Duration(chrono::Duration::hours(count as i64)),
            "min" => SlicePeriod::Duration(chrono::Duration::minutes(count as i64)),
            _ => return Err(invalid()),
        };
        period.validate()?;
        Ok(period)
    }
}

#[derive(Debug, Clone)]
pub struct Slicer<N: Num> {
    series: BarSeries<N>,
    slices: Vec<BarSeries<N>>,
}

impl<N: Num> Slicer<N> {
    /// One slice per period, starting at the first bar.
    pub fn regular(series: &BarSeries<N>, period: SlicePeriod) -> Result<Self, TradebenchError> {
        Self::rolling(series, period, 1)
    }

    /// One slice per period, starting at `period_begin`.
    pub fn regular_from(
        series: &BarSeries<N>,
        period: SlicePeriod,
        period_begin: NaiveDateTime,
    ) -> Result<Self, TradebenchError> {
        Self::rolling_from(series, period, period_begin, 1)
    }

    pub fn rolling(
        series: &BarSeries<N>,
        period: SlicePeriod,
        periods_per_slice: usize,
    ) -> Result<Self, TradebenchError> {
        match series.first_bar() {
            Some(first) => Self::rolling_from(series, period, first.end_time, periods_per_slice),
            None => {
                period.validate()?;
                require_periods_per_slice(periods_per_slice)?;
                Ok(Slicer {
                    series: series.clone(),
                    slices: Vec::new(),
                })
            }
        }
    }

    /// Slices starting at `period_begin`. Bars ending before it are
    /// dropped; a begin earlier than the first bar is moved to the first
    /// bar's end time.
    pub fn rolling_from(
        series: &BarSeries<N>,
        period: SlicePeriod,
        period_begin: NaiveDateTime,
        periods_per_slice: usize,
    ) -> Result<Self, TradebenchError> {
        period.validate()?;
        require_periods_per_slice(periods_per_slice)?;

        let (Some(first), Some(last)) = (series.first_bar(), series.end_index()) else {
            return Ok(Slicer {
                series: series.clone(),
                slices: Vec::new(),
            });
        };
        let period_begin = period_begin.max(first.end_time);

        let mut index = series.begin_index();
        while index <= last && series.bar(index).end_time < period_begin {
            index += 1;
        }
        if index > last {
            return Ok(Slicer {
                series: series.empty_view(index),
                slices: Vec::new(),
            });
        }
        let series = series.sub_series(index, last)?;
        let slices = split(&series, period, period_begin, periods_per_slice)?;
        tracing::debug!(
            series = series.name(),
            period = %period,
            begin = %period_begin,
            slices = slices.len(),
            "series sliced"
        );
        Ok(Slicer { series, slices })
    }

    /// Slices from explicit inclusive `(begin, end)` index bounds.
    pub fn from_bounds(series: &BarSeries<N>, bounds: &[(usize, usize)]) -> Result<Self, TradebenchError> {
        let slices = bounds
            .iter()
            .map(|&(begin, end)| series.sub_series(begin, end))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Slicer {
            series: series.clone(),
            slices,
        })
    }

    /// The sliced part of the input series.
    pub fn series(&self) -> &BarSeries<N> {
        &self.series
    }

    pub fn slice(&self, index: usize) -> Result<&BarSeries<N>, TradebenchError> {
        self.slices.get(index).ok_or(TradebenchError::SliceOutOfRange {
            index,
            slices: self.slices.len(),
        })
    }

    pub fn slices(&self) -> &[BarSeries<N>] {
        &self.slices
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn average_bars_per_slice(&self) -> f64 {
        if self.slices.is_empty() {
            return 0.0;
        }
        let total: usize = self.slices.iter().map(BarSeries::len).sum();
        total as f64 / self.slices.len() as f64
    }
}

fn require_periods_per_slice(periods_per_slice: usize) -> Result<(), TradebenchError> {
    if periods_per_slice == 0 {
        return Err(TradebenchError::InvalidArgument {
            reason: "periods per slice must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn split<N: Num>(
    series: &BarSeries<N>,
    period: SlicePeriod,
    period_begin: NaiveDateTime,
    periods_per_slice: usize,
) -> Result<Vec<BarSeries<N>>, TradebenchError> {
    let Some(last) = series.end_index() else {
        return Ok(Vec::new());
    };
    let mut start = period_begin;
    let mut end = period.after(start)?;
    let mut index = series.begin_index();
    let mut begins = vec![index];
    let mut slices = Vec::new();

    while index <= last {
        let time = series.bar(index).end_time;
        if start <= time && time < end {
            index += 1;
            continue;
        }
        let next_end = period.after(end)?;
        let current_begin = begins[begins.len() - 1];
        if time < next_end && index > current_begin {
            // Bar opens the next interval: close the current slice.
            let from = begins[begins.len().saturating_sub(periods_per_slice)];
            slices.push(series.sub_series(from, index - 1)?);
            begins.push(index);
            index += 1;
        }
        start = end;
        end = next_end;
    }
    let from = begins[begins.len().saturating_sub(periods_per_slice)];
    slices.push(series.sub_series(from, last)?);
    Ok(slices)
}
