//! OHLCV bar representation.

use crate::domain::num::Num;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// One immutable OHLCV sample covering `[begin_time, end_time)`.
///
/// `high >= max(open, close) >= min(open, close) >= low` is assumed of the
/// input and not checked.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar<N: Num> {
    pub begin_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub open: N,
    pub high: N,
    pub low: N,
    pub close: N,
    pub volume: N,
    pub trade_count: u64,
}

impl<N: Num> Bar<N> {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> N {
        self.high
            .plus(self.low)
            .plus(self.close)
            .divided_by(N::num_of(3.0))
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: N) -> N {
        let hl = self.high.minus(self.low);
        let hc = self.high.minus(prev_close).abs();
        let lc = self.low.minus(prev_close).abs();
        hl.max(hc).max(lc)
    }

    pub fn is_bullish(&self) -> bool {
        self.close.is_greater_than(self.open)
    }

    pub fn is_bearish(&self) -> bool {
        self.close.is_less_than(self.open)
    }
}

/// Parses an RFC 3339 timestamp (normalized to UTC), `%Y-%m-%d %H:%M:%S`,
/// or a bare `%Y-%m-%d` date at midnight.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
