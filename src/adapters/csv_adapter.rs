//! CSV file data adapter.
//!
//! Expects a header row naming the columns, in any order:
//! `begin_time,end_time,open,high,low,close,volume[,trades]`. `date` is
//! accepted for `begin_time`; without an `end_time` column every bar spans
//! the adapter's bar duration (one day by default).

use crate::domain::bar::{parse_timestamp, Bar};
use crate::domain::error::TradebenchError;
use crate::domain::num::Num;
use crate::domain::series::BarSeries;
use crate::ports::data_port::DataPort;
use chrono::{Duration, NaiveDateTime};
use csv::StringRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct CsvAdapter {
    bar_duration: Duration,
}

impl Default for CsvAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvAdapter {
    pub fn new() -> Self {
        Self {
            bar_duration: Duration::days(1),
        }
    }

    /// Span given to bars of files without an `end_time` column.
    pub fn with_bar_duration(mut self, bar_duration: Duration) -> Self {
        self.bar_duration = bar_duration;
        self
    }

    pub fn read_series<N: Num, R: Read>(
        &self,
        reader: R,
        name: &str,
    ) -> Result<BarSeries<N>, TradebenchError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr.headers().map_err(csv_error)?.clone();
        let columns = Columns::from_headers(&headers)?;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(csv_error)?;
            bars.push(self.parse_bar(&columns, &record)?);
        }
        bars.sort_by_key(|b: &Bar<N>| b.begin_time);

        tracing::debug!(series = name, bars = bars.len(), "bars loaded");
        Ok(BarSeries::new(name, bars))
    }

    fn parse_bar<N: Num>(
        &self,
        columns: &Columns,
        record: &StringRecord,
    ) -> Result<Bar<N>, TradebenchError> {
        let line = record.position().map_or(0, |p| p.line());
        let begin_time = timestamp(record, columns.begin, "begin_time", line)?;
        let end_time = match columns.end {
            Some(index) => timestamp(record, index, "end_time", line)?,
            None => begin_time + self.bar_duration,
        };
        if end_time <= begin_time {
            return Err(TradebenchError::Data {
                reason: format!("line {}: end_time must be after begin_time", line),
            });
        }

        let trade_count = match columns.trades {
            Some(index) => field(record, index, "trades", line)?
                .parse::<u64>()
                .map_err(|e| TradebenchError::Data {
                    reason: format!("line {}: invalid trades value: {}", line, e),
                })?,
            None => 0,
        };

        Ok(Bar {
            begin_time,
            end_time,
            open: number(record, columns.open, "open", line)?,
            high: number(record, columns.high, "high", line)?,
            low: number(record, columns.low, "low", line)?,
            close: number(record, columns.close, "close", line)?,
            volume: number(record, columns.volume, "volume", line)?,
            trade_count,
        })
    }
}

impl<N: Num> DataPort<N> for CsvAdapter {
    fn load_series(&self, path: &Path, name: &str) -> Result<BarSeries<N>, TradebenchError> {
        let file = File::open(path)?;
        let series = self.read_series(file, name)?;
        if series.is_empty() {
            return Err(TradebenchError::NoData {
                path: path.display().to_string(),
            });
        }
        Ok(series)
    }
}

struct Columns {
    begin: usize,
    end: Option<usize>,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    trades: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, TradebenchError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
        };
        let require = |names: &[&str]| {
            find(names).ok_or_else(|| TradebenchError::Data {
                reason: format!("missing {} column", names[0]),
            })
        };

        Ok(Columns {
            begin: require(&["begin_time", "date"])?,
            end: find(&["end_time"]),
            open: require(&["open"])?,
            high: require(&["high"])?,
            low: require(&["low"])?,
            close: require(&["close"])?,
            volume: require(&["volume"])?,
            trades: find(&["trades"]),
        })
    }
}

fn csv_error(e: csv::Error) -> TradebenchError {
    TradebenchError::Data {
        reason: format!("CSV parse error: {}", e),
    }
}

fn field<'r>(
    record: &'r StringRecord,
    index: usize,
    name: &str,
    line: u64,
) -> Result<&'r str, TradebenchError> {
    record.get(index).ok_or_else(|| TradebenchError::Data {
        reason: format!("line {}: missing {} value", line, name),
    })
}

fn timestamp(
    record: &StringRecord,
    index: usize,
    name: &str,
    line: u64,
) -> Result<NaiveDateTime, TradebenchError> {
    let text = field(record, index, name, line)?;
    parse_timestamp(text).ok_or_else(|| TradebenchError::Data {
        reason: format!("line {}: invalid {} '{}'", line, name, text),
    })
}

fn number<N: Num>(
    record: &StringRecord,
    index: usize,
    name: &str,
    line: u64,
) -> Result<N, TradebenchError> {
    let text = field(record, index, name, line)?;
    N::parse_num(text).ok_or_else(|| TradebenchError::Data {
        reason: format!("line {}: invalid {} value '{}'", line, name, text),
    })
}
