#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tradebench::domain::bar::Bar;
use tradebench::domain::error::TradebenchError;
use tradebench::domain::num::Num;
use tradebench::domain::series::BarSeries;
use tradebench::ports::data_port::DataPort;

/// In-memory bar store keyed by path.
pub struct MockDataPort {
    pub data: HashMap<PathBuf, Vec<Bar<f64>>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, path: &str, bars: Vec<Bar<f64>>) -> Self {
        self.data.insert(PathBuf::from(path), bars);
        self
    }
}

impl DataPort<f64> for MockDataPort {
    fn load_series(&self, path: &Path, name: &str) -> Result<BarSeries<f64>, TradebenchError> {
        match self.data.get(path) {
            Some(bars) if !bars.is_empty() => Ok(BarSeries::new(name, bars.clone())),
            _ => Err(TradebenchError::NoData {
                path: path.display().to_string(),
            }),
        }
    }
}

pub fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn bar<N: Num>(begin: NaiveDateTime, close: f64) -> Bar<N> {
    let c = N::num_of(close);
    Bar {
        begin_time: begin,
        end_time: begin + Duration::days(1),
        open: c,
        high: c,
        low: c,
        close: c,
        volume: N::num_of(1000.0),
        trade_count: 1,
    }
}

/// Daily bars from 2020-01-01 with the given closes.
pub fn daily_bars(closes: &[f64]) -> Vec<Bar<f64>> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| bar(at(2020, 1, 1) + Duration::days(i as i64), c))
        .collect()
}

pub fn daily_series(closes: &[f64]) -> BarSeries<f64> {
    BarSeries::new("daily", daily_bars(closes))
}

/// One bar per entry on 1 March of the given year, two bars in a year
/// landing on 1 March and 1 September.
pub fn bars_in_years(years: &[i32]) -> Vec<Bar<f64>> {
    let mut bars = Vec::new();
    let mut previous: Option<i32> = None;
    let mut within = 0;
    for (i, &year) in years.iter().enumerate() {
        within = if previous == Some(year) { within + 1 } else { 0 };
        previous = Some(year);
        let month = 3 + 3 * within as u32;
        bars.push(bar(at(year, month, 1), 10.0 + i as f64));
    }
    bars
}

pub fn to_csv(bars: &[Bar<f64>]) -> String {
    let mut out = String::from("begin_time,end_time,open,high,low,close,volume,trades\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            b.begin_time.format("%Y-%m-%d %H:%M:%S"),
            b.end_time.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume,
            b.trade_count
        ));
    }
    out
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}
