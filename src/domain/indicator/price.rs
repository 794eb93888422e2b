//! Bar field and constant indicators.
//!
//! These read bar storage directly and carry no cache.

use super::{Indicator, IndicatorRef};
use crate::domain::num::Num;
use crate::domain::series::BarSeries;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
    Typical,
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PriceField::Open => "OPEN",
            PriceField::High => "HIGH",
            PriceField::Low => "LOW",
            PriceField::Close => "CLOSE",
            PriceField::Volume => "VOLUME",
            PriceField::Typical => "TYPICAL",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug)]
pub struct PriceIndicator<N: Num> {
    series: BarSeries<N>,
    field: PriceField,
}

impl<N: Num> PriceIndicator<N> {
    pub fn new(series: BarSeries<N>, field: PriceField) -> Self {
        PriceIndicator { series, field }
    }
}

impl<N: Num> Indicator<N> for PriceIndicator<N> {
    fn value(&self, index: usize) -> N {
        let bar = self.series.bar(index);
        match self.field {
            PriceField::Open => bar.open,
            PriceField::High => bar.high,
            PriceField::Low => bar.low,
            PriceField::Close => bar.close,
            PriceField::Volume => bar.volume,
            PriceField::Typical => bar.typical_price(),
        }
    }

    fn unstable_bars(&self) -> usize {
        0
    }

    fn series(&self) -> &BarSeries<N> {
        &self.series
    }

    fn name(&self) -> String {
        self.field.to_string()
    }
}

#[derive(Debug)]
pub struct ConstantIndicator<N: Num> {
    series: BarSeries<N>,
    value: N,
}

impl<N: Num> Indicator<N> for ConstantIndicator<N> {
    fn value(&self, _index: usize) -> N {
        self.value
    }

    fn unstable_bars(&self) -> usize {
        0
    }

    fn series(&self) -> &BarSeries<N> {
        &self.series
    }

    fn name(&self) -> String {
        self.value.to_string()
    }
}

pub fn price<N: Num>(series: &BarSeries<N>, field: PriceField) -> IndicatorRef<N> {
    Rc::new(PriceIndicator::new(series.clone(), field))
}

pub fn open_price<N: Num>(series: &BarSeries<N>) -> IndicatorRef<N> {
    price(series, PriceField::Open)
}

pub fn high_price<N: Num>(series: &BarSeries<N>) -> IndicatorRef<N> {
    price(series, PriceField::High)
}

pub fn low_price<N: Num>(series: &BarSeries<N>) -> IndicatorRef<N> {
    price(series, PriceField::Low)
}

pub fn close_price<N: Num>(series: &BarSeries<N>) -> IndicatorRef<N> {
    price(series, PriceField::Close)
}

pub fn volume<N: Num>(series: &BarSeries<N>) -> IndicatorRef<N> {
    price(series, PriceField::Volume)
}

pub fn constant<N: Num>(series: &BarSeries<N>, value: N) -> IndicatorRef<N> {
    Rc::new(ConstantIndicator {
        series: series.clone(),
        value,
    })
}
