//! Numeric abstraction shared by every component.
//!
//! All core types are generic over [`Num`]. Two families are provided:
//! `f64` (fast, binary floating point) and [`DecimalNum`] (exact decimal
//! arithmetic with an explicit NaN state). Operations that have no defined
//! result (division by zero, overflow, NaN inputs) return NaN instead of
//! panicking.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

pub trait Num:
    Copy + fmt::Debug + fmt::Display + PartialEq + PartialOrd + Send + Sync + 'static
{
    fn num_of(value: f64) -> Self;
    fn nan() -> Self;
    fn plus(self, other: Self) -> Self;
    fn minus(self, other: Self) -> Self;
    fn multiplied_by(self, other: Self) -> Self;
    fn divided_by(self, other: Self) -> Self;
    fn is_nan(self) -> bool;
    fn to_f64(self) -> f64;

    /// Parses decimal text; `None` when it is not a finite number.
    fn parse_num(text: &str) -> Option<Self> {
        text.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Self::num_of)
    }

    fn zero() -> Self {
        Self::num_of(0.0)
    }

    fn one() -> Self {
        Self::num_of(1.0)
    }

    fn is_zero(self) -> bool {
        !self.is_nan() && self == Self::zero()
    }

    fn is_negative(self) -> bool {
        !self.is_nan() && self < Self::zero()
    }

    fn is_positive(self) -> bool {
        !self.is_nan() && self > Self::zero()
    }

    /// False whenever either side is NaN.
    fn is_greater_than(self, other: Self) -> bool {
        self > other
    }

    /// False whenever either side is NaN.
    fn is_less_than(self, other: Self) -> bool {
        self < other
    }

    fn negate(self) -> Self {
        Self::zero().minus(self)
    }

    fn abs(self) -> Self {
        if self.is_negative() { self.negate() } else { self }
    }

    /// NaN if either side is NaN.
    fn max(self, other: Self) -> Self {
        if self.is_nan() || other.is_nan() {
            return Self::nan();
        }
        if other > self { other } else { self }
    }

    /// NaN if either side is NaN.
    fn min(self, other: Self) -> Self {
        if self.is_nan() || other.is_nan() {
            return Self::nan();
        }
        if other < self { other } else { self }
    }
}

impl Num for f64 {
    fn num_of(value: f64) -> Self {
        value
    }

    fn nan() -> Self {
        f64::NAN
    }

    fn plus(self, other: Self) -> Self {
        self + other
    }

    fn minus(self, other: Self) -> Self {
        self - other
    }

    fn multiplied_by(self, other: Self) -> Self {
        self * other
    }

    fn divided_by(self, other: Self) -> Self {
        if other == 0.0 {
            return f64::NAN;
        }
        self / other
    }

    fn is_nan(self) -> bool {
        f64::is_nan(self)
    }

    fn to_f64(self) -> f64 {
        self
    }
}

/// Exact decimal number. `None` is NaN.
///
/// NaN compares unequal to everything, itself included, matching `f64`.
#[derive(Debug, Clone, Copy)]
pub struct DecimalNum(Option<Decimal>);

impl DecimalNum {
    pub fn new(value: Decimal) -> Self {
        DecimalNum(Some(value))
    }

    pub fn decimal(self) -> Option<Decimal> {
        self.0
    }

    fn combine(self, other: Self, op: impl Fn(Decimal, Decimal) -> Option<Decimal>) -> Self {
        match (self.0, other.0) {
            (Some(a), Some(b)) => DecimalNum(op(a, b)),
            _ => DecimalNum(None),
        }
    }
}

impl From<Decimal> for DecimalNum {
    fn from(value: Decimal) -> Self {
        DecimalNum::new(value)
    }
}

impl PartialEq for DecimalNum {
    fn eq(&self, other: &Self) -> bool {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for DecimalNum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        }
    }
}

impl fmt::Display for DecimalNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(d) => write!(f, "{}", d.normalize()),
            None => write!(f, "NaN"),
        }
    }
}

impl Num for DecimalNum {
    fn num_of(value: f64) -> Self {
        DecimalNum(Decimal::try_from(value).ok())
    }

    fn nan() -> Self {
        DecimalNum(None)
    }

    fn parse_num(text: &str) -> Option<Self> {
        let text = text.trim();
        Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .ok()
            .map(DecimalNum::new)
    }

    fn zero() -> Self {
        DecimalNum(Some(Decimal::ZERO))
    }

    fn one() -> Self {
        DecimalNum(Some(Decimal::ONE))
    }

    fn plus(self, other: Self) -> Self {
        self.combine(other, |a, b| a.checked_add(b))
    }

    fn minus(self, other: Self) -> Self {
        self.combine(other, |a, b| a.checked_sub(b))
    }

    fn multiplied_by(self, other: Self) -> Self {
        self.combine(other, |a, b| a.checked_mul(b))
    }

    fn divided_by(self, other: Self) -> Self {
        self.combine(other, |a, b| a.checked_div(b))
    }

    fn is_nan(self) -> bool {
        self.0.is_none()
    }

    fn to_f64(self) -> f64 {
        self.0.and_then(|d| d.to_f64()).unwrap_or(f64::NAN)
    }
}
