//! Configuration validation.
//!
//! Validates every key a run reads before any data is loaded, then converts
//! the validated sections into domain settings.
//!
//! Sections: `[backtest]`, `[strategy]`, `[walk_forward]`.

use crate::domain::backtest::BacktestConfig;
use crate::domain::bar::parse_timestamp;
use crate::domain::error::TradebenchError;
use crate::domain::history_runner::Lookahead;
use crate::domain::num::Num;
use crate::domain::order::OrderType;
use crate::domain::series::BarSeries;
use crate::domain::slicer::{SlicePeriod, Slicer};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

/// Scalar type a run computes with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericKind {
    #[default]
    Double,
    Decimal,
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericKind::Double => write!(f, "double"),
            NumericKind::Decimal => write!(f, "decimal"),
        }
    }
}

impl FromStr for NumericKind {
    type Err = TradebenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "double" | "f64" => Ok(NumericKind::Double),
            "decimal" => Ok(NumericKind::Decimal),
            other => Err(TradebenchError::InvalidArgument {
                reason: format!("unknown numeric type '{}' (expected double or decimal)", other),
            }),
        }
    }
}

/// Settings of a `[walk_forward]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkForwardConfig {
    pub period: SlicePeriod,
    pub periods_per_slice: usize,
    pub lookahead: Lookahead,
    /// Forced period begin; the first bar's end time when unset.
    pub begin: Option<NaiveDateTime>,
}

impl WalkForwardConfig {
    pub fn slicer<N: Num>(&self, series: &BarSeries<N>) -> Result<Slicer<N>, TradebenchError> {
        match self.begin {
            Some(begin) => Slicer::rolling_from(series, self.period, begin, self.periods_per_slice),
            None => Slicer::rolling(series, self.period, self.periods_per_slice),
        }
    }
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TradebenchError> {
    data_path(config)?;
    starting_type(config)?;
    validate_amount(config)?;
    validate_fee(config, "transaction_fee")?;
    validate_fee(config, "borrowing_fee")?;
    numeric_kind(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), TradebenchError> {
    strategy_name(config)?;
    optional_usize(config, "strategy", "unstable_bars")?;
    validate_percent(config, "stop_loss")?;
    validate_percent(config, "take_profit")?;
    Ok(())
}

pub fn validate_walk_forward_config(config: &dyn ConfigPort) -> Result<(), TradebenchError> {
    walk_forward_config_from(config).map(|_| ())
}

/// `[backtest] data`: path of the bar file.
pub fn data_path(config: &dyn ConfigPort) -> Result<String, TradebenchError> {
    required_string(config, "backtest", "data")
}

/// `[strategy] name`: registry key of the strategy to build.
pub fn strategy_name(config: &dyn ConfigPort) -> Result<String, TradebenchError> {
    required_string(config, "strategy", "name")
}

pub fn numeric_kind(config: &dyn ConfigPort) -> Result<NumericKind, TradebenchError> {
    match config.get_string("backtest", "numeric") {
        None => Ok(NumericKind::default()),
        Some(value) => value
            .parse()
            .map_err(|e: TradebenchError| invalid("backtest", "numeric", e)),
    }
}

pub fn backtest_config_from(config: &dyn ConfigPort) -> Result<BacktestConfig, TradebenchError> {
    validate_backtest_config(config)?;
    let defaults = BacktestConfig::default();
    Ok(BacktestConfig {
        starting_type: starting_type(config)?,
        amount: optional_f64(config, "backtest", "amount")?.unwrap_or(defaults.amount),
        transaction_fee: optional_f64(config, "backtest", "transaction_fee")?
            .unwrap_or(defaults.transaction_fee),
        borrowing_fee: optional_f64(config, "backtest", "borrowing_fee")?
            .unwrap_or(defaults.borrowing_fee),
    })
}

pub fn walk_forward_config_from(
    config: &dyn ConfigPort,
) -> Result<WalkForwardConfig, TradebenchError> {
    let period: SlicePeriod = required_string(config, "walk_forward", "period")?
        .parse()
        .map_err(|e: TradebenchError| invalid("walk_forward", "period", e))?;

    let periods_per_slice = optional_usize(config, "walk_forward", "periods_per_slice")?.unwrap_or(1);
    if periods_per_slice == 0 {
        return Err(TradebenchError::ConfigInvalid {
            section: "walk_forward".to_string(),
            key: "periods_per_slice".to_string(),
            reason: "periods_per_slice must be at least 1".to_string(),
        });
    }

    let lookahead = match config.get_string("walk_forward", "lookahead") {
        None => Lookahead::default(),
        Some(value) => value
            .parse()
            .map_err(|e: TradebenchError| invalid("walk_forward", "lookahead", e))?,
    };

    let begin = match config.get_string("walk_forward", "begin") {
        None => None,
        Some(value) => Some(parse_timestamp(&value).ok_or_else(|| TradebenchError::ConfigInvalid {
            section: "walk_forward".to_string(),
            key: "begin".to_string(),
            reason: format!("invalid timestamp '{}'", value),
        })?),
    };

    Ok(WalkForwardConfig {
        period,
        periods_per_slice,
        lookahead,
        begin,
    })
}

fn starting_type(config: &dyn ConfigPort) -> Result<OrderType, TradebenchError> {
    match config.get_string("backtest", "starting_type") {
        None => Ok(OrderType::Buy),
        Some(value) => value
            .parse()
            .map_err(|e: TradebenchError| invalid("backtest", "starting_type", e)),
    }
}

fn validate_amount(config: &dyn ConfigPort) -> Result<(), TradebenchError> {
    if let Some(amount) = optional_f64(config, "backtest", "amount")? {
        if amount <= 0.0 {
            return Err(TradebenchError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "amount".to_string(),
                reason: "amount must be positive".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_fee(config: &dyn ConfigPort, key: &str) -> Result<(), TradebenchError> {
    if let Some(fee) = optional_f64(config, "backtest", key)? {
        if fee < 0.0 {
            return Err(TradebenchError::ConfigInvalid {
                section: "backtest".to_string(),
                key: key.to_string(),
                reason: format!("{} must be non-negative", key),
            });
        }
    }
    Ok(())
}

fn validate_percent(config: &dyn ConfigPort, key: &str) -> Result<(), TradebenchError> {
    if let Some(pct) = optional_f64(config, "strategy", key)? {
        if pct <= 0.0 || pct > 100.0 {
            return Err(TradebenchError::ConfigInvalid {
                section: "strategy".to_string(),
                key: key.to_string(),
                reason: format!("{} must be in (0, 100]", key),
            });
        }
    }
    Ok(())
}

fn invalid(section: &str, key: &str, err: TradebenchError) -> TradebenchError {
    let reason = match err {
        TradebenchError::InvalidArgument { reason } => reason,
        other => other.to_string(),
    };
    TradebenchError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    }
}

pub(crate) fn required_string(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<String, TradebenchError> {
    match config.get_string(section, key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(TradebenchError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

/// A non-negative integer key; `None` when absent.
pub(crate) fn optional_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<usize>, TradebenchError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| TradebenchError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("expected a non-negative integer, found '{}'", value),
            }),
    }
}

/// A finite number key; `None` when absent.
pub(crate) fn optional_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, TradebenchError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(value) => match value.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(TradebenchError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("expected a number, found '{}'", value),
            }),
        },
    }
}
