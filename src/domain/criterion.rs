//! Analysis criteria: folds of a trading record into one score.
//!
//! Only closed positions contribute. An empty record yields the identity
//! of each fold (1 for ratios multiplied together, 0 for sums and counts).

use crate::domain::backtest::{BacktestConfig, run_backtest};
use crate::domain::error::TradebenchError;
use crate::domain::num::Num;
use crate::domain::order::OrderType;
use crate::domain::position::Position;
use crate::domain::series::BarSeries;
use crate::domain::strategy::Strategy;
use crate::domain::trading_record::TradingRecord;

pub trait Criterion<N: Num> {
    fn name(&self) -> &'static str;

    fn calculate_position(&self, series: &BarSeries<N>, position: &Position<N>) -> N;

    fn calculate(&self, series: &BarSeries<N>, record: &TradingRecord<N>) -> N;

    /// Whether score `a` ranks above score `b`.
    fn better_than(&self, a: N, b: N) -> bool {
        a.is_greater_than(b)
    }
}

/// Product of the gross return ratios of closed positions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TotalReturnCriterion;

impl<N: Num> Criterion<N> for TotalReturnCriterion {
    fn name(&self) -> &'static str {
        "total return"
    }

    fn calculate_position(&self, _series: &BarSeries<N>, position: &Position<N>) -> N {
        position.gross_return().unwrap_or_else(|_| N::one())
    }

    fn calculate(&self, series: &BarSeries<N>, record: &TradingRecord<N>) -> N {
        record
            .positions()
            .iter()
            .fold(N::one(), |acc, p| acc.multiplied_by(self.calculate_position(series, p)))
    }
}

/// Sum of profits after costs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetProfitCriterion;

impl<N: Num> Criterion<N> for NetProfitCriterion {
    fn name(&self) -> &'static str {
        "net profit"
    }

    fn calculate_position(&self, _series: &BarSeries<N>, position: &Position<N>) -> N {
        position.profit().unwrap_or_else(|_| N::zero())
    }

    fn calculate(&self, series: &BarSeries<N>, record: &TradingRecord<N>) -> N {
        record
            .positions()
            .iter()
            .fold(N::zero(), |acc, p| acc.plus(self.calculate_position(series, p)))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NumberOfPositionsCriterion;

impl<N: Num> Criterion<N> for NumberOfPositionsCriterion {
    fn name(&self) -> &'static str {
        "positions"
    }

    fn calculate_position(&self, _series: &BarSeries<N>, _position: &Position<N>) -> N {
        N::one()
    }

    fn calculate(&self, _series: &BarSeries<N>, record: &TradingRecord<N>) -> N {
        N::num_of(record.position_count() as f64)
    }

    fn better_than(&self, a: N, b: N) -> bool {
        a.is_less_than(b)
    }
}

/// Share of closed positions with a positive profit.
#[derive(Debug, Clone, Copy, Default)]
pub struct WinningPositionsRatioCriterion;

impl<N: Num> Criterion<N> for WinningPositionsRatioCriterion {
    fn name(&self) -> &'static str {
        "winning ratio"
    }

    fn calculate_position(&self, _series: &BarSeries<N>, position: &Position<N>) -> N {
        match position.profit() {
            Ok(profit) if profit.is_positive() => N::one(),
            _ => N::zero(),
        }
    }

    fn calculate(&self, series: &BarSeries<N>, record: &TradingRecord<N>) -> N {
        if record.position_count() == 0 {
            return N::zero();
        }
        let winners = record
            .positions()
            .iter()
            .fold(N::zero(), |acc, p| acc.plus(self.calculate_position(series, p)));
        winners.divided_by(N::num_of(record.position_count() as f64))
    }
}

/// Net profit per closed position.
#[derive(Debug, Clone, Copy, Default)]
pub struct AverageProfitCriterion;

impl<N: Num> Criterion<N> for AverageProfitCriterion {
    fn name(&self) -> &'static str {
        "average profit"
    }

    fn calculate_position(&self, series: &BarSeries<N>, position: &Position<N>) -> N {
        NetProfitCriterion.calculate_position(series, position)
    }

    fn calculate(&self, series: &BarSeries<N>, record: &TradingRecord<N>) -> N {
        if record.position_count() == 0 {
            return N::zero();
        }
        NetProfitCriterion
            .calculate(series, record)
            .divided_by(N::num_of(record.position_count() as f64))
    }
}

/// Largest peak-to-trough decline of the cash flow, as a fraction of the
/// peak.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaximumDrawdownCriterion;

impl<N: Num> Criterion<N> for MaximumDrawdownCriterion {
    fn name(&self) -> &'static str {
        "maximum drawdown"
    }

    fn calculate_position(&self, series: &BarSeries<N>, position: &Position<N>) -> N {
        let mut record = TradingRecord::new(position.starting_type());
        if let (Some(entry), Some(exit)) = (position.entry(), position.exit()) {
            let replayed = record
                .operate(entry.index(), entry.price_per_asset(), entry.amount())
                .and_then(|_| record.operate(exit.index(), exit.price_per_asset(), exit.amount()));
            if replayed.is_err() {
                return N::zero();
            }
        }
        self.calculate(series, &record)
    }

    fn calculate(&self, series: &BarSeries<N>, record: &TradingRecord<N>) -> N {
        max_drawdown(&cash_flow(series, record))
    }

    fn better_than(&self, a: N, b: N) -> bool {
        a.is_less_than(b)
    }
}

/// Return of buying at the first close and selling at the last.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuyAndHoldCriterion;

impl<N: Num> Criterion<N> for BuyAndHoldCriterion {
    fn name(&self) -> &'static str {
        "buy and hold"
    }

    fn calculate_position(&self, series: &BarSeries<N>, position: &Position<N>) -> N {
        let (Some(entry), Some(exit)) = (position.entry(), position.exit()) else {
            return N::one();
        };
        let ratio = series
            .bar(exit.index())
            .close
            .divided_by(series.bar(entry.index()).close);
        match position.starting_type() {
            OrderType::Buy => ratio,
            OrderType::Sell => N::one().plus(N::one()).minus(ratio),
        }
    }

    fn calculate(&self, series: &BarSeries<N>, _record: &TradingRecord<N>) -> N {
        match (series.first_bar(), series.last_bar()) {
            (Some(first), Some(last)) => last.close.divided_by(first.close),
            _ => N::one(),
        }
    }
}

/// Value of one unit of capital at every index of the series window,
/// following the closes while a position is held and flat otherwise.
pub fn cash_flow<N: Num>(series: &BarSeries<N>, record: &TradingRecord<N>) -> Vec<N> {
    let begin = series.begin_index();
    let mut values = vec![N::one(); series.len()];
    let Some(end) = series.end_index() else {
        return values;
    };
    let mut filled = begin;
    for position in record.positions() {
        let (Some(entry), Some(exit)) = (position.entry(), position.exit()) else {
            continue;
        };
        if entry.index() < begin || exit.index() > end || entry.index() < filled {
            continue;
        }
        for i in filled + 1..=entry.index() {
            values[i - begin] = values[filled - begin];
        }
        let base = values[entry.index() - begin];
        let entry_close = series.bar(entry.index()).close;
        for i in entry.index() + 1..=exit.index() {
            let ratio = series.bar(i).close.divided_by(entry_close);
            let ratio = match entry.order_type() {
                OrderType::Buy => ratio,
                OrderType::Sell => N::one().plus(N::one()).minus(ratio),
            };
            values[i - begin] = base.multiplied_by(ratio);
        }
        filled = exit.index();
    }
    for i in filled + 1..=end {
        values[i - begin] = values[filled - begin];
    }
    values
}

fn max_drawdown<N: Num>(values: &[N]) -> N {
    let mut peak = match values.first() {
        Some(v) => *v,
        None => return N::zero(),
    };
    let mut worst = N::zero();
    for &value in values {
        if value.is_greater_than(peak) {
            peak = value;
        }
        let drawdown = peak.minus(value).divided_by(peak);
        if drawdown.is_greater_than(worst) {
            worst = drawdown;
        }
    }
    worst
}

/// Backtests every candidate and returns the index of the best one by
/// `criterion`, with its score. Ties keep the earlier candidate.
pub fn best_strategy<N: Num>(
    criterion: &dyn Criterion<N>,
    series: &BarSeries<N>,
    candidates: &[Strategy<N>],
    config: &BacktestConfig,
) -> Result<Option<(usize, N)>, TradebenchError> {
    let mut best: Option<(usize, N)> = None;
    for (i, strategy) in candidates.iter().enumerate() {
        let record = run_backtest(series, strategy, config)?;
        let score = criterion.calculate(series, &record);
        tracing::debug!(strategy = strategy.name(), criterion = criterion.name(), score = %score, "candidate scored");
        best = match best {
            Some((_, current)) if !criterion.better_than(score, current) => best,
            _ => Some((i, score)),
        };
    }
    Ok(best)
}

/// Headline statistics of one trading record.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary<N: Num> {
    pub positions: usize,
    pub total_return: N,
    pub net_profit: N,
    pub winning_ratio: N,
    pub average_profit: N,
    pub max_drawdown: N,
    pub buy_and_hold: N,
    pub open_position: bool,
}

impl<N: Num> Summary<N> {
    pub fn compute(series: &BarSeries<N>, record: &TradingRecord<N>) -> Self {
        Summary {
            positions: record.position_count(),
            total_return: TotalReturnCriterion.calculate(series, record),
            net_profit: NetProfitCriterion.calculate(series, record),
            winning_ratio: WinningPositionsRatioCriterion.calculate(series, record),
            average_profit: AverageProfitCriterion.calculate(series, record),
            max_drawdown: MaximumDrawdownCriterion.calculate(series, record),
            buy_and_hold: BuyAndHoldCriterion.calculate(series, record),
            open_position: !record.is_closed(),
        }
    }
}
