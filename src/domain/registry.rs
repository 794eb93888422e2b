//! Strategy registry.
//!
//! A caller-owned map from strategy name to a factory that binds the
//! strategy's indicators to a series. Factories read their parameters from
//! the `[strategy]` section of a [`ConfigPort`]:
//!
//! - `sma-crossover` / `ema-crossover`: `fast`, `slow`
//! - `williams-r-reversal`: `period`, `oversold`, `overbought`
//! - `rules`: `entry`, `exit` rule expressions
//!
//! Every built-in also honours `stop_loss` and `take_profit` percentages
//! (ORed into the exit rule) and an `unstable_bars` override.

use crate::domain::config_validation::{optional_f64, optional_usize, required_string};
use crate::domain::error::TradebenchError;
use crate::domain::indicator::{close_price, constant, ema, sma, williams_r, IndicatorRef};
use crate::domain::num::Num;
use crate::domain::rule::Rule;
use crate::domain::rule_parser;
use crate::domain::series::BarSeries;
use crate::domain::strategy::Strategy;
use crate::ports::config_port::ConfigPort;
use std::collections::BTreeMap;

pub type StrategyFactory<N> =
    Box<dyn Fn(&BarSeries<N>, &dyn ConfigPort) -> Result<Strategy<N>, TradebenchError>>;

struct Entry<N: Num> {
    description: String,
    factory: StrategyFactory<N>,
}

pub struct StrategyRegistry<N: Num> {
    entries: BTreeMap<String, Entry<N>>,
}

impl<N: Num> Default for StrategyRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Num> StrategyRegistry<N> {
    pub fn new() -> Self {
        StrategyRegistry {
            entries: BTreeMap::new(),
        }
    }

    /// A registry holding the built-in strategies.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_builtins(&mut registry);
        registry
    }

    /// Registers `factory` under `name`, replacing any previous entry.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        factory: impl Fn(&BarSeries<N>, &dyn ConfigPort) -> Result<Strategy<N>, TradebenchError>
            + 'static,
    ) {
        self.entries.insert(
            name.into(),
            Entry {
                description: description.into(),
                factory: Box::new(factory),
            },
        );
    }

    pub fn build(
        &self,
        name: &str,
        series: &BarSeries<N>,
        config: &dyn ConfigPort,
    ) -> Result<Strategy<N>, TradebenchError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| TradebenchError::UnknownStrategy {
                name: name.to_string(),
            })?;
        let strategy = (entry.factory)(series, config)?;
        tracing::debug!(
            strategy = name,
            unstable_bars = strategy.unstable_bars(),
            entry = %strategy.entry_rule(),
            exit = %strategy.exit_rule(),
            "strategy built"
        );
        Ok(strategy)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// `(name, description)` pairs in sorted order.
    pub fn describe(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.description.as_str()))
    }
}

pub fn register_builtins<N: Num>(registry: &mut StrategyRegistry<N>) {
    registry.register(
        "sma-crossover",
        "long when SMA(fast) crosses above SMA(slow), out on the cross back",
        |series, config| moving_average_crossover("sma-crossover", series, config, sma, 5, 20),
    );
    registry.register(
        "ema-crossover",
        "long when EMA(fast) crosses above EMA(slow), out on the cross back",
        |series, config| moving_average_crossover("ema-crossover", series, config, ema, 12, 26),
    );
    registry.register(
        "williams-r-reversal",
        "enter when Williams %R leaves the oversold zone, exit when it leaves overbought",
        williams_r_reversal,
    );
    registry.register(
        "rules",
        "entry and exit rules given as expressions",
        rule_expressions,
    );
}

type MovingAverage<N> = fn(&IndicatorRef<N>, usize) -> Result<IndicatorRef<N>, TradebenchError>;

fn moving_average_crossover<N: Num>(
    name: &str,
    series: &BarSeries<N>,
    config: &dyn ConfigPort,
    average: MovingAverage<N>,
    default_fast: usize,
    default_slow: usize,
) -> Result<Strategy<N>, TradebenchError> {
    let fast_period = period(config, "fast", default_fast)?;
    let slow_period = period(config, "slow", default_slow)?;
    if fast_period >= slow_period {
        return Err(TradebenchError::ConfigInvalid {
            section: "strategy".to_string(),
            key: "fast".to_string(),
            reason: format!("fast ({}) must be below slow ({})", fast_period, slow_period),
        });
    }

    let close = close_price(series);
    let fast = average(&close, fast_period)?;
    let slow = average(&close, slow_period)?;
    let entry = Rule::crossed_up(&fast, &slow);
    let exit = Rule::crossed_down(&fast, &slow);
    finish(name, series, config, entry, exit, slow.unstable_bars())
}

fn williams_r_reversal<N: Num>(
    series: &BarSeries<N>,
    config: &dyn ConfigPort,
) -> Result<Strategy<N>, TradebenchError> {
    let period = period(config, "period", 14)?;
    let oversold = optional_f64(config, "strategy", "oversold")?.unwrap_or(-80.0);
    let overbought = optional_f64(config, "strategy", "overbought")?.unwrap_or(-20.0);
    if !(-100.0..=0.0).contains(&oversold) || !(-100.0..=0.0).contains(&overbought) || oversold >= overbought {
        return Err(TradebenchError::ConfigInvalid {
            section: "strategy".to_string(),
            key: "oversold".to_string(),
            reason: "expected -100 <= oversold < overbought <= 0".to_string(),
        });
    }

    let wr = williams_r(series, period)?;
    let entry = Rule::crossed_up(&wr, &constant(series, N::num_of(oversold)));
    let exit = Rule::crossed_down(&wr, &constant(series, N::num_of(overbought)));
    finish("williams-r-reversal", series, config, entry, exit, wr.unstable_bars())
}

fn rule_expressions<N: Num>(
    series: &BarSeries<N>,
    config: &dyn ConfigPort,
) -> Result<Strategy<N>, TradebenchError> {
    let entry_text = required_string(config, "strategy", "entry")?;
    let exit_text = required_string(config, "strategy", "exit")?;
    let entry = parse_expression(&entry_text, "entry", series)?;
    let exit = parse_expression(&exit_text, "exit", series)?;
    let unstable = entry.unstable_bars.max(exit.unstable_bars);
    finish("rules", series, config, entry.rule, exit.rule, unstable)
}

fn parse_expression<N: Num>(
    text: &str,
    key: &str,
    series: &BarSeries<N>,
) -> Result<rule_parser::ParsedRule<N>, TradebenchError> {
    rule_parser::parse(text, series).map_err(|e| {
        tracing::error!("failed to parse {}:\n{}", key, e.display_with_context(text));
        TradebenchError::from(e)
    })
}

/// Adds the optional protective exits and resolves the warm-up length.
fn finish<N: Num>(
    name: &str,
    series: &BarSeries<N>,
    config: &dyn ConfigPort,
    entry: Rule<N>,
    mut exit: Rule<N>,
    unstable_bars: usize,
) -> Result<Strategy<N>, TradebenchError> {
    let close = close_price(series);
    if let Some(pct) = optional_f64(config, "strategy", "stop_loss")? {
        exit = exit.or(Rule::stop_loss(&close, pct));
    }
    if let Some(pct) = optional_f64(config, "strategy", "take_profit")? {
        exit = exit.or(Rule::stop_gain(&close, pct));
    }
    let unstable_bars = optional_usize(config, "strategy", "unstable_bars")?.unwrap_or(unstable_bars);
    Ok(Strategy::new(name, entry, exit).with_unstable_bars(unstable_bars))
}

fn period(config: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, TradebenchError> {
    let value = optional_usize(config, "strategy", key)?.unwrap_or(default);
    if value == 0 {
        return Err(TradebenchError::ConfigInvalid {
            section: "strategy".to_string(),
            key: key.to_string(),
            reason: format!("{} must be at least 1", key),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::backtest::{run_backtest, BacktestConfig};
    use crate::domain::indicator::test_support::series_of_closes;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn zigzag() -> BarSeries<f64> {
        series_of_closes(&[5.0, 4.0, 3.0, 2.0, 3.0, 4.0, 5.0, 6.0, 5.0, 4.0, 3.0, 2.0])
    }

    #[test]
    fn builtins_are_listed_in_order() {
        let registry = StrategyRegistry::<f64>::with_builtins();
        assert_eq!(
            registry.names(),
            vec!["ema-crossover", "rules", "sma-crossover", "williams-r-reversal"]
        );
        assert!(registry.describe().all(|(_, d)| !d.is_empty()));
    }

    #[test]
    fn unknown_strategy_fails() {
        let registry = StrategyRegistry::<f64>::with_builtins();
        let err = registry
            .build("moon-phase", &zigzag(), &make_config("[strategy]\n"))
            .unwrap_err();
        assert!(matches!(err, TradebenchError::UnknownStrategy { name } if name == "moon-phase"));
    }

    #[test]
    fn custom_factory_is_buildable() {
        let mut registry = StrategyRegistry::<f64>::new();
        registry.register("always", "always in", |_, _| {
            Ok(Strategy::new("always", Rule::Boolean(true), Rule::Boolean(false)))
        });
        assert!(registry.contains("always"));
        let strategy = registry
            .build("always", &zigzag(), &make_config("[strategy]\n"))
            .unwrap();
        assert_eq!(strategy.name(), "always");
    }

    #[test]
    fn sma_crossover_trades_the_swing() {
        let series = zigzag();
        let registry = StrategyRegistry::with_builtins();
        let config = make_config("[strategy]\nname = sma-crossover\nfast = 2\nslow = 3\n");
        let strategy = registry.build("sma-crossover", &series, &config).unwrap();
        assert_eq!(strategy.unstable_bars(), 2);

        let record = run_backtest(&series, &strategy, &BacktestConfig::default()).unwrap();
        assert_eq!(record.position_count(), 1);
        let position = &record.positions()[0];
        assert!(position.entry().unwrap().index() < position.exit().unwrap().index());
    }

    #[test]
    fn crossover_rejects_inverted_periods() {
        let registry = StrategyRegistry::<f64>::with_builtins();
        let config = make_config("[strategy]\nfast = 20\nslow = 5\n");
        let err = registry.build("ema-crossover", &zigzag(), &config).unwrap_err();
        assert!(matches!(err, TradebenchError::ConfigInvalid { key, .. } if key == "fast"));
    }

    #[test]
    fn zero_period_rejected() {
        let registry = StrategyRegistry::<f64>::with_builtins();
        let config = make_config("[strategy]\nperiod = 0\n");
        let err = registry
            .build("williams-r-reversal", &zigzag(), &config)
            .unwrap_err();
        assert!(matches!(err, TradebenchError::ConfigInvalid { key, .. } if key == "period"));
    }

    #[test]
    fn williams_r_thresholds_validated() {
        let registry = StrategyRegistry::<f64>::with_builtins();
        let config = make_config("[strategy]\noversold = -10\noverbought = -90\n");
        assert!(registry
            .build("williams-r-reversal", &zigzag(), &config)
            .is_err());
    }

    #[test]
    fn protective_exits_are_ored_in() {
        let registry = StrategyRegistry::<f64>::with_builtins();
        let config = make_config("[strategy]\nperiod = 3\nstop_loss = 5\ntake_profit = 10\n");
        let strategy = registry
            .build("williams-r-reversal", &zigzag(), &config)
            .unwrap();
        let exit = strategy.exit_rule().to_string();
        assert!(exit.starts_with("Or(CrossedDown(WILLIAMS_R(3)"));
        assert!(exit.contains("StopLoss"));
        assert!(exit.contains("StopGain"));
    }

    #[test]
    fn unstable_bars_override() {
        let registry = StrategyRegistry::<f64>::with_builtins();
        let config = make_config("[strategy]\nunstable_bars = 7\n");
        let strategy = registry.build("sma-crossover", &zigzag(), &config).unwrap();
        assert_eq!(strategy.unstable_bars(), 7);
    }

    #[test]
    fn rules_strategy_parses_expressions() {
        let registry = StrategyRegistry::<f64>::with_builtins();
        let config = make_config(
            "[strategy]\nentry = CROSS_ABOVE(close, SMA(3))\nexit = CROSS_BELOW(close, SMA(3))\n",
        );
        let strategy = registry.build("rules", &zigzag(), &config).unwrap();
        assert_eq!(strategy.name(), "rules");
        assert_eq!(strategy.unstable_bars(), 2);
        assert_eq!(
            strategy.entry_rule().to_string(),
            "CrossedUp(CLOSE, SMA(3, CLOSE))"
        );
    }

    #[test]
    fn rules_strategy_reports_parse_errors() {
        let registry = StrategyRegistry::<f64>::with_builtins();
        let config = make_config("[strategy]\nentry = ABOVE(close\nexit = BELOW(close, 1)\n");
        let err = registry.build("rules", &zigzag(), &config).unwrap_err();
        assert!(matches!(err, TradebenchError::RuleParse(_)));

        let config = make_config("[strategy]\nentry = ABOVE(close, 1)\n");
        let err = registry.build("rules", &zigzag(), &config).unwrap_err();
        assert!(matches!(err, TradebenchError::ConfigMissing { key, .. } if key == "exit"));
    }
}
