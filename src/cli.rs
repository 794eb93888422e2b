//! CLI definition and dispatch.
//!
//! Results go to stdout; progress and diagnostics go to stderr through
//! `tracing`.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_backtest, BacktestConfig};
use crate::domain::config_validation::{
    backtest_config_from, data_path, numeric_kind, strategy_name, validate_backtest_config,
    validate_strategy_config, walk_forward_config_from, NumericKind,
};
use crate::domain::criterion::Summary;
use crate::domain::error::TradebenchError;
use crate::domain::history_runner::{HistoryRunner, Lookahead};
use crate::domain::num::{DecimalNum, Num};
use crate::domain::position::Position;
use crate::domain::registry::StrategyRegistry;
use crate::domain::series::BarSeries;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "tradebench", about = "Backtester for rule-based trading strategies")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over the whole series
    Backtest {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Run a walk-forward backtest over time slices
    WalkForward {
        #[command(flatten)]
        run: RunArgs,
        /// Override [walk_forward] lookahead (none | known-slices)
        #[arg(long)]
        lookahead: Option<Lookahead>,
    },
    /// Validate a configuration without loading data
    Validate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: Option<PathBuf>,
    },
    /// List registered strategies
    Strategies,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    #[arg(short, long)]
    pub config: PathBuf,
    /// Separate file holding the [strategy] section
    #[arg(short, long)]
    pub strategy: Option<PathBuf>,
    /// Override [backtest] data
    #[arg(short, long)]
    pub data: Option<PathBuf>,
    /// Override [backtest] numeric (double | decimal)
    #[arg(long)]
    pub numeric: Option<NumericKind>,
    /// Print every closed position
    #[arg(long)]
    pub positions: bool,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest { run } => run_backtest_command(&run),
        Command::WalkForward { run, lookahead } => run_walk_forward_command(&run, lookahead),
        Command::Validate { config, strategy } => run_validate(&config, strategy.as_ref()),
        Command::Strategies => {
            run_strategies();
            Ok(())
        }
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, TradebenchError> {
    tracing::info!("loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

/// Everything a run needs before the bar data is loaded.
struct RunInputs {
    config: FileConfigAdapter,
    strategy_file: Option<FileConfigAdapter>,
    strategy_name: String,
    data: PathBuf,
    numeric: NumericKind,
    backtest: BacktestConfig,
    show_positions: bool,
}

impl RunInputs {
    fn prepare(args: &RunArgs) -> Result<Self, TradebenchError> {
        let config = load_config(&args.config)?;
        let strategy_file = args.strategy.as_deref().map(load_config).transpose()?;

        let data = match &args.data {
            Some(path) => path.clone(),
            None => resolve_relative(&args.config, &data_path(&config)?),
        };
        let backtest = backtest_config_from(&config)?;
        let numeric = match args.numeric {
            Some(kind) => kind,
            None => numeric_kind(&config)?,
        };

        let mut inputs = RunInputs {
            config,
            strategy_file,
            strategy_name: String::new(),
            data,
            numeric,
            backtest,
            show_positions: args.positions,
        };
        validate_strategy_config(inputs.strategy_config())?;
        inputs.strategy_name = strategy_name(inputs.strategy_config())?;
        Ok(inputs)
    }

    fn strategy_config(&self) -> &dyn ConfigPort {
        match &self.strategy_file {
            Some(file) => file,
            None => &self.config,
        }
    }

    fn load_series<N: Num>(&self) -> Result<BarSeries<N>, TradebenchError> {
        let name = self
            .data
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "series".to_string());
        let series: BarSeries<N> = CsvAdapter::new().load_series(&self.data, &name)?;
        tracing::info!(
            series = %name,
            bars = series.len(),
            numeric = %self.numeric,
            "loaded {}",
            self.data.display()
        );
        Ok(series)
    }
}

/// Paths in a config file are relative to the file's directory.
fn resolve_relative(config_path: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        return path;
    }
    match config_path.parent() {
        Some(dir) => dir.join(path),
        None => path,
    }
}

fn run_backtest_command(args: &RunArgs) -> Result<(), TradebenchError> {
    let inputs = RunInputs::prepare(args)?;
    match inputs.numeric {
        NumericKind::Double => backtest_with::<f64>(&inputs),
        NumericKind::Decimal => backtest_with::<DecimalNum>(&inputs),
    }
}

fn backtest_with<N: Num>(inputs: &RunInputs) -> Result<(), TradebenchError> {
    let series = inputs.load_series::<N>()?;
    let registry = StrategyRegistry::with_builtins();
    let strategy = registry.build(&inputs.strategy_name, &series, inputs.strategy_config())?;

    let record = run_backtest(&series, &strategy, &inputs.backtest)?;
    let summary = Summary::compute(&series, &record);

    print_header(strategy.name(), &series);
    print_summary(&summary);
    if inputs.show_positions {
        print_positions(record.positions());
    }
    Ok(())
}

fn run_walk_forward_command(
    args: &RunArgs,
    lookahead: Option<Lookahead>,
) -> Result<(), TradebenchError> {
    let inputs = RunInputs::prepare(args)?;
    match inputs.numeric {
        NumericKind::Double => walk_forward_with::<f64>(&inputs, lookahead),
        NumericKind::Decimal => walk_forward_with::<DecimalNum>(&inputs, lookahead),
    }
}

fn walk_forward_with<N: Num>(
    inputs: &RunInputs,
    lookahead: Option<Lookahead>,
) -> Result<(), TradebenchError> {
    let settings = walk_forward_config_from(&inputs.config)?;
    let lookahead = lookahead.unwrap_or(settings.lookahead);
    let series = inputs.load_series::<N>()?;
    let registry = StrategyRegistry::with_builtins();
    let strategy = registry.build(&inputs.strategy_name, &series, inputs.strategy_config())?;

    let slicer = settings.slicer(&series)?;
    tracing::info!(
        period = %settings.period,
        periods_per_slice = settings.periods_per_slice,
        slices = slicer.len(),
        average_bars = slicer.average_bars_per_slice(),
        lookahead = %lookahead,
        "walk-forward"
    );
    let mut runner = HistoryRunner::new(slicer, strategy, &inputs.backtest).with_lookahead(lookahead);

    print_header(runner.strategy().name(), runner.slicer().series());
    println!("Period:           {} x {}", settings.period, settings.periods_per_slice);
    println!("Lookahead:        {}", lookahead);
    println!();

    for k in 0..runner.slicer().len() {
        let slice = runner.slicer().slice(k)?.clone();
        let closed = runner.run(k)?;
        let net: N = closed
            .iter()
            .filter_map(|p| p.profit().ok())
            .fold(N::zero(), |acc, p| acc.plus(p));
        println!(
            "slice {:>3}  {}  {:>4} bars  {:>3} closed  net {}",
            k,
            describe_window(&slice),
            slice.len(),
            closed.len(),
            format_num(net)
        );
        if inputs.show_positions {
            print_positions(closed);
        }
    }

    println!();
    let summary = Summary::compute(runner.slicer().series(), runner.trading_record());
    print_summary(&summary);
    Ok(())
}

fn run_validate(config_path: &Path, strategy_path: Option<&PathBuf>) -> Result<(), TradebenchError> {
    let config = load_config(config_path)?;
    validate_backtest_config(&config)?;
    println!("[backtest]     ok ({})", data_path(&config)?);

    let strategy_file = strategy_path.map(|p| load_config(p)).transpose()?;
    let strategy_config: &dyn ConfigPort = match &strategy_file {
        Some(file) => file,
        None => &config,
    };
    validate_strategy_config(strategy_config)?;
    let name = strategy_name(strategy_config)?;

    // Indicators are lazy, so building against an empty series checks
    // parameters and rule expressions without reading bars.
    let empty: BarSeries<f64> = BarSeries::new("validate", Vec::new());
    let strategy = StrategyRegistry::with_builtins().build(&name, &empty, strategy_config)?;
    println!("[strategy]     ok ({})", strategy.name());
    println!("  entry:         {}", strategy.entry_rule());
    println!("  exit:          {}", strategy.exit_rule());
    println!("  unstable bars: {}", strategy.unstable_bars());

    if config.sections().iter().any(|s| s == "walk_forward") {
        let settings = walk_forward_config_from(&config)?;
        println!(
            "[walk_forward] ok ({} x {}, lookahead {})",
            settings.period, settings.periods_per_slice, settings.lookahead
        );
    }

    println!("configuration is valid");
    Ok(())
}

fn run_strategies() {
    let registry = StrategyRegistry::<f64>::with_builtins();
    for (name, description) in registry.describe() {
        println!("{:<20} {}", name, description);
    }
}

fn print_header<N: Num>(strategy: &str, series: &BarSeries<N>) {
    println!("Strategy:         {}", strategy);
    println!(
        "Series:           {} ({} bars, {})",
        series.name(),
        series.len(),
        describe_window(series)
    );
}

fn print_summary<N: Num>(summary: &Summary<N>) {
    println!("Positions:        {}", summary.positions);
    println!("Total return:     {}", format_num(summary.total_return));
    println!("Net profit:       {}", format_num(summary.net_profit));
    println!("Winning ratio:    {}", format_num(summary.winning_ratio));
    println!("Average profit:   {}", format_num(summary.average_profit));
    println!("Max drawdown:     {}", format_num(summary.max_drawdown));
    println!("Buy and hold:     {}", format_num(summary.buy_and_hold));
    println!(
        "Open position:    {}",
        if summary.open_position { "yes" } else { "no" }
    );
}

fn print_positions<N: Num>(positions: &[Position<N>]) {
    for position in positions {
        if let (Some(entry), Some(exit), Ok(profit)) =
            (position.entry(), position.exit(), position.profit())
        {
            println!("    {}  ->  {}  profit {}", entry, exit, format_num(profit));
        }
    }
}

fn describe_window<N: Num>(series: &BarSeries<N>) -> String {
    match (series.first_bar(), series.last_bar()) {
        (Some(first), Some(last)) => format!("{} .. {}", first.begin_time, last.end_time),
        _ => "empty".to_string(),
    }
}

fn format_num<N: Num>(value: N) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{:.4}", value.to_f64())
    }
}
