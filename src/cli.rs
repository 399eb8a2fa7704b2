//! CLI definition and dispatch.
//!
//! Settings resolve in three layers: built-in defaults, then the optional INI
//! file, then command-line flags. The merged result is validated once before
//! any data is read. Reports go to stdout and logs go to stderr.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::svg_chart::write_charts;
use crate::adapters::text_report::{TextReport, write_sweep_table, write_trades_csv};
use crate::domain::backtest::{BacktestConfig, BacktestResult, run_backtest};
use crate::domain::config_validation::{
    validate_backtest_config, validate_date_range, validate_param_grid,
};
use crate::domain::error::SwingError;
use crate::domain::price::PricePoint;
use crate::domain::sweep::{ParamGrid, SweepEntry, run_sweep};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "swingtrader",
    about = "Bollinger Band + RSI swing-trading backtester"
)]
pub struct Cli {
    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single backtest and print the report
    Backtest {
        /// CSV file with Date,Open,High,Low,Close,AdjClose,Volume rows
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// First date to include (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last date to include (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Also export the trade list to this CSV file
        #[arg(long)]
        trades_out: Option<PathBuf>,
        /// Write SVG price and balance charts into this directory
        #[arg(long)]
        charts: Option<PathBuf>,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Run the threshold grid and rank the results
    Sweep {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Rows to print
        #[arg(long, default_value_t = 10)]
        top: usize,
        /// Run grid points one after another instead of on the thread pool
        #[arg(long)]
        sequential: bool,
        #[command(flatten)]
        grid: GridArgs,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Check a configuration file without running anything
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Command-line values that replace file or default settings.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    #[arg(long)]
    pub capital: Option<f64>,
    /// RSI level to buy below
    #[arg(long = "buy-rsi")]
    pub buy_threshold: Option<f64>,
    /// RSI level to sell above
    #[arg(long = "sell-rsi")]
    pub sell_threshold: Option<f64>,
    /// Fraction below entry, e.g. 0.05
    #[arg(long)]
    pub stop_loss: Option<f64>,
    /// Fraction above entry, e.g. 0.10
    #[arg(long)]
    pub take_profit: Option<f64>,
    /// Fraction of capital risked per trade, e.g. 0.02
    #[arg(long)]
    pub position_size: Option<f64>,
    #[arg(long)]
    pub max_drawdown: Option<f64>,
    #[arg(long)]
    pub trade_fee: Option<f64>,
    #[arg(long)]
    pub slippage: Option<f64>,
    #[arg(long)]
    pub rsi_period: Option<usize>,
    #[arg(long)]
    pub bb_period: Option<usize>,
    #[arg(long)]
    pub bb_stddev: Option<f64>,
}

impl Overrides {
    pub fn apply(&self, config: &mut BacktestConfig) {
        let s = &mut config.strategy;
        let r = &mut config.risk;
        set(&mut config.initial_capital, self.capital);
        set(&mut config.trade_fee_pct, self.trade_fee);
        set(&mut config.slippage_pct, self.slippage);
        set(&mut s.buy_threshold, self.buy_threshold);
        set(&mut s.sell_threshold, self.sell_threshold);
        set(&mut s.stop_loss_pct, self.stop_loss);
        set(&mut s.take_profit_pct, self.take_profit);
        set(&mut s.rsi_period, self.rsi_period);
        set(&mut s.bb_period, self.bb_period);
        set(&mut s.bb_stddev_mult, self.bb_stddev);
        set(&mut r.position_size_pct, self.position_size);
        set(&mut r.max_drawdown_pct, self.max_drawdown);
    }
}

/// Sweep grid lists that replace the `[sweep]` section or the built-in grid.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct GridArgs {
    /// Buy thresholds to try, e.g. 20,25,30
    #[arg(long, value_delimiter = ',')]
    pub buy_levels: Vec<f64>,
    /// Sell thresholds to try, e.g. 70,75,80
    #[arg(long, value_delimiter = ',')]
    pub sell_levels: Vec<f64>,
    /// Stop-loss fractions to try, e.g. 0.03,0.05
    #[arg(long, value_delimiter = ',')]
    pub stop_levels: Vec<f64>,
    /// Take-profit fractions to try, e.g. 0.10,0.15
    #[arg(long, value_delimiter = ',')]
    pub target_levels: Vec<f64>,
}

impl GridArgs {
    pub fn apply(&self, grid: &mut ParamGrid) {
        set_list(&mut grid.buy_thresholds, &self.buy_levels);
        set_list(&mut grid.sell_thresholds, &self.sell_levels);
        set_list(&mut grid.stop_loss_pcts, &self.stop_levels);
        set_list(&mut grid.take_profit_pcts, &self.target_levels);
    }
}

fn set_list(slot: &mut Vec<f64>, values: &[f64]) {
    if !values.is_empty() {
        *slot = values.to_vec();
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Command::Backtest {
            data,
            config,
            start,
            end,
            trades_out,
            charts,
            overrides,
        } => run_backtest_command(
            &data,
            config.as_deref(),
            start,
            end,
            BacktestOutputs {
                trades_csv: trades_out.as_deref(),
                charts_dir: charts.as_deref(),
            },
            &overrides,
        ),
        Command::Sweep {
            data,
            config,
            start,
            end,
            top,
            sequential,
            grid,
            overrides,
        } => {
            let sweep = SweepOptions {
                top,
                parallel: !sequential,
                grid: &grid,
            };
            run_sweep_command(&data, config.as_deref(), start, end, sweep, &overrides)
        }
        Command::Validate { config } => run_validate(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            (&e).into()
        }
    }
}

/// Defaults overlaid with whatever the `[backtest]`, `[strategy]` and
/// `[risk]` sections set.
pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, SwingError> {
    let mut config = BacktestConfig::default();
    let s = &mut config.strategy;
    let r = &mut config.risk;

    set(&mut config.initial_capital, adapter.get_double("backtest", "initial_capital")?);
    set(&mut config.trade_fee_pct, adapter.get_double("backtest", "trade_fee")?);
    set(&mut config.slippage_pct, adapter.get_double("backtest", "slippage")?);

    set(&mut s.buy_threshold, adapter.get_double("strategy", "buy_threshold")?);
    set(&mut s.sell_threshold, adapter.get_double("strategy", "sell_threshold")?);
    set(&mut s.stop_loss_pct, adapter.get_double("strategy", "stop_loss")?);
    set(&mut s.take_profit_pct, adapter.get_double("strategy", "take_profit")?);
    set(&mut s.rsi_period, adapter.get_usize("strategy", "rsi_period")?);
    set(&mut s.bb_period, adapter.get_usize("strategy", "bb_period")?);
    set(&mut s.bb_stddev_mult, adapter.get_double("strategy", "bb_stddev")?);

    set(&mut r.max_drawdown_pct, adapter.get_double("risk", "max_drawdown")?);
    set(&mut r.position_size_pct, adapter.get_double("risk", "position_size")?);

    Ok(config)
}

/// Optional `[backtest] start_date` / `end_date`.
pub fn read_date_range(
    adapter: &dyn ConfigPort,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), SwingError> {
    Ok((
        adapter.get_date("backtest", "start_date")?,
        adapter.get_date("backtest", "end_date")?,
    ))
}

/// Built-in grid overlaid with any `[sweep]` lists.
pub fn build_param_grid(adapter: &dyn ConfigPort) -> Result<ParamGrid, SwingError> {
    let mut grid = ParamGrid::default();
    if let Some(values) = adapter.get_double_list("sweep", "buy_thresholds")? {
        grid.buy_thresholds = values;
    }
    if let Some(values) = adapter.get_double_list("sweep", "sell_thresholds")? {
        grid.sell_thresholds = values;
    }
    if let Some(values) = adapter.get_double_list("sweep", "stop_losses")? {
        grid.stop_loss_pcts = values;
    }
    if let Some(values) = adapter.get_double_list("sweep", "take_profits")? {
        grid.take_profit_pcts = values;
    }
    Ok(grid)
}

/// Grid for a sweep: defaults, then the file's `[sweep]` section, then the
/// command-line lists. Validated before returning.
pub fn resolve_grid(config_path: Option<&Path>, args: &GridArgs) -> Result<ParamGrid, SwingError> {
    let mut grid = match config_path {
        Some(path) => build_param_grid(&FileConfigAdapter::from_file(path)?)?,
        None => ParamGrid::default(),
    };
    args.apply(&mut grid);
    validate_param_grid(&grid)?;
    Ok(grid)
}

/// Merged, validated settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub config: BacktestConfig,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

pub fn resolve_settings(
    config_path: Option<&Path>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    overrides: &Overrides,
) -> Result<RunSettings, SwingError> {
    let (mut config, file_start, file_end) = match config_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading config");
            let adapter = FileConfigAdapter::from_file(path)?;
            let (file_start, file_end) = read_date_range(&adapter)?;
            (build_backtest_config(&adapter)?, file_start, file_end)
        }
        None => (BacktestConfig::default(), None, None),
    };
    overrides.apply(&mut config);

    let start_date = start.or(file_start);
    let end_date = end.or(file_end);

    validate_backtest_config(&config)?;
    validate_date_range(start_date, end_date)?;

    Ok(RunSettings {
        config,
        start_date,
        end_date,
    })
}

/// Load the filtered series and run one backtest over it. The series is
/// returned alongside the result for outputs that draw it.
pub fn load_and_backtest(
    data_port: &dyn DataPort,
    settings: &RunSettings,
) -> Result<(Vec<PricePoint>, BacktestResult), SwingError> {
    let prices = data_port.load_prices(settings.start_date, settings.end_date)?;
    let result = run_backtest(&prices, &settings.config)?;
    Ok((prices, result))
}

/// Load, run and report. Split out from the command so any data source and
/// report format can be plugged in.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report: &dyn ReportPort,
    settings: &RunSettings,
    out: &mut dyn Write,
) -> Result<BacktestResult, SwingError> {
    let (_, result) = load_and_backtest(data_port, settings)?;
    report.write(&result, out)?;
    Ok(result)
}

/// Optional files written after the console report.
struct BacktestOutputs<'a> {
    trades_csv: Option<&'a Path>,
    charts_dir: Option<&'a Path>,
}

fn run_backtest_command(
    data: &Path,
    config_path: Option<&Path>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    outputs: BacktestOutputs<'_>,
    overrides: &Overrides,
) -> Result<(), SwingError> {
    let settings = resolve_settings(config_path, start, end, overrides)?;
    let data_port = CsvAdapter::new(data);

    let (prices, result) = load_and_backtest(&data_port, &settings)?;
    {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        TextReport::default().write(&result, &mut out)?;
    }

    if let Some(path) = outputs.trades_csv {
        write_trades_csv(&result.trades, path)?;
    }
    if let Some(dir) = outputs.charts_dir {
        let name = data
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("backtest");
        write_charts(dir, name, &prices, &result)?;
    }
    Ok(())
}

/// Run every point of `grid` around the merged base settings.
pub fn run_sweep_pipeline(
    data_port: &dyn DataPort,
    grid: &ParamGrid,
    settings: &RunSettings,
    parallel: bool,
) -> Result<Vec<SweepEntry>, SwingError> {
    let prices = data_port.load_prices(settings.start_date, settings.end_date)?;
    run_sweep(&prices, grid, &settings.config, parallel)
}

struct SweepOptions<'a> {
    top: usize,
    parallel: bool,
    grid: &'a GridArgs,
}

fn run_sweep_command(
    data: &Path,
    config_path: Option<&Path>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    sweep: SweepOptions<'_>,
    overrides: &Overrides,
) -> Result<(), SwingError> {
    let settings = resolve_settings(config_path, start, end, overrides)?;
    let grid = resolve_grid(config_path, sweep.grid)?;
    let data_port = CsvAdapter::new(data);

    let entries = run_sweep_pipeline(&data_port, &grid, &settings, sweep.parallel)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_sweep_table(&entries, sweep.top, &mut out)
}

fn run_validate(config_path: &Path) -> Result<(), SwingError> {
    let settings = resolve_settings(Some(config_path), None, None, &Overrides::default())?;
    let grid = resolve_grid(Some(config_path), &GridArgs::default())?;
    let c = &settings.config;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "Config OK: {}", config_path.display())?;
    writeln!(
        out,
        "  capital {:.2}, fee {}, slippage {}",
        c.initial_capital, c.trade_fee_pct, c.slippage_pct
    )?;
    writeln!(
        out,
        "  RSI({}) buy < {} sell > {}, BB({}, {})",
        c.strategy.rsi_period,
        c.strategy.buy_threshold,
        c.strategy.sell_threshold,
        c.strategy.bb_period,
        c.strategy.bb_stddev_mult
    )?;
    writeln!(
        out,
        "  stop {} target {} size {} max drawdown {}",
        c.strategy.stop_loss_pct,
        c.strategy.take_profit_pct,
        c.risk.position_size_pct,
        c.risk.max_drawdown_pct
    )?;
    writeln!(
        out,
        "  sweep grid: {} configurations",
        grid.generate_configs(c).len()
    )?;
    Ok(())
}
