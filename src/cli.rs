//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::adapters::console_report::render_comparison;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::adapters::json_store::{to_pretty_json, JsonStore, DEFAULT_DATA_DIR};
use crate::adapters::process_backtest_adapter::ProcessBacktestAdapter;
use crate::adapters::yahoo_adapter::YahooAdapter;
use crate::domain::comparison::compare_symbols;
use crate::domain::config_validation::validate_config;
use crate::domain::error::TickerCompareError;
use crate::domain::normalizer::fetch_envelope;
use crate::domain::ohlcv::{FetchEnvelope, Interval, Period};
use crate::domain::strategy::StrategySelector;
use crate::ports::backtest_port::BacktestPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::report_port::ReportPort;

pub const FETCH_USAGE: &str = "Usage: tickercompare fetch <symbol> [period] [interval]";
pub const COMPARE_USAGE: &str = "Usage: tickercompare compare SYMBOL1 [SYMBOL2...] PERIOD";
const COMPARE_EXAMPLE: &str = "Example: tickercompare compare AAPL MSFT GOOGL 1y";

#[derive(Parser, Debug)]
#[command(
    name = "tickercompare",
    about = "Fetch OHLCV data and compare backtest results across symbols"
)]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch daily bars for one symbol and print them as JSON
    Fetch {
        symbol: Option<String>,
        period: Option<String>,
        interval: Option<String>,
        /// Also write the document to <data-dir>/<symbol>_<period>.json
        #[arg(long)]
        save: bool,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Market data provider (yahoo or csv)
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        csv_dir: Option<PathBuf>,
    },
    /// Backtest several symbols and rank them by total return
    Compare {
        /// Symbols followed by the period, e.g. `AAPL MSFT 1y`
        args: Vec<String>,
        /// Strategy menu code passed to the backtest program
        #[arg(short, long)]
        strategy: Option<String>,
        #[arg(long)]
        backtest_bin: Option<PathBuf>,
        /// Per-symbol wall-clock limit in seconds
        #[arg(long)]
        timeout: Option<f64>,
        /// Export the comparison as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Export the comparison as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Fetch {
            symbol,
            period,
            interval,
            save,
            data_dir,
            provider,
            csv_dir,
        } => run_fetch(
            cli.config.as_deref(),
            FetchArgs {
                symbol,
                period,
                interval,
                save,
                data_dir,
                provider,
                csv_dir,
            },
        ),
        Command::Compare {
            args,
            strategy,
            backtest_bin,
            timeout,
            csv,
            json,
        } => run_compare(
            cli.config.as_deref(),
            CompareArgs {
                args,
                strategy,
                backtest_bin,
                timeout,
                csv,
                json,
            },
        ),
    }
}

/// Load and validate the configuration file, or start from defaults.
pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, TickerCompareError> {
    let Some(path) = path else {
        return Ok(FileConfigAdapter::empty());
    };
    info!("Loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_config(&adapter)?;
    Ok(adapter)
}

// ---------------------------------------------------------------------------
// fetch
// ---------------------------------------------------------------------------

pub struct FetchArgs {
    pub symbol: Option<String>,
    pub period: Option<String>,
    pub interval: Option<String>,
    pub save: bool,
    pub data_dir: Option<PathBuf>,
    pub provider: Option<String>,
    pub csv_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub symbol: String,
    pub period: Period,
    pub interval: Interval,
}

/// Fill in defaults and validate the positional fetch arguments.
pub fn resolve_fetch_request(
    symbol: Option<&str>,
    period: Option<&str>,
    interval: Option<&str>,
    default_interval: Interval,
) -> Result<FetchRequest, TickerCompareError> {
    let symbol = symbol
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TickerCompareError::Usage {
            message: FETCH_USAGE.to_string(),
        })?;

    let period = match period {
        Some(p) => p.parse()?,
        None => Period::default(),
    };
    let interval = match interval {
        Some(i) => i.parse()?,
        None => default_interval,
    };

    Ok(FetchRequest {
        symbol: symbol.to_string(),
        period,
        interval,
    })
}

/// Choose the market data provider from flags, then config.
pub fn build_market_data_port(
    config: &dyn ConfigPort,
    provider: Option<&str>,
    csv_dir: Option<&Path>,
) -> Result<Box<dyn MarketDataPort>, TickerCompareError> {
    let provider = provider
        .map(str::to_string)
        .or_else(|| config.get_string("fetch", "provider"))
        .unwrap_or_else(|| "yahoo".to_string())
        .to_lowercase();

    match provider.as_str() {
        "yahoo" => Ok(Box::new(YahooAdapter::from_config(config)?)),
        "csv" => {
            let dir = csv_dir
                .map(Path::to_path_buf)
                .or_else(|| config.get_string("fetch", "csv_dir").map(PathBuf::from))
                .ok_or_else(|| TickerCompareError::ConfigMissing {
                    section: "fetch".into(),
                    key: "csv_dir".into(),
                })?;
            Ok(Box::new(CsvAdapter::new(dir)))
        }
        other => Err(TickerCompareError::ConfigInvalid {
            section: "fetch".into(),
            key: "provider".into(),
            reason: format!("unknown provider '{other}' (expected yahoo or csv)"),
        }),
    }
}

fn run_fetch(config_path: Option<&Path>, args: FetchArgs) -> ExitCode {
    let mut stdout = io::stdout().lock();

    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return print_fetch_error(&mut stdout, &e),
    };

    let default_interval: Interval = config
        .get_string("fetch", "interval")
        .and_then(|i| i.parse().ok())
        .unwrap_or_default();
    let request = match resolve_fetch_request(
        args.symbol.as_deref(),
        args.period.as_deref(),
        args.interval.as_deref(),
        default_interval,
    ) {
        Ok(r) => r,
        Err(e) => return print_fetch_error(&mut stdout, &e),
    };

    let port = match build_market_data_port(
        &config,
        args.provider.as_deref(),
        args.csv_dir.as_deref(),
    ) {
        Ok(p) => p,
        Err(e) => return print_fetch_error(&mut stdout, &e),
    };

    let store = args.save.then(|| {
        let dir = args
            .data_dir
            .or_else(|| config.get_string("fetch", "data_dir").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        JsonStore::new(dir)
    });
    let quiet = config.get_bool("fetch", "quiet", true);

    run_fetch_pipeline(port.as_ref(), &request, quiet, store.as_ref(), &mut stdout)
}

/// Fetch, print, and optionally persist one envelope.
///
/// Success prints compact JSON, or pretty JSON when saving. A failure
/// envelope is always compact and exits 5. A failed save exits 1 but leaves
/// the printed document untouched.
pub fn run_fetch_pipeline(
    port: &dyn MarketDataPort,
    request: &FetchRequest,
    quiet: bool,
    store: Option<&JsonStore>,
    out: &mut dyn Write,
) -> ExitCode {
    let envelope = fetch_envelope(
        port,
        &request.symbol,
        request.period,
        request.interval,
        quiet,
    );

    if !envelope.is_success() {
        return match print_compact(out, &envelope) {
            Ok(()) => ExitCode::from(5),
            Err(e) => stdout_failure(e),
        };
    }

    let Some(store) = store else {
        return match print_compact(out, &envelope) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => stdout_failure(e),
        };
    };

    let mut code = ExitCode::SUCCESS;
    match store.save(&envelope) {
        Ok(Some(path)) => info!("Data saved to {}", path.display()),
        Ok(None) => {}
        Err(e) => {
            error!("{e}");
            code = (&e).into();
        }
    }

    let printed = to_pretty_json(&envelope).and_then(|json| Ok(writeln!(out, "{json}")?));
    match printed {
        Ok(()) => code,
        Err(e) => stdout_failure(e),
    }
}

fn print_compact(out: &mut dyn Write, envelope: &FetchEnvelope) -> Result<(), TickerCompareError> {
    let json = serde_json::to_string(envelope)?;
    writeln!(out, "{json}")?;
    Ok(())
}

fn print_fetch_error(out: &mut dyn Write, err: &TickerCompareError) -> ExitCode {
    if let Err(e) = print_compact(out, &FetchEnvelope::failure(err.to_string())) {
        return stdout_failure(e);
    }
    err.into()
}

fn stdout_failure(e: TickerCompareError) -> ExitCode {
    error!("failed to write output: {e}");
    (&e).into()
}

// ---------------------------------------------------------------------------
// compare
// ---------------------------------------------------------------------------

pub struct CompareArgs {
    pub args: Vec<String>,
    pub strategy: Option<String>,
    pub backtest_bin: Option<PathBuf>,
    pub timeout: Option<f64>,
    pub csv: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

/// Split `SYMBOL... PERIOD` into symbols and the trailing period.
pub fn split_compare_args(args: &[String]) -> Result<(Vec<String>, String), TickerCompareError> {
    match args {
        [symbols @ .., period] if !symbols.is_empty() => Ok((symbols.to_vec(), period.clone())),
        _ => Err(TickerCompareError::Usage {
            message: COMPARE_USAGE.to_string(),
        }),
    }
}

/// Selector from the flag, then `[backtest] strategy`, then the default.
pub fn resolve_strategy(
    flag: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<StrategySelector, TickerCompareError> {
    match flag
        .map(str::to_string)
        .or_else(|| config.get_string("backtest", "strategy"))
    {
        Some(code) => code.parse(),
        None => Ok(StrategySelector::default()),
    }
}

pub fn build_backtest_port(
    config: &dyn ConfigPort,
    backtest_bin: Option<&Path>,
    timeout: Option<f64>,
) -> Result<ProcessBacktestAdapter, TickerCompareError> {
    let mut adapter = ProcessBacktestAdapter::from_config(config)?;
    if let Some(bin) = backtest_bin {
        let mut overridden = ProcessBacktestAdapter::new(bin);
        if let Some(dir) = config.get_string("backtest", "working_dir") {
            overridden = overridden.with_working_dir(dir);
        }
        if let Some(max) = adapter.max_duration() {
            overridden = overridden.with_max_duration(max);
        }
        adapter = overridden;
    }
    if let Some(secs) = timeout {
        // 0 lifts any limit set in the config file.
        adapter = if secs == 0.0 {
            adapter.without_max_duration()
        } else {
            let max = Duration::try_from_secs_f64(secs).map_err(|_| TickerCompareError::Usage {
                message: format!("--timeout must be a non-negative number of seconds, got {secs}"),
            })?;
            adapter.with_max_duration(max)
        };
    }
    Ok(adapter)
}

fn run_compare(config_path: Option<&Path>, args: CompareArgs) -> ExitCode {
    let (symbols, period) = match split_compare_args(&args.args) {
        Ok(split) => split,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("{COMPARE_EXAMPLE}");
            return (&e).into();
        }
    };

    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            error!("{e}");
            return (&e).into();
        }
    };

    let strategy = match resolve_strategy(args.strategy.as_deref(), &config) {
        Ok(s) => s,
        Err(e) => {
            error!("{e}");
            return (&e).into();
        }
    };

    let port = match build_backtest_port(&config, args.backtest_bin.as_deref(), args.timeout) {
        Ok(p) => p,
        Err(e) => {
            error!("{e}");
            return (&e).into();
        }
    };

    let csv_exporter = CsvReportAdapter::new();
    let json_exporter = JsonReportAdapter::new();
    let mut exports: Vec<(&dyn ReportPort, &Path)> = Vec::new();
    if let Some(path) = args.csv.as_deref() {
        exports.push((&csv_exporter as &dyn ReportPort, path));
    }
    if let Some(path) = args.json.as_deref() {
        exports.push((&json_exporter as &dyn ReportPort, path));
    }

    let mut stdout = io::stdout().lock();
    run_compare_pipeline(&port, &symbols, &period, &strategy, &exports, &mut stdout)
}

/// Run the comparison, print the report, then write any exports.
///
/// Per-symbol failures never change the exit status; only a failed write
/// does.
pub fn run_compare_pipeline(
    port: &dyn BacktestPort,
    symbols: &[String],
    period: &str,
    strategy: &StrategySelector,
    exports: &[(&dyn ReportPort, &Path)],
    out: &mut dyn Write,
) -> ExitCode {
    if period.parse::<Period>().is_err() {
        warn!("period '{period}' is not one of 1mo, 3mo, 6mo, 1y, 2y, 5y; passing it through");
    }

    let result = compare_symbols(port, symbols, period, strategy);

    if let Err(e) = write!(out, "{}", render_comparison(&result)) {
        return stdout_failure(e.into());
    }

    let mut code = ExitCode::SUCCESS;
    for (exporter, path) in exports {
        match exporter.write(&result, path) {
            Ok(()) => info!("Comparison written to {}", path.display()),
            Err(e) => {
                error!("{e}");
                code = (&e).into();
            }
        }
    }
    code
}
