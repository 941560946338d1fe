//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::memory_store::MemorySnapshotStore;
use crate::domain::catalog::{self, FetchWindow};
use crate::domain::config_validation::{
    validate_data_config, validate_run_config, validate_store_config,
};
use crate::domain::error::StocksimError;
use crate::domain::price_series::PriceSeries;
use crate::domain::report::SeriesInfo;
use crate::domain::runner::{self, RunConfig};
use crate::domain::strategy::StrategySpec;
use crate::domain::symbols::{normalize, parse_symbols};
use crate::logging::setup_logging;
use crate::ports::config_port::ConfigPort;
use crate::ports::snapshot_port::SnapshotPort;

pub const DEFAULT_CASH: f64 = 10_000.0;
pub const DEFAULT_THRESHOLD: f64 = 0.5;
pub const DEFAULT_VOLATILITY: f64 = 0.5;

#[derive(Parser, Debug)]
#[command(name = "stocksim", about = "Tick-by-tick trading strategy simulator")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load price history for comma-separated symbols into the store
    Register { symbols: String },
    /// Print a registered symbol's openings and closings as JSON
    History { symbol: String },
    /// Remove a symbol from the store
    Delete { symbol: String },
    /// List registered symbols
    List,
    /// Run a strategy over registered symbols and print the report as JSON
    Run {
        /// "A" or "percent"
        #[arg(short, long)]
        strategy: Option<String>,
        /// Comma-separated symbols
        symbols: String,
        #[arg(long)]
        cash: Option<u64>,
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        volatility: Option<f64>,
        #[arg(long, conflicts_with = "no_short")]
        allow_short: bool,
        #[arg(long)]
        no_short: bool,
        /// Register missing symbols before running
        #[arg(long)]
        register: bool,
    },
    /// Validate a configuration file
    Validate,
}

pub fn run(cli: Cli) -> ExitCode {
    let config = match load_config(cli.config.as_ref()) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let level = cli
        .log_level
        .or_else(|| config.get_string("log", "level"))
        .unwrap_or_else(|| "warn".to_string());
    setup_logging(&level);

    let result = match cli.command {
        Command::Register { symbols } => run_register(&config, &symbols),
        Command::History { symbol } => run_history(&config, &symbol),
        Command::Delete { symbol } => run_delete(&config, &symbol),
        Command::List => run_list(&config),
        Command::Run {
            strategy,
            symbols,
            cash,
            threshold,
            volatility,
            allow_short,
            no_short,
            register,
        } => {
            let overrides = RunOverrides {
                strategy,
                cash,
                threshold,
                volatility,
                allow_short: match (allow_short, no_short) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
            };
            run_simulation(&config, &symbols, &overrides, register)
        }
        Command::Validate => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", error_message(&e));
            (&e).into()
        }
    }
}

/// The stderr line for a failed command, tagged with the error's category.
pub fn error_message(err: &StocksimError) -> String {
    format!("error [{}]: {err}", err.label())
}

/// No path means an empty configuration, so every key takes its default.
pub fn load_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, ExitCode> {
    let loaded = match path {
        Some(p) => FileConfigAdapter::from_file(p),
        None => FileConfigAdapter::from_string(""),
    };
    loaded.map_err(|e| {
        eprintln!("{}", error_message(&e));
        ExitCode::from(&e)
    })
}

/// Command-line values that take precedence over the `[run]` section.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub strategy: Option<String>,
    pub cash: Option<u64>,
    pub threshold: Option<f64>,
    pub volatility: Option<f64>,
    pub allow_short: Option<bool>,
}

pub fn build_run_config(
    config: &dyn ConfigPort,
    overrides: &RunOverrides,
) -> Result<RunConfig, StocksimError> {
    let selector = overrides
        .strategy
        .clone()
        .or_else(|| config.get_string("run", "strategy"))
        .ok_or_else(|| StocksimError::ConfigMissing {
            section: "run".into(),
            key: "strategy".into(),
        })?;

    let threshold = overrides
        .threshold
        .unwrap_or_else(|| config.get_double("run", "threshold", DEFAULT_THRESHOLD));
    let volatility = overrides
        .volatility
        .unwrap_or_else(|| config.get_double("run", "volatility", DEFAULT_VOLATILITY));
    let cash = overrides
        .cash
        .map(|c| c as f64)
        .unwrap_or_else(|| config.get_double("run", "cash", DEFAULT_CASH));

    let strategy = StrategySpec::parse(&selector, threshold, volatility)?;
    let mut run_config = RunConfig::new(strategy, cash);
    run_config.allow_short = overrides
        .allow_short
        .or_else(|| config.get_opt_bool("run", "allow_short"));
    Ok(run_config)
}

pub fn build_fetch_window(config: &dyn ConfigPort) -> FetchWindow {
    let default = FetchWindow::default();
    FetchWindow {
        period: config.get_string("data", "period").unwrap_or(default.period),
        interval: config.get_string("data", "interval").unwrap_or(default.interval),
    }
}

pub fn build_data_port(config: &dyn ConfigPort) -> CsvAdapter {
    let dir = config
        .get_string("data", "dir")
        .unwrap_or_else(|| "./data".to_string());
    CsvAdapter::new(PathBuf::from(dir))
}

/// SQLite when `[store] path` is set and the feature is on, otherwise an
/// in-process store that lives as long as the command.
pub fn open_store(config: &dyn ConfigPort) -> Result<Box<dyn SnapshotPort>, StocksimError> {
    validate_store_config(config)?;

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;
        if config.get_string("store", "path").is_some() {
            let store = SqliteAdapter::from_config(config)?;
            let purged = store.purge_expired()?;
            if purged > 0 {
                tracing::debug!(purged, "dropped expired snapshots");
            }
            return Ok(Box::new(store));
        }
    }

    let ttl = config.get_int(
        "store",
        "ttl_days",
        crate::ports::snapshot_port::DEFAULT_TTL_DAYS,
    );
    tracing::warn!("no persistent store configured; snapshots last for this command only");
    Ok(Box::new(MemorySnapshotStore::with_ttl(chrono::Duration::days(ttl))))
}

fn symbol_list(input: &str) -> Result<Vec<String>, StocksimError> {
    parse_symbols(input)
        .map_err(|e| StocksimError::invalid_parameter("symbols", e.to_string()))
}

fn run_register(config: &dyn ConfigPort, symbols: &str) -> Result<(), StocksimError> {
    validate_data_config(config)?;
    let symbols = symbol_list(symbols)?;
    let data = build_data_port(config);
    let store = open_store(config)?;
    let window = build_fetch_window(config);

    for symbol in &symbols {
        let series = catalog::register(&data, store.as_ref(), symbol, &window)?;
        eprintln!("Registered {} ({} observations)", symbol, series.len());
    }
    Ok(())
}

fn run_history(config: &dyn ConfigPort, symbol: &str) -> Result<(), StocksimError> {
    let store = open_store(config)?;
    let symbol = normalize(symbol);
    let series = store
        .load(&symbol)?
        .ok_or_else(|| StocksimError::data_unavailable(&symbol, "not registered"))?;
    println!("{}", serde_json::to_string_pretty(&SeriesInfo::from(&series))?);
    Ok(())
}

fn run_delete(config: &dyn ConfigPort, symbol: &str) -> Result<(), StocksimError> {
    let store = open_store(config)?;
    let symbol = normalize(symbol);
    store.delete(&symbol)?;
    eprintln!("Deleted {symbol}");
    Ok(())
}

fn run_list(config: &dyn ConfigPort) -> Result<(), StocksimError> {
    let store = open_store(config)?;
    let names = store.list()?;
    if names.is_empty() {
        eprintln!("No symbols registered");
    }
    for name in &names {
        println!("{name}");
    }
    Ok(())
}

fn load_series(
    config: &dyn ConfigPort,
    store: &dyn SnapshotPort,
    symbols: &[String],
    register: bool,
) -> Result<Vec<PriceSeries>, StocksimError> {
    if register {
        validate_data_config(config)?;
        let data = build_data_port(config);
        let window = build_fetch_window(config);
        return symbols
            .iter()
            .map(|s| catalog::register(&data, store, s, &window))
            .collect();
    }
    catalog::resolve(store, symbols)
}

fn run_simulation(
    config: &dyn ConfigPort,
    symbols: &str,
    overrides: &RunOverrides,
    register: bool,
) -> Result<(), StocksimError> {
    validate_run_config(config)?;
    let run_config = build_run_config(config, overrides)?;
    let symbols = symbol_list(symbols)?;
    let store = open_store(config)?;
    let series = load_series(config, store.as_ref(), &symbols, register)?;

    eprintln!(
        "Running {} over {} ({} ticks)",
        run_config.strategy.selector(),
        symbols.join(", "),
        series.first().map(PriceSeries::len).unwrap_or(0)
    );

    let report = runner::run(&run_config, &series)?;
    if let Some(reason) = &report.halted {
        eprintln!("warning: run halted: {reason}");
    }
    println!("{}", report.to_json()?);
    Ok(())
}

fn run_validate(config: &dyn ConfigPort) -> Result<(), StocksimError> {
    validate_data_config(config)?;
    validate_store_config(config)?;
    validate_run_config(config)?;
    eprintln!("Configuration is valid");
    Ok(())
}
