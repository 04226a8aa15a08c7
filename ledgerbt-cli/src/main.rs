//! LedgerBT CLI — run, sweep and latch commands.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config plus bar / signal CSVs
//! - `sweep` — run a sizing / cost grid over the same inputs
//! - `latch` — latch an entry/exit trigger file and print the position states
//!
//! Logging goes to stderr; set `RUST_LOG` (default `info`) to change the level.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use ledgerbt_core::latch::{latch_pair, PositionState};
use ledgerbt_runner::data_loader::read_triggers;
use ledgerbt_runner::export::export_sweep_csv;
use ledgerbt_runner::{
    load_inputs, run_single_backtest, save_artifacts, BacktestConfig, BacktestResult, ParamGrid,
    ParamSweep,
};

#[derive(Parser)]
#[command(name = "ledgerbt", about = "LedgerBT — event-driven single-instrument backtester")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Bars CSV (date,open,high,low,close,volume).
        #[arg(long)]
        bars: PathBuf,

        /// Signal CSV: `date,signal[,target_size]` or `date,entry,exit`
        /// depending on `[signal] source`.
        #[arg(long)]
        signal: PathBuf,

        /// Override the config's start date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Override the config's end date (YYYY-MM-DD).
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Run a parameter grid over one set of inputs.
    Sweep {
        #[arg(long)]
        config: PathBuf,

        #[arg(long)]
        bars: PathBuf,

        #[arg(long)]
        signal: PathBuf,

        /// Sizing parameters, comma separated (e.g. 0.5,0.75,0.95). With no
        /// axis given at all, sweeps 0.25 to 1.0 of equity.
        #[arg(long, value_delimiter = ',')]
        sizing: Vec<f64>,

        /// Commission rates, comma separated.
        #[arg(long, value_delimiter = ',')]
        commission: Vec<f64>,

        /// Slippage fractions, comma separated.
        #[arg(long, value_delimiter = ',')]
        slippage: Vec<f64>,

        /// Run configurations one after another instead of in parallel.
        #[arg(long, default_value_t = false)]
        serial: bool,

        /// Write the sweep summary CSV here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Number of best configurations to log, ranked by final equity.
        #[arg(long, default_value_t = 3)]
        top: usize,
    },
    /// Latch an entry/exit trigger CSV and print `date,entry,exit,state`.
    Latch {
        /// Trigger CSV (date,entry,exit).
        #[arg(long)]
        triggers: PathBuf,

        /// Start in the holding state.
        #[arg(long, default_value_t = false)]
        holding: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            bars,
            signal,
            start,
            end,
            output_dir,
        } => run_backtest_cmd(&config, &bars, &signal, start, end, &output_dir),
        Commands::Sweep {
            config,
            bars,
            signal,
            sizing,
            commission,
            slippage,
            serial,
            output,
            top,
        } => {
            let grid = ParamGrid {
                sizing_params: sizing,
                commission_rates: commission,
                slippages: slippage,
            };
            run_sweep_cmd(&config, &bars, &signal, grid, serial, output.as_deref(), top)
        }
        Commands::Latch { triggers, holding } => run_latch_cmd(&triggers, holding),
    }
}

fn load_config(
    path: &Path,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<BacktestConfig> {
    let mut config = BacktestConfig::from_file(path)?;
    if start.is_some() {
        config.backtest.start_date = start;
    }
    if end.is_some() {
        config.backtest.end_date = end;
    }
    config.validate()?;
    Ok(config)
}

fn run_backtest_cmd(
    config_path: &Path,
    bars: &Path,
    signal: &Path,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    output_dir: &Path,
) -> Result<()> {
    let config = load_config(config_path, start, end)?;
    let result = run_single_backtest(&config, bars, signal)?;

    print_summary(&result);

    let run_dir = save_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn run_sweep_cmd(
    config_path: &Path,
    bars: &Path,
    signal: &Path,
    grid: ParamGrid,
    serial: bool,
    output: Option<&Path>,
    top: usize,
) -> Result<()> {
    let grid = if grid.sizing_params.is_empty()
        && grid.commission_rates.is_empty()
        && grid.slippages.is_empty()
    {
        tracing::info!("no grid axes given; sweeping the default sizing fractions");
        ParamGrid::sizing_default()
    } else {
        grid
    };

    let config = load_config(config_path, None, None)?;
    let data = load_inputs(&config, bars, signal)?;
    let results = ParamSweep::new()
        .with_parallelism(!serial)
        .sweep(&grid, &config, &data)?;

    tracing::info!(runs = results.len(), "sweep finished");

    let csv = export_sweep_csv(&results)?;
    match output {
        Some(path) => {
            std::fs::write(path, csv)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Sweep summary saved to: {}", path.display());
        }
        None => print!("{csv}"),
    }

    for (rank, r) in results.top_n(top).into_iter().enumerate() {
        tracing::info!(
            rank = rank + 1,
            run_id = %r.run_id,
            sizing = r.config.sizing.param,
            commission_rate = r.config.costs.commission_rate,
            slippage = r.config.costs.slippage,
            final_equity = r.final_equity,
            "top configuration"
        );
    }
    Ok(())
}

fn run_latch_cmd(triggers: &Path, holding: bool) -> Result<()> {
    let pair = read_triggers(triggers)?;
    let states = latch_pair(&pair, PositionState::from(holding))?;

    let mut wtr = csv::Writer::from_writer(std::io::stdout().lock());
    wtr.write_record(["date", "entry", "exit", "state"])?;
    for (i, state) in states.iter().enumerate() {
        wtr.write_record([
            pair.dates[i].to_string(),
            pair.entries[i].to_string(),
            pair.exits[i].to_string(),
            if state.is_holding() { "holding" } else { "flat" }.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let period = match (result.start_date, result.end_date) {
        (Some(s), Some(e)) => format!("{s} to {e}"),
        _ => "-".to_string(),
    };

    println!();
    println!("=== Backtest Result ===");
    println!("Run ID:         {}", result.run_id);
    println!("Symbol:         {}", result.symbol);
    println!("Period:         {period}");
    println!("Bars:           {}", result.bar_count);
    println!("Trades:         {}", result.trades.len());
    println!();
    println!("--- Account ---");
    println!("Initial:        {:.2}", result.initial_capital);
    println!("Final Equity:   {:.2}", result.final_equity);
    println!("Total Return:   {:.2}%", result.total_return() * 100.0);
    println!("Final Position: {:.4}", result.final_position);
    println!("Commission:     {:.2}", result.total_commission);
    println!("Slippage:       {:.2}", result.total_slippage);
    if let Some(date) = result.ruined_at {
        println!();
        println!("WARNING: equity exhausted on {date}; curve is zero from there on");
    }
    println!();
}
