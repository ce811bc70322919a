//! Implementation of the `rbalance` command.

use crate::output::write_outputs;
use crate::pipeline::run as run_pipeline;
use crate::report::{self, JsonOutput};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use rustbalance_core::{PriceMetric, RunConfig};
use rustbalance_loader::load_dir;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Output format for the run summary.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// JSON output for tooling integration
    Json,
}

/// Build the balance sheet, income statement and KPIs of a ledger.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding accounts.csv, transactions.csv and the picklists
    #[arg(value_name = "DIR")]
    pub data_dir: PathBuf,

    /// Directory to write the output tables to
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Start of the reporting window (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub start: Option<NaiveDate>,

    /// Start of the deferred-tax window (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub deferred_tax_start: Option<NaiveDate>,

    /// Closing date (YYYY-MM-DD), today by default
    #[arg(long, value_name = "DATE")]
    pub end: Option<NaiveDate>,

    /// Price lookups after the first, one day earlier each
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Daily price used for valuation (open, high, low, close, adj close)
    #[arg(long, value_name = "METRIC")]
    pub price_metric: Option<PriceMetric>,

    /// Lookback window of a wash sale, in days
    #[arg(long, value_name = "DAYS")]
    pub wash_sale_days: Option<u32>,

    /// Tolerance of the accounting-equation check
    #[arg(long, value_name = "AMOUNT")]
    pub tolerance: Option<Decimal>,

    /// Exit with status 1 when the accounting equation does not hold
    #[arg(long)]
    pub strict: bool,

    /// Show verbose output including stage timings
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all output (just use exit code)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format (text or json)
    #[arg(long, short = 'f', value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl Args {
    /// Run parameters, defaults overridden by the flags given.
    #[must_use]
    pub fn config(&self) -> RunConfig {
        let mut config = RunConfig::default();
        if let Some(start) = self.start {
            config.start_date = start;
        }
        if let Some(start) = self.deferred_tax_start {
            config.deferred_tax_start = start;
        }
        if let Some(end) = self.end {
            config.end_date = end;
        }
        if let Some(retries) = self.max_retries {
            config.max_price_retries = retries;
        }
        if let Some(metric) = self.price_metric {
            config.price_metric = metric;
        }
        if let Some(days) = self.wash_sale_days {
            config.wash_sale_days = days;
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        config
    }
}

fn run(args: &Args) -> Result<ExitCode> {
    let mut stdout = io::stdout().lock();
    let start = std::time::Instant::now();
    let config = args.config();

    if args.verbose && !args.quiet {
        eprintln!("Loading {}...", args.data_dir.display());
    }
    let inputs = load_dir(&args.data_dir, config.price_metric)
        .with_context(|| format!("failed to load {}", args.data_dir.display()))?;

    let output = run_pipeline(inputs, config).context("run aborted")?;

    let files = match &args.output {
        Some(dir) => write_outputs(&output, dir)
            .with_context(|| format!("failed to write outputs to {}", dir.display()))?,
        None => Vec::new(),
    };

    if args.verbose && !args.quiet {
        eprintln!("Finished in {:.2?}", start.elapsed());
    }

    let (errors, warnings) = report::count_issues(&output.checks);
    if !args.quiet {
        match args.format {
            OutputFormat::Text => {
                report::report_checks(&output.checks, &mut stdout)?;
                writeln!(stdout)?;
                report::report_kpis(&output, &mut stdout)?;
                for file in &files {
                    writeln!(stdout, "wrote {}", file.display())?;
                }
                writeln!(stdout)?;
                report::print_summary(errors, warnings, &mut stdout)?;
            }
            OutputFormat::Json => {
                let json = JsonOutput::new(&output, &files);
                serde_json::to_writer_pretty(&mut stdout, &json)?;
                writeln!(stdout)?;
            }
        }
    }

    if args.strict && !output.checks.equation_holds() {
        tracing::warn!("accounting equation does not hold");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Main entry point for the `rbalance` command.
pub fn main() -> ExitCode {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_writer(io::stderr)
            .init();
    }

    match run(&args) {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
