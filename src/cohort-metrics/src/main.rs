//! cohort-metrics: marketing cohort unit economics from visit, order and
//! spend logs.
//!
//! Loads configuration, ingests the three CSV logs, runs the pipeline and
//! writes every derived table to the output directory.

use anyhow::Context;
use chrono::NaiveDateTime;
use clap::{Parser, ValueEnum};
use cohort_analytics::PipelineRun;
use cohort_core::config::{AppConfig, OutputFormat};
use cohort_core::timestamp::parse_timestamp;
use cohort_reporting::ReportBundle;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
    Both,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Both => OutputFormat::Both,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "cohort-metrics")]
#[command(about = "Cohort CAC, LTV, ROI, retention and conversion from marketing logs")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "COHORT_METRICS_CONFIG")]
    config: Option<PathBuf>,

    /// Visits log (overrides config)
    #[arg(long)]
    visits: Option<PathBuf>,

    /// Orders log (overrides config)
    #[arg(long)]
    orders: Option<PathBuf>,

    /// Marketing costs log (overrides config)
    #[arg(long)]
    costs: Option<PathBuf>,

    /// Directory report tables are written to (overrides config)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Attribution horizon in days (overrides config)
    #[arg(long)]
    horizon_days: Option<u32>,

    /// Observation cutoff for cohort maturity, e.g. 2019-11-01
    #[arg(long, value_parser = parse_cutoff)]
    max_acq_date: Option<NaiveDateTime>,

    /// Also print every table to stdout
    #[arg(long, default_value_t = false)]
    print: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

fn parse_cutoff(raw: &str) -> Result<NaiveDateTime, String> {
    parse_timestamp(raw).ok_or_else(|| format!("not a date or timestamp: {raw}"))
}

/// Logs go to stderr so `--print` output on stdout stays clean.
fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "cohort_metrics=info,cohort_analytics=info,cohort_ingest=info,cohort_reporting=info".into()
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(path) = &cli.visits {
        config.input.visits_path = path.clone();
    }
    if let Some(path) = &cli.orders {
        config.input.orders_path = path.clone();
    }
    if let Some(path) = &cli.costs {
        config.input.costs_path = path.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output.dir = dir.clone();
    }
    if let Some(format) = cli.format {
        config.output.format = format.into();
    }
    if let Some(days) = cli.horizon_days {
        config.analysis.horizon_days = days;
    }
    if let Some(cutoff) = cli.max_acq_date {
        config.analysis.max_acq_date = Some(cutoff);
    }
    if cli.print {
        config.output.print = true;
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let mut config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    apply_overrides(&mut config, &cli);
    config.validate().context("invalid configuration")?;

    info!(
        visits = %config.input.visits_path.display(),
        orders = %config.input.orders_path.display(),
        costs = %config.input.costs_path.display(),
        horizon_days = config.analysis.horizon_days,
        "Configuration loaded"
    );

    let outcome = cohort_ingest::load_tables(&config.input).context("failed to load input logs")?;

    let run = PipelineRun::new(config.analysis.clone())?;
    let report = run
        .run(&outcome.tables)
        .with_context(|| format!("pipeline run {} failed", run.run_id))?;

    let bundle = ReportBundle::from_report(&report).with_ingest(&outcome);
    let written = bundle
        .write_to_dir(&config.output.dir, config.output.format)
        .with_context(|| format!("failed to write reports to {}", config.output.dir.display()))?;

    if config.output.print {
        println!("{}", bundle.render_text());
    }

    info!(
        run_id = %report.run_id,
        files = written.len(),
        bad_channels = report.bad_channels.len(),
        "Run complete"
    );
    Ok(())
}
