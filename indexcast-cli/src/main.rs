//! IndexCast CLI — transform, explore, and forecast commands.
//!
//! Commands:
//! - `transform`: reshape a prices file into one frequency/kind slice and write it as CSV
//! - `explore`: descriptive statistics and period returns of a slice
//! - `forecast`: run the configured strategies with walk-forward validation

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use indexcast_core::data::{transform, Frequency, TimeSeriesTable, ValueKind};
use indexcast_core::stats::{describe, return_summary, ColumnStatistics, ReturnSummary};
use indexcast_runner::export::{export_table_csv, save_artifacts, save_exploration};
use indexcast_runner::runner::format_value;
use indexcast_runner::{
    generate_synthetic_prices, load_configured_prices, run_from_config, ForecastBundle,
    ForecastConfig, LoadedPrices, RunOutcome,
};

/// Columns of the generated price table used with `--synthetic`.
const SYNTHETIC_COLUMNS: [&str; 3] = ["SYN_LARGE", "SYN_TECH", "SYN_SMALL"];

#[derive(Parser)]
#[command(
    name = "indexcast",
    about = "IndexCast CLI — market index forecasting with walk-forward validation"
)]
struct Cli {
    /// Log level for IndexCast crates (overridden by RUST_LOG).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Where the prices come from.
#[derive(Args)]
struct DataArgs {
    /// Wide prices CSV (`date,<col>,...`).
    #[arg(long)]
    data: Option<PathBuf>,

    /// Use generated random-walk prices instead of a file.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

impl DataArgs {
    /// `--data` takes precedence over the configured prices file.
    fn apply_to(&self, config: &mut ForecastConfig) {
        if let Some(path) = &self.data {
            config.data.path = Some(path.clone());
        }
    }

    fn config(&self) -> ForecastConfig {
        let mut config = ForecastConfig::default();
        self.apply_to(&mut config);
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Reshape prices into one frequency/kind slice and write it as CSV.
    Transform {
        #[command(flatten)]
        source: DataArgs,

        /// Frequency: B, W-FRI, BM or BY.
        #[arg(long, default_value = "BM")]
        frequency: Frequency,

        /// Value kind: level or return.
        #[arg(long, default_value = "return")]
        kind: ValueKind,

        /// Output CSV path. Defaults to `<frequency>_<kind>.csv`.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print descriptive statistics and period returns of a slice.
    Explore {
        #[command(flatten)]
        source: DataArgs,

        /// Frequency of the return slice to describe.
        #[arg(long, default_value = "BM")]
        frequency: Frequency,

        /// Also write data_statistics.csv / data_returns.csv under this directory.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the configured strategies with walk-forward validation.
    Forecast {
        #[command(flatten)]
        source: DataArgs,

        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured frequency.
        #[arg(long)]
        frequency: Option<Frequency>,

        /// Override the configured value kind.
        #[arg(long)]
        kind: Option<ValueKind>,

        /// Override the configured number of validation steps.
        #[arg(long)]
        steps: Option<usize>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Transform {
            source,
            frequency,
            kind,
            output,
        } => run_transform(&source, frequency, kind, output),
        Commands::Explore {
            source,
            frequency,
            output,
        } => run_explore(&source, frequency, output.as_deref()),
        Commands::Forecast {
            source,
            config,
            frequency,
            kind,
            steps,
            output,
        } => run_forecast(&source, config, frequency, kind, steps, &output),
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("indexcast_core={level},indexcast_runner={level},indexcast_cli={level}").into()
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_prices(source: &DataArgs, config: &ForecastConfig) -> Result<LoadedPrices> {
    if source.synthetic {
        let columns: Vec<String> = SYNTHETIC_COLUMNS.iter().map(|c| c.to_string()).collect();
        let start = NaiveDate::from_ymd_opt(2010, 1, 1).context("invalid synthetic start date")?;
        let end = chrono::Local::now().date_naive();
        return Ok(generate_synthetic_prices(&columns, start, end)?);
    }
    Ok(load_configured_prices(config)?)
}

fn slice(prices: &LoadedPrices, frequency: Frequency, kind: ValueKind) -> Result<TimeSeriesTable> {
    let panel = transform(&prices.prices)?;
    Ok(panel.slice(frequency, kind)?)
}

// ─── transform ───────────────────────────────────────────────────────

fn run_transform(
    source: &DataArgs,
    frequency: Frequency,
    kind: ValueKind,
    output: Option<PathBuf>,
) -> Result<()> {
    let prices = load_prices(source, &source.config())?;
    let table = slice(&prices, frequency, kind)?;

    let path = output.unwrap_or_else(|| PathBuf::from(format!("{frequency}_{kind}.csv")));
    std::fs::write(&path, export_table_csv(&table)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!(
        "Wrote {} rows x {} columns to {}",
        table.len(),
        table.columns().len(),
        path.display()
    );
    Ok(())
}

// ─── explore ─────────────────────────────────────────────────────────

fn run_explore(source: &DataArgs, frequency: Frequency, output: Option<&Path>) -> Result<()> {
    let prices = load_prices(source, &source.config())?;
    let returns = slice(&prices, frequency, ValueKind::Return)?;
    let levels = slice(&prices, Frequency::BusinessDay, ValueKind::Level)?;

    let stats = describe(&returns);
    let period_returns = return_summary(&levels);

    print_statistics(frequency, &stats);
    if let Some(summary) = &period_returns {
        print_period_returns(summary);
    }
    if prices.synthetic {
        println!("WARNING: statistics based on SYNTHETIC data");
    }

    if let Some(dir) = output {
        let run_dir = save_exploration(&stats, period_returns.as_ref(), dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn print_statistics(frequency: Frequency, stats: &[ColumnStatistics]) {
    println!();
    println!("=== {frequency} return statistics ===");
    if stats.is_empty() {
        println!("(no columns)");
        return;
    }
    print!("{:<18}", "");
    for s in stats {
        print!("{:>14}", s.name);
    }
    println!();

    let columns: Vec<_> = stats.iter().map(ColumnStatistics::rows).collect();
    for (i, (label, _)) in columns[0].iter().enumerate() {
        print!("{label:<18}");
        for rows in &columns {
            print!("{:>14}", format_stat(&rows[i].1.to_string()));
        }
        println!();
    }
}

fn format_stat(text: &str) -> String {
    match text.parse::<f64>() {
        Ok(v) if v.fract() != 0.0 => format!("{v:.5}"),
        _ if text.is_empty() => "n/a".into(),
        _ => text.to_string(),
    }
}

fn print_period_returns(summary: &ReturnSummary) {
    println!();
    println!("=== Returns as of {} ===", summary.as_of);
    print!("{:<12}", "");
    for c in &summary.columns {
        print!("{c:>14}");
    }
    println!();
    for (label, values) in &summary.rows {
        print!("{label:<12}");
        for v in values {
            if v.is_nan() {
                print!("{:>14}", "n/a");
            } else {
                print!("{:>13.2}%", v * 100.0);
            }
        }
        println!();
    }
}

// ─── forecast ────────────────────────────────────────────────────────

fn run_forecast(
    source: &DataArgs,
    config_path: Option<PathBuf>,
    frequency: Option<Frequency>,
    kind: Option<ValueKind>,
    steps: Option<usize>,
    output: &Path,
) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => ForecastConfig::from_file(path)?,
        None => ForecastConfig::default(),
    };
    source.apply_to(&mut config);
    if let Some(frequency) = frequency {
        config.data.frequency = frequency;
    }
    if let Some(kind) = kind {
        config.data.kind = kind;
    }
    if let Some(steps) = steps {
        config.validation.steps = steps;
    }

    tracing::info!(
        config = ?config_path,
        strategies = config.strategy.len(),
        steps = config.validation.steps,
        "starting forecast run"
    );
    let prices = load_prices(source, &config)?;
    let bundles = match run_from_config(&config, &prices)? {
        RunOutcome::NothingToDo(reason) => {
            println!("Nothing to do: {reason}");
            return Ok(());
        }
        RunOutcome::Completed(bundles) => bundles,
    };

    for bundle in &bundles {
        print_bundle(bundle);
    }
    if prices.synthetic {
        println!("WARNING: forecasts based on SYNTHETIC data");
    }

    let run_dir = save_artifacts(&bundles, output)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn print_bundle(bundle: &ForecastBundle) {
    println!();
    println!("=== {} ===", bundle.strategy);
    if !bundle.validation_performed() {
        println!("(not enough data: validation not performed)");
    }

    print!("{:<18}", "");
    for c in &bundle.live.columns {
        print!("{c:>14}");
    }
    println!();
    for (label, values) in bundle.summary_rows() {
        print!("{label:<18}");
        for v in values {
            print!("{:>14}", format_value(v));
        }
        println!();
    }

    for (name, result) in bundle.live.iter() {
        if let Err(e) = result {
            println!("  {name}: forecast unavailable ({e})");
        }
    }
}
