//! Export — JSON and CSV artifact generation.
//!
//! Forecast runs produce, per strategy:
//! - `<strategy>_forecast_summary.csv`: presentation rows × series
//! - `<strategy>_forecast_results.csv`: the full walk-forward result table
//!
//! A strategy listed more than once gets a numeric suffix on its files.
//! plus `bundle.json` holding every bundle. Exploration writes
//! `data_statistics.csv` and `data_returns.csv`.
//!
//! Persisted bundles carry a `schema_version`. Unknown versions are rejected
//! on load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indexcast_core::data::TimeSeriesTable;
use indexcast_core::stats::{ColumnStatistics, ReturnSummary};

use crate::runner::{format_value, ForecastBundle, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize bundles to pretty JSON.
pub fn export_json(bundles: &[ForecastBundle]) -> Result<String> {
    serde_json::to_string_pretty(bundles).context("failed to serialize forecast bundles to JSON")
}

/// Deserialize bundles from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<Vec<ForecastBundle>> {
    let bundles: Vec<ForecastBundle> =
        serde_json::from_str(json).context("failed to deserialize forecast bundles from JSON")?;
    if let Some(b) = bundles.iter().find(|b| b.schema_version > SCHEMA_VERSION) {
        bail!(
            "unsupported schema version {} (max supported: {})",
            b.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(bundles)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Summary rows as CSV: one row per presentation label, one column per series.
pub fn export_summary_csv(bundle: &ForecastBundle) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec![String::new()];
    header.extend(bundle.live.columns.iter().cloned());
    wtr.write_record(&header)?;

    for (label, values) in bundle.summary_rows() {
        let mut record = vec![label.to_string()];
        record.extend(values.into_iter().map(format_value));
        wtr.write_record(&record)?;
    }

    finish(wtr)
}

/// Walk-forward result table as CSV.
///
/// Columns: date, then `<series>_actual`, `<series>_forecast`,
/// `<series>_ci_lower`, `<series>_ci_upper` for every series. Missing
/// values are empty cells.
pub fn export_results_csv(bundle: &ForecastBundle) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let results = &bundle.results;

    let mut header = vec!["date".to_string()];
    for s in &results.series {
        for field in ["actual", "forecast", "ci_lower", "ci_upper"] {
            header.push(format!("{}_{field}", s.name));
        }
    }
    wtr.write_record(&header)?;

    for (row, date) in results.dates.iter().enumerate() {
        let mut record = vec![date.to_string()];
        for s in &results.series {
            let p = &s.points[row];
            for v in [p.actual, p.forecast, p.ci_lower, p.ci_upper] {
                record.push(v.map(|v| v.to_string()).unwrap_or_default());
            }
        }
        wtr.write_record(&record)?;
    }

    finish(wtr)
}

/// Descriptive statistics as CSV: one row per statistic, one column per series.
pub fn export_statistics_csv(stats: &[ColumnStatistics]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec![String::new()];
    header.extend(stats.iter().map(|s| s.name.clone()));
    wtr.write_record(&header)?;

    let columns: Vec<_> = stats.iter().map(ColumnStatistics::rows).collect();
    if let Some(first) = columns.first() {
        for (i, (label, _)) in first.iter().enumerate() {
            let mut record = vec![label.clone()];
            record.extend(columns.iter().map(|rows| rows[i].1.to_string()));
            wtr.write_record(&record)?;
        }
    }

    finish(wtr)
}

/// Period-return summary as CSV.
pub fn export_returns_csv(summary: &ReturnSummary) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec![format!("as of {}", summary.as_of)];
    header.extend(summary.columns.iter().cloned());
    wtr.write_record(&header)?;

    for (label, values) in &summary.rows {
        let mut record = vec![label.clone()];
        record.extend(values.iter().map(|v| nan_to_empty(*v)));
        wtr.write_record(&record)?;
    }

    finish(wtr)
}

/// Wide table as CSV (`date,<col>,...`), missing values as empty cells.
pub fn export_table_csv(table: &TimeSeriesTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["date".to_string()];
    header.extend(table.columns().iter().cloned());
    wtr.write_record(&header)?;

    for (row, date) in table.dates().iter().enumerate() {
        let mut record = vec![date.to_string()];
        record.extend((0..table.columns().len()).map(|c| nan_to_empty(table.value(row, c))));
        wtr.write_record(&record)?;
    }

    finish(wtr)
}

fn nan_to_empty(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        v.to_string()
    }
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

const MAX_DIR_ATTEMPTS: usize = 1000;

/// Create a fresh `{prefix}_{timestamp}` directory under `output_dir`.
///
/// Runs started within the same second get a `_2`, `_3`, ... suffix so an
/// existing run directory is never reused.
fn timestamped_dir(output_dir: &Path, prefix: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;
    let stem = format!("{prefix}_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"));

    for attempt in 1..=MAX_DIR_ATTEMPTS {
        let dirname = if attempt == 1 {
            stem.clone()
        } else {
            format!("{stem}_{attempt}")
        };
        let run_dir = output_dir.join(dirname);
        match std::fs::create_dir(&run_dir) {
            Ok(()) => return Ok(run_dir),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to create artifact dir: {}", run_dir.display())
                })
            }
        }
    }
    bail!("no free artifact dir for {stem} under {}", output_dir.display())
}

/// File stem of every bundle's CSVs. Repeated strategy names get a
/// `_2`, `_3`, ... suffix in bundle order.
fn artifact_stems(bundles: &[ForecastBundle]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    bundles
        .iter()
        .map(|b| {
            let n = seen.entry(b.strategy.as_str()).or_insert(0);
            *n += 1;
            if *n == 1 {
                b.strategy.clone()
            } else {
                format!("{}_{n}", b.strategy)
            }
        })
        .collect()
}

/// Save the full artifact set for a forecast run.
///
/// Creates `forecast_{timestamp}/` under `output_dir` containing
/// `bundle.json` and the summary/results CSVs of every strategy.
/// Returns the path to the created directory.
pub fn save_artifacts(bundles: &[ForecastBundle], output_dir: &Path) -> Result<PathBuf> {
    let run_dir = timestamped_dir(output_dir, "forecast")?;

    std::fs::write(run_dir.join("bundle.json"), export_json(bundles)?)?;

    for (bundle, stem) in bundles.iter().zip(artifact_stems(bundles)) {
        let summary = export_summary_csv(bundle)?;
        std::fs::write(run_dir.join(format!("{stem}_forecast_summary.csv")), summary)?;
        let results = export_results_csv(bundle)?;
        std::fs::write(run_dir.join(format!("{stem}_forecast_results.csv")), results)?;
    }

    tracing::info!(path = %run_dir.display(), bundles = bundles.len(), "saved artifacts");
    Ok(run_dir)
}

/// Save exploration output: `data_statistics.csv` and, when available,
/// `data_returns.csv` under a new `explore_{timestamp}/` directory.
pub fn save_exploration(
    stats: &[ColumnStatistics],
    returns: Option<&ReturnSummary>,
    output_dir: &Path,
) -> Result<PathBuf> {
    let run_dir = timestamped_dir(output_dir, "explore")?;
    std::fs::write(run_dir.join("data_statistics.csv"), export_statistics_csv(stats)?)?;
    if let Some(returns) = returns {
        std::fs::write(run_dir.join("data_returns.csv"), export_returns_csv(returns)?)?;
    }
    Ok(run_dir)
}

/// Load bundles from an artifact directory's bundle.json.
pub fn load_artifacts(dir: &Path) -> Result<Vec<ForecastBundle>> {
    let path = dir.join("bundle.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
