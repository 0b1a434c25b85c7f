//! Report collaborators: CSV export of run statistics and per-frame samples, and
//! the console comparison table.

use anyhow::Context;
use motion_bench::{ComparisonRow, ReportSink, RunStatistics};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

const BAR_WIDTH: usize = 40;

/// Writes the session's runs to a CSV file, one row per run.
pub struct CsvReport {
    path: PathBuf,
}

impl CsvReport {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ReportSink for CsvReport {
    type Error = anyhow::Error;

    fn publish(&mut self, runs: &[RunStatistics]) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_path(&self.path)
            .with_context(|| format!("creating {}", self.path.display()))?;
        for run in runs {
            writer.serialize(run)?;
        }
        writer.flush()?;
        log::info!("wrote {} run(s) to {}", runs.len(), self.path.display());
        Ok(())
    }
}

/// One line of the per-frame sample export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRow {
    pub frame: u64,
    pub motion_pixels: usize,
    pub regions: usize,
}

pub fn write_samples(path: &Path, rows: &[SampleRow]) -> anyhow::Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Renders the comparison as a text table with a bar per run.
pub fn comparison_table(rows: &[ComparisonRow]) -> String {
    let label_width = rows
        .iter()
        .map(|row| row.parameter_label.len())
        .max()
        .unwrap_or(0)
        .max("parameters".len());

    let mut out = format!(
        "{:<label_width$}  {:>6}  {:>10}  {:>8}  mean motion\n",
        "parameters", "frames", "mean", "max"
    );
    for row in rows {
        let bar = (row.relative_mean * BAR_WIDTH as f64).round() as usize;
        out.push_str(&format!(
            "{:<label_width$}  {:>6}  {:>10.1}  {:>8}  {}\n",
            row.parameter_label,
            row.frames,
            row.mean_motion_pixels,
            row.max_motion_pixels,
            "#".repeat(bar.min(BAR_WIDTH))
        ));
    }
    out
}

pub fn print_comparison(rows: &[ComparisonRow]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(comparison_table(rows).as_bytes())?;
    stdout.flush()
}
