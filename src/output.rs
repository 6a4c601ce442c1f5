//! Output formatting and persistence for analysis results.
//!
//! Supports pretty-printing, JSON reports and CSV export of derived tables.

use std::fmt::Debug;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::analyzers::types::QuestionAccuracyTable;
use crate::report::{AccuracyReport, AverageReport};

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty<T: Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes `rows` to a CSV file with a header row, replacing any existing file.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    debug!(path = %path.display(), rows = rows.len(), "Writing CSV");

    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes the accuracy table in pivot layout: one row per class, one column
/// per question, blank where a class has no rate for a question.
pub fn write_accuracy_csv(path: &Path, table: &QuestionAccuracyTable, class_header: &str) -> Result<()> {
    debug!(path = %path.display(), cells = table.len(), "Writing accuracy pivot");

    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let mut writer = WriterBuilder::new().from_writer(file);

    let questions = table.questions();
    let mut header = vec![class_header.to_string()];
    header.extend(questions.iter().map(|q| q.to_string()));
    writer.write_record(&header)?;

    for class in table.classes() {
        let mut record = vec![class.to_string()];
        record.extend(
            table
                .row(class)
                .into_iter()
                .map(|cell| cell.map(|v| format!("{v:.2}")).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;

    Ok(())
}

/// Serializes `value` as pretty JSON into `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    debug!(path = %path.display(), "Writing JSON");
    let body = serde_json::to_vec_pretty(value)?;
    fs::write(path, body).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}

/// Saves the averages table and the full report under `dir`.
pub fn save_average_report(dir: &Path, report: &AverageReport) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let csv_path = dir.join("class_averages.csv");
    let json_path = dir.join("class_averages.json");
    write_csv(&csv_path, &report.averages)?;
    write_json(&json_path, report)?;

    info!(dir = %dir.display(), "Average report saved");
    Ok(vec![csv_path, json_path])
}

/// Saves the accuracy pivot and the full report under `dir`, using `stem` for
/// the file names.
pub fn save_accuracy_report(
    dir: &Path,
    stem: &str,
    report: &AccuracyReport,
    class_header: &str,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let csv_path = dir.join(format!("{stem}.csv"));
    let json_path = dir.join(format!("{stem}.json"));
    write_accuracy_csv(&csv_path, &report.table, class_header)?;
    write_json(&json_path, report)?;

    info!(dir = %dir.display(), stem, "Accuracy report saved");
    Ok(vec![csv_path, json_path])
}
