use std::collections::BTreeMap;

use tracing::debug;

use crate::analyzers::labels::ClassLabel;
use crate::analyzers::types::{
    AnswerRecord, ClassAverage, QuestionAccuracyTable, QuestionId, ScoreRecord,
};
use crate::analyzers::utility::{mean, stddev};
use crate::error::{AnalysisError, Result};

/// Question-id prefix of single-choice questions.
pub const DEFAULT_QUESTION_PREFIX: &str = "A";

/// Averages the total score of each class.
///
/// Records whose total is absent or ≤ 0 are dropped before grouping, so they
/// neither count towards a mean nor keep an otherwise empty class alive.
/// Entries come back in ascending class order.
pub fn compute_class_averages(rows: &[ScoreRecord]) -> Result<Vec<ClassAverage>> {
    let mut series: BTreeMap<&ClassLabel, Vec<f64>> = BTreeMap::new();
    let mut excluded = 0usize;

    for row in rows {
        match row.total {
            Some(total) if total > 0.0 => series.entry(&row.class).or_default().push(total),
            _ => excluded += 1,
        }
    }

    debug!(
        rows = rows.len(),
        excluded,
        classes = series.len(),
        "Grouped total scores by class"
    );

    if series.is_empty() {
        return Err(AnalysisError::empty(format!(
            "none of {} records has a positive total score",
            rows.len()
        )));
    }

    Ok(series
        .into_iter()
        .filter_map(|(class, totals)| {
            let avg = mean(&totals)?;
            Some(ClassAverage {
                class: class.clone(),
                average: avg,
                count: totals.len(),
                stddev: stddev(&totals, avg),
            })
        })
        .collect())
}

/// Pivots correctness rates into a (class, question) table.
///
/// Only questions whose id starts with `prefix` are kept; each cell holds the
/// mean rate over all matching rows for that pair.
pub fn compute_question_accuracy(
    rows: &[AnswerRecord],
    prefix: &str,
) -> Result<QuestionAccuracyTable> {
    let mut series: BTreeMap<(ClassLabel, QuestionId), Vec<f64>> = BTreeMap::new();

    for row in rows.iter().filter(|r| r.question.has_prefix(prefix)) {
        series
            .entry((row.class.clone(), row.question.clone()))
            .or_default()
            .push(row.rate);
    }

    debug!(
        rows = rows.len(),
        prefix,
        cells = series.len(),
        "Pivoted correctness rates"
    );

    if series.is_empty() {
        return Err(AnalysisError::empty(format!(
            "no question id starts with '{prefix}'"
        )));
    }

    let cells = series
        .into_iter()
        .filter_map(|(key, rates)| mean(&rates).map(|avg| (key, avg)))
        .collect();

    Ok(QuestionAccuracyTable { cells })
}
