//! One analysis pass: parse the sheet, aggregate, group by tier and describe
//! the chart.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::analyzers::aggregate::{
    DEFAULT_QUESTION_PREFIX, compute_class_averages, compute_question_accuracy,
};
use crate::analyzers::labels::{ClassLabel, LabelPolicy};
use crate::analyzers::tiers::{group_by_tier, unassigned_classes};
use crate::analyzers::types::{ClassAverage, QuestionAccuracyTable, TierAssignment};
use crate::chart::{ChartSpec, accuracy_chart, class_average_chart, tiered_accuracy_chart};
use crate::config::{ColumnNames, TierConfig};
use crate::error::Result;
use crate::parser::{RateScale, parse_answer_records, parse_score_records};

/// How an uploaded sheet is read.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub columns: ColumnNames,
    pub label_policy: LabelPolicy,
    pub question_prefix: String,
    pub rate_scale: RateScale,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            columns: ColumnNames::default(),
            label_policy: LabelPolicy::default(),
            question_prefix: DEFAULT_QUESTION_PREFIX.to_string(),
            rate_scale: RateScale::default(),
        }
    }
}

/// Result of the class-average variant.
#[derive(Debug, Serialize)]
pub struct AverageReport {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub rows_read: usize,
    pub rows_used: usize,
    pub averages: Vec<ClassAverage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiers: Option<Vec<TierAssignment>>,
    pub unassigned_classes: Vec<ClassLabel>,
    pub chart: ChartSpec,
}

/// Result of the question-accuracy variants, plain or tiered.
#[derive(Debug, Serialize)]
pub struct AccuracyReport {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub question_prefix: String,
    pub rows_read: usize,
    pub rows_used: usize,
    pub table: QuestionAccuracyTable,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiers: Option<Vec<TierAssignment>>,
    pub unassigned_classes: Vec<ClassLabel>,
    pub chart: ChartSpec,
}

/// Averages the total score per class, dropping students with a total ≤ 0.
///
/// With `tiers`, the averages are also grouped by tier and the chart is
/// colored per tier.
pub fn average_report(
    source: &str,
    bytes: &[u8],
    options: &AnalysisOptions,
    tiers: Option<&TierConfig>,
) -> Result<AverageReport> {
    let rows = parse_score_records(bytes, &options.columns, options.label_policy)?;
    let averages = compute_class_averages(&rows)?;
    let rows_used = averages.iter().map(|a| a.count).sum();

    let assignments = tiers.map(|config| group_by_tier(averages.as_slice(), config));
    let unassigned = tiers
        .map(|config| unassigned_classes(averages.as_slice(), config))
        .unwrap_or_default();
    let chart = class_average_chart(&averages, assignments.as_deref());

    info!(
        source,
        rows_read = rows.len(),
        rows_used,
        classes = averages.len(),
        "Class averages computed"
    );

    Ok(AverageReport {
        generated_at: Utc::now(),
        source: source.to_string(),
        rows_read: rows.len(),
        rows_used,
        averages,
        tiers: assignments,
        unassigned_classes: unassigned,
        chart,
    })
}

/// Pivots the single-choice question rates per class.
///
/// With `tiers`, only tiered classes are charted, colored by tier; classes of
/// no tier stay in the table and are listed in `unassigned_classes`.
pub fn accuracy_report(
    source: &str,
    bytes: &[u8],
    options: &AnalysisOptions,
    tiers: Option<&TierConfig>,
) -> Result<AccuracyReport> {
    let rows = parse_answer_records(
        bytes,
        &options.columns,
        options.label_policy,
        options.rate_scale,
    )?;
    let prefix = options.question_prefix.as_str();
    let table = compute_question_accuracy(&rows, prefix)?;
    let rows_used = rows
        .iter()
        .filter(|r| r.question.has_prefix(prefix))
        .count();

    let (assignments, unassigned, chart) = match tiers {
        Some(config) => {
            let assignments = group_by_tier(&table, config);
            let chart = tiered_accuracy_chart(&table, &assignments);
            (Some(assignments), unassigned_classes(&table, config), chart)
        }
        None => (None, Vec::new(), accuracy_chart(&table)),
    };

    info!(
        source,
        prefix,
        rows_read = rows.len(),
        rows_used,
        cells = table.len(),
        "Question accuracy computed"
    );

    Ok(AccuracyReport {
        generated_at: Utc::now(),
        source: source.to_string(),
        question_prefix: options.question_prefix.clone(),
        rows_read: rows.len(),
        rows_used,
        table,
        tiers: assignments,
        unassigned_classes: unassigned,
        chart,
    })
}
