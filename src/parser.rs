//! Parser for exported score sheets (CSV, xlsx or xls).
//!
//! The header row is checked against [`ColumnNames`] once; every data row is
//! then converted into a typed record, so the aggregation code never looks
//! columns up by name.

use std::collections::HashMap;

use clap::ValueEnum;
use serde::Deserialize;
use tracing::debug;

use crate::analyzers::labels::{ClassLabel, LabelPolicy};
use crate::analyzers::types::{AnswerRecord, QuestionId, ScoreRecord};
use crate::config::ColumnNames;
use crate::error::{AnalysisError, Result};
use crate::sheet::read_sheet;

/// Scale of the correctness-rate column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RateScale {
    /// Rates are already percentages (0–100).
    #[default]
    Percent,
    /// Rates are fractions (0–1).
    Fraction,
}

impl RateScale {
    pub fn to_percent(self, value: f64) -> f64 {
        match self {
            RateScale::Percent => value,
            RateScale::Fraction => value * 100.0,
        }
    }
}

struct Header<'a> {
    names: &'a [String],
    positions: HashMap<&'a str, usize>,
}

impl<'a> Header<'a> {
    fn new(names: &'a [String]) -> Self {
        let mut positions = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            positions.entry(name.as_str()).or_insert(i);
        }
        Self { names, positions }
    }

    fn require(&self, column: &str) -> Result<usize> {
        self.positions.get(column).copied().ok_or_else(|| {
            AnalysisError::invalid(format!(
                "missing required column '{column}' (found: {})",
                self.names.join(", ")
            ))
        })
    }

    fn optional(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }
}

fn at_line(line: u64, err: AnalysisError) -> AnalysisError {
    match err {
        AnalysisError::InvalidInput(msg) => AnalysisError::InvalidInput(format!("line {line}: {msg}")),
        other => other,
    }
}

/// Parses a numeric cell. Blank cells are `None`; a trailing `%` is accepted
/// and reported through the second tuple field. `NaN` and infinities count as
/// non-numeric.
fn parse_number(raw: &str, column: &str, line: u64) -> Result<Option<(f64, bool)>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let (digits, is_percent) = match raw.strip_suffix('%') {
        Some(stripped) => (stripped.trim_end(), true),
        None => (raw, false),
    };
    match digits.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some((value, is_percent))),
        _ => Err(AnalysisError::invalid(format!(
            "line {line}: column '{column}' holds non-numeric value '{raw}'"
        ))),
    }
}

/// Reads the total-score path: class label, total score and, when present,
/// the student identifier.
///
/// # Errors
///
/// [`AnalysisError::InvalidInput`] when the class or total column is missing,
/// the sheet cannot be read, a total is not a finite number, or a class code
/// fails normalization.
pub fn parse_score_records(
    bytes: &[u8],
    columns: &ColumnNames,
    policy: LabelPolicy,
) -> Result<Vec<ScoreRecord>> {
    let sheet = read_sheet(bytes)?;
    let header = Header::new(&sheet.header);
    let class_idx = header.require(&columns.class)?;
    let total_idx = header.require(&columns.total)?;
    let student_idx = header.optional(&columns.student_id);

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for record in &sheet.rows {
        let line = record.line;

        let raw_class = record.cell(class_idx);
        if raw_class.is_empty() {
            skipped += 1;
            continue;
        }
        let class = ClassLabel::parse(raw_class, policy).map_err(|e| at_line(line, e))?;

        let total = parse_number(record.cell(total_idx), &columns.total, line)?
            .map(|(value, _)| value);

        let student_id = student_idx
            .map(|i| record.cell(i))
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        rows.push(ScoreRecord {
            student_id,
            class,
            total,
        });
    }

    debug!(rows = rows.len(), skipped, "Parsed score records");
    Ok(rows)
}

/// Reads the question path: class label, question id and correctness rate.
///
/// Rates are converted to percent using `scale`, unless the cell itself ends
/// in `%`. Rows with a blank class, question or rate are skipped.
///
/// # Errors
///
/// [`AnalysisError::InvalidInput`] when a required column is missing, a rate
/// is not a finite number, the sheet cannot be read, or a class code fails
/// normalization.
pub fn parse_answer_records(
    bytes: &[u8],
    columns: &ColumnNames,
    policy: LabelPolicy,
    scale: RateScale,
) -> Result<Vec<AnswerRecord>> {
    let sheet = read_sheet(bytes)?;
    let header = Header::new(&sheet.header);
    let class_idx = header.require(&columns.class)?;
    let question_idx = header.require(&columns.question)?;
    let rate_idx = header.require(&columns.rate)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for record in &sheet.rows {
        let line = record.line;

        let raw_class = record.cell(class_idx);
        let raw_question = record.cell(question_idx);
        let rate = parse_number(record.cell(rate_idx), &columns.rate, line)?;

        let Some((value, is_percent)) = rate else {
            skipped += 1;
            continue;
        };
        if raw_class.is_empty() || raw_question.is_empty() {
            skipped += 1;
            continue;
        }

        let class = ClassLabel::parse(raw_class, policy).map_err(|e| at_line(line, e))?;

        rows.push(AnswerRecord {
            class,
            question: QuestionId::new(raw_question),
            rate: if is_percent {
                value
            } else {
                scale.to_percent(value)
            },
        });
    }

    debug!(rows = rows.len(), skipped, "Parsed answer records");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scores() {
        let csv = "考号,班级,总分\n1001,1,80\n1002,1,0\n1003,2,60\n";
        let rows = parse_score_records(csv.as_bytes(), &ColumnNames::default(), LabelPolicy::Numeric)
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].student_id.as_deref(), Some("1001"));
        assert_eq!(rows[0].class.as_str(), "1班");
        assert_eq!(rows[0].total, Some(80.0));
        assert_eq!(rows[1].total, Some(0.0));
    }

    #[test]
    fn test_parse_scores_without_student_column() {
        let csv = "\u{feff}班级,总分\n05,\n5.0,77.5\n";
        let rows = parse_score_records(csv.as_bytes(), &ColumnNames::default(), LabelPolicy::Numeric)
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].student_id, None);
        assert_eq!(rows[0].total, None);
        assert_eq!(rows[1].class.as_str(), "5班");
    }

    #[test]
    fn test_missing_total_column() {
        let csv = "班级,语文\n1,80\n";
        let err = parse_score_records(csv.as_bytes(), &ColumnNames::default(), LabelPolicy::Numeric)
            .unwrap_err();
        match err {
            AnalysisError::InvalidInput(msg) => assert!(msg.contains("总分")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_total() {
        let csv = "班级,总分\n1,缺考\n";
        let err = parse_score_records(csv.as_bytes(), &ColumnNames::default(), LabelPolicy::Numeric)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
    }

    #[test]
    fn test_non_numeric_class_depends_on_policy() {
        let csv = "班级,总分\n国际部,80\n";
        let strict = parse_score_records(csv.as_bytes(), &ColumnNames::default(), LabelPolicy::Numeric);
        assert!(matches!(strict, Err(AnalysisError::InvalidInput(_))));

        let lenient =
            parse_score_records(csv.as_bytes(), &ColumnNames::default(), LabelPolicy::Verbatim)
                .unwrap();
        assert_eq!(lenient[0].class.as_str(), "国际部");
    }

    #[test]
    fn test_blank_class_rows_are_skipped() {
        let csv = "班级,总分\n1,80\n,999\n";
        let rows = parse_score_records(csv.as_bytes(), &ColumnNames::default(), LabelPolicy::Numeric)
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_custom_column_names() {
        let columns = ColumnNames {
            class: "class".into(),
            total: "total".into(),
            ..ColumnNames::default()
        };
        let csv = "class,total\n3,91\n";
        let rows = parse_score_records(csv.as_bytes(), &columns, LabelPolicy::Numeric).unwrap();
        assert_eq!(rows[0].class.as_str(), "3班");
    }

    #[test]
    fn test_parse_answers_with_scales() {
        let csv = "班级,题号,得分率\n05,A1,0.7\n05,A2,85%\n05,B1,\n";
        let rows = parse_answer_records(
            csv.as_bytes(),
            &ColumnNames::default(),
            LabelPolicy::Numeric,
            RateScale::Fraction,
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert!((rows[0].rate - 70.0).abs() < 1e-9);
        assert_eq!(rows[0].class.as_str(), "05班");
        assert_eq!(rows[1].question.as_str(), "A2");
        assert_eq!(rows[1].rate, 85.0);
    }

    #[test]
    fn test_missing_question_column() {
        let csv = "班级,得分率\n1,50\n";
        let err = parse_answer_records(
            csv.as_bytes(),
            &ColumnNames::default(),
            LabelPolicy::Numeric,
            RateScale::Percent,
        )
        .unwrap_err();
        match err {
            AnalysisError::InvalidInput(msg) => assert!(msg.contains("题号")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_nan_and_infinite_totals_are_rejected() {
        for csv in ["班级,总分\n1,inf\n1,80\n", "班级,总分\n1,80\n1,NaN\n"] {
            let err =
                parse_score_records(csv.as_bytes(), &ColumnNames::default(), LabelPolicy::Numeric)
                    .unwrap_err();
            match err {
                AnalysisError::InvalidInput(msg) => assert!(msg.contains("non-numeric"), "{msg}"),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_nan_and_infinite_rates_are_rejected() {
        for csv in [
            "班级,题号,得分率\n05,A1,70\n05,A1,NaN\n",
            "班级,题号,得分率\n05,A1,inf\n",
            "班级,题号,得分率\n05,A1,-infinity%\n",
        ] {
            let err = parse_answer_records(
                csv.as_bytes(),
                &ColumnNames::default(),
                LabelPolicy::Numeric,
                RateScale::Percent,
            )
            .unwrap_err();
            assert!(matches!(err, AnalysisError::InvalidInput(_)), "{csv}");
        }
    }

    #[test]
    fn test_parse_scores_from_xlsx() {
        let bytes = include_bytes!("../tests/fixtures/scores.xlsx");
        let rows = parse_score_records(bytes, &ColumnNames::default(), LabelPolicy::Numeric).unwrap();

        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].student_id.as_deref(), Some("20240101"));
        assert_eq!(rows[0].class.as_str(), "1班");
        assert_eq!(rows[0].total, Some(612.0));
        assert_eq!(rows[4].class.as_str(), "03班");
        assert_eq!(rows[4].total, Some(497.5));
        assert_eq!(rows[5].total, None);
    }

    #[test]
    fn test_xlsx_missing_column_reports_header() {
        let bytes = include_bytes!("../tests/fixtures/scores.xlsx");
        let columns = ColumnNames {
            total: "语文".into(),
            ..ColumnNames::default()
        };
        let err = parse_score_records(bytes, &columns, LabelPolicy::Numeric).unwrap_err();
        match err {
            AnalysisError::InvalidInput(msg) => {
                assert!(msg.contains("语文"));
                assert!(msg.contains("总分"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
