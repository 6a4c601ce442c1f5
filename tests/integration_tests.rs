use class_score_report::analyzers::{
    ClassLabel, LabelPolicy, QuestionId, compute_class_averages, compute_question_accuracy,
    group_by_tier, normalize_class_label,
};
use class_score_report::config::{ColumnNames, TierConfig};
use class_score_report::parser::{RateScale, parse_answer_records, parse_score_records};
use class_score_report::report::{AnalysisOptions, accuracy_report, average_report};
use class_score_report::AnalysisError;

fn class(raw: &str) -> ClassLabel {
    ClassLabel::parse(raw, LabelPolicy::Numeric).unwrap()
}

#[test]
fn test_class_average_pipeline() {
    let bytes = include_bytes!("fixtures/scores.csv");
    let rows = parse_score_records(bytes, &ColumnNames::default(), LabelPolicy::Numeric)
        .expect("Failed to parse scores");
    let averages = compute_class_averages(&rows).unwrap();

    let classes: Vec<&str> = averages.iter().map(|a| a.class.as_str()).collect();
    // 9班 only has a zero total and disappears.
    assert_eq!(classes, vec!["1班", "02班", "3班", "8班"]);

    assert_eq!(averages[0].average, 600.0);
    assert_eq!(averages[0].count, 2);
    assert_eq!(averages[1].average, 553.0);
    assert_eq!(averages[2].average, 497.5);
    assert_eq!(averages[3].count, 1);
}

#[test]
fn test_question_accuracy_pipeline() {
    let bytes = include_bytes!("fixtures/answers.csv");
    let rows = parse_answer_records(
        bytes,
        &ColumnNames::default(),
        LabelPolicy::Numeric,
        RateScale::Percent,
    )
    .unwrap();
    let table = compute_question_accuracy(&rows, "A").unwrap();

    let questions: Vec<&str> = table.questions().into_iter().map(|q| q.as_str()).collect();
    assert_eq!(questions, vec!["A1", "A2", "A10"]);

    assert_eq!(table.get(&class("05"), &QuestionId::new("A1")), Some(80.0));
    assert_eq!(table.get(&class("8"), &QuestionId::new("A2")), None);
    assert_eq!(table.get(&class("8"), &QuestionId::new("B2")), None);
}

#[test]
fn test_tiered_report_from_config_file() {
    let config = TierConfig::load(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/tiers.json"))
        .unwrap();
    let bytes = include_bytes!("fixtures/answers.csv");
    let report =
        accuracy_report("answers.csv", bytes, &AnalysisOptions::default(), Some(&config)).unwrap();

    let tiers = report.tiers.as_ref().unwrap();
    assert_eq!(tiers.len(), 2);
    assert_eq!(tiers[0].tier, "英才班");
    assert_eq!(tiers[0].classes, vec![class("1")]);
    assert_eq!(tiers[1].classes, vec![class("5")]);

    // 8班 sits in no tier: kept in the table, left out of the tiered chart.
    assert_eq!(report.unassigned_classes, vec![class("8")]);
    assert!(report.table.get(&class("8"), &QuestionId::new("A1")).is_some());
    let names: Vec<&str> = report.chart.series.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["1班（英才班）", "05班（实验班）"]);
    assert_eq!(report.chart.series[1].color.as_deref(), Some("#2980b9"));
}

#[test]
fn test_group_by_tier_on_averages() {
    let bytes = include_bytes!("fixtures/scores.csv");
    let report = average_report("scores.csv", bytes, &AnalysisOptions::default(), None).unwrap();
    let assignments = group_by_tier(report.averages.as_slice(), &TierConfig::default());

    let tiers: Vec<&str> = assignments.iter().map(|a| a.tier.as_str()).collect();
    assert_eq!(tiers, vec!["英才班", "实验班"]);
    assert_eq!(assignments[0].classes, vec![class("1"), class("2")]);
}

#[test]
fn test_wrong_sheet_is_invalid_input() {
    let bytes = include_bytes!("fixtures/answers.csv");
    let err = average_report("answers.csv", bytes, &AnalysisOptions::default(), None).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidInput(_)));
}

#[test]
fn test_all_zero_sheet_is_empty_result() {
    let csv = "班级,总分\n1,0\n2,0\n";
    let err = average_report("zeros.csv", csv.as_bytes(), &AnalysisOptions::default(), None)
        .unwrap_err();
    assert!(matches!(err, AnalysisError::EmptyResult(_)));
}

#[test]
fn test_normalized_labels_are_stable() {
    for raw in ["05", "5.0", "12班"] {
        let once = normalize_class_label(raw).unwrap();
        assert_eq!(normalize_class_label(&once).unwrap(), once);
    }
}

#[test]
fn test_class_averages_from_xlsx_workbook() {
    let bytes = include_bytes!("fixtures/scores.xlsx");
    let report = average_report(
        "scores.xlsx",
        bytes,
        &AnalysisOptions::default(),
        Some(&TierConfig::default()),
    )
    .unwrap();

    // Numeric class cells (stored as 1.0, 2.0) normalize like typed codes.
    let classes: Vec<&str> = report.averages.iter().map(|a| a.class.as_str()).collect();
    assert_eq!(classes, vec!["1班", "2班", "03班"]);
    assert_eq!(report.rows_read, 6);
    assert_eq!(report.averages[0].average, 612.0);
    assert_eq!(report.averages[0].count, 1);
    assert_eq!(report.averages[1].average, 553.0);
    assert_eq!(report.averages[2].average, 497.5);

    let tiers = report.tiers.unwrap();
    assert_eq!(tiers[0].classes, vec![class("1"), class("2")]);
    assert_eq!(tiers[1].classes, vec![class("3")]);
}

#[test]
fn test_corrupt_workbook_is_invalid_input() {
    let mut bytes = include_bytes!("fixtures/scores.xlsx").to_vec();
    bytes.truncate(64);
    let err = average_report("broken.xlsx", &bytes, &AnalysisOptions::default(), None).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidInput(_)));
}
