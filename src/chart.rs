//! Renderer-neutral chart descriptions.
//!
//! A [`ChartSpec`] carries everything a plotting front end needs (title, axis
//! names, categories, series values, colors and value labels) and serializes
//! to JSON for embedding.

use serde::Serialize;

use crate::analyzers::types::{ClassAverage, QuestionAccuracyTable, TierAssignment};
use crate::analyzers::utility::round2;

pub const AVERAGE_CHART_TITLE: &str = "各班平均总分（剔除0分学生）";
pub const ACCURACY_CHART_TITLE: &str = "各班单选题得分率";
pub const TIERED_ACCURACY_CHART_TITLE: &str = "分层单选题得分率";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Aligned with [`ChartSpec::categories`]; `None` leaves a gap.
    pub values: Vec<Option<f64>>,
    /// Value labels drawn above each point, two decimals.
    pub labels: Vec<Option<String>>,
}

impl ChartSeries {
    fn new(name: impl Into<String>, color: Option<String>, values: Vec<Option<f64>>) -> Self {
        let labels = values
            .iter()
            .map(|v| v.map(|v| format!("{v:.2}")))
            .collect();
        Self {
            name: name.into(),
            color,
            values: values.into_iter().map(|v| v.map(round2)).collect(),
            labels,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_axis: String,
    pub y_axis: String,
    pub categories: Vec<String>,
    pub series: Vec<ChartSeries>,
}

/// Bar chart of the class averages.
///
/// Without tiers there is a single series over every class. With tiers the
/// categories are the tiered classes in tier order and each tier becomes its
/// own colored series, empty outside its classes.
pub fn class_average_chart(
    averages: &[ClassAverage],
    tiers: Option<&[TierAssignment]>,
) -> ChartSpec {
    let (categories, series) = match tiers {
        None => {
            let categories = averages.iter().map(|a| a.class.to_string()).collect();
            let values = averages.iter().map(|a| Some(a.average)).collect();
            (categories, vec![ChartSeries::new("平均总分", None, values)])
        }
        Some(tiers) => {
            let ordered: Vec<&ClassAverage> = tiers
                .iter()
                .flat_map(|t| t.classes.iter())
                .filter_map(|class| averages.iter().find(|a| &a.class == class))
                .collect();
            let categories = ordered.iter().map(|a| a.class.to_string()).collect();
            let series = tiers
                .iter()
                .map(|tier| {
                    let values = ordered
                        .iter()
                        .map(|a| tier.classes.contains(&a.class).then_some(a.average))
                        .collect();
                    ChartSeries::new(tier.tier.clone(), Some(tier.color.clone()), values)
                })
                .collect();
            (categories, series)
        }
    };

    ChartSpec {
        kind: ChartKind::Bar,
        title: AVERAGE_CHART_TITLE.to_string(),
        x_axis: "班级".to_string(),
        y_axis: "平均总分".to_string(),
        categories,
        series,
    }
}

fn question_axis(table: &QuestionAccuracyTable) -> Vec<String> {
    table.questions().iter().map(|q| q.to_string()).collect()
}

/// One line per class across the question axis.
pub fn accuracy_chart(table: &QuestionAccuracyTable) -> ChartSpec {
    let series = table
        .classes()
        .into_iter()
        .map(|class| ChartSeries::new(class.to_string(), None, table.row(class)))
        .collect();

    ChartSpec {
        kind: ChartKind::Line,
        title: ACCURACY_CHART_TITLE.to_string(),
        x_axis: "题号".to_string(),
        y_axis: "得分率（%）".to_string(),
        categories: question_axis(table),
        series,
    }
}

/// Like [`accuracy_chart`], restricted to tiered classes and colored by tier.
pub fn tiered_accuracy_chart(
    table: &QuestionAccuracyTable,
    assignments: &[TierAssignment],
) -> ChartSpec {
    let series = assignments
        .iter()
        .flat_map(|tier| {
            tier.classes.iter().map(move |class| {
                ChartSeries::new(
                    format!("{class}（{}）", tier.tier),
                    Some(tier.color.clone()),
                    table.row(class),
                )
            })
        })
        .collect();

    ChartSpec {
        kind: ChartKind::Line,
        title: TIERED_ACCURACY_CHART_TITLE.to_string(),
        x_axis: "题号".to_string(),
        y_axis: "得分率（%）".to_string(),
        categories: question_axis(table),
        series,
    }
}
