//! Data types used by the aggregation pipeline.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::analyzers::labels::ClassLabel;

/// One student's row on the total-score path.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub student_id: Option<String>,
    pub class: ClassLabel,
    /// `None` when the cell was blank.
    pub total: Option<f64>,
}

/// One row on the question path: a class's correctness rate for a question.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRecord {
    pub class: ClassLabel,
    pub question: QuestionId,
    /// Always on the 0–100 scale.
    pub rate: f64,
}

/// A question identifier such as `A1`, ordered so that `A2` precedes `A10`.
#[derive(Debug, Clone)]
pub struct QuestionId(String);

impl QuestionId {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    fn sort_key(&self) -> (&str, Option<u64>, &str) {
        let split = self
            .0
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(self.0.len());
        let (head, rest) = self.0.split_at(split);
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let number = rest[..digits_end].parse::<u64>().ok();
        (head, number, &rest[digits_end..])
    }
}

impl PartialEq for QuestionId {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for QuestionId {}

impl PartialOrd for QuestionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QuestionId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for QuestionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Mean total score of one class, over its records with a positive total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassAverage {
    pub class: ClassLabel,
    pub average: f64,
    pub count: usize,
    pub stddev: f64,
}

/// Mean correctness rate keyed by (class, question).
///
/// Pairs with no matching rows are absent rather than zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionAccuracyTable {
    pub(crate) cells: BTreeMap<(ClassLabel, QuestionId), f64>,
}

impl QuestionAccuracyTable {
    pub fn get(&self, class: &ClassLabel, question: &QuestionId) -> Option<f64> {
        self.cells.get(&(class.clone(), question.clone())).copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Classes with at least one cell, ascending.
    pub fn classes(&self) -> Vec<&ClassLabel> {
        let mut classes: Vec<&ClassLabel> = self.cells.keys().map(|(c, _)| c).collect();
        classes.dedup();
        classes
    }

    /// Questions with at least one cell, in natural order.
    pub fn questions(&self) -> Vec<&QuestionId> {
        let mut questions: Vec<&QuestionId> = self.cells.keys().map(|(_, q)| q).collect();
        questions.sort();
        questions.dedup();
        questions
    }

    /// The row of `class` aligned with [`questions`](Self::questions).
    pub fn row(&self, class: &ClassLabel) -> Vec<Option<f64>> {
        self.questions()
            .into_iter()
            .map(|q| self.get(class, q))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClassLabel, &QuestionId, f64)> {
        self.cells.iter().map(|((c, q), v)| (c, q, *v))
    }
}

#[derive(Serialize)]
struct AccuracyCell<'a> {
    class: &'a ClassLabel,
    question: &'a QuestionId,
    rate: f64,
}

impl Serialize for QuestionAccuracyTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(|(class, question, rate)| AccuracyCell {
            class,
            question,
            rate,
        }))
    }
}

/// A configured tier together with the classes of it found in a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierAssignment {
    pub tier: String,
    pub color: String,
    pub classes: Vec<ClassLabel>,
}

/// A derived table whose rows are keyed by class.
pub trait ClassTable {
    /// Every class in the table, ascending.
    fn class_labels(&self) -> Vec<ClassLabel>;
}

impl ClassTable for QuestionAccuracyTable {
    fn class_labels(&self) -> Vec<ClassLabel> {
        self.classes().into_iter().cloned().collect()
    }
}

impl ClassTable for [ClassAverage] {
    fn class_labels(&self) -> Vec<ClassLabel> {
        let mut classes: Vec<ClassLabel> = self.iter().map(|a| a.class.clone()).collect();
        classes.sort();
        classes.dedup();
        classes
    }
}
