//! Score aggregation.
//!
//! Filters typed score rows, groups them by class, pivots single-choice
//! question rates into a (class × question) table and splits classes into
//! the configured tiers.

pub mod aggregate;
pub mod labels;
pub mod tiers;
pub mod types;
pub mod utility;

pub use aggregate::{DEFAULT_QUESTION_PREFIX, compute_class_averages, compute_question_accuracy};
pub use labels::{ClassLabel, LabelPolicy, normalize_class_label};
pub use tiers::{group_by_tier, unassigned_classes};
pub use types::{
    AnswerRecord, ClassAverage, ClassTable, QuestionAccuracyTable, QuestionId, ScoreRecord,
    TierAssignment,
};
