//! Class label normalization.
//!
//! Spreadsheets carry class codes as `"05"`, `5`, `5.0` or `"5班"`. Everything
//! that joins on classes goes through [`ClassLabel`] so the forms agree.

use std::cmp::Ordering;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{AnalysisError, Result};

/// Suffix of a canonical class label.
pub const CLASS_SUFFIX: &str = "班";

/// How strictly class codes are normalized while parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LabelPolicy {
    /// Every class code must be numeric; anything else is invalid input.
    #[default]
    Numeric,
    /// Numeric codes are normalized, other labels are kept as written.
    Verbatim,
}

/// Converts a numeric or string class code into the canonical `"<digits>班"`.
///
/// Digit strings keep their digits (`"05"` stays `"05班"`). Numeric exports
/// with a zero fraction collapse to the integer (`"5.0"` becomes `"5班"`).
/// Already canonical labels come back unchanged.
pub fn normalize_class_label(raw: &str) -> Result<String> {
    let (digits, _) = split_class_code(raw)?;
    Ok(format!("{digits}{CLASS_SUFFIX}"))
}

fn split_class_code(raw: &str) -> Result<(String, u32)> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_suffix(CLASS_SUFFIX)
        .unwrap_or(trimmed)
        .trim_end();

    if body.is_empty() {
        return Err(AnalysisError::invalid(format!(
            "empty class code '{raw}'"
        )));
    }

    if body.chars().all(|c| c.is_ascii_digit()) {
        let number = body
            .parse::<u32>()
            .map_err(|_| AnalysisError::invalid(format!("class code '{raw}' is out of range")))?;
        return Ok((body.to_string(), number));
    }

    match body.parse::<f64>() {
        Ok(value)
            if value.is_finite()
                && value >= 0.0
                && value.fract() == 0.0
                && value <= f64::from(u32::MAX) =>
        {
            let number = value as u32;
            Ok((number.to_string(), number))
        }
        _ => Err(AnalysisError::invalid(format!(
            "class code '{raw}' is not numeric"
        ))),
    }
}

/// A normalized class label.
///
/// Labels with a class number compare by that number, so `"05班"` and `"5班"`
/// are the same class and `"2班"` sorts before `"10班"`. Named labels (only
/// produced under [`LabelPolicy::Verbatim`]) sort after numbered ones.
#[derive(Debug, Clone)]
pub struct ClassLabel {
    text: String,
    number: Option<u32>,
}

impl ClassLabel {
    pub fn parse(raw: &str, policy: LabelPolicy) -> Result<Self> {
        match split_class_code(raw) {
            Ok((digits, number)) => Ok(Self {
                text: format!("{digits}{CLASS_SUFFIX}"),
                number: Some(number),
            }),
            Err(err) => match policy {
                LabelPolicy::Numeric => Err(err),
                LabelPolicy::Verbatim => {
                    let text = raw.trim();
                    if text.is_empty() {
                        return Err(err);
                    }
                    Ok(Self {
                        text: text.to_string(),
                        number: None,
                    })
                }
            },
        }
    }

    /// The label of class `number`, written without leading zeros.
    pub fn from_number(number: u32) -> Self {
        Self {
            text: format!("{number}{CLASS_SUFFIX}"),
            number: Some(number),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn number(&self) -> Option<u32> {
        self.number
    }
}

impl PartialEq for ClassLabel {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ClassLabel {}

impl PartialOrd for ClassLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClassLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.number, other.number) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.text.cmp(&other.text),
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for ClassLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}
