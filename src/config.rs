//! Runtime settings and the fixed tier configuration.

use std::env;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::analyzers::labels::{ClassLabel, LabelPolicy};
use crate::error::AnalysisError;

/// Settings read from the environment (and `.env`, loaded by the binary).
#[derive(Debug, Clone)]
pub struct Settings {
    pub log_file_path: String,
    pub tiers_config: Option<String>,
    pub output_dir: String,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            log_file_path: env::var("LOG_FILE_PATH")
                .unwrap_or_else(|_| "logs/class_score_report.log".to_string()),
            tiers_config: env::var("TIERS_CONFIG").ok().filter(|p| !p.is_empty()),
            output_dir: env::var("REPORT_OUTPUT_DIR").unwrap_or_else(|_| "reports".to_string()),
        }
    }
}

/// Column names looked up in the header row of an uploaded sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    pub class: String,
    pub total: String,
    pub question: String,
    pub rate: String,
    pub student_id: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            class: "班级".to_string(),
            total: "总分".to_string(),
            question: "题号".to_string(),
            rate: "得分率".to_string(),
            student_id: "考号".to_string(),
        }
    }
}

/// A named group of comparable classes and its display color.
#[derive(Debug, Clone, PartialEq)]
pub struct Tier {
    pub name: String,
    pub color: String,
    pub classes: Vec<ClassLabel>,
}

#[derive(Deserialize)]
struct RawTier {
    name: String,
    color: String,
    classes: Vec<String>,
}

#[derive(Deserialize)]
struct RawTierConfig {
    tiers: Vec<RawTier>,
}

/// Ordered, immutable tier configuration.
///
/// Stored on disk as JSON:
/// ```json
/// {
///   "tiers": [
///     { "name": "英才班", "color": "#d62728", "classes": ["1", "2"] },
///     { "name": "实验班", "color": "#1f77b4", "classes": ["3", "4", "5"] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TierConfig {
    tiers: Vec<Tier>,
}

impl TierConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read tier config '{path}'"))?;
        let config = Self::from_json(&content)
            .with_context(|| format!("invalid tier config '{path}'"))?;
        Ok(config)
    }

    /// Parses and validates a JSON tier config.
    ///
    /// Class labels are normalized the same way as uploaded data; a class may
    /// belong to one tier at most.
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: RawTierConfig = serde_json::from_str(content)?;
        let mut seen: Vec<ClassLabel> = Vec::new();
        let mut tiers = Vec::with_capacity(raw.tiers.len());

        for raw_tier in raw.tiers {
            if raw_tier.name.trim().is_empty() {
                return Err(AnalysisError::invalid("tier with an empty name").into());
            }

            let mut classes = Vec::with_capacity(raw_tier.classes.len());
            for code in &raw_tier.classes {
                let label = ClassLabel::parse(code, LabelPolicy::Verbatim)?;
                if seen.contains(&label) {
                    return Err(AnalysisError::invalid(format!(
                        "class '{label}' is listed in more than one tier"
                    ))
                    .into());
                }
                seen.push(label.clone());
                classes.push(label);
            }

            tiers.push(Tier {
                name: raw_tier.name,
                color: raw_tier.color,
                classes,
            });
        }

        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// The tier a class belongs to, if any.
    pub fn tier_of(&self, class: &ClassLabel) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.classes.contains(class))
    }

    /// Resolves the configuration: an explicit path first, then the built-in tiers.
    pub fn resolve(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

fn builtin_tier(name: &str, color: &str, numbers: &[u32]) -> Tier {
    Tier {
        name: name.to_string(),
        color: color.to_string(),
        classes: numbers.iter().copied().map(ClassLabel::from_number).collect(),
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                builtin_tier("英才班", "#d62728", &[1, 2]),
                builtin_tier("实验班", "#1f77b4", &[3, 4, 5]),
                builtin_tier("普通班", "#2ca02c", &[6, 7, 9, 10]),
            ],
        }
    }
}
