//! Pipeline specification data structures.
//!
//! Defines the JSON schema for pipeline specs: schema requirements, the
//! ordered transformation steps, row conditions and derived-column
//! expressions.

use crate::error::{CleanError, Result, ResultExt as _};
use crate::rules::{MissingPolicy, OnError, Rule, RulePolicy};
use crate::table::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Current pipeline spec version
pub const SPEC_VERSION: &str = "0.1";

/// Root pipeline specification structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Specification version for future migrations
    pub version: String,

    /// Human-readable pipeline name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Schema validation rules
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Ordered sequence of transformation steps
    pub steps: Vec<Step>,
}

impl PipelineSpec {
    /// Create an empty pipeline spec at the current version
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: SPEC_VERSION.to_owned(),
            name: name.into(),
            description: None,
            schema: SchemaConfig::default(),
            steps: Vec::new(),
        }
    }

    /// Append a step, builder style
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Load a pipeline spec from a JSON file
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid spec.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline spec {}", path.display()))?;
        Self::from_json(&content)
    }

    /// Parse a pipeline spec from JSON string
    ///
    /// # Errors
    ///
    /// Returns [`CleanError::Config`] for malformed JSON or unknown step types.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CleanError::Config(format!("Invalid pipeline spec: {e}")))
    }

    /// Save pipeline spec to a JSON file
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path.as_ref(), json).context("Failed to write pipeline spec file")
    }

    /// Serialize pipeline spec to JSON string
    ///
    /// # Errors
    ///
    /// Only fails if a value cannot be represented in JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Schema validation configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Schema matching mode
    #[serde(default)]
    pub match_mode: SchemaMatchMode,

    /// Required column names
    #[serde(default)]
    pub required_columns: Vec<String>,
}

/// Schema matching mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchemaMatchMode {
    /// Required columns must exist, allow extra columns
    #[default]
    Tolerant,

    /// Exact match: required columns only, no extras
    Strict,
}

/// Transformation step (tagged enum)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Drop specified columns
    DropColumns { columns: Vec<String> },

    /// Keep only the specified columns, in the given order
    SelectColumns { columns: Vec<String> },

    /// Rename columns according to mapping (applied simultaneously)
    RenameColumns { mapping: BTreeMap<String, String> },

    /// Convert every column name to unique `snake_case`
    StandardizeNames,

    /// Apply a cleaning rule to each listed column
    Clean {
        columns: Vec<String>,
        rule: Rule,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        missing: Option<MissingPolicy>,
        #[serde(default)]
        on_error: OnError,
    },

    /// Keep only rows matching the condition
    Filter { condition: Condition },

    /// Append a column computed from each row
    Derive { name: String, expr: DeriveExpr },
}

impl Step {
    /// Short operation name, as it appears in JSON
    pub fn op(&self) -> &'static str {
        match self {
            Self::DropColumns { .. } => "drop_columns",
            Self::SelectColumns { .. } => "select_columns",
            Self::RenameColumns { .. } => "rename_columns",
            Self::StandardizeNames => "standardize_names",
            Self::Clean { .. } => "clean",
            Self::Filter { .. } => "filter",
            Self::Derive { .. } => "derive",
        }
    }

    /// Rule policy of a `clean` step
    pub fn policy(&self) -> Option<RulePolicy> {
        match self {
            Self::Clean {
                missing, on_error, ..
            } => Some(RulePolicy {
                missing: missing.clone(),
                on_error: *on_error,
            }),
            _ => None,
        }
    }
}

/// Row predicate used by `filter` steps.
///
/// ```json
/// { "test": "between", "column": "price", "min": 100, "max": 350000 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum Condition {
    Equals { column: String, value: Value },
    NotEquals { column: String, value: Value },
    OneOf { column: String, values: Vec<Value> },
    /// Inclusive numeric range. Non-numeric and null values never match.
    Between { column: String, min: f64, max: f64 },
    NotNull { column: String },
    All { conditions: Vec<Condition> },
    Any { conditions: Vec<Condition> },
    Not { condition: Box<Condition> },
}

impl Condition {
    /// Every column the condition reads, in order of appearance.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Equals { column, .. }
            | Self::NotEquals { column, .. }
            | Self::OneOf { column, .. }
            | Self::Between { column, .. }
            | Self::NotNull { column } => out.push(column),
            Self::All { conditions } | Self::Any { conditions } => {
                for c in conditions {
                    c.collect_columns(out);
                }
            }
            Self::Not { condition } => condition.collect_columns(out),
        }
    }
}

/// Expression computing a derived column.
///
/// ```json
/// { "kind": "difference", "left": "cease_date", "right": "start_date" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeriveExpr {
    /// The same value on every row
    Constant { value: Value },

    /// Copy of another column
    Copy { column: String },

    /// `left - right`; null if either side is null
    Difference { left: String, right: String },

    /// Sum of the listed columns, skipping nulls; null if all are null
    Sum { columns: Vec<String> },

    /// True if any column is true, else null if any is null, else false
    AnyTrue { columns: Vec<String> },

    /// The column's value, or `value` where it is null
    FillNull { column: String, value: Value },
}

impl DeriveExpr {
    /// Every column the expression reads.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Self::Constant { .. } => Vec::new(),
            Self::Copy { column } | Self::FillNull { column, .. } => vec![column],
            Self::Difference { left, right } => vec![left, right],
            Self::Sum { columns } | Self::AnyTrue { columns } => {
                columns.iter().map(String::as_str).collect()
            }
        }
    }
}
