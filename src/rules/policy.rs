use crate::table::Value;
use serde::{Deserialize, Serialize};

/// Which inputs count as missing, and what replaces them.
///
/// Markers are compared exactly against string cells. Datasets disagree on
/// what "missing" looks like (`""`, `"-"`, `"NaN"`, `"Not Stated"`), so
/// nothing is assumed beyond what is listed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingPolicy {
    #[serde(default = "default_markers")]
    pub markers: Vec<String>,

    #[serde(default)]
    pub sentinel: Value,
}

impl MissingPolicy {
    pub fn new<S: Into<String>>(markers: impl IntoIterator<Item = S>, sentinel: Value) -> Self {
        Self {
            markers: markers.into_iter().map(Into::into).collect(),
            sentinel,
        }
    }

    /// Empty strings become `Null`.
    pub fn empty_as_null() -> Self {
        Self::new([""], Value::Null)
    }

    pub fn is_missing(&self, value: &Value) -> bool {
        value
            .as_str()
            .is_some_and(|s| self.markers.iter().any(|m| m == s))
    }
}

impl Default for MissingPolicy {
    fn default() -> Self {
        Self::empty_as_null()
    }
}

fn default_markers() -> Vec<String> {
    vec![String::new()]
}

/// What to do when a field fails its rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnError {
    /// Write the sentinel and record an issue.
    #[default]
    Sentinel,
    /// Leave the original value and record an issue.
    Keep,
    /// Fail the whole operation with a `ValueError`.
    Abort,
}

/// Missing-value and failure handling for one rule application.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RulePolicy {
    #[serde(default)]
    pub missing: Option<MissingPolicy>,

    #[serde(default)]
    pub on_error: OnError,
}

impl RulePolicy {
    pub fn abort() -> Self {
        Self {
            missing: None,
            on_error: OnError::Abort,
        }
    }

    pub fn with_missing(mut self, missing: MissingPolicy) -> Self {
        self.missing = Some(missing);
        self
    }

    /// Value written for a failed field under [`OnError::Sentinel`].
    pub fn sentinel(&self) -> Value {
        self.missing
            .as_ref()
            .map(|m| m.sentinel.clone())
            .unwrap_or_default()
    }
}
