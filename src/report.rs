//! Per-row issue reporting.
//!
//! Non-fatal field failures are never swallowed: each one becomes a
//! [`RowIssue`] saying where it happened, what the input was, and what was
//! written in its place.

use serde::Serialize;

/// What was done with a field that failed its rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueAction {
    /// The rule's sentinel was written.
    Sentinel,
    /// The original value was left in place.
    Kept,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    /// Pipeline step (zero-based) that raised the issue, when run from a pipeline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
    /// Row index within the table the rule ran on. Pipeline runs translate
    /// it to the row's position in the input table.
    pub row: usize,
    pub column: String,
    pub rule: String,
    pub value: String,
    pub reason: String,
    pub action: IssueAction,
}

/// Outcome counts plus every recorded issue for one or more rule applications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    /// Fields the rule rewrote successfully.
    pub transformed: usize,
    /// Fields matched as missing and replaced by the sentinel.
    pub missing: usize,
    pub issues: Vec<RowIssue>,
}

impl CleanReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Fold `other` into this report, tagging its issues with `step`.
    pub fn merge(&mut self, other: Self, step: Option<usize>) {
        self.transformed += other.transformed;
        self.missing += other.missing;
        self.issues
            .extend(other.issues.into_iter().map(|issue| RowIssue {
                step: issue.step.or(step),
                ..issue
            }));
    }

    /// Issue counts per column, sorted by column name.
    pub fn issues_by_column(&self) -> Vec<(String, usize)> {
        let mut counts = std::collections::BTreeMap::<&str, usize>::new();
        for issue in &self.issues {
            *counts.entry(issue.column.as_str()).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(c, n)| (c.to_owned(), n))
            .collect()
    }
}
