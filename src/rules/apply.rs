//! Column-wide rule application.
//!
//! Each field is cleaned independently from a read-only view of the input
//! table. Outcomes are collected in row order before anything is written, so
//! the serial and parallel paths produce identical tables and reports.

use super::{CleaningRule, OnError, RulePolicy};
use crate::error::{CleanError, Result, ValueError};
use crate::report::{CleanReport, IssueAction, RowIssue};
use crate::table::{ColumnKind, ColumnSpec, Header, Row, RowView, Table, Value};
use rayon::prelude::*;

/// Execution options for rule application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Clean rows on the rayon thread pool.
    pub parallel: bool,
}

enum Outcome {
    Unchanged,
    Replaced(Value),
    Missing(Value),
    Failed(String),
}

/// Apply `rule` to every value of `column`, serially.
///
/// # Errors
///
/// Returns [`SchemaError::UnknownColumn`](crate::error::SchemaError) if the
/// column does not exist, or the lowest-indexed [`ValueError`] when the
/// policy is [`OnError::Abort`].
pub fn apply_rule<R>(
    table: Table,
    column: &str,
    rule: &R,
    policy: &RulePolicy,
) -> Result<(Table, CleanReport)>
where
    R: CleaningRule + ?Sized,
{
    apply_rule_with(table, column, rule, policy, ExecOptions::default())
}

/// [`apply_rule`] with explicit execution options.
///
/// # Errors
///
/// Same as [`apply_rule`].
pub fn apply_rule_with<R>(
    table: Table,
    column: &str,
    rule: &R,
    policy: &RulePolicy,
    options: ExecOptions,
) -> Result<(Table, CleanReport)>
where
    R: CleaningRule + ?Sized,
{
    let kind = rule.output_kind().unwrap_or(ColumnKind::String);
    let spec = ColumnSpec::resolve(table.header(), column, kind)?;
    apply_resolved(table, &spec, rule, policy, options)
}

pub(crate) fn apply_resolved<R>(
    table: Table,
    spec: &ColumnSpec,
    rule: &R,
    policy: &RulePolicy,
    options: ExecOptions,
) -> Result<(Table, CleanReport)>
where
    R: CleaningRule + ?Sized,
{
    let header = table.header();
    let outcomes: Vec<Outcome> = if options.parallel {
        table
            .rows()
            .par_iter()
            .map(|row| clean_field(header, row, spec, rule, policy))
            .collect()
    } else {
        table
            .rows()
            .iter()
            .map(|row| clean_field(header, row, spec, rule, policy))
            .collect()
    };

    if policy.on_error == OnError::Abort
        && let Some((row, reason)) = outcomes.iter().enumerate().find_map(|(i, o)| match o {
            Outcome::Failed(reason) => Some((i, reason)),
            _ => None,
        })
    {
        let value = table
            .rows()
            .get(row)
            .and_then(|r| r.get(spec.index()))
            .map(ToString::to_string)
            .unwrap_or_default();
        return Err(CleanError::Value(ValueError {
            row,
            column: spec.name().to_owned(),
            value,
            reason: reason.clone(),
        }));
    }

    let mut report = CleanReport::default();
    let (header, mut rows) = table.into_parts();
    for (i, (row, outcome)) in rows.iter_mut().zip(outcomes).enumerate() {
        let Some(cell) = row.get_mut(spec.index()) else {
            continue;
        };
        match outcome {
            Outcome::Unchanged => {}
            Outcome::Replaced(v) => {
                report.transformed += 1;
                *cell = v;
            }
            Outcome::Missing(v) => {
                report.missing += 1;
                *cell = v;
            }
            Outcome::Failed(reason) => {
                let action = match policy.on_error {
                    OnError::Keep => IssueAction::Kept,
                    OnError::Sentinel | OnError::Abort => IssueAction::Sentinel,
                };
                report.issues.push(RowIssue {
                    step: None,
                    row: i,
                    column: spec.name().to_owned(),
                    rule: rule.name().to_owned(),
                    value: cell.to_string(),
                    reason,
                    action,
                });
                if action == IssueAction::Sentinel {
                    *cell = policy.sentinel();
                }
            }
        }
    }

    if !report.issues.is_empty() {
        tracing::warn!(
            column = spec.name(),
            rule = rule.name(),
            issues = report.issues.len(),
            "Some fields could not be cleaned"
        );
    }
    tracing::debug!(
        column = spec.name(),
        rule = rule.name(),
        transformed = report.transformed,
        missing = report.missing,
        "Applied rule"
    );

    Ok((Table::from_parts(header, rows), report))
}

fn clean_field<R>(
    header: &Header,
    row: &Row,
    spec: &ColumnSpec,
    rule: &R,
    policy: &RulePolicy,
) -> Outcome
where
    R: CleaningRule + ?Sized,
{
    let Some(value) = row.get(spec.index()) else {
        return Outcome::Unchanged;
    };
    // Nulls are already the result of an earlier missing/failure decision.
    if value.is_null() {
        return Outcome::Unchanged;
    }
    if let Some(missing) = &policy.missing
        && missing.is_missing(value)
    {
        return Outcome::Missing(missing.sentinel.clone());
    }
    match rule.clean(value, &RowView::new(header, row)) {
        Ok(cleaned) if cleaned == *value => Outcome::Unchanged,
        // A rule that declares its output kind must honour it
        Ok(cleaned) if rule.output_kind().is_some() && !spec.kind().admits(&cleaned) => {
            Outcome::Failed(format!(
                "rule produced a {} value, expected {}",
                cleaned.type_name(),
                spec.kind().as_str()
            ))
        }
        Ok(cleaned) => Outcome::Replaced(cleaned),
        Err(reason) => Outcome::Failed(reason),
    }
}
