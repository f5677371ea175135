//! Pipeline specification validation and compilation.
//!
//! Validates pipeline specs against an input header before execution,
//! catching every error up front with actionable messages. The same
//! simulation of the header through each step resolves every column
//! reference to a [`ColumnSpec`], so the executor never looks a name up
//! again.

use super::spec::{Condition, DeriveExpr, PipelineSpec, SPEC_VERSION, SchemaMatchMode, Step};
use crate::error::{CleanError, Result};
use crate::naming::sanitize_column_names;
use crate::rules::{CleaningRule as _, Rule, RulePolicy};
use crate::table::{ColumnKind, ColumnSpec, Header, Value};
use chrono::format::{Item, StrftimeItems};
use serde::Serialize;
use std::collections::HashSet;

/// Validation error with helpful context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub step_index: Option<usize>,
    pub message: String,
}

impl ValidationError {
    fn new(step_index: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            step_index,
            message: message.into(),
        }
    }

    fn step(step_index: usize, message: impl Into<String>) -> Self {
        Self::new(Some(step_index), message)
    }

    fn schema(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(idx) = self.step_index {
            write!(f, "Step {}: {}", idx + 1, self.message)
        } else {
            write!(f, "Schema: {}", self.message)
        }
    }
}

/// A step with all of its column references resolved.
#[derive(Debug, Clone)]
pub(crate) enum CompiledStep {
    Drop(Vec<String>),
    Select(Vec<String>),
    Rename(Vec<(String, String)>),
    Standardize,
    Clean {
        targets: Vec<ColumnSpec>,
        rule: Rule,
        policy: RulePolicy,
    },
    Filter(CompiledCondition),
    Derive {
        name: String,
        expr: CompiledExpr,
    },
}

#[derive(Debug, Clone)]
pub(crate) enum CompiledCondition {
    Equals(ColumnSpec, Value),
    NotEquals(ColumnSpec, Value),
    OneOf(ColumnSpec, Vec<Value>),
    Between(ColumnSpec, f64, f64),
    NotNull(ColumnSpec),
    All(Vec<CompiledCondition>),
    Any(Vec<CompiledCondition>),
    Not(Box<CompiledCondition>),
}

#[derive(Debug, Clone)]
pub(crate) enum CompiledExpr {
    Constant(Value),
    Copy(ColumnSpec),
    Difference(ColumnSpec, ColumnSpec),
    Sum(Vec<ColumnSpec>),
    AnyTrue(Vec<ColumnSpec>),
    FillNull(ColumnSpec, Value),
}

/// Validate a pipeline spec against an input header.
///
/// Returns every problem found; an empty list means the spec can run.
pub fn validate_pipeline(spec: &PipelineSpec, header: &Header) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    plan(spec, header, &mut errors);
    errors
}

/// Resolve a pipeline spec against an input header.
///
/// # Errors
///
/// Returns [`CleanError::Validation`] with every problem
/// [`validate_pipeline`] would report.
pub(crate) fn compile(spec: &PipelineSpec, header: &Header) -> Result<Vec<CompiledStep>> {
    let mut errors = Vec::new();
    let steps = plan(spec, header, &mut errors);
    if errors.is_empty() {
        Ok(steps)
    } else {
        Err(CleanError::Validation(errors))
    }
}

fn plan(
    spec: &PipelineSpec,
    header: &Header,
    errors: &mut Vec<ValidationError>,
) -> Vec<CompiledStep> {
    if spec.version != SPEC_VERSION {
        errors.push(ValidationError::schema(format!(
            "Unsupported spec version '{}', expected '{SPEC_VERSION}'",
            spec.version
        )));
    }

    validate_schema_requirements(spec, header, errors);

    // Simulate step-by-step execution to track column positions
    let mut columns: Vec<String> = header.names().to_vec();
    let mut compiled = Vec::with_capacity(spec.steps.len());
    for (idx, step) in spec.steps.iter().enumerate() {
        let mut sim = Simulator {
            idx,
            columns: &mut columns,
            errors: &mut *errors,
        };
        if let Some(step) = sim.step(step) {
            compiled.push(step);
        }
    }
    compiled
}

/// Validate schema matching requirements
fn validate_schema_requirements(
    spec: &PipelineSpec,
    header: &Header,
    errors: &mut Vec<ValidationError>,
) {
    for required in &spec.schema.required_columns {
        if !header.contains(required) {
            errors.push(ValidationError::schema(format!(
                "Required column '{required}' not found in input"
            )));
        }
    }

    // Strict mode: no extra columns allowed
    if spec.schema.match_mode == SchemaMatchMode::Strict {
        let required: HashSet<&str> = spec
            .schema
            .required_columns
            .iter()
            .map(String::as_str)
            .collect();
        let extra: Vec<&str> = header
            .names()
            .iter()
            .map(String::as_str)
            .filter(|c| !required.contains(c))
            .collect();

        if !extra.is_empty() {
            errors.push(ValidationError::schema(format!(
                "Strict mode: unexpected columns found: {extra:?}"
            )));
        }
    }
}

fn is_valid_date_format(pattern: &str) -> bool {
    !pattern.is_empty() && !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

struct Simulator<'a> {
    idx: usize,
    columns: &'a mut Vec<String>,
    errors: &'a mut Vec<ValidationError>,
}

impl Simulator<'_> {
    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(ValidationError::step(self.idx, message));
    }

    fn resolve(&mut self, name: &str, kind: ColumnKind, operation: &str) -> Option<ColumnSpec> {
        match self.columns.iter().position(|c| c == name) {
            Some(index) => Some(ColumnSpec::at(name, index, kind)),
            None => {
                self.error(format!("Cannot {operation} non-existent column '{name}'"));
                None
            }
        }
    }

    fn resolve_all(
        &mut self,
        names: &[String],
        kind: ColumnKind,
        operation: &str,
    ) -> Option<Vec<ColumnSpec>> {
        let resolved: Vec<Option<ColumnSpec>> = names
            .iter()
            .map(|n| self.resolve(n, kind, operation))
            .collect();
        resolved.into_iter().collect()
    }

    /// Validate one step, update the simulated header, and return the
    /// compiled step when it is valid.
    fn step(&mut self, step: &Step) -> Option<CompiledStep> {
        match step {
            Step::DropColumns { columns } => {
                let known: Vec<String> = columns
                    .iter()
                    .filter(|c| self.resolve(c, ColumnKind::String, "drop").is_some())
                    .cloned()
                    .collect();
                self.columns.retain(|c| !known.contains(c));
                (known.len() == columns.len()).then_some(CompiledStep::Drop(known))
            }

            Step::SelectColumns { columns } => {
                let resolved = self.resolve_all(columns, ColumnKind::String, "select");
                let mut seen = HashSet::new();
                let mut unique = true;
                for c in columns {
                    if !seen.insert(c.as_str()) {
                        self.error(format!("Column '{c}' is selected more than once"));
                        unique = false;
                    }
                }
                resolved?;
                if !unique {
                    return None;
                }
                self.columns.clone_from(columns);
                Some(CompiledStep::Select(columns.clone()))
            }

            Step::RenameColumns { mapping } => {
                let mut ok = true;
                for from in mapping.keys() {
                    ok &= self.resolve(from, ColumnKind::String, "rename").is_some();
                }
                let renamed: Vec<String> = self
                    .columns
                    .iter()
                    .map(|c| mapping.get(c).unwrap_or(c).clone())
                    .collect();
                let mut seen = HashSet::new();
                for name in &renamed {
                    if !seen.insert(name.as_str()) {
                        self.error(format!("Cannot rename to '{name}': name already in use"));
                        ok = false;
                    }
                }
                if !ok {
                    return None;
                }
                *self.columns = renamed;
                Some(CompiledStep::Rename(
                    mapping
                        .iter()
                        .map(|(a, b)| (a.clone(), b.clone()))
                        .collect(),
                ))
            }

            Step::StandardizeNames => {
                *self.columns = sanitize_column_names(self.columns.as_slice());
                Some(CompiledStep::Standardize)
            }

            Step::Clean { columns, rule, .. } => {
                if columns.is_empty() {
                    self.error("Clean step lists no columns");
                }
                self.check_rule(rule);
                let kind = rule.output_kind().unwrap_or_default();
                let targets = self.resolve_all(columns, kind, "clean")?;
                (!columns.is_empty()).then(|| CompiledStep::Clean {
                    targets,
                    rule: rule.clone(),
                    policy: step.policy().unwrap_or_default(),
                })
            }

            Step::Filter { condition } => self.condition(condition).map(CompiledStep::Filter),

            Step::Derive { name, expr } => {
                if self.columns.contains(name) {
                    self.error(format!("Cannot derive '{name}': column already exists"));
                    return None;
                }
                let expr = self.expr(expr)?;
                self.columns.push(name.clone());
                Some(CompiledStep::Derive {
                    name: name.clone(),
                    expr,
                })
            }
        }
    }

    fn check_rule(&mut self, rule: &Rule) {
        match rule {
            Rule::Bucket { buckets } if buckets.is_empty() => {
                self.error("Bucket rule needs at least one bucket");
            }
            Rule::SplitPart { separator, .. } if separator.is_empty() => {
                self.error("Split separator must not be empty");
            }
            Rule::Replace { from, .. } if from.is_empty() => {
                self.error("Replace pattern must not be empty");
            }
            Rule::ParseDate { format, output } => {
                for pattern in std::iter::once(format).chain(output) {
                    if !is_valid_date_format(pattern) {
                        self.error(format!("Invalid date format '{pattern}'"));
                    }
                }
            }
            _ => {}
        }
    }

    fn condition(&mut self, condition: &Condition) -> Option<CompiledCondition> {
        let kind = ColumnKind::String;
        match condition {
            Condition::Equals { column, value } => Some(CompiledCondition::Equals(
                self.resolve(column, kind, "filter on")?,
                value.clone(),
            )),
            Condition::NotEquals { column, value } => Some(CompiledCondition::NotEquals(
                self.resolve(column, kind, "filter on")?,
                value.clone(),
            )),
            Condition::OneOf { column, values } => Some(CompiledCondition::OneOf(
                self.resolve(column, kind, "filter on")?,
                values.clone(),
            )),
            Condition::Between { column, min, max } => {
                let spec = self.resolve(column, ColumnKind::Float, "filter on");
                if min > max {
                    self.error(format!("Empty range: min {min} is greater than max {max}"));
                    return None;
                }
                Some(CompiledCondition::Between(spec?, *min, *max))
            }
            Condition::NotNull { column } => Some(CompiledCondition::NotNull(
                self.resolve(column, kind, "filter on")?,
            )),
            Condition::All { conditions } => self.conditions(conditions).map(CompiledCondition::All),
            Condition::Any { conditions } => self.conditions(conditions).map(CompiledCondition::Any),
            Condition::Not { condition } => self
                .condition(condition)
                .map(|c| CompiledCondition::Not(Box::new(c))),
        }
    }

    fn conditions(&mut self, conditions: &[Condition]) -> Option<Vec<CompiledCondition>> {
        let compiled: Vec<Option<CompiledCondition>> =
            conditions.iter().map(|c| self.condition(c)).collect();
        compiled.into_iter().collect()
    }

    fn expr(&mut self, expr: &DeriveExpr) -> Option<CompiledExpr> {
        let op = "derive from";
        match expr {
            DeriveExpr::Constant { value } => Some(CompiledExpr::Constant(value.clone())),
            DeriveExpr::Copy { column } => Some(CompiledExpr::Copy(self.resolve(
                column,
                ColumnKind::String,
                op,
            )?)),
            DeriveExpr::Difference { left, right } => {
                let left = self.resolve(left, ColumnKind::Float, op);
                let right = self.resolve(right, ColumnKind::Float, op);
                Some(CompiledExpr::Difference(left?, right?))
            }
            DeriveExpr::Sum { columns } => {
                if columns.is_empty() {
                    self.error("Sum needs at least one column");
                }
                let specs = self.resolve_all(columns, ColumnKind::Float, op)?;
                (!specs.is_empty()).then_some(CompiledExpr::Sum(specs))
            }
            DeriveExpr::AnyTrue { columns } => {
                if columns.is_empty() {
                    self.error("Any-true needs at least one column");
                }
                let specs = self.resolve_all(columns, ColumnKind::Boolean, op)?;
                (!specs.is_empty()).then_some(CompiledExpr::AnyTrue(specs))
            }
            DeriveExpr::FillNull { column, value } => Some(CompiledExpr::FillNull(
                self.resolve(column, ColumnKind::String, op)?,
                value.clone(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used)]
    use super::*;
    use crate::pipeline::spec::SchemaConfig;
    use crate::rules::OnError;
    use std::collections::BTreeMap;

    fn header() -> Header {
        Header::new(["id", "name", "price"]).unwrap()
    }

    fn spec(steps: Vec<Step>) -> PipelineSpec {
        PipelineSpec {
            steps,
            ..PipelineSpec::new("test")
        }
    }

    fn clean(columns: &[&str], rule: Rule) -> Step {
        Step::Clean {
            columns: columns.iter().map(|&c| c.to_owned()).collect(),
            rule,
            missing: None,
            on_error: OnError::Sentinel,
        }
    }

    #[test]
    fn test_validate_drop_columns() {
        let spec = spec(vec![Step::DropColumns {
            columns: vec!["id".to_owned(), "nonexistent".to_owned()],
        }]);

        let errors = validate_pipeline(&spec, &header());

        assert_eq!(errors.len(), 1);
        assert!(errors.first().unwrap().message.contains("nonexistent"));
    }

    #[test]
    fn test_validate_rename_conflict() {
        let mapping = BTreeMap::from([("id".to_owned(), "name".to_owned())]);
        let spec = spec(vec![Step::RenameColumns { mapping }]);

        let errors = validate_pipeline(&spec, &header());

        assert_eq!(errors.len(), 1);
        assert!(errors.first().unwrap().message.contains("already in use"));
    }

    #[test]
    fn test_validate_rename_swap_is_allowed() {
        let mapping = BTreeMap::from([
            ("id".to_owned(), "name".to_owned()),
            ("name".to_owned(), "id".to_owned()),
        ]);
        let spec = spec(vec![Step::RenameColumns { mapping }]);
        assert!(validate_pipeline(&spec, &header()).is_empty());
    }

    #[test]
    fn test_validate_schema_requirements() {
        let spec = PipelineSpec {
            schema: SchemaConfig {
                match_mode: SchemaMatchMode::Strict,
                required_columns: vec!["id".to_owned(), "missing".to_owned()],
            },
            ..PipelineSpec::new("test")
        };

        let errors = validate_pipeline(&spec, &header());

        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.message.contains("'missing'")));
        assert!(errors.iter().any(|e| e.message.contains("Strict mode")));
        assert!(errors.iter().all(|e| e.step_index.is_none()));
    }

    #[test]
    fn test_validate_tracks_header_through_steps() {
        let spec = spec(vec![
            Step::RenameColumns {
                mapping: BTreeMap::from([("price".to_owned(), "price_usd".to_owned())]),
            },
            // old name is gone after the rename
            clean(&["price"], Rule::Trim),
            clean(&["price_usd"], Rule::Trim),
            Step::Derive {
                name: "source".to_owned(),
                expr: DeriveExpr::Constant {
                    value: Value::from("DETE"),
                },
            },
            Step::SelectColumns {
                columns: vec!["source".to_owned(), "id".to_owned()],
            },
            // dropped by the select
            clean(&["name"], Rule::Trim),
        ]);

        let errors = validate_pipeline(&spec, &header());
        let steps: Vec<Option<usize>> = errors.iter().map(|e| e.step_index).collect();
        assert_eq!(steps, vec![Some(1), Some(5)]);
        assert_eq!(
            errors.first().unwrap().to_string(),
            "Step 2: Cannot clean non-existent column 'price'"
        );
    }

    #[test]
    fn test_validate_derive_collision_and_bad_range() {
        let spec = spec(vec![
            Step::Derive {
                name: "price".to_owned(),
                expr: DeriveExpr::Copy {
                    column: "id".to_owned(),
                },
            },
            Step::Filter {
                condition: Condition::Between {
                    column: "price".to_owned(),
                    min: 10.0,
                    max: 1.0,
                },
            },
        ]);
        let errors = validate_pipeline(&spec, &header());
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_validate_version() {
        let spec = PipelineSpec {
            version: "9.9".to_owned(),
            ..PipelineSpec::new("test")
        };
        let errors = validate_pipeline(&spec, &header());
        assert_eq!(errors.len(), 1);
        assert!(errors.first().unwrap().message.contains("9.9"));
    }

    #[test]
    fn test_validate_date_formats() {
        let spec = spec(vec![
            clean(
                &["name"],
                Rule::ParseDate {
                    format: "%m/%d/%Y %H:%M".to_owned(),
                    output: Some("%Q".to_owned()),
                },
            ),
            clean(
                &["price"],
                Rule::ParseDate {
                    format: String::new(),
                    output: None,
                },
            ),
        ]);
        let errors = validate_pipeline(&spec, &header());
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.first().unwrap().step_index, Some(0));
        assert!(errors.first().unwrap().message.contains("'%Q'"));
    }

    #[test]
    fn test_compile_resolves_positions_after_standardize() {
        let header = Header::new(["dateCrawled", "Price", "odometer"]).unwrap();
        let spec = spec(vec![
            Step::StandardizeNames,
            Step::DropColumns {
                columns: vec!["date_crawled".to_owned()],
            },
            clean(
                &["odometer"],
                Rule::ToInteger {
                    strip: ",km".to_owned(),
                },
            ),
        ]);
        let steps = compile(&spec, &header).unwrap();
        let Some(CompiledStep::Clean { targets, .. }) = steps.get(2) else {
            panic!("expected clean step");
        };
        let target = targets.first().unwrap();
        assert_eq!(target.index(), 1);
        assert_eq!(target.kind(), ColumnKind::Integer);
    }

    #[test]
    fn test_compile_fails_with_all_errors() {
        let spec = spec(vec![
            clean(&["nope"], Rule::Trim),
            clean(&["id"], Rule::Bucket { buckets: vec![] }),
        ]);
        let Err(CleanError::Validation(errors)) = compile(&spec, &header()) else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 2);
    }
}
