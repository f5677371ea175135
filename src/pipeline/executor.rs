//! Pipeline execution engine.
//!
//! Executes pipeline specs against an in-memory table, applying
//! transformations sequentially and generating detailed run reports.

use super::spec::PipelineSpec;
use super::validation::{CompiledCondition, CompiledExpr, CompiledStep, compile};
use crate::error::{CleanError, Result};
use crate::naming::sanitize_column_names;
use crate::report::CleanReport;
use crate::rules::{ExecOptions, apply::apply_resolved};
use crate::table::{self, ColumnSpec, RowView, Table, Value};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Report generated after pipeline execution
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Pipeline name from the spec
    pub pipeline: String,

    /// When execution started
    pub started_at: DateTime<Local>,

    /// Number of rows before processing
    pub rows_before: usize,

    /// Number of columns before processing
    pub columns_before: usize,

    /// Number of rows after processing
    pub rows_after: usize,

    /// Number of columns after processing
    pub columns_after: usize,

    /// Number of steps successfully applied
    pub steps_applied: usize,

    /// Field-level outcomes of every `clean` step
    pub cleaning: CleanReport,

    /// Warnings generated during execution
    pub warnings: Vec<String>,

    /// Time taken for execution
    pub duration: Duration,
}

impl RunReport {
    /// Create a summary message
    pub fn summary(&self) -> String {
        format!(
            "Pipeline '{}' completed: rows {} → {}, columns {} → {}, {} steps, {} fields cleaned, {} missing, {} issues, {:.2}s",
            self.pipeline,
            self.rows_before,
            self.rows_after,
            self.columns_before,
            self.columns_after,
            self.steps_applied,
            self.cleaning.transformed,
            self.cleaning.missing,
            self.cleaning.issues.len(),
            self.duration.as_secs_f64()
        )
    }
}

/// Execute a pipeline spec on an in-memory table.
///
/// The spec is validated against the table's header first; nothing runs if
/// any step refers to a column that will not exist at that point.
///
/// # Errors
///
/// Returns [`CleanError::Validation`](crate::error::CleanError::Validation)
/// if the spec does not fit the table, or the first fatal error raised by a
/// step (schema errors, or value errors under an `abort` policy).
pub fn run_pipeline(
    spec: &PipelineSpec,
    table: Table,
    options: ExecOptions,
) -> Result<(Table, RunReport)> {
    let start = Instant::now();
    let started_at = Local::now();

    let steps = compile(spec, table.header())?;

    let rows_before = table.row_count();
    let columns_before = table.column_count();
    let mut cleaning = CleanReport::default();
    let mut warnings = Vec::new();
    // Input row index of every row still in the table.
    let mut origin: Vec<usize> = (0..rows_before).collect();

    tracing::info!(
        pipeline = %spec.name,
        rows = rows_before,
        columns = columns_before,
        steps = steps.len(),
        parallel = options.parallel,
        "Running pipeline"
    );

    let mut table = table;
    for (idx, (step, source)) in steps.iter().zip(&spec.steps).enumerate() {
        let rows_in = table.row_count();
        table = apply_step(step, table, options, &mut cleaning, &mut origin, idx)?;

        tracing::debug!(
            step = idx + 1,
            op = source.op(),
            rows = table.row_count(),
            columns = table.column_count(),
            "Applied step"
        );
        if rows_in > 0 && table.is_empty() {
            warnings.push(format!("Step {}: {} removed every row", idx + 1, source.op()));
        }
    }

    if !cleaning.is_clean() {
        warnings.push(format!(
            "{} field(s) could not be cleaned; see the issue list",
            cleaning.issues.len()
        ));
    }

    let report = RunReport {
        pipeline: spec.name.clone(),
        started_at,
        rows_before,
        columns_before,
        rows_after: table.row_count(),
        columns_after: table.column_count(),
        steps_applied: steps.len(),
        cleaning,
        warnings,
        duration: start.elapsed(),
    };
    tracing::info!("{}", report.summary());

    Ok((table, report))
}

/// Apply a single compiled step.
///
/// Row indices in issues and value errors are translated through `origin`,
/// so they always point at the input table.
fn apply_step(
    step: &CompiledStep,
    table: Table,
    options: ExecOptions,
    cleaning: &mut CleanReport,
    origin: &mut Vec<usize>,
    idx: usize,
) -> Result<Table> {
    Ok(match step {
        CompiledStep::Drop(columns) => table::drop_columns(table, columns)?,

        CompiledStep::Select(columns) => table::select_columns(table, columns)?,

        CompiledStep::Rename(mapping) => table::rename(table, mapping.iter().cloned())?,

        CompiledStep::Standardize => {
            let names = table.header().names().to_vec();
            let renamed = sanitize_column_names(&names);
            table::rename(table, names.into_iter().zip(renamed))?
        }

        CompiledStep::Clean {
            targets,
            rule,
            policy,
        } => {
            let mut table = table;
            for target in targets {
                let (cleaned, mut report) = apply_resolved(table, target, rule, policy, options)
                    .map_err(|e| at_input_row(e, origin))?;
                for issue in &mut report.issues {
                    issue.row = input_row(origin, issue.row);
                }
                cleaning.merge(report, Some(idx));
                table = cleaned;
            }
            table
        }

        CompiledStep::Filter(condition) => {
            let keep: Vec<bool> = table.views().map(|row| condition.matches(&row)).collect();
            *origin = origin
                .iter()
                .zip(&keep)
                .filter_map(|(&row, &kept)| kept.then_some(row))
                .collect();
            table::retain_rows(table, &keep)
        }

        CompiledStep::Derive { name, expr } => {
            table::derive_column(table, name, |row| expr.eval(row))
                .map_err(|e| at_input_row(e, origin))?
        }
    })
}

fn input_row(origin: &[usize], row: usize) -> usize {
    origin.get(row).copied().unwrap_or(row)
}

fn at_input_row(err: CleanError, origin: &[usize]) -> CleanError {
    match err {
        CleanError::Value(mut e) => {
            e.row = input_row(origin, e.row);
            CleanError::Value(e)
        }
        other => other,
    }
}

impl CompiledCondition {
    fn matches(&self, row: &RowView<'_>) -> bool {
        match self {
            Self::Equals(column, value) => {
                cell(row, column).is_some_and(|v| loosely_equal(v, value))
            }
            Self::NotEquals(column, value) => {
                !cell(row, column).is_some_and(|v| loosely_equal(v, value))
            }
            Self::OneOf(column, values) => cell(row, column)
                .is_some_and(|v| values.iter().any(|candidate| loosely_equal(v, candidate))),
            Self::Between(column, min, max) => cell(row, column)
                .and_then(Value::as_f64)
                .is_some_and(|x| *min <= x && x <= *max),
            Self::NotNull(column) => cell(row, column).is_some_and(|v| !v.is_null()),
            Self::All(conditions) => conditions.iter().all(|c| c.matches(row)),
            Self::Any(conditions) => conditions.iter().any(|c| c.matches(row)),
            Self::Not(condition) => !condition.matches(row),
        }
    }
}

impl CompiledExpr {
    fn eval(&self, row: &RowView<'_>) -> std::result::Result<Value, String> {
        match self {
            Self::Constant(value) => Ok(value.clone()),
            Self::Copy(column) => Ok(cell(row, column).cloned().unwrap_or_default()),
            Self::Difference(left, right) => {
                let left = cell(row, left).unwrap_or(&Value::Null);
                let right = cell(row, right).unwrap_or(&Value::Null);
                match (left, right) {
                    (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                    (Value::Int(a), Value::Int(b)) => a
                        .checked_sub(*b)
                        .map(Value::Int)
                        .ok_or_else(|| format!("{a} - {b} overflows")),
                    (a, b) => match (a.as_f64(), b.as_f64()) {
                        (Some(a), Some(b)) => Ok(Value::Float(a - b)),
                        _ => Err(format!(
                            "cannot subtract {} from {}",
                            b.type_name(),
                            a.type_name()
                        )),
                    },
                }
            }
            Self::Sum(columns) => {
                let mut int_total: Option<i64> = Some(0);
                let mut float_total = 0.0;
                let mut seen = false;
                for column in columns {
                    match cell(row, column).unwrap_or(&Value::Null) {
                        Value::Null => continue,
                        Value::Int(i) => int_total = int_total.and_then(|t| t.checked_add(*i)),
                        Value::Float(_) => int_total = None,
                        other => {
                            return Err(format!(
                                "cannot sum {} in '{}'",
                                other.type_name(),
                                column.name()
                            ));
                        }
                    }
                    float_total += cell(row, column).and_then(Value::as_f64).unwrap_or_default();
                    seen = true;
                }
                Ok(match (seen, int_total) {
                    (false, _) => Value::Null,
                    (true, Some(total)) => Value::Int(total),
                    (true, None) => Value::Float(float_total),
                })
            }
            Self::AnyTrue(columns) => {
                let mut saw_null = false;
                for column in columns {
                    match cell(row, column).unwrap_or(&Value::Null) {
                        Value::Bool(true) => return Ok(Value::Bool(true)),
                        Value::Bool(false) => {}
                        Value::Null => saw_null = true,
                        other => {
                            return Err(format!(
                                "expected boolean in '{}', found {}",
                                column.name(),
                                other.type_name()
                            ));
                        }
                    }
                }
                Ok(if saw_null {
                    Value::Null
                } else {
                    Value::Bool(false)
                })
            }
            Self::FillNull(column, fill) => Ok(match cell(row, column) {
                None | Some(Value::Null) => fill.clone(),
                Some(value) => value.clone(),
            }),
        }
    }
}

fn cell<'a>(row: &RowView<'a>, column: &ColumnSpec) -> Option<&'a Value> {
    row.value(column)
}

/// Equality that treats `2` and `2.0` as the same number.
fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            a.as_f64() == b.as_f64()
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used)]
    use super::*;
    use crate::error::CleanError;
    use crate::pipeline::spec::{Condition, DeriveExpr, Step};
    use crate::rules::{MissingPolicy, OnError, Rule};
    use std::collections::BTreeMap;

    fn autos() -> Table {
        let header = ["dateCrawled", "name", "price", "odometer", "seller"];
        let rows = [
            ["2016-03-26", "Peugeot_807", "$5,000", "150,000km", "privat"],
            ["2016-04-04", "BMW_740i", "$8,500", "150,000km", "privat"],
            ["2016-03-26", "Volkswagen_Golf", "$8,990", "70,000km", "gewerblich"],
            ["2016-03-12", "Smart_smart", "$4,350", "70,000km", "privat"],
            ["2016-04-01", "Ford_Focus", "$1,2x0", "150,000km", "privat"],
            ["2016-03-21", "Chrysler", "", "125,000km", "privat"],
        ];
        table::load(
            rows.iter()
                .map(|r| r.iter().map(|&s| s.to_owned()).collect())
                .collect(),
            header.iter().map(|&s| s.to_owned()).collect(),
        )
        .unwrap()
    }

    fn autos_pipeline(on_error: OnError) -> PipelineSpec {
        PipelineSpec::new("autos")
            .step(Step::StandardizeNames)
            .step(Step::Clean {
                columns: vec!["price".to_owned()],
                rule: Rule::ToInteger {
                    strip: "$,".to_owned(),
                },
                missing: Some(MissingPolicy::empty_as_null()),
                on_error,
            })
            .step(Step::Clean {
                columns: vec!["odometer".to_owned()],
                rule: Rule::ToInteger {
                    strip: ",km".to_owned(),
                },
                missing: None,
                on_error: OnError::Abort,
            })
            .step(Step::RenameColumns {
                mapping: BTreeMap::from([("odometer".to_owned(), "odometer_km".to_owned())]),
            })
            .step(Step::Filter {
                condition: Condition::Not {
                    condition: Box::new(Condition::Equals {
                        column: "seller".to_owned(),
                        value: Value::from("gewerblich"),
                    }),
                },
            })
            .step(Step::DropColumns {
                columns: vec!["seller".to_owned()],
            })
    }

    #[test]
    fn test_run_autos_pipeline() {
        let (t, report) =
            run_pipeline(&autos_pipeline(OnError::Sentinel), autos(), ExecOptions::default())
                .unwrap();

        assert_eq!(
            t.header().names(),
            ["date_crawled", "name", "price", "odometer_km"]
        );
        assert_eq!(t.row_count(), 5);
        assert_eq!(t.value(0, "price"), Some(&Value::Int(5000)));
        assert_eq!(t.value(0, "odometer_km"), Some(&Value::Int(150_000)));
        // malformed price and empty price both end up null
        assert_eq!(t.value(3, "price"), Some(&Value::Null));
        assert_eq!(t.value(4, "price"), Some(&Value::Null));

        assert_eq!(report.rows_before, 6);
        assert_eq!(report.rows_after, 5);
        assert_eq!(report.columns_before, 5);
        assert_eq!(report.columns_after, 4);
        assert_eq!(report.steps_applied, 6);
        assert_eq!(report.cleaning.missing, 1);
        assert_eq!(report.cleaning.issues.len(), 1);

        let issue = report.cleaning.issues.first().unwrap();
        assert_eq!(issue.step, Some(1));
        assert_eq!(issue.row, 4);
        assert_eq!(issue.column, "price");
        assert_eq!(issue.value, "$1,2x0");
        assert_eq!(report.warnings.len(), 1);
        assert!(report.summary().contains("rows 6 → 5"));
    }

    fn private_listings() -> Step {
        Step::Filter {
            condition: Condition::Equals {
                column: "seller".to_owned(),
                value: Value::from("privat"),
            },
        }
    }

    fn clean_price(on_error: OnError) -> Step {
        Step::Clean {
            columns: vec!["price".to_owned()],
            rule: Rule::ToInteger {
                strip: "$,".to_owned(),
            },
            missing: None,
            on_error,
        }
    }

    #[test]
    fn test_issue_rows_point_at_input_after_filter() {
        let spec = PipelineSpec::new("autos")
            .step(private_listings())
            .step(clean_price(OnError::Sentinel));
        let (t, report) = run_pipeline(&spec, autos(), ExecOptions::default()).unwrap();

        // The dealer listing at input row 2 is gone, so the table is one row shorter
        assert_eq!(t.row_count(), 5);
        let rows: Vec<(usize, &str)> = report
            .cleaning
            .issues
            .iter()
            .map(|i| (i.row, i.value.as_str()))
            .collect();
        assert_eq!(rows, vec![(4, "$1,2x0"), (5, "")]);

        let spec = PipelineSpec::new("autos")
            .step(private_listings())
            .step(clean_price(OnError::Abort));
        let err = run_pipeline(&spec, autos(), ExecOptions { parallel: true })
            .err()
            .unwrap();
        assert_eq!(err.row(), Some(4));
    }

    #[test]
    fn test_derive_error_points_at_input_row() {
        let spec = PipelineSpec::new("autos")
            .step(Step::Filter {
                condition: Condition::NotEquals {
                    column: "name".to_owned(),
                    value: Value::from("Peugeot_807"),
                },
            })
            .step(Step::Derive {
                name: "gap".to_owned(),
                expr: DeriveExpr::Difference {
                    left: "name".to_owned(),
                    right: "seller".to_owned(),
                },
            });
        let err = run_pipeline(&spec, autos(), ExecOptions::default())
            .err()
            .unwrap();
        let CleanError::Value(err) = err else {
            panic!("expected value error");
        };
        assert_eq!(err.row, 1);
        assert_eq!(err.column, "gap");
    }

    #[test]
    fn test_abort_stops_pipeline() {
        let err = run_pipeline(&autos_pipeline(OnError::Abort), autos(), ExecOptions::default())
            .err()
            .unwrap();
        let CleanError::Value(err) = err else {
            panic!("expected value error");
        };
        assert_eq!(err.row, 4);
        assert_eq!(err.column, "price");
    }

    #[test]
    fn test_invalid_spec_does_not_run() {
        let spec = PipelineSpec::new("bad").step(Step::DropColumns {
            columns: vec!["mileage".to_owned()],
        });
        let err = run_pipeline(&spec, autos(), ExecOptions::default()).err().unwrap();
        assert!(matches!(err, CleanError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("mileage"));
    }

    #[test]
    fn test_parallel_run_matches_serial() {
        let spec = autos_pipeline(OnError::Keep);
        let (serial, serial_report) = run_pipeline(&spec, autos(), ExecOptions::default()).unwrap();
        let (parallel, parallel_report) =
            run_pipeline(&spec, autos(), ExecOptions { parallel: true }).unwrap();
        assert_eq!(serial, parallel);
        assert_eq!(serial_report.cleaning, parallel_report.cleaning);
    }

    fn survey() -> Table {
        let header = ["id", "cease_date", "start_date", "dissatisfied", "job_dissatisfaction"];
        let rows = vec![
            vec![Value::Int(1), Value::Int(2012), Value::Int(1984), Value::Bool(false), Value::Bool(true)],
            vec![Value::Int(2), Value::Int(2012), Value::Null, Value::Bool(false), Value::Bool(false)],
            vec![Value::Int(3), Value::Int(2013), Value::Int(2013), Value::Null, Value::Bool(false)],
            vec![Value::Int(4), Value::Float(2014.0), Value::Int(2010), Value::Bool(false), Value::Null],
        ];
        Table::from_rows(crate::table::Header::new(header).unwrap(), rows).unwrap()
    }

    #[test]
    fn test_derive_expressions() {
        let spec = PipelineSpec::new("survey")
            .step(Step::Derive {
                name: "institute_service".to_owned(),
                expr: DeriveExpr::Difference {
                    left: "cease_date".to_owned(),
                    right: "start_date".to_owned(),
                },
            })
            .step(Step::Derive {
                name: "any_dissatisfied".to_owned(),
                expr: DeriveExpr::AnyTrue {
                    columns: vec!["dissatisfied".to_owned(), "job_dissatisfaction".to_owned()],
                },
            })
            .step(Step::Derive {
                name: "institute".to_owned(),
                expr: DeriveExpr::Constant {
                    value: Value::from("DETE"),
                },
            })
            .step(Step::Derive {
                name: "start_filled".to_owned(),
                expr: DeriveExpr::FillNull {
                    column: "start_date".to_owned(),
                    value: Value::Int(0),
                },
            });

        let (t, report) = run_pipeline(&spec, survey(), ExecOptions::default()).unwrap();
        assert_eq!(report.columns_after, 9);
        let service: Vec<&Value> = t.column_values("institute_service").unwrap();
        assert_eq!(
            service,
            [&Value::Int(28), &Value::Null, &Value::Int(0), &Value::Float(4.0)]
        );
        let any: Vec<&Value> = t.column_values("any_dissatisfied").unwrap();
        assert_eq!(
            any,
            [&Value::Bool(true), &Value::Bool(false), &Value::Null, &Value::Null]
        );
        assert_eq!(t.value(2, "institute"), Some(&Value::from("DETE")));
        assert_eq!(t.value(1, "start_filled"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_filter_conditions() {
        let between = Condition::Between {
            column: "cease_date".to_owned(),
            min: 2012.0,
            max: 2013.0,
        };
        let spec = PipelineSpec::new("survey").step(Step::Filter {
            condition: Condition::All {
                conditions: vec![
                    between,
                    Condition::NotNull {
                        column: "start_date".to_owned(),
                    },
                    Condition::OneOf {
                        column: "id".to_owned(),
                        values: vec![Value::Float(1.0), Value::Int(3), Value::Int(4)],
                    },
                ],
            },
        });
        let (t, _) = run_pipeline(&spec, survey(), ExecOptions::default()).unwrap();
        let ids: Vec<&Value> = t.column_values("id").unwrap();
        assert_eq!(ids, [&Value::Int(1), &Value::Int(3)]);
    }

    #[test]
    fn test_sum_skips_nulls() {
        let spec = PipelineSpec::new("survey").step(Step::Derive {
            name: "total".to_owned(),
            expr: DeriveExpr::Sum {
                columns: vec!["cease_date".to_owned(), "start_date".to_owned()],
            },
        });
        let (t, _) = run_pipeline(&spec, survey(), ExecOptions::default()).unwrap();
        assert_eq!(t.value(0, "total"), Some(&Value::Int(3996)));
        assert_eq!(t.value(1, "total"), Some(&Value::Int(2012)));
        assert_eq!(t.value(3, "total"), Some(&Value::Float(4024.0)));
    }
}
