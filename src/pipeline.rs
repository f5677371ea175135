//! Pipeline specification and execution.
//!
//! A pipeline is a versioned JSON document listing the steps that turn a raw
//! table into a clean one. Specs are validated against the input header before
//! anything runs, so a typo in a column name is reported up front along with
//! every other problem, not halfway through a run.
//!
//! # Overview
//!
//! Steps fall into three groups:
//! - **Column management**: `drop_columns`, `select_columns`, `rename_columns`,
//!   `standardize_names`
//! - **Field cleaning**: `clean`, applying a [`Rule`](crate::rules::Rule) with
//!   its missing-value and error policy to one or more columns
//! - **Rows and derived data**: `filter` with a [`Condition`], `derive` with a
//!   [`DeriveExpr`]
//!
//! # Example
//!
//! ```
//! use tabclean::pipeline::{PipelineSpec, run_pipeline};
//! use tabclean::rules::ExecOptions;
//! use tabclean::table::{self, Value};
//!
//! let spec = PipelineSpec::from_json(r#"{
//!     "version": "0.1",
//!     "name": "artworks",
//!     "steps": [
//!         { "op": "clean", "columns": ["Date"],
//!           "rule": { "kind": "range_midpoint", "strip": "()cC.s' " } },
//!         { "op": "standardize_names" }
//!     ]
//! }"#)?;
//!
//! let raw = table::load(
//!     vec![vec!["Dress".to_owned(), "c. 1913-1923".to_owned()]],
//!     vec!["Title".to_owned(), "Date".to_owned()],
//! )?;
//! let (clean, report) = run_pipeline(&spec, raw, ExecOptions::default())?;
//! assert_eq!(clean.value(0, "date"), Some(&Value::Int(1918)));
//! assert_eq!(report.steps_applied, 2);
//! # Ok::<(), tabclean::error::CleanError>(())
//! ```

pub mod executor;
pub mod spec;
pub mod validation;

pub use executor::{RunReport, run_pipeline};
pub use spec::{
    Condition, DeriveExpr, PipelineSpec, SPEC_VERSION, SchemaConfig, SchemaMatchMode, Step,
};
pub use validation::{ValidationError, validate_pipeline};
