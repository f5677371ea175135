//! # tabclean - configurable cleaning for string-encoded tables
//!
//! tabclean takes a header plus rows of string fields (as read from a CSV
//! export) and applies a configured list of per-column transformations:
//! strip junk characters, cast to numbers, replace missing-value markers,
//! derive new columns, filter rows, rename or drop columns. The result is a
//! cleaned table plus a report of every field that could not be cleaned.
//!
//! ## Quick Start
//!
//! ```
//! use tabclean::rules::{apply_rule, MissingPolicy, Rule, RulePolicy};
//! use tabclean::table::{self, Value};
//!
//! let autos = table::load(
//!     vec![
//!         vec!["$5,000".to_owned(), "150,000km".to_owned()],
//!         vec![String::new(), "70,000km".to_owned()],
//!     ],
//!     vec!["price".to_owned(), "odometer".to_owned()],
//! )?;
//!
//! let policy = RulePolicy::default().with_missing(MissingPolicy::empty_as_null());
//! let (autos, report) = apply_rule(autos, "price", &Rule::ToInteger { strip: "$,".to_owned() }, &policy)?;
//! let (autos, _) = apply_rule(autos, "odometer", &Rule::ToInteger { strip: ",km".to_owned() }, &policy)?;
//! let autos = table::rename(autos, [("odometer", "odometer_km")])?;
//!
//! assert_eq!(autos.value(0, "price"), Some(&Value::Int(5000)));
//! assert_eq!(autos.value(1, "price"), Some(&Value::Null));
//! assert_eq!(autos.value(1, "odometer_km"), Some(&Value::Int(70_000)));
//! assert!(report.is_clean());
//! # Ok::<(), tabclean::error::CleanError>(())
//! ```
//!
//! ## Core Modules
//!
//! - [`table`]: the `Table` model and structural operations
//! - [`rules`]: per-field cleaning rules and their missing/error policy
//! - [`pipeline`]: JSON pipeline specs, validation and execution
//! - [`report`]: per-row issue reporting
//! - [`stats`]: frequency tables and summary statistics
//! - [`naming`]: column-name standardisation
//! - [`io`]: CSV reading and writing for the command-line driver
//! - [`error`]: error types and handling utilities
//!
//! ## Failure model
//!
//! Structural problems (ragged rows, unknown or colliding columns) are
//! [`SchemaError`](error::SchemaError)s and always stop the operation. A field
//! that a rule cannot transform is a [`ValueError`](error::ValueError); by
//! default it is replaced by the rule's sentinel and recorded in the
//! [`CleanReport`](report::CleanReport), and only stops the operation when
//! the rule's policy says `abort`.

#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod naming;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod stats;
pub mod table;
