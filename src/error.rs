//! Centralized error handling for tabclean.
//!
//! Two failure families matter to callers of the cleaning functions:
//!
//! - [`SchemaError`]: the shape of the table is wrong (ragged rows, duplicate
//!   or unknown columns, rename collisions). Always fatal to the operation.
//! - [`ValueError`]: a single field could not be transformed. Whether this is
//!   fatal depends on the rule's [`OnError`](crate::rules::OnError) policy;
//!   when it is not, the failure is recorded in a
//!   [`CleanReport`](crate::report::CleanReport) instead.
//!
//! Both are wrapped by [`CleanError`], which also absorbs I/O, JSON and CSV
//! failures so the `?` operator works across the crate:
//!
//! ```
//! use tabclean::error::{CleanError, SchemaError};
//!
//! fn describe(err: &CleanError) -> String {
//!     match err {
//!         CleanError::Schema(SchemaError::RowLength { row, .. }) => format!("ragged row {row}"),
//!         CleanError::Value(e) => format!("bad value in {}", e.column),
//!         other => other.to_string(),
//!     }
//! }
//! ```

use crate::pipeline::ValidationError;
use std::fmt;

/// Structural problems with a table or header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A row does not have as many fields as the header.
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// The same column name appears twice in a header.
    DuplicateColumn { column: String },

    /// A referenced column does not exist.
    UnknownColumn { column: String },

    /// A rename or derive would produce a name that is already taken.
    NameCollision { column: String },

    /// Two tables could not be combined because their headers differ.
    HeaderMismatch { left: Vec<String>, right: Vec<String> },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RowLength {
                row,
                expected,
                found,
            } => write!(f, "row {row} has {found} fields, header has {expected}"),
            Self::DuplicateColumn { column } => write!(f, "duplicate column '{column}'"),
            Self::UnknownColumn { column } => write!(f, "unknown column '{column}'"),
            Self::NameCollision { column } => {
                write!(f, "column name '{column}' is already in use")
            }
            Self::HeaderMismatch { left, right } => {
                write!(f, "headers differ: {left:?} vs {right:?}")
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// A single field that a rule could not transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueError {
    /// Zero-based row index; the input row when raised from a pipeline.
    pub row: usize,
    pub column: String,
    /// The offending input, rendered as text.
    pub value: String,
    pub reason: String,
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {}, column '{}': cannot transform {:?}: {}",
            self.row, self.column, self.value, self.reason
        )
    }
}

impl std::error::Error for ValueError {}

/// Main error type for tabclean operations.
#[derive(Debug)]
pub enum CleanError {
    /// Table shape errors, fatal to the operation
    Schema(SchemaError),

    /// Field transformation errors under an `abort` policy
    Value(ValueError),

    /// I/O errors (reading specs, CSV files, reports)
    Io(std::io::Error),

    /// CSV decoding or encoding errors
    Csv(String),

    /// Pipeline spec or settings errors
    Config(String),

    /// A pipeline spec does not fit the table it was run against
    Validation(Vec<ValidationError>),

    /// Generic error with context
    Other(String),
}

impl fmt::Display for CleanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema(e) => write!(f, "Schema error: {e}"),
            Self::Value(e) => write!(f, "Value error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Validation(errors) => {
                write!(f, "Pipeline validation failed:")?;
                for e in errors {
                    write!(f, "\n  {e}")?;
                }
                Ok(())
            }
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CleanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Schema(e) => Some(e),
            Self::Value(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Csv(_) | Self::Config(_) | Self::Validation(_) | Self::Other(_) => None,
        }
    }
}

impl CleanError {
    /// Row index carried by the error, if any.
    pub fn row(&self) -> Option<usize> {
        match self {
            Self::Schema(SchemaError::RowLength { row, .. }) => Some(*row),
            Self::Value(e) => Some(e.row),
            _ => None,
        }
    }

    /// Column name carried by the error, if any.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::Schema(
                SchemaError::DuplicateColumn { column }
                | SchemaError::UnknownColumn { column }
                | SchemaError::NameCollision { column },
            ) => Some(column),
            Self::Value(e) => Some(&e.column),
            _ => None,
        }
    }
}

impl From<SchemaError> for CleanError {
    fn from(err: SchemaError) -> Self {
        Self::Schema(err)
    }
}

impl From<ValueError> for CleanError {
    fn from(err: ValueError) -> Self {
        Self::Value(err)
    }
}

impl From<std::io::Error> for CleanError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CleanError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

impl From<serde_json::Error> for CleanError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<anyhow::Error> for CleanError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

/// Result type alias for tabclean operations.
pub type Result<T> = std::result::Result<T, CleanError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CleanError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: CleanError = e.into();
            CleanError::Other(format!("{}: {}", msg.into(), err))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err: CleanError = e.into();
            CleanError::Other(format!("{}: {}", f(), err))
        })
    }
}
