//! Per-field cleaning rules.
//!
//! A [`CleaningRule`] maps one value (with its row for context) to a new
//! value or a failure reason. The built-in [`Rule`] set covers the usual
//! string-to-number chores (stripping junk characters, casting, year ranges,
//! lookups, bucketing) and is serializable so pipelines can be written in
//! JSON. Ad-hoc logic can be plugged in with [`rule_fn`].
//!
//! What happens to missing markers and to failures is decided by the
//! [`RulePolicy`] passed alongside the rule, never by the rule itself:
//!
//! ```
//! use tabclean::rules::{apply_rule, MissingPolicy, OnError, Rule, RulePolicy};
//! use tabclean::table::{self, Value};
//!
//! let t = table::load(
//!     vec![vec!["$5,000".to_owned()], vec![String::new()]],
//!     vec!["price".to_owned()],
//! )?;
//! let rule = Rule::ToInteger { strip: "$,".to_owned() };
//! let policy = RulePolicy {
//!     missing: Some(MissingPolicy::empty_as_null()),
//!     on_error: OnError::Abort,
//! };
//! let (t, report) = apply_rule(t, "price", &rule, &policy)?;
//! assert_eq!(t.value(0, "price"), Some(&Value::Int(5000)));
//! assert_eq!(t.value(1, "price"), Some(&Value::Null));
//! assert_eq!(report.missing, 1);
//! # Ok::<(), tabclean::error::CleanError>(())
//! ```

pub mod apply;
pub mod builtin;
pub mod policy;

pub use apply::{ExecOptions, apply_rule, apply_rule_with};
pub use builtin::{Bucket, Pattern, Rule, range_midpoint};
pub use policy::{MissingPolicy, OnError, RulePolicy};

use crate::table::{ColumnKind, RowView, Value};

/// A pure, stateless transformation of one field.
pub trait CleaningRule: Send + Sync {
    /// Name used in reports and logs.
    fn name(&self) -> &str;

    /// Transform `value`. `row` gives read access to the rest of the record.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the value cannot be transformed.
    fn clean(&self, value: &Value, row: &RowView<'_>) -> Result<Value, String>;

    /// Kind of value the rule produces, when it is fixed.
    fn output_kind(&self) -> Option<ColumnKind> {
        None
    }
}

/// A [`CleaningRule`] backed by a closure.
pub struct FnRule<F> {
    name: String,
    f: F,
}

/// Wrap a closure as a named cleaning rule.
pub fn rule_fn<F>(name: impl Into<String>, f: F) -> FnRule<F>
where
    F: Fn(&Value) -> Result<Value, String> + Send + Sync,
{
    FnRule {
        name: name.into(),
        f,
    }
}

impl<F> CleaningRule for FnRule<F>
where
    F: Fn(&Value) -> Result<Value, String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn clean(&self, value: &Value, _row: &RowView<'_>) -> Result<Value, String> {
        (self.f)(value)
    }
}
