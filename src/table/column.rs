use super::value::Value;
use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered, unique column names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Header {
    names: Vec<String>,
}

impl Header {
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateColumn`] if a name repeats.
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Result<Self, SchemaError> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateColumn {
                    column: name.clone(),
                });
            }
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownColumn`] if `name` is absent.
    pub fn index_of(&self, name: &str) -> Result<usize, SchemaError> {
        self.position(name)
            .ok_or_else(|| SchemaError::UnknownColumn {
                column: name.to_owned(),
            })
    }

    pub(crate) fn into_names(self) -> Vec<String> {
        self.names
    }
}

/// Expected type of a column once cleaned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Float,
    #[default]
    String,
    Categorical,
    Boolean,
}

impl ColumnKind {
    /// Whether `value` is a legal cell for this kind. `Null` always is.
    pub fn admits(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null)
            | (Self::Integer, Value::Int(_))
            | (Self::Float, Value::Float(_) | Value::Int(_))
            | (Self::String | Self::Categorical, Value::Str(_))
            | (Self::Boolean, Value::Bool(_)) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Categorical => "categorical",
            Self::Boolean => "boolean",
        }
    }
}

/// A column resolved against a header: its name, position and expected kind.
///
/// Resolved once, then used as a typed accessor instead of a raw index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    name: String,
    index: usize,
    kind: ColumnKind,
}

impl ColumnSpec {
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownColumn`] if `name` is not in `header`.
    pub fn resolve(header: &Header, name: &str, kind: ColumnKind) -> Result<Self, SchemaError> {
        Ok(Self {
            name: name.to_owned(),
            index: header.index_of(name)?,
            kind,
        })
    }

    pub(crate) fn at(name: &str, index: usize, kind: ColumnKind) -> Self {
        Self {
            name: name.to_owned(),
            index,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }
}

/// Borrowed view of one row with by-name access, handed to predicates and
/// derive functions.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    header: &'a Header,
    values: &'a [Value],
}

impl<'a> RowView<'a> {
    pub(crate) fn new(header: &'a Header, values: &'a [Value]) -> Self {
        Self { header, values }
    }

    /// Value of the named column, or `None` if the column does not exist.
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.values.get(self.header.position(column)?)
    }

    /// Value through a pre-resolved column.
    pub fn value(&self, spec: &ColumnSpec) -> Option<&'a Value> {
        self.values.get(spec.index())
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    pub fn header(&self) -> &'a Header {
        self.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_rejects_duplicates() {
        let err = Header::new(["id", "name", "id"]).err();
        assert_eq!(
            err,
            Some(SchemaError::DuplicateColumn {
                column: "id".to_owned()
            })
        );
    }

    #[test]
    fn test_column_spec_resolves_once() -> Result<(), SchemaError> {
        let header = Header::new(["title", "date", "nationality"])?;
        let spec = ColumnSpec::resolve(&header, "date", ColumnKind::Integer)?;
        assert_eq!(spec.index(), 1);
        assert_eq!(spec.kind(), ColumnKind::Integer);

        let values = vec![
            Value::from("Dress"),
            Value::Int(1918),
            Value::from("American"),
        ];
        let view = RowView::new(&header, &values);
        assert_eq!(view.value(&spec), Some(&Value::Int(1918)));
        assert_eq!(view.get("nationality"), Some(&Value::from("American")));
        assert_eq!(view.get("missing"), None);
        Ok(())
    }

    #[test]
    fn test_kind_admits() {
        assert!(ColumnKind::Float.admits(&Value::Int(2)));
        assert!(ColumnKind::Integer.admits(&Value::Null));
        assert!(!ColumnKind::Integer.admits(&Value::from("2")));
        assert!(ColumnKind::Categorical.admits(&Value::from("Veteran")));
    }
}
