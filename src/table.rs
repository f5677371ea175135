//! In-memory tables and the structural operations over them.
//!
//! A [`Table`] is a [`Header`] plus rows of [`Value`]s. Tables start life as
//! strings (see [`load`]) and are refined column by column with
//! [`apply_rule`](crate::rules::apply_rule). Every operation here takes the
//! table by value and hands back a new one, so there is no shared state
//! between steps.
//!
//! ```
//! use tabclean::table::{self, Value};
//!
//! let t = table::load(
//!     vec![vec!["VW".to_owned(), "5000".to_owned()]],
//!     vec!["brand".to_owned(), "price".to_owned()],
//! )?;
//! let t = table::rename(t, [("brand", "make")])?;
//! assert_eq!(t.header().names(), ["make", "price"]);
//! assert_eq!(t.value(0, "price"), Some(&Value::from("5000")));
//! # Ok::<(), tabclean::error::SchemaError>(())
//! ```

pub mod column;
pub mod ops;
pub mod value;

pub use column::{ColumnKind, ColumnSpec, Header, RowView};
pub use ops::{
    concat, derive_column, drop_columns, filter_rows, load, rename, select_columns,
};
pub use value::Value;

pub(crate) use ops::retain_rows;

use crate::error::SchemaError;

/// One record; always as long as the table's header.
pub type Row = Vec<Value>;

/// A header plus rows of equal length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    header: Header,
    rows: Vec<Row>,
}

impl Table {
    /// Build a table from already-typed rows, checking every row length.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::RowLength`] for the first row whose field count
    /// differs from the header.
    pub fn from_rows(header: Header, rows: Vec<Row>) -> Result<Self, SchemaError> {
        if let Some((row, found)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != header.len())
            .map(|(i, r)| (i, r.len()))
        {
            return Err(SchemaError::RowLength {
                row,
                expected: header.len(),
                found,
            });
        }
        Ok(Self { header, rows })
    }

    /// Caller guarantees every row matches `header`.
    pub(crate) fn from_parts(header: Header, rows: Vec<Row>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == header.len()));
        Self { header, rows }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_parts(self) -> (Header, Vec<Row>) {
        (self.header, self.rows)
    }

    /// Cell lookup by row index and column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.header.position(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// All values of one column, in row order.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownColumn`] if `column` is not in the header.
    pub fn column_values(&self, column: &str) -> Result<Vec<&Value>, SchemaError> {
        let idx = self.header.index_of(column)?;
        Ok(self.rows.iter().filter_map(|r| r.get(idx)).collect())
    }

    pub fn views(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(|r| RowView::new(&self.header, r))
    }
}
