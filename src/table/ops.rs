//! Structural table operations: loading, renaming, filtering, deriving.
//!
//! All operations are single pass and preserve row order.

use super::column::{Header, RowView};
use super::value::Value;
use super::{Row, Table};
use crate::error::{CleanError, SchemaError, ValueError};
use std::collections::HashSet;

/// Build a string table from raw rows and a header.
///
/// # Errors
///
/// Returns [`SchemaError::RowLength`] for the first ragged row and
/// [`SchemaError::DuplicateColumn`] for a repeated header name.
pub fn load(rows: Vec<Vec<String>>, header: Vec<String>) -> Result<Table, SchemaError> {
    let header = Header::new(header)?;
    let rows: Vec<Row> = rows
        .into_iter()
        .map(|r| r.into_iter().map(Value::Str).collect())
        .collect();
    let table = Table::from_rows(header, rows)?;
    tracing::debug!(
        rows = table.row_count(),
        columns = table.column_count(),
        "Loaded table"
    );
    Ok(table)
}

/// Rename columns according to `mapping` (old name, new name).
///
/// Renames are applied simultaneously, so swapping two names is allowed.
///
/// # Errors
///
/// Returns [`SchemaError::UnknownColumn`] if a source name is absent and
/// [`SchemaError::NameCollision`] if the result would contain a name twice.
pub fn rename<I, A, B>(table: Table, mapping: I) -> Result<Table, SchemaError>
where
    I: IntoIterator<Item = (A, B)>,
    A: AsRef<str>,
    B: Into<String>,
{
    let (header, rows) = table.into_parts();
    let mut names = header.clone().into_names();

    for (from, to) in mapping {
        let idx = header.index_of(from.as_ref())?;
        if let Some(slot) = names.get_mut(idx) {
            *slot = to.into();
        }
    }

    let mut seen = HashSet::with_capacity(names.len());
    for name in &names {
        if !seen.insert(name.as_str()) {
            return Err(SchemaError::NameCollision {
                column: name.clone(),
            });
        }
    }

    Ok(Table::from_parts(Header::new(names)?, rows))
}

/// Keep the rows for which `predicate` holds, in their original order.
pub fn filter_rows<P>(table: Table, predicate: P) -> Table
where
    P: Fn(&RowView<'_>) -> bool,
{
    let keep: Vec<bool> = table.views().map(|row| predicate(&row)).collect();
    retain_rows(table, &keep)
}

/// Keep the rows whose flag in `keep` is set.
pub(crate) fn retain_rows(table: Table, keep: &[bool]) -> Table {
    let before = table.row_count();
    let (header, rows) = table.into_parts();
    let rows: Vec<Row> = rows
        .into_iter()
        .zip(keep)
        .filter_map(|(row, &kept)| kept.then_some(row))
        .collect();
    tracing::debug!(before, after = rows.len(), "Filtered rows");
    Table::from_parts(header, rows)
}

/// Append a column computed from each row.
///
/// # Errors
///
/// Returns [`SchemaError::NameCollision`] if `name` already exists, or a
/// [`ValueError`] naming the first row for which `f` fails.
pub fn derive_column<F>(table: Table, name: &str, f: F) -> Result<Table, CleanError>
where
    F: Fn(&RowView<'_>) -> Result<Value, String>,
{
    if table.header().contains(name) {
        return Err(SchemaError::NameCollision {
            column: name.to_owned(),
        }
        .into());
    }

    let derived = table
        .views()
        .enumerate()
        .map(|(row, view)| {
            f(&view).map_err(|reason| ValueError {
                row,
                column: name.to_owned(),
                value: String::new(),
                reason,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (header, rows) = table.into_parts();
    let mut names = header.into_names();
    names.push(name.to_owned());
    let rows = rows
        .into_iter()
        .zip(derived)
        .map(|(mut r, v)| {
            r.push(v);
            r
        })
        .collect();

    Ok(Table::from_parts(Header::new(names)?, rows))
}

/// Remove the named columns.
///
/// # Errors
///
/// Returns [`SchemaError::UnknownColumn`] for a name not in the header.
pub fn drop_columns<S: AsRef<str>>(table: Table, columns: &[S]) -> Result<Table, SchemaError> {
    let mut dropped = HashSet::new();
    for c in columns {
        dropped.insert(table.header().index_of(c.as_ref())?);
    }
    let keep: Vec<usize> = (0..table.column_count())
        .filter(|i| !dropped.contains(i))
        .collect();
    project(table, &keep)
}

/// Keep only the named columns, in the order given.
///
/// # Errors
///
/// Returns [`SchemaError::UnknownColumn`] for a name not in the header and
/// [`SchemaError::DuplicateColumn`] if a name is selected twice.
pub fn select_columns<S: AsRef<str>>(table: Table, columns: &[S]) -> Result<Table, SchemaError> {
    let keep = columns
        .iter()
        .map(|c| table.header().index_of(c.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    project(table, &keep)
}

/// Stack `bottom` under `top`. Headers must be identical.
///
/// # Errors
///
/// Returns [`SchemaError::HeaderMismatch`] if the headers differ.
pub fn concat(top: Table, bottom: Table) -> Result<Table, SchemaError> {
    if top.header() != bottom.header() {
        return Err(SchemaError::HeaderMismatch {
            left: top.header().names().to_vec(),
            right: bottom.header().names().to_vec(),
        });
    }
    let (header, mut rows) = top.into_parts();
    let (_, more) = bottom.into_parts();
    rows.extend(more);
    Ok(Table::from_parts(header, rows))
}

fn project(table: Table, keep: &[usize]) -> Result<Table, SchemaError> {
    let (header, rows) = table.into_parts();
    let header = Header::new(
        keep.iter()
            .filter_map(|&i| header.names().get(i).cloned()),
    )?;
    let rows = rows
        .into_iter()
        .map(|mut r| {
            keep.iter()
                .map(|&i| r.get_mut(i).map(std::mem::take).unwrap_or_default())
                .collect()
        })
        .collect();
    Ok(Table::from_parts(header, rows))
}
