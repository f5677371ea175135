//! CSV adapter for the command-line driver.
//!
//! Reading is deliberately lenient (`flexible`), so ragged rows reach
//! [`table::load`] and fail there with a [`SchemaError`](crate::error::SchemaError)
//! naming the row.

use crate::error::{Result, ResultExt as _};
use crate::table::{self, Table};
use std::io::{Read, Write};
use std::path::Path;

/// Read a CSV file with a header row into an all-string table.
///
/// # Errors
///
/// Fails on I/O or CSV decoding errors, and with a schema error on ragged
/// rows or duplicate header names.
pub fn read_csv(path: &Path, delimiter: u8) -> Result<Table> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let table = read_csv_from(file, delimiter)?;
    tracing::debug!(
        path = %path.display(),
        rows = table.row_count(),
        columns = table.column_count(),
        "Read CSV"
    );
    Ok(table)
}

/// Read CSV from any reader.
///
/// # Errors
///
/// Same as [`read_csv`].
pub fn read_csv_from<R: Read>(reader: R, delimiter: u8) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let header: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
    let rows = reader
        .records()
        .map(|record| record.map(|r| r.iter().map(str::to_owned).collect()))
        .collect::<std::result::Result<Vec<Vec<String>>, csv::Error>>()?;

    Ok(table::load(rows, header)?)
}

/// Write a table as CSV with a header row. Nulls are written as empty fields.
///
/// # Errors
///
/// Fails on I/O or CSV encoding errors.
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_csv_to(table, file)
}

/// Write CSV to any writer.
///
/// # Errors
///
/// Same as [`write_csv`].
pub fn write_csv_to<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(table.header().names())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(ToString::to_string))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used)]
    use super::*;
    use crate::error::{CleanError, SchemaError};
    use crate::table::Value;

    #[test]
    fn test_read_quoted_fields() {
        let data = "name,price\n\"Golf, 1.4\",\"$8,990\"\nPolo,\n";
        let t = read_csv_from(data.as_bytes(), b',').unwrap();
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.value(0, "name"), Some(&Value::from("Golf, 1.4")));
        assert_eq!(t.value(0, "price"), Some(&Value::from("$8,990")));
        assert_eq!(t.value(1, "price"), Some(&Value::from("")));
    }

    #[test]
    fn test_ragged_row_is_schema_error() {
        let data = "a,b\n1,2\n3\n";
        let err = read_csv_from(data.as_bytes(), b',').err().unwrap();
        assert!(matches!(
            err,
            CleanError::Schema(SchemaError::RowLength {
                row: 1,
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_write_renders_nulls_empty() {
        let header = crate::table::Header::new(["id", "price"]).unwrap();
        let t = Table::from_rows(
            header,
            vec![
                vec![Value::Int(1), Value::Int(5000)],
                vec![Value::Int(2), Value::Null],
            ],
        )
        .unwrap();
        let mut out = Vec::new();
        write_csv_to(&t, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "id,price\n1,5000\n2,\n");
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("autos.csv");
        let t = read_csv_from("a,b\nx,y\n".as_bytes(), b',').unwrap();
        write_csv(&t, &path).unwrap();
        assert_eq!(read_csv(&path, b',').unwrap(), t);
    }
}
