//! Frequency tables, grouped means and summary statistics.

use crate::error::SchemaError;
use crate::table::{Table, Value};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// One distinct value of a frequency table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FreqEntry {
    pub value: String,
    pub count: usize,
    /// Share of non-null cells, 0-100
    pub percent: f64,
}

/// Label under which [`value_counts`] lists null cells.
pub const NULL_LABEL: &str = "<null>";

/// Count each distinct non-null value of `column`, most frequent first.
///
/// Ties are broken by value so the output is stable.
///
/// # Errors
///
/// Returns [`SchemaError::UnknownColumn`] if the column does not exist.
pub fn freq_table(table: &Table, column: &str) -> Result<Vec<FreqEntry>, SchemaError> {
    value_counts(table, column, false)
}

/// [`freq_table`], optionally counting nulls as a value of their own
/// ([`NULL_LABEL`]). Percentages are then of every row, not of non-null cells.
///
/// # Errors
///
/// Returns [`SchemaError::UnknownColumn`] if the column does not exist.
pub fn value_counts(
    table: &Table,
    column: &str,
    include_nulls: bool,
) -> Result<Vec<FreqEntry>, SchemaError> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut total = 0_usize;
    for value in table.column_values(column)? {
        let key = match value {
            Value::Null if !include_nulls => continue,
            Value::Null => NULL_LABEL.to_owned(),
            other => other.to_string(),
        };
        *counts.entry(key).or_default() += 1;
        total += 1;
    }

    let mut entries: Vec<FreqEntry> = counts
        .into_iter()
        .map(|(value, count)| FreqEntry {
            value,
            count,
            percent: count as f64 * 100.0 / total as f64,
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    Ok(entries)
}

/// Mean of one column within each group of another.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub group: String,
    /// Rows in the group
    pub rows: usize,
    /// Rows that contributed to the mean
    pub count: usize,
    /// `None` when no row of the group has a numeric value
    pub mean: Option<f64>,
}

/// Mean of `value` per distinct non-null value of `by`, ordered by group.
///
/// Numbers count as themselves and booleans as 0 or 1, so the mean of a
/// yes/no column is the share of `true` answers. Everything else is skipped.
///
/// # Errors
///
/// Returns [`SchemaError::UnknownColumn`] if either column does not exist.
pub fn group_mean(table: &Table, by: &str, value: &str) -> Result<Vec<GroupMean>, SchemaError> {
    let keys = table.column_values(by)?;
    let values = table.column_values(value)?;

    let mut groups: BTreeMap<String, (usize, usize, f64)> = BTreeMap::new();
    for (key, v) in keys.into_iter().zip(values) {
        if key.is_null() {
            continue;
        }
        let (rows, count, sum) = groups.entry(key.to_string()).or_default();
        *rows += 1;
        if let Some(x) = v.as_f64().or_else(|| v.as_bool().map(|b| f64::from(u8::from(b)))) {
            *count += 1;
            *sum += x;
        }
    }

    Ok(groups
        .into_iter()
        .map(|(group, (rows, count, sum))| GroupMean {
            group,
            rows,
            count,
            mean: (count > 0).then(|| sum / count as f64),
        })
        .collect())
}

/// Arithmetic mean of the numeric values, ignoring everything else.
pub fn mean<'a>(values: impl IntoIterator<Item = &'a Value>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .filter_map(Value::as_f64)
        .fold((0.0, 0_usize), |(sum, n), x| (sum + x, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericStats {
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two values
    pub std_dev: Option<f64>,
    pub min: f64,
    pub median: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    /// Non-null cells
    pub count: usize,
    pub nulls: usize,
    pub distinct: usize,
    pub top: Option<FreqEntry>,
    /// Present when every non-null cell is a number or numeric text
    pub numeric: Option<NumericStats>,
}

/// Summarise one column.
///
/// Text cells that parse as finite numbers count as numeric, so a raw CSV
/// column of prices can be described before it is cleaned.
///
/// # Errors
///
/// Returns [`SchemaError::UnknownColumn`] if the column does not exist.
pub fn describe(table: &Table, column: &str) -> Result<ColumnSummary, SchemaError> {
    let values = table.column_values(column)?;
    let nulls = values.iter().filter(|v| v.is_null()).count();
    let freq = freq_table(table, column)?;

    let numbers: Option<Vec<f64>> = values
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| numeric(v))
        .collect();

    Ok(ColumnSummary {
        column: column.to_owned(),
        count: values.len() - nulls,
        nulls,
        distinct: freq.len(),
        top: freq.into_iter().next(),
        numeric: numbers.and_then(numeric_stats),
    })
}

fn numeric(value: &Value) -> Option<f64> {
    value.as_f64().or_else(|| {
        value
            .as_str()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|x| x.is_finite())
    })
}

fn numeric_stats(mut xs: Vec<f64>) -> Option<NumericStats> {
    if xs.is_empty() {
        return None;
    }
    xs.sort_by(f64::total_cmp);
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let std_dev = (xs.len() > 1).then(|| {
        let ss: f64 = xs.iter().map(|x| (x - mean).powi(2)).sum();
        (ss / (n - 1.0)).sqrt()
    });
    let mid = xs.len() / 2;
    let median = if xs.len() % 2 == 0 {
        f64::midpoint(*xs.get(mid - 1)?, *xs.get(mid)?)
    } else {
        *xs.get(mid)?
    };
    Some(NumericStats {
        mean,
        std_dev,
        min: *xs.first()?,
        median,
        max: *xs.last()?,
    })
}
