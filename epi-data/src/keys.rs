//! Key field names and the re-keying rules shared by both views.

use crate::error::{EpiError, Result};
use chrono::NaiveDate;
use log::debug;
use polars::prelude::*;

/// Location identifier key
pub const GEO_VALUE: &str = "geo_value";
/// Observation time key
pub const TIME_VALUE: &str = "time_value";
/// Revision time key of an archive
pub const VERSION: &str = "version";

/// Placeholder written into a collapsed `geo_value` dimension.
pub const TOTAL_GEO: &str = "total";
/// Placeholder written into a collapsed `time_value` dimension.
pub const TOTAL_TIME: i64 = 0;

const ROW_COUNT: &str = "__rows";

pub(crate) fn has_column(table: &DataFrame, name: &str) -> bool {
    table.get_column_names().iter().any(|n| n.as_str() == name)
}

/// Check that the table carries every required field.
pub(crate) fn validate(table: &DataFrame, required: &[&str]) -> Result<()> {
    if required.iter().all(|r| has_column(table, r)) {
        Ok(())
    } else {
        Err(EpiError::Schema {
            required: required.iter().map(|r| r.to_string()).collect(),
        })
    }
}

/// `leading`, then the extra keys, then `time_value`.
pub(crate) fn canonical_key(leading: &[&str], extra_keys: &[&str]) -> Result<Vec<String>> {
    let mut key: Vec<String> = leading.iter().map(|k| k.to_string()).collect();
    for extra in extra_keys {
        if *extra == TIME_VALUE || key.iter().any(|k| k == extra) {
            return Err(EpiError::InvalidArgument(format!(
                "extra key {extra:?} repeats a key field"
            )));
        }
        key.push(extra.to_string());
    }
    key.push(TIME_VALUE.to_string());
    Ok(key)
}

pub(crate) fn cols<S: AsRef<str>>(names: &[S]) -> Vec<Expr> {
    names.iter().map(|n| col(n.as_ref())).collect()
}

pub(crate) fn stable_sort() -> SortMultipleOptions {
    SortMultipleOptions::default().with_maintain_order(true)
}

/// Move the key columns to the front and sort rows by them, rejecting
/// duplicate key tuples.
pub(crate) fn rekey(table: DataFrame, key: &[String]) -> Result<DataFrame> {
    if let Some(missing) = key.iter().find(|k| !has_column(&table, k)) {
        return Err(EpiError::InvalidArgument(format!("unknown key field {missing:?}")));
    }
    let rest: Vec<String> = table
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .filter(|n| !key.contains(n))
        .collect();
    let order: Vec<Expr> = cols(key).into_iter().chain(cols(&rest)).collect();
    let keyed = table
        .lazy()
        .select(order)
        .sort_by_exprs(cols(key), stable_sort())
        .collect()?;
    if let Some(duplicate) = first_duplicate(&keyed, key)? {
        return Err(EpiError::DuplicateKey(duplicate));
    }
    debug!("rekey: {} rows by {:?}", keyed.height(), key);
    Ok(keyed)
}

/// The smallest key tuple shared by more than one row, described as
/// `name=value` pairs.
fn first_duplicate(table: &DataFrame, key: &[String]) -> Result<Option<String>> {
    let repeated = table
        .clone()
        .lazy()
        .group_by(cols(key))
        .agg([len().alias(ROW_COUNT)])
        .filter(col(ROW_COUNT).gt(lit(1)))
        .sort_by_exprs(cols(key), SortMultipleOptions::default())
        .collect()?;
    Ok(repeated.get(0).map(|row| describe_key(key, &row)))
}

pub(crate) fn describe_key(names: &[String], values: &[AnyValue]) -> String {
    names
        .iter()
        .zip(values)
        .map(|(name, value)| match value {
            AnyValue::String(s) => format!("{name}={s}"),
            other => format!("{name}={other}"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every cell of a date column. Nulls and non-date columns are rejected.
pub(crate) fn dates(table: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
    if table.height() == 0 {
        return Ok(Vec::new());
    }
    let column = table.column(name)?;
    if column.dtype() != &DataType::Date {
        return Err(EpiError::InvalidArgument(format!(
            "{name} must hold dates, found {}",
            column.dtype()
        )));
    }
    column
        .as_materialized_series()
        .date()?
        .as_date_iter()
        .map(|d| d.ok_or_else(|| EpiError::InvalidArgument(format!("{name} has missing dates"))))
        .collect()
}

/// Integer and floating-point columns; the ones windows and sums apply to.
pub(crate) fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int32
            | DataType::Int64
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Names of the non-key columns with a numeric type.
pub(crate) fn numeric_values(table: &DataFrame, key: &[String]) -> Vec<String> {
    table
        .get_columns()
        .iter()
        .filter(|c| !key.iter().any(|k| k == c.name().as_str()) && is_numeric(c.dtype()))
        .map(|c| c.name().to_string())
        .collect()
}
