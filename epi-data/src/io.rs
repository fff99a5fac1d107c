//! Flat-file CSV reading and writing.
//!
//! Cells are type-inferred by polars, with `YYYY-MM-DD` cells parsed as
//! dates. Identifier columns (`geo_value` and any extra keys the caller
//! names) are always read as strings, so codes such as county FIPS `06037`
//! keep their leading zeros.

use crate::{
    error::{EpiError, Result},
    keys::GEO_VALUE,
};
use log::debug;
use polars::prelude::*;
use std::{
    io::{Cursor, Write},
    path::Path,
};

/// Parse a headed CSV body.
///
/// Short rows are padded with nulls; a row with more fields than the header
/// is an error.
pub fn from_csv_str(body: &str, id_columns: &[&str]) -> Result<DataFrame> {
    let header = check_row_widths(body)?;
    let overwrite = Schema::from_iter(
        header
            .iter()
            .filter(|name| name.as_str() == GEO_VALUE || id_columns.contains(&name.as_str()))
            .map(|name| (PlSmallStr::from(name.as_str()), DataType::String)),
    );
    let table = CsvReadOptions::default()
        .with_has_header(true)
        .with_schema_overwrite(Some(Arc::new(overwrite)))
        .with_parse_options(CsvParseOptions::default().with_try_parse_dates(true))
        .into_reader_with_file_handle(Cursor::new(body.as_bytes().to_vec()))
        .finish()?;
    debug!("csv: read {} rows x {} columns", table.height(), table.width());
    Ok(table)
}

pub fn read_csv(path: impl AsRef<Path>, id_columns: &[&str]) -> Result<DataFrame> {
    let body = std::fs::read_to_string(path)?;
    from_csv_str(&body, id_columns)
}

/// Write the table as a headed CSV; dates as `YYYY-MM-DD`, nulls as empty cells.
pub fn to_csv_writer<W: Write>(table: &DataFrame, writer: W) -> Result<()> {
    let mut table = table.clone();
    CsvWriter::new(writer)
        .include_header(true)
        .finish(&mut table)?;
    Ok(())
}

pub fn to_csv_string(table: &DataFrame) -> Result<String> {
    let mut buffer = Vec::new();
    to_csv_writer(table, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

pub fn write_csv(table: &DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let file = std::fs::File::create(path)?;
    to_csv_writer(table, file)
}

/// The header names, after checking that no row is wider than the header.
fn check_row_widths(body: &str) -> Result<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());
    let header: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        if record.len() > header.len() {
            return Err(EpiError::RaggedRow {
                // 1-based, counting the header line
                row: i + 2,
                expected: header.len(),
                found: record.len(),
            });
        }
    }
    Ok(header)
}
