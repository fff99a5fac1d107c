//! Local commands: load a flat file as a snapshot, transform it, write it back.

use anyhow::Context;
use chrono::NaiveDate;
use epi_data::{io, Aggregate, FillMethod, Snapshot, WindowSize};
use log::info;
use polars::prelude::*;
use std::path::Path;

/// Read a CSV and promote it to a snapshot. Extra keys are read as text.
pub fn load_snapshot(
    input: &Path,
    as_of: Option<NaiveDate>,
    extra_keys: &[String],
) -> anyhow::Result<Snapshot> {
    let extra_keys: Vec<&str> = extra_keys.iter().map(String::as_str).collect();
    let table = io::read_csv(input, &extra_keys)
        .with_context(|| format!("reading {}", input.display()))?;
    let snapshot = Snapshot::promote(table, as_of, &extra_keys)?;
    info!(
        "Loaded {} rows from {} as of {}",
        snapshot.table().height(),
        input.display(),
        snapshot.as_of()
    );
    Ok(snapshot)
}

/// Write to `output`, or to stdout when there is none.
pub fn emit(table: &DataFrame, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            io::write_csv(table, path).with_context(|| format!("writing {}", path.display()))?;
            info!("Wrote {} rows to {}", table.height(), path.display());
        }
        None => print!("{}", io::to_csv_string(table)?),
    }
    Ok(())
}

/// The table as a JSON array of row objects.
pub fn to_json(table: &DataFrame) -> anyhow::Result<String> {
    let mut table = table.clone();
    let mut buffer = Vec::new();
    JsonWriter::new(&mut buffer)
        .with_json_format(JsonFormat::Json)
        .finish(&mut table)?;
    Ok(String::from_utf8(buffer)?)
}

pub fn run_summarize(
    input: &Path,
    key: &str,
    as_of: Option<NaiveDate>,
    extra_keys: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let snapshot = load_snapshot(input, as_of, extra_keys)?;
    let totals = snapshot.sum_group(key)?;
    if json {
        println!("{}", to_json(&totals)?);
        Ok(())
    } else {
        emit(&totals, None)
    }
}

pub fn run_complete(
    input: &Path,
    output: Option<&Path>,
    fill: Option<(&str, FillMethod)>,
    as_of: Option<NaiveDate>,
    extra_keys: &[String],
) -> anyhow::Result<()> {
    let mut snapshot = load_snapshot(input, as_of, extra_keys)?.complete()?;
    if let Some((column, method)) = fill {
        snapshot = snapshot.fill(column, method)?;
    }
    emit(snapshot.table(), output)
}

pub fn run_slide(
    input: &Path,
    output: Option<&Path>,
    aggregate: Aggregate,
    window: WindowSize,
    as_of: Option<NaiveDate>,
    extra_keys: &[String],
) -> anyhow::Result<()> {
    let snapshot = load_snapshot(input, as_of, extra_keys)?;
    info!("Sliding {} over {:?}", aggregate, window);
    emit(snapshot.slide_with(aggregate, window)?.table(), output)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV_DATA: &str = "\
geo_value,time_value,cases
ca,2020-03-01,10
ca,2020-03-03,30
fl,2020-03-01,5
";

    fn write_input(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("cases.csv");
        std::fs::write(&path, body).unwrap();
        path
    }

    fn column<'a>(table: &'a DataFrame, name: &str) -> &'a Series {
        table.column(name).unwrap().as_materialized_series()
    }

    #[test]
    fn test_complete_with_fill_writes_grid() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), CSV_DATA);
        let output = dir.path().join("complete.csv");
        run_complete(
            &input,
            Some(&output),
            Some(("cases", FillMethod::Forward)),
            None,
            &[],
        )
        .unwrap();
        let table = io::read_csv(&output, &[]).unwrap();
        assert_eq!(table.height(), 6);
        let cases = column(&table, "cases").i64().unwrap().to_vec();
        assert_eq!(cases[1], Some(10));
        assert_eq!(cases[5], Some(5));
    }

    #[test]
    fn test_slide_writes_means() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), CSV_DATA);
        let output = dir.path().join("slide.csv");
        run_slide(
            &input,
            Some(&output),
            Aggregate::Mean,
            WindowSize::Rows(2),
            None,
            &[],
        )
        .unwrap();
        let table = io::read_csv(&output, &[]).unwrap();
        let cases = column(&table, "cases").cast(&DataType::Float64).unwrap();
        assert_eq!(cases.f64().unwrap().get(1), Some(20.0));
    }

    #[test]
    fn test_load_snapshot_reads_extra_keys_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            "geo_value,zip,time_value,cases\nma,02139,2020-03-01,1\nma,02138,2020-03-01,2\n",
        );
        let snapshot = load_snapshot(&input, None, &["zip".to_string()]).unwrap();
        let zips: Vec<Option<&str>> = column(snapshot.table(), "zip").str().unwrap().into_iter().collect();
        assert_eq!(zips, vec![Some("02138"), Some("02139")]);
    }

    #[test]
    fn test_json_records_include_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), CSV_DATA);
        let snapshot = load_snapshot(&input, None, &[]).unwrap();
        let json = to_json(&snapshot.sum_group("geo_value").unwrap()).unwrap();
        let records: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(records.as_array().unwrap().len(), 2);
        assert_eq!(records[0]["geo_value"], "ca");
        assert_eq!(records[0]["cases"], 40);
        assert_eq!(records[0]["time_value"], 0);
    }

    #[test]
    fn test_load_snapshot_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_snapshot(&dir.path().join("nope.csv"), None, &[]).is_err());
    }
}
