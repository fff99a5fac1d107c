use crate::{
    error::{EpiError, Result},
    keys::{self, GEO_VALUE, TIME_VALUE, VERSION},
    window::WindowSize,
};
use chrono::NaiveDate;
use log::debug;
use polars::prelude::*;

/// The full revision history of a set of observations.
///
/// Keyed by `[version, geo_value, *extra_keys, time_value]` with `version`
/// most significant. An archive spans many versions, so unlike a
/// [`Snapshot`](crate::snapshot::Snapshot) it carries no single as-of date.
#[derive(Debug, Clone)]
pub struct Archive {
    table: DataFrame,
    key: Vec<String>,
}

impl Archive {
    pub const REQUIRED: [&'static str; 3] = [GEO_VALUE, TIME_VALUE, VERSION];

    pub fn validate(table: &DataFrame) -> Result<()> {
        keys::validate(table, &Self::REQUIRED)
    }

    pub fn promote(table: DataFrame, extra_keys: &[&str]) -> Result<Archive> {
        Self::validate(&table)?;
        let key = keys::canonical_key(&[VERSION, GEO_VALUE], extra_keys)?;
        let table = keys::rekey(table, &key)?;
        debug!("archive: {} rows keyed by {:?}", table.height(), key);
        Ok(Archive { table, key })
    }

    pub fn table(&self) -> &DataFrame {
        &self.table
    }

    pub fn into_table(self) -> DataFrame {
        self.table
    }

    /// Key field names, most significant first, minus `exclude`.
    pub fn keys(&self, exclude: &[&str]) -> Vec<&str> {
        self.key
            .iter()
            .map(String::as_str)
            .filter(|name| !exclude.contains(name))
            .collect()
    }

    /// Group by every key field except `time_value`: one group per
    /// (version, location, extra keys) series.
    pub fn group(&self) -> Result<GroupBy<'_>> {
        Ok(self.table.group_by_stable(self.keys(&[TIME_VALUE]))?)
    }

    /// Distinct versions present, oldest first.
    pub fn versions(&self) -> Result<Vec<NaiveDate>> {
        let mut versions = keys::dates(&self.table, VERSION)?;
        versions.dedup();
        Ok(versions)
    }

    /// Rolling computation across revisions has no definition yet.
    pub fn slide<F>(&self, _f: F, _size: WindowSize) -> Result<Archive>
    where
        F: Fn(&[f64]) -> f64,
    {
        Err(EpiError::Unsupported("sliding over an archive"))
    }
}
