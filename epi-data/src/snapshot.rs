use crate::{
    error::{EpiError, Result},
    fill::FillMethod,
    keys::{self, GEO_VALUE, TIME_VALUE, TOTAL_GEO, TOTAL_TIME},
    window::{self, Aggregate, WindowSize},
};
use chrono::NaiveDate;
use epi_utils::DateRange;
use log::debug;
use polars::prelude::*;

/// Observations as known at one point in time.
///
/// The table is keyed by `[geo_value, *extra_keys, time_value]`: key columns
/// first, rows sorted by that key, every key tuple unique. `as_of` records
/// the date the whole snapshot is considered observed. Operations that keep
/// the table's shape return a new `Snapshot` carrying the same `as_of`.
#[derive(Debug, Clone)]
pub struct Snapshot {
    table: DataFrame,
    key: Vec<String>,
    as_of: NaiveDate,
}

impl Snapshot {
    pub const REQUIRED: [&'static str; 2] = [GEO_VALUE, TIME_VALUE];

    pub fn validate(table: &DataFrame) -> Result<()> {
        keys::validate(table, &Self::REQUIRED)
    }

    /// Turn a raw table into a snapshot.
    ///
    /// Without an explicit `as_of` the latest `time_value` is used, which
    /// requires the time values to be dates. Promoting a snapshot's own table
    /// again yields the same key and row order.
    pub fn promote(
        table: DataFrame,
        as_of: Option<NaiveDate>,
        extra_keys: &[&str],
    ) -> Result<Snapshot> {
        Self::validate(&table)?;
        let as_of = match as_of {
            Some(as_of) => as_of,
            None => latest_time(&table)?,
        };
        let key = keys::canonical_key(&[GEO_VALUE], extra_keys)?;
        let table = keys::rekey(table, &key)?;
        debug!(
            "snapshot: {} rows keyed by {:?}, as of {}",
            table.height(),
            key,
            as_of
        );
        Ok(Snapshot { table, key, as_of })
    }

    pub fn table(&self) -> &DataFrame {
        &self.table
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn into_table(self) -> DataFrame {
        self.table
    }

    pub fn with_as_of(self, as_of: NaiveDate) -> Snapshot {
        Snapshot { as_of, ..self }
    }

    fn derive(&self, table: DataFrame) -> Snapshot {
        Snapshot {
            table,
            key: self.key.clone(),
            as_of: self.as_of,
        }
    }

    /// Key field names, most significant first, minus `exclude`.
    pub fn keys(&self, exclude: &[&str]) -> Vec<&str> {
        self.key
            .iter()
            .map(String::as_str)
            .filter(|name| !exclude.contains(name))
            .collect()
    }

    /// Group by every key field not in `exclude`, groups in key order.
    ///
    /// `group(&[TIME_VALUE])` yields one group per time series.
    pub fn group(&self, exclude: &[&str]) -> Result<GroupBy<'_>> {
        Ok(self.table.group_by_stable(self.keys(exclude))?)
    }

    fn series_keys(&self) -> Vec<&str> {
        self.keys(&[TIME_VALUE])
    }

    /// Run `f` on each time series and stack the results in key order.
    fn map_series<F>(&self, mut f: F) -> Result<DataFrame>
    where
        F: FnMut(DataFrame) -> Result<DataFrame>,
    {
        let mut out: Option<DataFrame> = None;
        for part in self.table.partition_by_stable(self.series_keys(), true)? {
            let mapped = f(part)?;
            match out.as_mut() {
                Some(acc) => {
                    acc.vstack_mut(&mapped)?;
                }
                None => out = Some(mapped),
            }
        }
        Ok(out.unwrap_or_else(|| self.table.clone()))
    }

    /// Apply `f` over a trailing window of each time series.
    ///
    /// Every numeric data column is replaced by its windowed aggregate as
    /// `f64`; other columns pass through. A window holds at least the
    /// current row, and never reaches into another series.
    pub fn slide<F>(&self, f: F, size: WindowSize) -> Result<Snapshot>
    where
        F: Fn(&[f64]) -> f64,
    {
        size.check()?;
        if self.table.height() == 0 {
            return Ok(self.clone());
        }
        let values = keys::numeric_values(&self.table, &self.key);
        let out = self.map_series(|mut part| {
            let times = match size {
                WindowSize::Rows(_) => Vec::new(),
                WindowSize::Duration(_) => keys::dates(&part, TIME_VALUE)?,
            };
            for name in &values {
                let cast = part.column(name)?.cast(&DataType::Float64)?;
                let cells: Vec<Option<f64>> = cast.as_materialized_series().f64()?.to_vec();
                let rolled = window::rolling(&cells, &times, size, &f);
                part.with_column(Series::new(name.as_str().into(), rolled))?;
            }
            Ok(part)
        })?;
        debug!("slide: {} numeric columns, window {:?}", values.len(), size);
        Ok(self.derive(out))
    }

    /// [`Snapshot::slide`] with one of the built-in aggregates, evaluated as
    /// polars rolling expressions over each series.
    pub fn slide_with(&self, aggregate: Aggregate, size: WindowSize) -> Result<Snapshot> {
        size.check()?;
        if self.table.height() == 0 {
            return Ok(self.clone());
        }
        if let WindowSize::Duration(_) = size {
            // rolling by time needs a null-free date column
            keys::dates(&self.table, TIME_VALUE)?;
        }
        let over = keys::cols(&self.series_keys());
        let rolled: Vec<Expr> = keys::numeric_values(&self.table, &self.key)
            .iter()
            .map(|name| {
                let value = col(name.as_str()).cast(DataType::Float64);
                let windowed = match size {
                    WindowSize::Rows(n) => aggregate.rolling_rows(value, n),
                    WindowSize::Duration(d) => {
                        aggregate.rolling_by(value, col(TIME_VALUE), d.num_days())
                    }
                };
                windowed
                    .fill_nan(lit(NULL))
                    .over(over.clone())
                    .alias(name.as_str())
            })
            .collect();
        let out = self.table.clone().lazy().with_columns(rolled).collect()?;
        debug!("slide_with: {aggregate} over {size:?}");
        Ok(self.derive(out))
    }

    /// Densify the time axis.
    ///
    /// Every series gets one row per day from the earliest to the latest
    /// `time_value` found anywhere in the table. Introduced rows hold nulls;
    /// nothing is interpolated.
    pub fn complete(&self) -> Result<Snapshot> {
        let dates = keys::dates(&self.table, TIME_VALUE)?;
        let (Some(&min_t), Some(&max_t)) = (dates.iter().min(), dates.iter().max()) else {
            return Ok(self.clone());
        };
        let days: Vec<NaiveDate> = DateRange::new(min_t, max_t).collect();
        let n_days = days.len();
        let axis = DataFrame::new(vec![Series::new(TIME_VALUE.into(), days).into_column()])?;
        let order: Vec<Expr> = self
            .table
            .get_column_names()
            .iter()
            .map(|name| col(name.as_str()))
            .collect();
        let out = self
            .table
            .clone()
            .lazy()
            .select(keys::cols(&self.series_keys()))
            .unique_stable(None, UniqueKeepStrategy::First)
            .cross_join(axis.lazy(), None)
            .join(
                self.table.clone().lazy(),
                keys::cols(&self.key),
                keys::cols(&self.key),
                JoinArgs::new(JoinType::Left),
            )
            .select(order)
            .sort_by_exprs(keys::cols(&self.key), keys::stable_sort())
            .collect()?;
        debug!(
            "complete: {} rows, {} days from {} to {}",
            out.height(),
            n_days,
            min_t,
            max_t
        );
        Ok(self.derive(out))
    }

    /// Fill the gaps of `value_column` within each time series.
    pub fn fill(&self, value_column: &str, method: FillMethod) -> Result<Snapshot> {
        if !keys::has_column(&self.table, value_column) || self.key.iter().any(|k| k == value_column)
        {
            return Err(EpiError::InvalidArgument(format!(
                "no data column named {value_column:?}"
            )));
        }
        let out = self.map_series(|mut part| {
            let filled = part
                .column(value_column)?
                .as_materialized_series()
                .fill_null(method.strategy())?;
            part.with_column(filled)?;
            Ok(part)
        })?;
        Ok(self.derive(out))
    }

    /// Sum every numeric data column within groups of `key`.
    ///
    /// The result leads with `[geo_value, time_value]`. A dimension the
    /// roll-up collapses gets a placeholder: `"total"` for `geo_value`, `0`
    /// for `time_value`. Non-numeric columns are dropped.
    pub fn sum_group(&self, key: &str) -> Result<DataFrame> {
        if !keys::has_column(&self.table, key) {
            return Err(EpiError::InvalidArgument(format!("no field named {key:?}")));
        }
        let mut skip = self.key.clone();
        skip.push(key.to_string());
        let values = keys::numeric_values(&self.table, &skip);

        let mut sums = self
            .table
            .clone()
            .lazy()
            .group_by([col(key)])
            .agg(values.iter().map(|v| col(v.as_str()).sum()).collect::<Vec<_>>());
        if key != GEO_VALUE {
            sums = sums.with_column(lit(TOTAL_GEO).alias(GEO_VALUE));
        }
        if key != TIME_VALUE {
            sums = sums.with_column(lit(TOTAL_TIME).cast(DataType::Int64).alias(TIME_VALUE));
        }
        let mut order = vec![GEO_VALUE.to_string(), TIME_VALUE.to_string()];
        if key != GEO_VALUE && key != TIME_VALUE {
            order.push(key.to_string());
        }
        order.extend(values);
        let out = sums
            .select(keys::cols(&order))
            .sort_by_exprs([col(key)], keys::stable_sort())
            .collect()?;
        debug!("sum_group {key:?}: {} groups", out.height());
        Ok(out)
    }
}

fn latest_time(table: &DataFrame) -> Result<NaiveDate> {
    let time = table.column(TIME_VALUE)?;
    if time.dtype() != &DataType::Date {
        return Err(EpiError::InvalidArgument(format!(
            "cannot infer as_of from {} time_value; pass it explicitly",
            time.dtype()
        )));
    }
    time.as_materialized_series()
        .date()?
        .as_date_iter()
        .flatten()
        .max()
        .ok_or_else(|| {
            EpiError::InvalidArgument(
                "cannot infer as_of from a table without time values".to_string(),
            )
        })
}
