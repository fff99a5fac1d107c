//! Trailing-window sizes, built-in aggregates and the per-series rolling kernel.

use crate::error::{EpiError, Result};
use chrono::{NaiveDate, TimeDelta};
use polars::prelude::{
    lit, when, ClosedWindow, DataType, Duration, Expr, RollingOptionsDynamicWindow,
    RollingOptionsFixedWindow, NULL,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// How far back a trailing window reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSize {
    /// The current row and up to `n - 1` preceding rows.
    Rows(usize),
    /// Rows whose time lies in `(t - d, t]`.
    Duration(TimeDelta),
}

impl WindowSize {
    pub(crate) fn check(&self) -> Result<()> {
        match self {
            WindowSize::Rows(0) => Err(EpiError::InvalidArgument(
                "window must hold at least one row".to_string(),
            )),
            WindowSize::Duration(d) if *d < TimeDelta::days(1) => Err(EpiError::InvalidArgument(
                format!("window duration must be at least one day, got {d}"),
            )),
            _ => Ok(()),
        }
    }
}

impl FromStr for WindowSize {
    type Err = EpiError;

    /// `"7"` is seven rows, `"7d"` is seven days.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let size = if s.ends_with('d') {
            epi_utils::dates::parse_days(s)
                .map(WindowSize::Duration)
                .map_err(|e| EpiError::InvalidArgument(format!("window size {s:?}: {e}")))?
        } else {
            s.parse::<usize>()
                .map(WindowSize::Rows)
                .map_err(|e| EpiError::InvalidArgument(format!("window size {s:?}: {e}")))?
        };
        size.check()?;
        Ok(size)
    }
}

/// Built-in window aggregates.
///
/// `Std` and `Var` are sample statistics and are undefined for a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Mean,
    Sum,
    Min,
    Max,
    Std,
    Var,
}

impl Aggregate {
    pub fn apply(&self, values: &[f64]) -> f64 {
        let n = values.len() as f64;
        match self {
            Aggregate::Sum => values.iter().sum(),
            Aggregate::Mean => values.iter().sum::<f64>() / n,
            Aggregate::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregate::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregate::Var => sample_variance(values),
            Aggregate::Std => sample_variance(values).sqrt(),
        }
    }

    /// The polars rolling expression for `value` over a fixed row count.
    /// A window counts as soon as it holds one non-null value.
    pub(crate) fn rolling_rows(&self, value: Expr, rows: usize) -> Expr {
        let options = RollingOptionsFixedWindow {
            window_size: rows,
            min_periods: 1,
            ..Default::default()
        };
        let count = present(&value).rolling_sum(options.clone());
        let stat = match self {
            Aggregate::Mean => value.rolling_mean(options),
            Aggregate::Sum => value.rolling_sum(options),
            Aggregate::Min => value.rolling_min(options),
            Aggregate::Max => value.rolling_max(options),
            Aggregate::Std => value.rolling_std(options),
            Aggregate::Var => value.rolling_var(options),
        };
        self.mask_undefined(stat, count)
    }

    /// The polars rolling expression for `value` over `(t - days, t]` of `by`.
    pub(crate) fn rolling_by(&self, value: Expr, by: Expr, days: i64) -> Expr {
        let options = RollingOptionsDynamicWindow {
            window_size: Duration::parse(&format!("{days}d")),
            min_periods: 1,
            closed_window: ClosedWindow::Right,
            fn_params: None,
        };
        let count = present(&value).rolling_sum_by(by.clone(), options.clone());
        let stat = match self {
            Aggregate::Mean => value.rolling_mean_by(by, options),
            Aggregate::Sum => value.rolling_sum_by(by, options),
            Aggregate::Min => value.rolling_min_by(by, options),
            Aggregate::Max => value.rolling_max_by(by, options),
            Aggregate::Std => value.rolling_std_by(by, options),
            Aggregate::Var => value.rolling_var_by(by, options),
        };
        self.mask_undefined(stat, count)
    }

    /// Sample statistics need two values; null out windows with fewer.
    fn mask_undefined(&self, stat: Expr, count: Expr) -> Expr {
        match self {
            Aggregate::Std | Aggregate::Var => when(count.lt(lit(2.0)))
                .then(lit(NULL))
                .otherwise(stat),
            _ => stat,
        }
    }
}

fn present(value: &Expr) -> Expr {
    value.clone().is_not_null().cast(DataType::Float64)
}

fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
}

impl FromStr for Aggregate {
    type Err = EpiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Aggregate::Mean),
            "sum" => Ok(Aggregate::Sum),
            "min" => Ok(Aggregate::Min),
            "max" => Ok(Aggregate::Max),
            "std" => Ok(Aggregate::Std),
            "var" => Ok(Aggregate::Var),
            other => Err(EpiError::InvalidArgument(format!("unknown aggregate {other:?}"))),
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aggregate::Mean => "mean",
            Aggregate::Sum => "sum",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
            Aggregate::Std => "std",
            Aggregate::Var => "var",
        };
        f.write_str(name)
    }
}

/// Roll an arbitrary `f` over one time series.
///
/// `cells` and `times` are the series' values and dates in time order
/// (`times` is only consulted for duration windows). Missing cells are left
/// out of each window; a window with nothing left, or whose result is NaN,
/// yields a missing value.
pub(crate) fn rolling<F>(
    cells: &[Option<f64>],
    times: &[NaiveDate],
    size: WindowSize,
    f: F,
) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    let mut start = 0;
    let mut window: Vec<f64> = Vec::new();
    (0..cells.len())
        .map(|i| {
            start = match size {
                WindowSize::Rows(n) => (i + 1).saturating_sub(n),
                WindowSize::Duration(d) => {
                    while times[i] - times[start] >= d {
                        start += 1;
                    }
                    start
                }
            };
            window.clear();
            window.extend(cells[start..=i].iter().flatten());
            if window.is_empty() {
                None
            } else {
                Some(f(&window)).filter(|v| !v.is_nan())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(n: u32) -> Vec<NaiveDate> {
        (1..=n)
            .map(|d| NaiveDate::from_ymd_opt(2020, 3, d).unwrap())
            .collect()
    }

    fn values(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_window_size_from_str() {
        assert_eq!("7".parse::<WindowSize>().unwrap(), WindowSize::Rows(7));
        assert_eq!(
            "14d".parse::<WindowSize>().unwrap(),
            WindowSize::Duration(TimeDelta::try_days(14).unwrap())
        );
        assert!("0".parse::<WindowSize>().is_err());
        assert!("0d".parse::<WindowSize>().is_err());
        assert!("week".parse::<WindowSize>().is_err());
    }

    #[test]
    fn test_aggregate_parse_and_apply() {
        let agg: Aggregate = "Mean".parse().unwrap();
        assert_eq!(agg, Aggregate::Mean);
        assert_eq!(agg.apply(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(Aggregate::Var.apply(&[1.0, 2.0, 3.0]), 1.0);
        assert!(Aggregate::Std.apply(&[1.0]).is_nan());
        assert!("median".parse::<Aggregate>().is_err());
    }

    #[test]
    fn test_rolling_rows_has_no_leading_gaps() {
        let out = rolling(&values(&[1.0, 2.0, 3.0, 4.0]), &days(4), WindowSize::Rows(3), |w| {
            Aggregate::Sum.apply(w)
        });
        assert_eq!(out, values(&[1.0, 3.0, 6.0, 9.0]));
    }

    #[test]
    fn test_rolling_duration_follows_dates() {
        let times = vec![
            NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 3, 2).unwrap(),
            NaiveDate::from_ymd_opt(2020, 3, 5).unwrap(),
        ];
        let out = rolling(
            &values(&[1.0, 2.0, 4.0]),
            &times,
            WindowSize::Duration(TimeDelta::try_days(2).unwrap()),
            |w| Aggregate::Sum.apply(w),
        );
        assert_eq!(out, values(&[1.0, 3.0, 4.0]));
    }

    #[test]
    fn test_rolling_skips_missing_cells() {
        let cells = vec![None, Some(2.0), None];
        let out = rolling(&cells, &days(3), WindowSize::Rows(1), |w| {
            Aggregate::Mean.apply(w)
        });
        assert_eq!(out, vec![None, Some(2.0), None]);
    }

    #[test]
    fn test_rolling_undefined_statistic_is_missing() {
        let out = rolling(&values(&[1.0, 3.0]), &days(2), WindowSize::Rows(2), |w| {
            Aggregate::Std.apply(w)
        });
        assert_eq!(out[0], None);
        assert_eq!(out[1], Some(2f64.sqrt()));
    }
}
