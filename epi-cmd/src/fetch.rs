//! Epidata `covidcast` client.
//!
//! Downloads signals as CSV and shapes them into a flat observation table
//! with `geo_value`, `time_value`, optionally `version`, and one value column
//! per signal.

use anyhow::{bail, Context};
use chrono::NaiveDate;
use epi_data::{
    io,
    keys::{GEO_VALUE, TIME_VALUE, VERSION},
    merge,
};
use epi_utils::dates::{format_date_compact, format_epirange, parse_date_compact, parse_date_flexible};
use log::{info, warn};
use polars::prelude::*;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::{str::FromStr, time::Duration};

/// Default Epidata API endpoint.
pub const EPIDATA_BASE_URL: &str = "https://api.delphi.cmu.edu/epidata/";

/// Column Epidata uses for the issue date of a revision.
const ISSUE: &str = "issue";
/// Column Epidata uses for the observed value.
const VALUE: &str = "value";

/// One signal over a set of locations and a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// e.g. "jhu-csse"
    pub source: String,
    /// e.g. "confirmed_incidence_num"
    pub signal: String,
    /// e.g. "state"
    pub geo_type: String,
    /// e.g. "day"
    pub time_type: String,
    pub geo_values: Vec<String>,
    pub time_range: (NaiveDate, NaiveDate),
    /// Restrict to revisions issued in this window; keeps the `version` column.
    pub issue_range: Option<(NaiveDate, NaiveDate)>,
    /// Ask for the data as it stood on this date.
    pub as_of: Option<NaiveDate>,
}

impl FetchRequest {
    pub fn url(&self, base_url: &str) -> String {
        let mut url = format!(
            "{}covidcast/?data_source={}&signals={}&geo_type={}&time_type={}&geo_values={}&time_values={}",
            base_url,
            self.source,
            self.signal,
            self.geo_type,
            self.time_type,
            self.geo_values.join(","),
            format_epirange(&self.time_range.0, &self.time_range.1),
        );
        if let Some((start, end)) = &self.issue_range {
            url.push_str(&format!("&issues={}", format_epirange(start, end)));
        }
        if let Some(as_of) = &self.as_of {
            url.push_str(&format!("&as_of={}", format_date_compact(as_of)));
        }
        url.push_str("&format=csv");
        url
    }

    /// Keys a fetched table is unique on.
    pub fn join_keys(&self) -> Vec<&'static str> {
        if self.issue_range.is_some() {
            vec![GEO_VALUE, TIME_VALUE, VERSION]
        } else {
            vec![GEO_VALUE, TIME_VALUE]
        }
    }

    fn for_signal(&self, signal: &str) -> FetchRequest {
        FetchRequest {
            signal: signal.to_string(),
            ..self.clone()
        }
    }
}

/// A signal and the column its values land in: `signal=column`.
/// A bare `signal` names its column after itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalColumn {
    pub signal: String,
    pub value_name: String,
}

impl SignalColumn {
    pub fn new(signal: &str, value_name: &str) -> Self {
        SignalColumn {
            signal: signal.to_string(),
            value_name: value_name.to_string(),
        }
    }
}

impl FromStr for SignalColumn {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let (signal, value_name) = match s.split_once('=') {
            Some((signal, column)) => (signal.trim(), column.trim()),
            None => (s.trim(), s.trim()),
        };
        if signal.is_empty() || value_name.is_empty() {
            bail!("expected SIGNAL or SIGNAL=COLUMN, got {s:?}");
        }
        Ok(SignalColumn::new(signal, value_name))
    }
}

/// Download the raw CSV body, with retry and exponential backoff.
pub async fn fetch_csv(client: &Client, base_url: &str, request: &FetchRequest) -> anyhow::Result<String> {
    let max_tries = 3;
    let mut sleep_millis: u64 = 1000;
    let url = request.url(base_url);

    for attempt in 1..=max_tries {
        info!(
            "Fetching {}:{} for {} (attempt {}/{})",
            request.source,
            request.signal,
            request.geo_values.join(","),
            attempt,
            max_tries
        );
        match client.get(&url).send().await {
            Ok(response) if response.status() == StatusCode::OK => match response.text().await {
                Ok(body) if body.trim().is_empty() => {
                    warn!("Attempt {}/{}: Empty response for {}", attempt, max_tries, url);
                }
                Ok(body) => return Ok(body),
                Err(e) => {
                    warn!("Attempt {}/{}: Failed to read body: {}", attempt, max_tries, e);
                }
            },
            Ok(response) => {
                warn!(
                    "Attempt {}/{}: Bad response status: {}",
                    attempt,
                    max_tries,
                    response.status()
                );
            }
            Err(e) => {
                warn!("Attempt {}/{}: Request failed: {}", attempt, max_tries, e);
            }
        }
        if attempt < max_tries {
            tokio::time::sleep(Duration::from_millis(sleep_millis)).await;
            sleep_millis *= 2;
        }
    }
    bail!("giving up on {} after {} attempts", url, max_tries)
}

/// Fetch one signal and shape it with [`normalize`].
pub async fn fetch_series(
    client: &Client,
    base_url: &str,
    request: &FetchRequest,
    value_name: &str,
) -> anyhow::Result<DataFrame> {
    let body = fetch_csv(client, base_url, request).await?;
    let raw = io::from_csv_str(&body, &[]).context("Epidata response is not a CSV table")?;
    normalize(raw, value_name, request.issue_range.is_some())
}

/// Fetch several signals of one source, one after another, and join them
/// into a wide table on the request's keys.
pub async fn fetch_merged(
    client: &Client,
    base_url: &str,
    request: &FetchRequest,
    signals: &[SignalColumn],
) -> anyhow::Result<DataFrame> {
    let mut frames = Vec::with_capacity(signals.len());
    for signal in signals {
        let single = request.for_signal(&signal.signal);
        frames.push(fetch_series(client, base_url, &single, &signal.value_name).await?);
    }
    let merged = merge(frames, &request.join_keys()).context("joining signals")?;
    info!(
        "Merged {} signals into {} rows",
        signals.len(),
        merged.height()
    );
    Ok(merged)
}

/// Shape a raw Epidata table into observations.
///
/// `issue` becomes `version` (kept only when `keep_version` is set),
/// `value` becomes `value_name`, and time columns are turned into dates.
pub fn normalize(mut raw: DataFrame, value_name: &str, keep_version: bool) -> anyhow::Result<DataFrame> {
    raw.rename(VALUE, value_name.into())
        .context("Epidata response has no value column")?;
    let mut keep = vec![GEO_VALUE, TIME_VALUE];
    if keep_version {
        raw.rename(ISSUE, VERSION.into())
            .context("Epidata response has no issue column")?;
        keep.push(VERSION);
    }
    keep.push(value_name);
    let mut table = raw.select(keep)?;
    for name in [TIME_VALUE, VERSION] {
        let dates = match table.column(name) {
            Ok(column) => to_dates(column).with_context(|| format!("column {name}"))?,
            Err(_) => continue,
        };
        table.with_column(dates)?;
    }
    info!("Normalized {} observations of {}", table.height(), value_name);
    Ok(table)
}

/// Epidata dates arrive as compact `YYYYMMDD` integers or as dashed strings.
fn to_dates(column: &Column) -> anyhow::Result<Series> {
    let series = column.as_materialized_series();
    let dates: Vec<Option<NaiveDate>> = match series.dtype() {
        DataType::Date => return Ok(series.clone()),
        DataType::Int64 => series
            .i64()?
            .into_iter()
            .map(|v| v.map(|i| parse_date_compact(&i.to_string())).transpose())
            .collect::<anyhow::Result<_>>()?,
        DataType::String => series
            .str()?
            .into_iter()
            .map(|v| v.map(parse_date_flexible).transpose())
            .collect::<anyhow::Result<_>>()?,
        other => bail!("expected dates, found {other}"),
    };
    Ok(Series::new(series.name().clone(), dates))
}
