//! The example datasets the library is demonstrated on, as canned Epidata
//! requests.

use crate::fetch::{FetchRequest, SignalColumn};
use chrono::NaiveDate;
use clap::ValueEnum;
use epi_utils::dates::parse_date_compact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Dataset {
    /// Doctor-visit CLI percentages with their revision history
    DvSubset,
    /// 7-day case rates with their revision history
    CaseRateSubset,
    /// Daily FL and NJ case counts containing reporting outliers
    IncidenceNumOutlierExample,
    /// Daily cases, case rates and death rates for six states
    JhuCsseDailySubset,
}

impl Dataset {
    pub fn file_name(&self) -> &'static str {
        match self {
            Dataset::DvSubset => "dv_subset.csv",
            Dataset::CaseRateSubset => "case_rate_subset.csv",
            Dataset::IncidenceNumOutlierExample => "incidence_num_outlier_example.csv",
            Dataset::JhuCsseDailySubset => "jhu_csse_daily_subset.csv",
        }
    }

    /// The request shared by every signal of the dataset; its `signal` is
    /// the first of [`Dataset::signals`].
    pub fn request(&self) -> anyhow::Result<FetchRequest> {
        let signals = self.signals();
        let first = signals.first().map(|s| s.signal.clone()).unwrap_or_default();
        let request = match self {
            Dataset::DvSubset => FetchRequest {
                issue_range: Some(range("20200601", "20211201")?),
                ..request("doctor-visits", first, &["ca", "fl", "ny", "tx"], range("20200601", "20211201")?)
            },
            Dataset::CaseRateSubset => FetchRequest {
                issue_range: Some(range("20200601", "20211201")?),
                ..request("jhu-csse", first, &["ca", "fl", "ny", "tx"], range("20200601", "20211201")?)
            },
            Dataset::IncidenceNumOutlierExample => FetchRequest {
                as_of: Some(parse_date_compact("20211028")?),
                ..request("jhu-csse", first, &["fl", "nj"], range("20200601", "20210531")?)
            },
            Dataset::JhuCsseDailySubset => request(
                "jhu-csse",
                first,
                &["ca", "fl", "ny", "tx", "ga", "pa"],
                range("20200301", "20211231")?,
            ),
        };
        Ok(request)
    }

    pub fn signals(&self) -> Vec<SignalColumn> {
        match self {
            Dataset::DvSubset => vec![SignalColumn::new("smoothed_adj_cli", "percent_cli")],
            Dataset::CaseRateSubset => {
                vec![SignalColumn::new("confirmed_7dav_incidence_prop", "case_rate_7d_av")]
            }
            Dataset::IncidenceNumOutlierExample => {
                vec![SignalColumn::new("confirmed_incidence_num", "cases")]
            }
            Dataset::JhuCsseDailySubset => vec![
                SignalColumn::new("confirmed_incidence_num", "cases"),
                SignalColumn::new("confirmed_7dav_incidence_num", "cases_7d_av"),
                SignalColumn::new("confirmed_7dav_incidence_prop", "case_rate_7d_av"),
                SignalColumn::new("deaths_7dav_incidence_prop", "death_rate_7d_av"),
            ],
        }
    }
}

fn request(
    source: &str,
    signal: String,
    geo_values: &[&str],
    time_range: (NaiveDate, NaiveDate),
) -> FetchRequest {
    FetchRequest {
        source: source.to_string(),
        signal,
        geo_type: "state".to_string(),
        time_type: "day".to_string(),
        geo_values: geo_values.iter().map(|g| g.to_string()).collect(),
        time_range,
        issue_range: None,
        as_of: None,
    }
}

fn range(start: &str, end: &str) -> anyhow::Result<(NaiveDate, NaiveDate)> {
    Ok((parse_date_compact(start)?, parse_date_compact(end)?))
}
