//! Command implementations for the epi CLI.
//!
//! `fetch` downloads one or more Epidata signals into a cached CSV, and
//! `dataset` does the same for the named example datasets. The other
//! subcommands load a CSV as a snapshot and transform it.

use chrono::NaiveDate;
use clap::Subcommand;
use epi_data::{keys::GEO_VALUE, Aggregate, FillMethod, WindowSize};
use epi_utils::dates::parse_date_flexible;
use fetch::SignalColumn;
use presets::Dataset;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub mod cache;
pub mod fetch;
pub mod presets;
pub mod transform;

#[derive(Subcommand)]
pub enum Command {
    /// Fetch Epidata signals into one CSV (skipped when the file exists)
    Fetch {
        /// Data source, e.g. jhu-csse
        #[arg(long)]
        source: String,

        /// SIGNAL or SIGNAL=COLUMN, e.g. confirmed_incidence_num=cases;
        /// repeat to join several signals
        #[arg(long = "signal", required = true)]
        signals: Vec<SignalColumn>,

        #[arg(long, default_value = "state")]
        geo_type: String,

        #[arg(long, default_value = "day")]
        time_type: String,

        /// Comma-separated locations, or * for all
        #[arg(short = 'g', long, value_delimiter = ',', default_value = "*")]
        geo_values: Vec<String>,

        #[arg(long, value_parser = parse_date_flexible)]
        start: NaiveDate,

        #[arg(long, value_parser = parse_date_flexible)]
        end: NaiveDate,

        /// First issue date; with --issues-end, keeps revisions as `version`
        #[arg(long, value_parser = parse_date_flexible, requires = "issues_end")]
        issues_start: Option<NaiveDate>,

        #[arg(long, value_parser = parse_date_flexible, requires = "issues_start")]
        issues_end: Option<NaiveDate>,

        /// Data as it stood on this date
        #[arg(long, value_parser = parse_date_flexible, conflicts_with = "issues_start")]
        as_of: Option<NaiveDate>,

        /// Output path for the observations CSV
        #[arg(short = 'o', long)]
        output: PathBuf,

        #[arg(long, default_value = fetch::EPIDATA_BASE_URL)]
        base_url: String,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 60)]
        timeout: u64,
    },

    /// Fetch one of the example datasets into <DIR>/<name>.csv
    Dataset {
        #[arg(value_enum)]
        name: Dataset,

        #[arg(short = 'd', long, default_value = "data")]
        dir: PathBuf,

        #[arg(long, default_value = fetch::EPIDATA_BASE_URL)]
        base_url: String,

        #[arg(long, default_value_t = 60)]
        timeout: u64,
    },

    /// Sum a snapshot's numeric columns per value of one key
    Summarize {
        #[arg(short = 'i', long)]
        input: PathBuf,

        #[arg(short = 'k', long, default_value = GEO_VALUE)]
        key: String,

        #[arg(long, value_delimiter = ',')]
        extra_keys: Vec<String>,

        #[arg(long, value_parser = parse_date_flexible)]
        as_of: Option<NaiveDate>,

        /// Print JSON records instead of CSV
        #[arg(long)]
        json: bool,
    },

    /// Fill in missing days for every series, optionally filling values
    Complete {
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// Output path; stdout when omitted
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Column to fill after completion
        #[arg(long)]
        fill: Option<String>,

        /// ffill or bfill
        #[arg(long, default_value = "ffill")]
        method: FillMethod,

        #[arg(long, value_delimiter = ',')]
        extra_keys: Vec<String>,

        #[arg(long, value_parser = parse_date_flexible)]
        as_of: Option<NaiveDate>,
    },

    /// Rolling aggregate of every numeric column within each series
    Slide {
        #[arg(short = 'i', long)]
        input: PathBuf,

        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Row count (7) or calendar span (7d)
        #[arg(short = 'w', long)]
        window: WindowSize,

        /// mean, sum, min, max, std or var
        #[arg(short = 'a', long, default_value = "mean")]
        aggregate: Aggregate,

        #[arg(long, value_delimiter = ',')]
        extra_keys: Vec<String>,

        #[arg(long, value_parser = parse_date_flexible)]
        as_of: Option<NaiveDate>,
    },
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Fetch {
            source,
            signals,
            geo_type,
            time_type,
            geo_values,
            start,
            end,
            issues_start,
            issues_end,
            as_of,
            output,
            base_url,
            timeout,
        } => {
            let request = fetch::FetchRequest {
                source,
                signal: signals.first().map(|s| s.signal.clone()).unwrap_or_default(),
                geo_type,
                time_type,
                geo_values,
                time_range: (start, end),
                issue_range: issues_start.zip(issues_end),
                as_of,
            };
            fetch_to(&output, &request, &signals, &base_url, timeout).await
        }
        Command::Dataset {
            name,
            dir,
            base_url,
            timeout,
        } => {
            let output = dir.join(name.file_name());
            let request = name.request()?;
            fetch_to(&output, &request, &name.signals(), &base_url, timeout).await
        }
        Command::Summarize {
            input,
            key,
            extra_keys,
            as_of,
            json,
        } => transform::run_summarize(&input, &key, as_of, &extra_keys, json),
        Command::Complete {
            input,
            output,
            fill,
            method,
            extra_keys,
            as_of,
        } => transform::run_complete(
            &input,
            output.as_deref(),
            fill.as_deref().map(|column| (column, method)),
            as_of,
            &extra_keys,
        ),
        Command::Slide {
            input,
            output,
            window,
            aggregate,
            extra_keys,
            as_of,
        } => transform::run_slide(
            &input,
            output.as_deref(),
            aggregate,
            window,
            as_of,
            &extra_keys,
        ),
    }
}

async fn fetch_to(
    output: &Path,
    request: &fetch::FetchRequest,
    signals: &[SignalColumn],
    base_url: &str,
    timeout: u64,
) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout))
        .build()?;
    cache::cached(output, || fetch::fetch_merged(&client, base_url, request, signals)).await?;
    Ok(())
}
