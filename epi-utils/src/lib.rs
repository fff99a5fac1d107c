//! Shared utility functions for epiprocess crates.

pub mod date_range;

pub use date_range::DateRange;

/// Date utility functions
pub mod dates {
    use anyhow::Context;
    use chrono::{NaiveDate, TimeDelta};

    /// Format a NaiveDate as "YYYYMMDD" (Epidata compact format)
    pub fn format_date_compact(date: &NaiveDate) -> String {
        date.format("%Y%m%d").to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s, "%Y-%m-%d")?)
    }

    /// Parse a date string in "YYYYMMDD" format (Epidata compact format)
    pub fn parse_date_compact(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s, "%Y%m%d")?)
    }

    /// Parse either "YYYY-MM-DD" or "YYYYMMDD".
    ///
    /// Epidata answers with compact integers in some formats and dashed
    /// dates in others.
    pub fn parse_date_flexible(s: &str) -> anyhow::Result<NaiveDate> {
        let s = s.trim();
        let parsed = if s.contains('-') {
            parse_date(s)
        } else {
            parse_date_compact(s)
        };
        parsed.with_context(|| format!("not a date: {s:?}"))
    }

    /// Format an inclusive date range the way Epidata expects it:
    /// "YYYYMMDD-YYYYMMDD"
    pub fn format_epirange(start: &NaiveDate, end: &NaiveDate) -> String {
        format!("{}-{}", format_date_compact(start), format_date_compact(end))
    }

    /// Parse a window length such as "7d" into a duration in days.
    pub fn parse_days(s: &str) -> anyhow::Result<TimeDelta> {
        let digits = s
            .trim()
            .strip_suffix('d')
            .with_context(|| format!("expected a day count like \"7d\", got {s:?}"))?;
        let days: i64 = digits.parse()?;
        TimeDelta::try_days(days).with_context(|| format!("day count out of range: {days}"))
    }

}
