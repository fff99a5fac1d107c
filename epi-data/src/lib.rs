//! Snapshot and archive views of epidemiological time series.
//!
//! A raw polars [`DataFrame`](polars::prelude::DataFrame) is promoted into
//! one of two views:
//!
//! - [`Snapshot`]: one row per (location, extra keys, time), as observed on
//!   a single as-of date. Supports grouped rolling windows, gap completion,
//!   directional fills and roll-ups.
//! - [`Archive`]: one row per (version, location, extra keys, time), the
//!   full revision history.
//!
//! ```rust
//! use epi_data::{io, keys::GEO_VALUE, Snapshot};
//!
//! let table = io::from_csv_str("\
//! geo_value,time_value,cases
//! ca,2021-12-30,10
//! ca,2021-12-31,20
//! fl,2021-12-31,5
//! ", &[]).unwrap();
//! let snap = Snapshot::promote(table, None, &[]).unwrap();
//! assert_eq!(snap.as_of().to_string(), "2021-12-31");
//!
//! let totals = snap.sum_group(GEO_VALUE).unwrap();
//! let cases: Vec<Option<i64>> = totals
//!     .column("cases").unwrap()
//!     .as_materialized_series()
//!     .i64().unwrap()
//!     .to_vec();
//! assert_eq!(cases, vec![Some(30), Some(5)]);
//! ```

pub mod archive;
pub mod error;
pub mod fill;
pub mod io;
pub mod keys;
pub mod merge;
pub mod snapshot;
pub mod window;

pub use archive::Archive;
pub use error::{EpiError, Result};
pub use fill::FillMethod;
pub use merge::merge;
pub use snapshot::Snapshot;
pub use window::{Aggregate, WindowSize};
