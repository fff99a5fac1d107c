//! Combining several single-signal tables into one wide table.

use crate::{
    error::{EpiError, Result},
    keys,
};
use log::debug;
use polars::prelude::*;

/// Inner-join `frames` on the shared fields `on`, left to right.
///
/// Every frame must carry all of `on`. Rows present in only some frames are
/// dropped, and the result is sorted by `on`. Data columns must not repeat
/// across frames.
pub fn merge(frames: Vec<DataFrame>, on: &[&str]) -> Result<DataFrame> {
    let mut frames = frames.into_iter();
    let first = frames
        .next()
        .ok_or_else(|| EpiError::InvalidArgument("nothing to merge".to_string()))?;
    keys::validate(&first, on)?;
    let mut seen: Vec<String> = data_columns(&first, on);
    let mut merged = first.lazy();
    for frame in frames {
        keys::validate(&frame, on)?;
        for name in data_columns(&frame, on) {
            if seen.contains(&name) {
                return Err(EpiError::InvalidArgument(format!(
                    "column {name:?} appears in more than one table"
                )));
            }
            seen.push(name);
        }
        merged = merged.join(
            frame.lazy(),
            keys::cols(on),
            keys::cols(on),
            JoinArgs::new(JoinType::Inner),
        );
    }
    let out = merged
        .sort_by_exprs(keys::cols(on), keys::stable_sort())
        .collect()?;
    debug!("merge: {} rows, columns {:?}", out.height(), seen);
    Ok(out)
}

fn data_columns(frame: &DataFrame, on: &[&str]) -> Vec<String> {
    frame
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .filter(|n| !on.contains(&n.as_str()))
        .collect()
}
