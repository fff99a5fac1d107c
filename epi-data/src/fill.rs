use crate::error::{EpiError, Result};
use polars::prelude::FillNullStrategy;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Direction in which known values are carried into gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FillMethod {
    /// Propagate the last known value forward in time.
    #[default]
    #[serde(rename = "ffill")]
    Forward,
    /// Propagate the next known value backward in time.
    #[serde(rename = "bfill")]
    Backward,
}

impl FillMethod {
    /// Unlimited fill in this direction.
    pub fn strategy(&self) -> FillNullStrategy {
        match self {
            FillMethod::Forward => FillNullStrategy::Forward(None),
            FillMethod::Backward => FillNullStrategy::Backward(None),
        }
    }
}

impl FromStr for FillMethod {
    type Err = EpiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "ffill" | "forward" => Ok(FillMethod::Forward),
            "bfill" | "backward" => Ok(FillMethod::Backward),
            other => Err(EpiError::InvalidArgument(format!(
                "fill method must be ffill or bfill, got {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FillMethod;
    use polars::prelude::*;

    fn series() -> Series {
        Series::new(
            "cases".into(),
            vec![None, Some(1i64), None, None, Some(4), None],
        )
    }

    fn filled(method: FillMethod) -> Vec<Option<i64>> {
        series()
            .fill_null(method.strategy())
            .unwrap()
            .i64()
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_forward_fill() {
        assert_eq!(
            filled(FillMethod::Forward),
            vec![None, Some(1), Some(1), Some(1), Some(4), Some(4)]
        );
    }

    #[test]
    fn test_backward_fill() {
        assert_eq!(
            filled(FillMethod::Backward),
            vec![Some(1), Some(1), Some(4), Some(4), Some(4), None]
        );
    }

    #[test]
    fn test_parse_method() {
        assert_eq!("ffill".parse::<FillMethod>().unwrap(), FillMethod::Forward);
        assert_eq!("backward".parse::<FillMethod>().unwrap(), FillMethod::Backward);
        assert!("pad".parse::<FillMethod>().is_err());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&FillMethod::Backward).unwrap(), "\"bfill\"");
        let method: FillMethod = serde_json::from_str("\"ffill\"").unwrap();
        assert_eq!(method, FillMethod::default());
    }
}
