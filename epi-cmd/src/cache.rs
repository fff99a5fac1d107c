//! Write-once flat-file cache.
//!
//! A cached table is fetched at most once: when the file exists it is read
//! back, otherwise the fetch runs and its result is written out.

use anyhow::Context;
use epi_data::io;
use log::info;
use polars::prelude::DataFrame;
use std::{future::Future, path::Path};

pub async fn cached<F, Fut>(path: &Path, fetch: F) -> anyhow::Result<DataFrame>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<DataFrame>>,
{
    if path.exists() {
        info!("Reading cached {}", path.display());
        return io::read_csv(path, &[]).with_context(|| format!("reading {}", path.display()));
    }
    let table = fetch().await?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    io::write_csv(&table, path).with_context(|| format!("writing {}", path.display()))?;
    info!("Cached {} rows to {}", table.height(), path.display());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::cached;
    use epi_data::io;
    use polars::prelude::DataFrame;

    const CSV_DATA: &str = "geo_value,time_value,cases\n06037,2020-03-01,10\n";

    #[tokio::test]
    async fn test_fetches_once_then_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("cases.csv");

        let first = cached(&path, || async { Ok::<_, anyhow::Error>(io::from_csv_str(CSV_DATA, &[])?) })
            .await
            .unwrap();
        assert!(path.exists());

        let second = cached(&path, || async { Err::<DataFrame, _>(anyhow::anyhow!("should not fetch twice")) })
            .await
            .unwrap();
        assert!(first.equals_missing(&second));
    }

    #[tokio::test]
    async fn test_failed_fetch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.csv");
        let result = cached(&path, || async { Err::<DataFrame, _>(anyhow::anyhow!("offline")) }).await;
        assert!(result.is_err());
        assert!(!path.exists());
    }
}
