//! Local persistence for raw and formatted price data.
//!
//! Layout under the storage root:
//!
//! ```text
//! {root}/{symbol}/prices.json              raw API payload
//! {root}/{symbol}/formatted_prices/*.csv   formatting job output
//! ```

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// File name for the raw JSON payload.
pub const RAW_FILE: &str = "prices.json";

/// Directory the formatting job writes CSV output into.
pub const FORMATTED_DIR: &str = "formatted_prices";

/// Errors that can occur during local price storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No formatted CSV found under '{0}'")]
    NoFormattedCsv(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persists the raw quote payload for a symbol.
///
/// Creates `{root}/{symbol}/` and writes `prices.json` into it.
///
/// # Returns
///
/// The symbol directory, which downstream tasks use as their working path.
pub fn store_prices(root: &Path, symbol: &str, prices: &Value) -> Result<PathBuf, StoreError> {
    let dir = root.join(symbol);
    fs::create_dir_all(&dir)?;

    let path = dir.join(RAW_FILE);
    fs::write(&path, serde_json::to_vec_pretty(prices)?)?;

    info!(path = %path.display(), "stored raw prices");
    Ok(dir)
}

/// Reads back the raw quote payload from a symbol directory.
pub fn read_prices(dir: &Path) -> Result<Value, StoreError> {
    let raw = fs::read(dir.join(RAW_FILE))?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Writes formatted CSV content into the symbol directory.
///
/// Produces `{dir}/formatted_prices/{symbol}_formatted.csv`, the same layout
/// the containerized formatting job emits.
pub fn write_formatted_csv(dir: &Path, symbol: &str, csv: &str) -> Result<PathBuf, StoreError> {
    let formatted_dir = dir.join(FORMATTED_DIR);
    fs::create_dir_all(&formatted_dir)?;

    let path = formatted_dir.join(format!("{symbol}_formatted.csv"));
    fs::write(&path, csv)?;

    info!(path = %path.display(), "wrote formatted CSV");
    Ok(path)
}

/// Locates the formatted CSV produced for a symbol directory.
///
/// # Errors
///
/// Returns `StoreError::NoFormattedCsv` if the formatted directory is missing
/// or holds no `.csv` file. When several exist the lexicographically first is
/// returned, so repeated runs pick a stable file.
pub fn find_formatted_csv(dir: &Path) -> Result<PathBuf, StoreError> {
    let formatted_dir = dir.join(FORMATTED_DIR);
    if !formatted_dir.is_dir() {
        return Err(StoreError::NoFormattedCsv(formatted_dir));
    }

    let mut candidates: Vec<PathBuf> = fs::read_dir(&formatted_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map(|ext| ext == "csv").unwrap_or(false))
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        .next()
        .ok_or(StoreError::NoFormattedCsv(formatted_dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_store_then_read_round_trip() {
        let tmp = TempDir::new().unwrap();
        let prices = json!({
            "meta": {"symbol": "AAPL"},
            "timestamp": [1700000000, 1700086400],
            "indicators": {"quote": [{"close": [191.2, 189.7]}]}
        });

        let dir = store_prices(tmp.path(), "AAPL", &prices).unwrap();
        assert_eq!(dir, tmp.path().join("AAPL"));
        assert!(dir.join(RAW_FILE).is_file());

        let read_back = read_prices(&dir).unwrap();
        assert_eq!(read_back, prices);
    }

    #[test]
    fn test_read_prices_missing_file() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            read_prices(tmp.path()),
            Err(StoreError::Io(_))
        ));
    }

    #[test]
    fn test_find_formatted_csv() {
        let tmp = TempDir::new().unwrap();
        let path = write_formatted_csv(tmp.path(), "AAPL", "timestamp,close\n1,2\n").unwrap();

        let found = find_formatted_csv(tmp.path()).unwrap();
        assert_eq!(found, path);
        assert!(found.ends_with("formatted_prices/AAPL_formatted.csv"));
    }

    #[test]
    fn test_find_formatted_csv_ignores_other_files() {
        let tmp = TempDir::new().unwrap();
        let formatted = tmp.path().join(FORMATTED_DIR);
        fs::create_dir_all(&formatted).unwrap();
        fs::write(formatted.join("_SUCCESS"), "").unwrap();
        fs::write(formatted.join("part-0001.csv"), "a,b\n").unwrap();

        let found = find_formatted_csv(tmp.path()).unwrap();
        assert!(found.ends_with("part-0001.csv"));
    }

    #[test]
    fn test_find_formatted_csv_missing_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            find_formatted_csv(tmp.path()),
            Err(StoreError::NoFormattedCsv(_))
        ));
    }

    #[test]
    fn test_find_formatted_csv_empty_dir() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(FORMATTED_DIR)).unwrap();
        assert!(matches!(
            find_formatted_csv(tmp.path()),
            Err(StoreError::NoFormattedCsv(_))
        ));
    }
}
