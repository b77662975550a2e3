use chrono::{DateTime, Utc};
use core_types::{CoreError, PriceBar, PriceSeries, PriceSeriesProvider};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Failed to read price file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Price file {path} is not a JSON array of bars: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("No bars for {0} in the requested range")]
    Empty(String),

    #[error(transparent)]
    Series(#[from] CoreError),
}

/// Loads `<directory>/<symbol>.json`, a JSON array of OHLCV bars.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    directory: PathBuf,
}

impl JsonFileProvider {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Loads the whole file at `path`, using its stem as the symbol.
    pub fn load_file(path: &Path) -> Result<PriceSeries, ProviderError> {
        let directory = path.parent().unwrap_or_else(|| Path::new("."));
        let symbol = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        JsonFileProvider::new(directory).load(&symbol, DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC)
    }
}

impl PriceSeriesProvider for JsonFileProvider {
    type Error = ProviderError;

    fn load(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PriceSeries, Self::Error> {
        let path = self.directory.join(format!("{symbol}.json"));
        let raw = std::fs::read_to_string(&path).map_err(|source| ProviderError::Io {
            path: path.clone(),
            source,
        })?;
        let mut bars: Vec<PriceBar> =
            serde_json::from_str(&raw).map_err(|source| ProviderError::Json {
                path: path.clone(),
                source,
            })?;

        bars.retain(|b| b.timestamp >= start && b.timestamp <= end);
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        if bars.is_empty() {
            return Err(ProviderError::Empty(symbol.to_string()));
        }

        tracing::debug!(symbol, bars = bars.len(), path = %path.display(), "Loaded price file");
        Ok(PriceSeries::new(symbol, bars)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn loads_sorts_and_filters_bars() {
        let directory = std::env::temp_dir().join(format!("quantlab-provider-{}", std::process::id()));
        std::fs::create_dir_all(&directory).unwrap();
        let day = |d: u32| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();
        let bars = vec![
            PriceBar::flat(day(3), 102.0),
            PriceBar::flat(day(1), 100.0),
            PriceBar::flat(day(2), 101.0),
            PriceBar::flat(day(2), 101.0),
        ];
        std::fs::write(directory.join("SPY.json"), serde_json::to_string(&bars).unwrap()).unwrap();

        let provider = JsonFileProvider::new(&directory);
        let series = provider.load("SPY", day(2), day(31)).unwrap();
        assert_eq!(series.symbol(), "SPY");
        assert_eq!(series.closes(), vec![101.0, 102.0]);

        assert!(matches!(
            provider.load("SPY", day(10), day(20)),
            Err(ProviderError::Empty(_))
        ));
        assert!(matches!(provider.load("QQQ", day(1), day(2)), Err(ProviderError::Io { .. })));
        std::fs::remove_dir_all(&directory).ok();
    }
}
