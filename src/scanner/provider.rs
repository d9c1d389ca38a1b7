// src/scanner/provider.rs - Candle sources for the scanner
use std::path::PathBuf;

use async_trait::async_trait;
use log::debug;

use crate::errors::{CoreError, CoreResult};
use crate::types::Candle;

/// Source of candle history for one symbol. The scanner only ever asks
/// for the most recent `limit` candles.
#[async_trait]
pub trait CandleProvider: Send + Sync {
    async fn fetch(&self, symbol: &str, limit: usize) -> CoreResult<Vec<Candle>>;
}

/// Reads per-symbol candle files (`<dir>/<SYMBOL>.json`, a JSON array of
/// candles) for offline and demo runs.
pub struct ReplayProvider {
    dir: PathBuf,
}

impl ReplayProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl CandleProvider for ReplayProvider {
    async fn fetch(&self, symbol: &str, limit: usize) -> CoreResult<Vec<Candle>> {
        let path = self.dir.join(format!("{}.json", symbol));
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| CoreError::provider(format!("read {}: {}", path.display(), e)))?;
        let mut candles: Vec<Candle> = serde_json::from_str(&raw)
            .map_err(|e| CoreError::provider(format!("parse {}: {}", path.display(), e)))?;
        candles.sort_by_key(|c| c.time);
        if candles.len() > limit {
            candles.drain(..candles.len() - limit);
        }
        debug!(
            "[Provider] {}: loaded {} candles from {}",
            symbol,
            candles.len(),
            path.display()
        );
        Ok(candles)
    }
}
