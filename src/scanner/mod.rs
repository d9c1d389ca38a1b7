// src/scanner/mod.rs - Parallel multi-symbol scan loop
pub mod provider;

pub use provider::{CandleProvider, ReplayProvider};

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::future::join_all;
use log::{debug, info, warn};
use tokio::time::timeout;

use crate::config::SignalConfig;
use crate::engine;
use crate::errors::{CoreError, CoreResult};
use crate::indicators::QuadBandEngine;
use crate::signals::SignalRepository;
use crate::types::{ScannerResult, Signal};

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub symbols: Vec<String>,
    pub interval: String,
    pub cadence_secs: u64,
    pub parallelism: usize,
    pub candle_limit: usize,
    pub task_timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            interval: "1m".to_string(),
            cadence_secs: 60,
            parallelism: 4,
            candle_limit: 500,
            task_timeout_secs: 10,
        }
    }
}

/// Totals for one completed scan cycle.
#[derive(Debug, Clone, Copy)]
pub struct CycleSummary {
    pub scanned: usize,
    pub failed: usize,
    pub candles_analyzed: usize,
    pub signals_found: usize,
    pub signals_admitted: usize,
    pub lifecycle_events: usize,
    pub duration: Duration,
}

/// Scans a symbol list on a fixed cadence. Each cycle fetches candles,
/// runs the evaluation pipeline per symbol on the worker pool, feeds
/// latest prices through the signal book and publishes one result per
/// symbol. A failing symbol is logged and skipped; the cycle goes on.
pub struct Scanner {
    config: ScannerConfig,
    signal_config: Arc<SignalConfig>,
    provider: Arc<dyn CandleProvider>,
    repository: Arc<SignalRepository>,
    results: DashMap<String, ScannerResult>,
}

type SymbolScan = (usize, Option<f64>, Vec<Signal>);

impl Scanner {
    pub fn new(
        config: ScannerConfig,
        signal_config: SignalConfig,
        provider: Arc<dyn CandleProvider>,
        repository: Arc<SignalRepository>,
    ) -> CoreResult<Self> {
        signal_config.validate()?;
        if config.symbols.is_empty() {
            return Err(CoreError::config("scanner needs at least one symbol"));
        }
        if config.parallelism == 0 {
            return Err(CoreError::config("scanner parallelism must be at least 1"));
        }
        Ok(Self {
            config,
            signal_config: Arc::new(signal_config),
            provider,
            repository,
            results: DashMap::new(),
        })
    }

    /// Scan cadence loop. Cycles never overlap: the next tick waits for
    /// the previous cycle to finish.
    pub async fn run(&self) {
        info!(
            "[Scanner] Starting: {} symbols, {} interval, every {}s, pool of {}",
            self.config.symbols.len(),
            self.config.interval,
            self.config.cadence_secs,
            self.config.parallelism
        );
        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.cadence_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let summary = self.scan_cycle().await;
            self.log_cycle(&summary);
            self.repository.log_summary();
        }
    }

    /// One pass over every configured symbol, in batches of the pool size.
    pub async fn scan_cycle(&self) -> CycleSummary {
        let started = Instant::now();
        let mut summary = CycleSummary {
            scanned: 0,
            failed: 0,
            candles_analyzed: 0,
            signals_found: 0,
            signals_admitted: 0,
            lifecycle_events: 0,
            duration: Duration::ZERO,
        };

        for batch in self.config.symbols.chunks(self.config.parallelism) {
            let mut handles = Vec::with_capacity(batch.len());
            for symbol in batch {
                let symbol = symbol.clone();
                let provider = Arc::clone(&self.provider);
                let signal_config = Arc::clone(&self.signal_config);
                let interval = self.config.interval.clone();
                let limit = self.config.candle_limit;
                let budget = Duration::from_secs(self.config.task_timeout_secs);
                handles.push(tokio::spawn(async move {
                    Self::scan_symbol(provider, signal_config, symbol, interval, limit, budget)
                        .await
                }));
            }

            for (symbol, joined) in batch.iter().zip(join_all(handles).await) {
                match joined {
                    Ok(Ok((candle_count, last_close, signals))) => {
                        summary.scanned += 1;
                        summary.candles_analyzed += candle_count;
                        summary.signals_found += signals.len();
                        if let Some(price) = last_close {
                            summary.lifecycle_events +=
                                self.repository.apply_price(symbol, price).len();
                        }
                        for signal in &signals {
                            if self.repository.insert_or_refresh(signal.clone()) {
                                summary.signals_admitted += 1;
                            }
                        }
                        self.results
                            .insert(symbol.clone(), ScannerResult::new(symbol.clone(), signals));
                    }
                    Ok(Err(e)) => {
                        summary.failed += 1;
                        warn!("[Scanner] {}: {}", symbol, e);
                    }
                    Err(e) => {
                        summary.failed += 1;
                        warn!("[Scanner] {}: worker failed: {}", symbol, e);
                    }
                }
            }
        }

        summary.duration = started.elapsed();
        summary
    }

    async fn scan_symbol(
        provider: Arc<dyn CandleProvider>,
        signal_config: Arc<SignalConfig>,
        symbol: String,
        interval: String,
        limit: usize,
        budget: Duration,
    ) -> CoreResult<SymbolScan> {
        let work = async {
            let candles = provider.fetch(&symbol, limit).await?;
            let bands = QuadBandEngine::for_interval(&interval);
            // A feed shorter than the slow band is a data-quality condition,
            // not a scan failure: the symbol reports an empty read.
            let signals =
                match engine::evaluate_with_bands(&symbol, &candles, &signal_config, &bands) {
                    Ok(signals) => signals,
                    Err(CoreError::InsufficientData { needed, got }) => {
                        debug!(
                            "[Scanner] {} has {} candles, need {}; reporting empty",
                            symbol, got, needed
                        );
                        Vec::new()
                    }
                    Err(err) => return Err(err),
                };
            let last_close = candles.last().map(|c| c.close);
            Ok((candles.len(), last_close, signals))
        };
        match timeout(budget, work).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::Task(format!(
                "scan timed out after {}s",
                budget.as_secs()
            ))),
        }
    }

    /// Latest published result per symbol, alphabetical.
    pub fn latest_results(&self) -> Vec<ScannerResult> {
        let mut results: Vec<ScannerResult> =
            self.results.iter().map(|e| e.value().clone()).collect();
        results.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        results
    }

    pub fn result_for(&self, symbol: &str) -> Option<ScannerResult> {
        self.results.get(symbol).map(|e| e.value().clone())
    }

    pub fn repository(&self) -> &SignalRepository {
        &self.repository
    }

    fn log_cycle(&self, summary: &CycleSummary) {
        info!(
            "[Scanner] Cycle done in {:?}: {} ok, {} failed, {} candles, {} signals ({} admitted), {} lifecycle events",
            summary.duration,
            summary.scanned,
            summary.failed,
            summary.candles_analyzed,
            summary.signals_found,
            summary.signals_admitted,
            summary.lifecycle_events
        );
    }
}
