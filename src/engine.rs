// src/engine.rs - Evaluation pipeline: candles in, signals out
use log::{debug, warn};

use crate::config::SignalConfig;
use crate::detectors::{ChannelDetector, DivergenceDetector};
use crate::errors::{CoreError, CoreResult};
use crate::indicators::{IncrementalEngine, QuadBandEngine};
use crate::signals::{ConfluenceInputs, ConfluenceScorer, SignalFactory};
use crate::types::{Candle, Direction, QuadSnapshot, Signal};

/// Run the full pipeline over a batch of candles using the 1m band
/// presets. Pure: no clock, no I/O, no shared state.
pub fn evaluate(symbol: &str, candles: &[Candle], config: &SignalConfig) -> CoreResult<Vec<Signal>> {
    let bands = QuadBandEngine::for_interval("1m");
    evaluate_with_bands(symbol, candles, config, &bands)
}

/// Same pipeline with caller-chosen band presets (the scanner picks them
/// per its configured candle interval).
pub fn evaluate_with_bands(
    symbol: &str,
    candles: &[Candle],
    config: &SignalConfig,
    bands: &QuadBandEngine,
) -> CoreResult<Vec<Signal>> {
    let needed = bands.min_candles();
    if candles.len() < needed {
        return Err(CoreError::InsufficientData {
            needed,
            got: candles.len(),
        });
    }

    let series = bands.compute(candles);
    let snapshot = match series.snapshot() {
        Some(s) => s,
        None => {
            debug!("[Engine] {}: no valid oscillator snapshot yet", symbol);
            return Ok(Vec::new());
        }
    };
    let rotation = series.detect_rotation(config);

    let oscillator_bands: Vec<_> = series.bands().collect();
    let divergences = DivergenceDetector::new(config).detect(candles, &oscillator_bands);

    let channel_detector = ChannelDetector::new(config);
    let last_close = candles.last().map(|c| c.close).unwrap_or(f64::NAN);
    let channel = channel_detector.detect(candles);
    let channel_with_position =
        channel.map(|ch| (ch, channel_detector.classify_position(&ch, last_close)));

    let scorer = ConfluenceScorer::new(config);
    let factory = SignalFactory::new(config);
    let mut candidates = Vec::new();

    for direction in [Direction::Long, Direction::Short] {
        // Divergence list is already merged best-first.
        let divergence = divergences
            .iter()
            .find(|d| match direction {
                Direction::Long => d.kind.is_bullish(),
                Direction::Short => !d.kind.is_bullish(),
            })
            .copied();

        let inputs = ConfluenceInputs {
            direction,
            candles,
            snapshot: &snapshot,
            rotation,
            divergence: divergence.as_ref(),
            channel: channel_with_position,
        };
        let flags = scorer.score(&inputs);
        if !scorer.qualifies(&flags) {
            continue;
        }

        if let Some(signal) = factory.build(
            symbol, direction, candles, snapshot, flags, divergence, channel,
        ) {
            candidates.push(signal);
        }
    }

    Ok(factory.select_top(candidates))
}

/// Streaming front end over the batch pipeline. Holds per-symbol rolling
/// buffers; feeding the same candles tick by tick yields the same signals
/// the batch path yields over the retained window.
pub struct SignalEngine {
    config: SignalConfig,
    bands: QuadBandEngine,
    incremental: IncrementalEngine,
}

impl SignalEngine {
    pub fn new(interval: &str, config: SignalConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            bands: QuadBandEngine::for_interval(interval),
            incremental: IncrementalEngine::new(interval),
            config,
        })
    }

    /// Absorb one tick and re-evaluate the symbol. `is_new_candle` false
    /// amends the still-open candle in place.
    pub fn on_tick(&mut self, symbol: &str, candle: Candle, is_new_candle: bool) -> Vec<Signal> {
        self.incremental.update(symbol, candle, is_new_candle);
        let candles = match self.incremental.candles(symbol) {
            Some(c) => c,
            None => return Vec::new(),
        };
        match evaluate_with_bands(symbol, candles, &self.config, &self.bands) {
            Ok(signals) => signals,
            Err(CoreError::InsufficientData { needed, got }) => {
                debug!(
                    "[Engine] {}: warming up ({}/{} candles)",
                    symbol, got, needed
                );
                Vec::new()
            }
            Err(e) => {
                warn!("[Engine] {}: evaluation failed: {}", symbol, e);
                Vec::new()
            }
        }
    }

    /// Latest per-band oscillator readings from the rolling buffers.
    pub fn snapshot(&self, symbol: &str) -> Option<QuadSnapshot> {
        self.incremental.snapshot(symbol)
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SignalStatus;

    fn candle(i: usize, close: f64) -> Candle {
        Candle {
            time: i as i64 * 60,
            open: close * 1.0005,
            high: close * 1.001,
            low: close * 0.999,
            close,
            volume: 100.0,
        }
    }

    fn flat_series(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle {
                time: i as i64 * 60,
                open: 100.0,
                high: 100.0,
                low: 100.0,
                close: 100.0,
                volume: 100.0,
            })
            .collect()
    }

    /// Steady decline followed by a small reversal. Leaves every band deep
    /// in oversold with the fast band turning up.
    fn decline_then_reversal() -> Vec<Candle> {
        let mut candles = Vec::new();
        let mut price = 100.0;
        for i in 0..150 {
            candles.push(candle(i, price));
            price *= 0.995;
        }
        for i in 150..153 {
            price *= 1.0005;
            candles.push(candle(i, price));
        }
        candles
    }

    #[test]
    fn too_few_candles_is_an_error() {
        let cfg = SignalConfig::default();
        let err = evaluate("EURUSD", &flat_series(10), &cfg).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientData { .. }));
    }

    #[test]
    fn flat_market_produces_no_signal() {
        let cfg = SignalConfig::default();
        let signals = evaluate("EURUSD", &flat_series(200), &cfg).unwrap();
        assert!(signals.is_empty());
    }

    #[test]
    fn oversold_rotation_produces_long_signal() {
        let cfg = SignalConfig::default();
        let signals = evaluate("EURUSD", &decline_then_reversal(), &cfg).unwrap();
        assert!(!signals.is_empty());
        let signal = &signals[0];
        assert_eq!(signal.direction, Direction::Long);
        assert!(signal.confluence.quad_rotation);
        assert!(signal.confluence.score >= 3);
        assert_eq!(signal.status, SignalStatus::Pending);
        assert!(signal.prices_are_ordered());
    }

    #[test]
    fn streaming_engine_matches_batch_output() {
        let cfg = SignalConfig::default();
        let candles = decline_then_reversal();
        let batch = evaluate("EURUSD", &candles, &cfg).unwrap();

        let mut engine = SignalEngine::new("1m", cfg).unwrap();
        let mut streamed = Vec::new();
        for c in &candles {
            streamed = engine.on_tick("EURUSD", *c, true);
        }

        assert_eq!(batch.len(), streamed.len());
        for (b, s) in batch.iter().zip(streamed.iter()) {
            assert_eq!(b.direction, s.direction);
            assert_eq!(b.confluence, s.confluence);
            assert_eq!(b.entry_price, s.entry_price);
            assert_eq!(b.stop_loss, s.stop_loss);
            assert_eq!(b.target2, s.target2);
        }
    }

    #[test]
    fn never_more_than_three_signals() {
        let cfg = SignalConfig::default();
        for series in [flat_series(200), decline_then_reversal()] {
            let signals = evaluate("EURUSD", &series, &cfg).unwrap();
            assert!(signals.len() <= 3);
        }
    }
}
