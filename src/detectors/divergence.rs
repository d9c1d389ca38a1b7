// src/detectors/divergence.rs - Price vs oscillator divergence detection
use std::collections::HashSet;

use log::debug;

use crate::config::SignalConfig;
use crate::detectors::swing::{find_swing_highs, find_swing_lows};
use crate::types::{
    BandId, Candle, Divergence, DivergenceKind, OscillatorValue, SwingPoint,
};

/// Finds price/oscillator divergences across swing points inside the
/// configured lookback window. Stateless; one instance per evaluation.
pub struct DivergenceDetector<'a> {
    config: &'a SignalConfig,
}

impl<'a> DivergenceDetector<'a> {
    pub fn new(config: &'a SignalConfig) -> Self {
        Self { config }
    }

    /// Runs once per supplied band and merges the results, slower bands
    /// first, ties broken by steeper angle.
    pub fn detect(
        &self,
        candles: &[Candle],
        bands: &[(BandId, &[OscillatorValue])],
    ) -> Vec<Divergence> {
        let mut all = Vec::new();
        for (band, series) in bands {
            all.extend(self.detect_for_band(candles, *band, series));
        }
        all.sort_by(|a, b| {
            b.band
                .priority()
                .cmp(&a.band.priority())
                .then_with(|| {
                    b.angle_degrees
                        .partial_cmp(&a.angle_degrees)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });
        all
    }

    fn detect_for_band(
        &self,
        candles: &[Candle],
        band: BandId,
        oscillator: &[OscillatorValue],
    ) -> Vec<Divergence> {
        let cfg = self.config;
        let n = candles.len().min(oscillator.len());
        if n == 0 {
            return Vec::new();
        }
        let offset = n.saturating_sub(cfg.divergence_lookback);
        let window = &candles[offset..n];
        let osc_window = &oscillator[offset..n];

        let lows = find_swing_lows(window, Some(osc_window), cfg.swing_window, cfg.min_swing_size);
        let highs =
            find_swing_highs(window, Some(osc_window), cfg.swing_window, cfg.min_swing_size);

        let mut seen: HashSet<(usize, usize, bool)> = HashSet::new();
        let mut found = Vec::new();

        for pair in lows.windows(2) {
            if let Some(d) = self.classify_pair(&pair[0], &pair[1], band, false, &mut seen) {
                found.push(d);
            }
        }
        for pair in highs.windows(2) {
            if let Some(d) = self.classify_pair(&pair[0], &pair[1], band, true, &mut seen) {
                found.push(d);
            }
        }

        if !found.is_empty() {
            debug!(
                "[Divergence] {} candidate(s) on band {} within {} candles",
                found.len(),
                band,
                window.len()
            );
        }
        found
    }

    /// Classify one adjacent (earlier, recent) swing pair. Each index pair
    /// contributes at most one non-hidden and one hidden divergence.
    fn classify_pair(
        &self,
        earlier: &SwingPoint,
        recent: &SwingPoint,
        band: BandId,
        on_highs: bool,
        seen: &mut HashSet<(usize, usize, bool)>,
    ) -> Option<Divergence> {
        let cfg = self.config;
        let span = recent.index.saturating_sub(earlier.index);
        if span < cfg.min_divergence_span {
            return None;
        }

        let price_delta = recent.price - earlier.price;
        let osc_delta = recent.oscillator_k - earlier.oscillator_k;

        let kind = if on_highs {
            // Swing highs: price higher-high with oscillator lower-high is
            // a reversal warning; the mirror is trend continuation.
            if price_delta > 0.0 && osc_delta < 0.0 {
                DivergenceKind::Bearish
            } else if price_delta < 0.0 && osc_delta > 0.0 {
                DivergenceKind::HiddenBearish
            } else {
                return None;
            }
        } else {
            if price_delta < 0.0 && osc_delta > 0.0 {
                DivergenceKind::Bullish
            } else if price_delta > 0.0 && osc_delta < 0.0 {
                DivergenceKind::HiddenBullish
            } else {
                return None;
            }
        };

        if !seen.insert((earlier.index, recent.index, kind.is_hidden())) {
            return None;
        }

        let angle = angle_degrees(osc_delta, span);
        if angle < cfg.min_divergence_angle {
            return None;
        }

        Some(Divergence {
            kind,
            angle_degrees: angle,
            price_points: [(earlier.time, earlier.price), (recent.time, recent.price)],
            oscillator_points: [
                (earlier.time, earlier.oscillator_k),
                (recent.time, recent.oscillator_k),
            ],
            candle_span: span,
            band,
        })
    }
}

/// Divergence angle: atan2 of the oscillator delta over the candle-index
/// delta, in degrees. Steeper means the oscillator disagrees harder with
/// price over a shorter stretch.
fn angle_degrees(osc_delta: f64, span: usize) -> f64 {
    osc_delta.abs().atan2(span as f64).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(time: i64, low: f64, high: f64, close: f64) -> Candle {
        Candle {
            time,
            open: close,
            high,
            low,
            close,
            volume: 100.0,
        }
    }

    fn osc(time: i64, k: f64) -> OscillatorValue {
        OscillatorValue {
            time,
            k: Some(k),
            d: Some(k),
        }
    }

    /// Two swing lows ten candles apart: price makes a lower low while the
    /// oscillator makes a higher low.
    fn bullish_fixture() -> (Vec<Candle>, Vec<OscillatorValue>) {
        let mut candles = Vec::new();
        let mut series = Vec::new();
        // Baseline, first trough at index 5, recovery, second (lower)
        // trough at index 15, recovery.
        let lows = [
            106.0, 105.0, 104.0, 103.0, 102.0, 100.0, 102.0, 103.5, 104.5, 105.0, 104.0, 103.0,
            102.0, 101.0, 100.5, 99.0, 101.0, 102.0, 103.0, 104.0, 105.0,
        ];
        let ks = [
            60.0, 55.0, 45.0, 35.0, 20.0, 5.0, 25.0, 45.0, 55.0, 60.0, 55.0, 50.0, 45.0, 42.0,
            40.0, 35.0, 45.0, 52.0, 58.0, 62.0, 65.0,
        ];
        for (i, (&low, &k)) in lows.iter().zip(ks.iter()).enumerate() {
            candles.push(candle(i as i64 * 60, low, low + 1.5, low + 0.5));
            series.push(osc(i as i64 * 60, k));
        }
        (candles, series)
    }

    #[test]
    fn detects_classic_bullish_divergence() {
        let cfg = SignalConfig::default();
        let (candles, series) = bullish_fixture();
        let detector = DivergenceDetector::new(&cfg);
        let found = detector.detect(&candles, &[(BandId::Fast, series.as_slice())]);

        let bullish: Vec<_> = found
            .iter()
            .filter(|d| d.kind == DivergenceKind::Bullish)
            .collect();
        assert_eq!(bullish.len(), 1);
        let d = bullish[0];
        assert_eq!(d.band, BandId::Fast);
        assert_eq!(d.candle_span, 10);
        assert!(d.angle_degrees >= cfg.min_divergence_angle);
        // Price lower low, oscillator higher low.
        assert!(d.price_points[1].1 < d.price_points[0].1);
        assert!(d.oscillator_points[1].1 > d.oscillator_points[0].1);
    }

    #[test]
    fn detection_is_idempotent() {
        let cfg = SignalConfig::default();
        let (candles, series) = bullish_fixture();
        let detector = DivergenceDetector::new(&cfg);
        let first = detector.detect(&candles, &[(BandId::Fast, series.as_slice())]);
        let second = detector.detect(&candles, &[(BandId::Fast, series.as_slice())]);
        assert_eq!(first, second);
    }

    #[test]
    fn minimum_span_gates_adjacent_micro_swings() {
        let cfg = SignalConfig {
            min_divergence_span: 15,
            ..SignalConfig::default()
        };
        let (candles, series) = bullish_fixture();
        let detector = DivergenceDetector::new(&cfg);
        let found = detector.detect(&candles, &[(BandId::Fast, series.as_slice())]);
        assert!(found.iter().all(|d| d.candle_span >= 15));
        assert!(found.is_empty());
    }

    #[test]
    fn slower_bands_sort_first() {
        let cfg = SignalConfig::default();
        let (candles, series) = bullish_fixture();
        let detector = DivergenceDetector::new(&cfg);
        let found = detector.detect(
            &candles,
            &[
                (BandId::Fast, series.as_slice()),
                (BandId::Slow, series.as_slice()),
            ],
        );
        assert!(found.len() >= 2);
        assert_eq!(found[0].band, BandId::Slow);
    }
}
