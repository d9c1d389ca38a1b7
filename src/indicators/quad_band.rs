// src/indicators/quad_band.rs - Four stochastic bands over one candle series
use log::debug;

use crate::config::SignalConfig;
use crate::indicators::stochastic::{BandParams, OscillatorBand};
use crate::types::{
    BandId, BandReading, Candle, OscillatorValue, OscillatorZone, QuadSnapshot, RotationResult,
    RotationStrength,
};

/// Band presets tuned per candle interval. Unrecognized intervals fall back
/// to the 1-minute preset.
pub fn band_params_for_interval(interval: &str) -> [(BandId, BandParams); 4] {
    match interval {
        "3m" => [
            (BandId::Fast, BandParams::new(9, 3, 3)),
            (BandId::Standard, BandParams::new(14, 3, 3)),
            (BandId::Medium, BandParams::new(26, 4, 4)),
            (BandId::Slow, BandParams::new(40, 8, 8)),
        ],
        "5m" => [
            (BandId::Fast, BandParams::new(9, 3, 3)),
            (BandId::Standard, BandParams::new(14, 3, 3)),
            (BandId::Medium, BandParams::new(24, 4, 4)),
            (BandId::Slow, BandParams::new(34, 6, 6)),
        ],
        "15m" => [
            (BandId::Fast, BandParams::new(7, 3, 3)),
            (BandId::Standard, BandParams::new(12, 3, 3)),
            (BandId::Medium, BandParams::new(20, 4, 4)),
            (BandId::Slow, BandParams::new(28, 5, 5)),
        ],
        "1m" => one_minute_preset(),
        other => {
            debug!(
                "[QuadBand] No preset for interval '{}', using 1m defaults",
                other
            );
            one_minute_preset()
        }
    }
}

fn one_minute_preset() -> [(BandId, BandParams); 4] {
    [
        (BandId::Fast, BandParams::new(9, 3, 3)),
        (BandId::Standard, BandParams::new(14, 3, 3)),
        (BandId::Medium, BandParams::new(44, 4, 4)),
        (BandId::Slow, BandParams::new(60, 10, 10)),
    ]
}

/// Runs the four bands over the same candle series and time-aligns their
/// outputs. All methods read the aligned series; no mutable state.
#[derive(Debug, Clone)]
pub struct QuadBandEngine {
    bands: [(BandId, OscillatorBand); 4],
}

impl QuadBandEngine {
    pub fn for_interval(interval: &str) -> Self {
        let params = band_params_for_interval(interval);
        Self {
            bands: params.map(|(id, p)| (id, OscillatorBand::new(p))),
        }
    }

    pub fn band_params(&self, band: BandId) -> BandParams {
        self.bands
            .iter()
            .find(|(id, _)| *id == band)
            .map(|(_, b)| b.params())
            .expect("all four bands are always present")
    }

    /// Longest warm-up across the four bands; below this no snapshot exists.
    pub fn min_candles(&self) -> usize {
        self.bands
            .iter()
            .map(|(_, b)| b.params().d_warmup() + 1)
            .max()
            .unwrap_or(1)
    }

    pub fn compute(&self, candles: &[Candle]) -> QuadSeries {
        QuadSeries {
            series: self
                .bands
                .each_ref()
                .map(|(id, band)| (*id, band.compute(candles))),
        }
    }
}

/// The four time-aligned oscillator series plus the derived snapshot views.
#[derive(Debug, Clone)]
pub struct QuadSeries {
    series: [(BandId, Vec<OscillatorValue>); 4],
}

impl QuadSeries {
    pub fn band(&self, band: BandId) -> &[OscillatorValue] {
        &self
            .series
            .iter()
            .find(|(id, _)| *id == band)
            .expect("all four bands are always present")
            .1
    }

    pub fn bands(&self) -> impl Iterator<Item = (BandId, &[OscillatorValue])> {
        self.series.iter().map(|(id, s)| (*id, s.as_slice()))
    }

    /// Most recent valid (k, d) per band. Guards against the transient
    /// undefined value at the moment a new candle opens; returns None only
    /// when some band has no valid reading at all.
    pub fn snapshot(&self) -> Option<QuadSnapshot> {
        let read = |band: BandId| -> Option<BandReading> {
            self.band(band).iter().rev().find_map(|v| match (v.k, v.d) {
                (Some(k), Some(d)) => Some(BandReading { k, d }),
                _ => None,
            })
        };
        Some(QuadSnapshot {
            fast: read(BandId::Fast)?,
            standard: read(BandId::Standard)?,
            medium: read(BandId::Medium)?,
            slow: read(BandId::Slow)?,
        })
    }

    /// All four bands with %K above %D.
    pub fn all_bullish(&self) -> bool {
        self.snapshot()
            .map(|s| s.readings().iter().all(|(_, r)| r.k > r.d))
            .unwrap_or(false)
    }

    /// All four bands with %K below %D.
    pub fn all_bearish(&self) -> bool {
        self.snapshot()
            .map(|s| s.readings().iter().all(|(_, r)| r.k < r.d))
            .unwrap_or(false)
    }

    /// Number of bands whose %K currently sits in `zone`.
    pub fn count_in_zone(&self, zone: OscillatorZone, config: &SignalConfig) -> usize {
        let Some(snapshot) = self.snapshot() else {
            return 0;
        };
        snapshot
            .readings()
            .iter()
            .filter(|(_, r)| classify_zone(r.k, config) == zone)
            .count()
    }

    /// Quad rotation: all four %K values deep past the threshold while the
    /// fast band has started turning back (k crossing over d).
    pub fn detect_rotation(&self, config: &SignalConfig) -> RotationResult {
        let Some(snapshot) = self.snapshot() else {
            return RotationResult::none();
        };
        let ks: Vec<f64> = snapshot.readings().iter().map(|(_, r)| r.k).collect();
        // The shallowest of the four %K values bounds the whole quad.
        let highest_k = ks.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let lowest_k = ks.iter().cloned().fold(f64::INFINITY, f64::min);

        let oversold_strength = depth_tier(highest_k, config.oversold);
        let overbought_strength = depth_tier(100.0 - lowest_k, 100.0 - config.overbought);

        let turning_up = snapshot.fast.k > snapshot.fast.d;
        let turning_down = snapshot.fast.k < snapshot.fast.d;

        if oversold_strength > RotationStrength::None && turning_up {
            return RotationResult {
                is_oversold_rotation: true,
                is_overbought_rotation: false,
                strength: oversold_strength,
            };
        }
        if overbought_strength > RotationStrength::None && turning_down {
            return RotationResult {
                is_oversold_rotation: false,
                is_overbought_rotation: true,
                strength: overbought_strength,
            };
        }
        RotationResult::none()
    }
}

fn classify_zone(k: f64, config: &SignalConfig) -> OscillatorZone {
    if k <= config.oversold {
        OscillatorZone::Oversold
    } else if k >= config.overbought {
        OscillatorZone::Overbought
    } else {
        OscillatorZone::Neutral
    }
}

/// Depth tiers for the rotation test. `depth` is the shallowest of the
/// four %K values measured from the oversold side (so all four sit at or
/// below it); mirrored by the caller for overbought.
fn depth_tier(depth: f64, threshold: f64) -> RotationStrength {
    if depth <= threshold.min(10.0) {
        RotationStrength::Extreme
    } else if depth <= threshold.min(15.0) {
        RotationStrength::Strong
    } else if depth <= threshold {
        RotationStrength::Moderate
    } else {
        RotationStrength::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle {
                time: i as i64 * 60,
                open: 50_000.0,
                high: 50_000.0,
                low: 50_000.0,
                close: 50_000.0,
                volume: 100.0,
            })
            .collect()
    }

    #[test]
    fn unknown_interval_falls_back_to_one_minute() {
        assert_eq!(band_params_for_interval("7m"), band_params_for_interval("1m"));
    }

    #[test]
    fn flat_market_snapshot_is_neutral() {
        let engine = QuadBandEngine::for_interval("1m");
        let series = engine.compute(&flat_candles(120));
        let snapshot = series.snapshot().expect("enough candles for all bands");
        for (_, r) in snapshot.readings() {
            assert_eq!(r.k, 50.0);
            assert_eq!(r.d, 50.0);
        }
        assert!(!series.detect_rotation(&SignalConfig::default()).is_active());
    }

    #[test]
    fn snapshot_requires_slowest_band_warmup() {
        let engine = QuadBandEngine::for_interval("1m");
        let series = engine.compute(&flat_candles(30));
        assert!(series.snapshot().is_none());
    }

    #[test]
    fn neutral_market_counts_no_extreme_zones() {
        let engine = QuadBandEngine::for_interval("1m");
        let series = engine.compute(&flat_candles(120));
        let cfg = SignalConfig::default();
        assert_eq!(series.count_in_zone(OscillatorZone::Oversold, &cfg), 0);
        assert_eq!(series.count_in_zone(OscillatorZone::Neutral, &cfg), 4);
        assert_eq!(series.count_in_zone(OscillatorZone::Overbought, &cfg), 0);
    }
}
