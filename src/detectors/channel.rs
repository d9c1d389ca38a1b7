// src/detectors/channel.rs - Price channel from recent swing points
use log::debug;

use crate::config::SignalConfig;
use crate::detectors::swing::{find_swing_highs, find_swing_lows};
use crate::types::{Candle, ChannelBoundary, ChannelPosition};

/// Swing test width for channel bounds. Narrower than the divergence swing
/// window so the channel reacts to more recent structure.
const CHANNEL_SWING_WINDOW: usize = 2;

/// Derives a price channel (upper/lower/mid) from the lookback window and
/// classifies where current price sits relative to its extremes.
pub struct ChannelDetector<'a> {
    config: &'a SignalConfig,
}

impl<'a> ChannelDetector<'a> {
    pub fn new(config: &'a SignalConfig) -> Self {
        Self { config }
    }

    /// Averaging the top-2 highs and bottom-2 lows keeps a single outlier
    /// wick from defining the whole channel.
    pub fn detect(&self, candles: &[Candle]) -> Option<ChannelBoundary> {
        let cfg = self.config;
        let n = candles.len();
        if n < 2 * CHANNEL_SWING_WINDOW + 1 {
            return None;
        }
        let window = &candles[n.saturating_sub(cfg.channel_lookback)..];

        let highs = find_swing_highs(window, None, CHANNEL_SWING_WINDOW, cfg.min_swing_size);
        let lows = find_swing_lows(window, None, CHANNEL_SWING_WINDOW, cfg.min_swing_size);
        if highs.len() < 2 || lows.len() < 2 {
            return None;
        }

        let mut high_prices: Vec<f64> = highs.iter().map(|s| s.price).collect();
        let mut low_prices: Vec<f64> = lows.iter().map(|s| s.price).collect();
        high_prices.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        low_prices.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let upper = (high_prices[0] + high_prices[1]) / 2.0;
        let lower = (low_prices[0] + low_prices[1]) / 2.0;
        if upper <= lower {
            return None;
        }
        let midline = (upper + lower) / 2.0;
        let height_pct = (upper - lower) / midline;

        // Outside [1%, 10%] price is trending, not channeling; the channel
        // is then unusable for mean-reversion confluence.
        let is_valid = height_pct >= cfg.channel_min_height_pct
            && height_pct <= cfg.channel_max_height_pct;

        let touch_band = (upper - lower) * cfg.channel_extreme_threshold;
        let upper_touches = highs
            .iter()
            .filter(|s| (upper - s.price).abs() <= touch_band)
            .count();
        let lower_touches = lows
            .iter()
            .filter(|s| (s.price - lower).abs() <= touch_band)
            .count();

        debug!(
            "[Channel] upper={:.5} lower={:.5} height={:.2}% valid={} touches={}U/{}L",
            upper,
            lower,
            height_pct * 100.0,
            is_valid,
            upper_touches,
            lower_touches
        );

        Some(ChannelBoundary {
            upper,
            lower,
            midline,
            is_valid,
            upper_touches,
            lower_touches,
        })
    }

    /// Buckets `price` against the channel using a threshold band near each
    /// boundary.
    pub fn classify_position(&self, channel: &ChannelBoundary, price: f64) -> ChannelPosition {
        let band = (channel.upper - channel.lower) * self.config.channel_extreme_threshold;
        if price > channel.upper + band || price < channel.lower - band {
            ChannelPosition::Outside
        } else if price >= channel.upper - band {
            ChannelPosition::Upper
        } else if price <= channel.lower + band {
            ChannelPosition::Lower
        } else {
            ChannelPosition::Middle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(time: i64, low: f64, high: f64) -> Candle {
        Candle {
            time,
            open: (low + high) / 2.0,
            high,
            low,
            close: (low + high) / 2.0,
            volume: 100.0,
        }
    }

    /// A ranging series oscillating between roughly 98 and 102.
    fn ranging_candles() -> Vec<Candle> {
        (0..50)
            .map(|i| {
                let phase = (i % 10) as f64;
                let center = 100.0 + if phase < 5.0 { phase } else { 10.0 - phase } - 2.5;
                candle(i as i64 * 60, center - 0.3, center + 0.3)
            })
            .collect()
    }

    #[test]
    fn ranging_market_yields_valid_channel() {
        let cfg = SignalConfig::default();
        let channel = ChannelDetector::new(&cfg)
            .detect(&ranging_candles())
            .expect("swings exist");
        assert!(channel.is_valid);
        assert!(channel.upper > channel.midline);
        assert!(channel.midline > channel.lower);
        assert!(channel.upper_touches >= 1);
        assert!(channel.lower_touches >= 1);
    }

    #[test]
    fn wide_range_is_invalid() {
        // Swings 30% apart: trending territory, not a usable channel.
        let candles: Vec<Candle> = (0..50)
            .map(|i| {
                let phase = (i % 10) as f64;
                let center = 100.0 + (if phase < 5.0 { phase } else { 10.0 - phase }) * 8.0;
                candle(i as i64 * 60, center - 0.3, center + 0.3)
            })
            .collect();
        let cfg = SignalConfig::default();
        let channel = ChannelDetector::new(&cfg).detect(&candles);
        if let Some(ch) = channel {
            assert!(!ch.is_valid);
        }
    }

    #[test]
    fn position_buckets_cover_the_range() {
        let cfg = SignalConfig::default();
        let detector = ChannelDetector::new(&cfg);
        let channel = ChannelBoundary {
            upper: 102.0,
            lower: 98.0,
            midline: 100.0,
            is_valid: true,
            upper_touches: 2,
            lower_touches: 2,
        };
        assert_eq!(detector.classify_position(&channel, 101.8), ChannelPosition::Upper);
        assert_eq!(detector.classify_position(&channel, 98.2), ChannelPosition::Lower);
        assert_eq!(detector.classify_position(&channel, 100.0), ChannelPosition::Middle);
        assert_eq!(detector.classify_position(&channel, 104.0), ChannelPosition::Outside);
    }
}
