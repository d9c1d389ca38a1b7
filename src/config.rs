// src/config.rs - Tunable thresholds for the signal pipeline
use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, CoreResult};
use crate::types::SignalStrength;

/// Pure value object of tunable thresholds. Immutable per evaluation call;
/// callers supply their own or take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    /// %K at or below this counts as oversold.
    pub oversold: f64,
    /// %K at or above this counts as overbought.
    pub overbought: f64,

    /// Candles considered by the divergence detector.
    pub divergence_lookback: usize,
    /// Candles on each side that must be strictly higher/lower for a swing.
    pub swing_window: usize,
    /// Minimum relative swing size (fraction of price) to reject noise.
    pub min_swing_size: f64,
    /// Minimum candles between paired swing points.
    pub min_divergence_span: usize,
    /// Minimum divergence angle in degrees.
    pub min_divergence_angle: f64,

    /// Candles considered by the channel detector.
    pub channel_lookback: usize,
    /// Fraction of channel height treated as "at the boundary".
    pub channel_extreme_threshold: f64,
    /// Channel height as a fraction of midline must fall in this range.
    pub channel_min_height_pct: f64,
    pub channel_max_height_pct: f64,

    /// Stop buffer below the recent low (above the recent high for SHORT),
    /// as a fraction of entry. Default 0.1%.
    pub stop_buffer_pct: f64,
    /// Target offsets from entry, as fractions. Must be strictly increasing.
    pub target_pcts: [f64; 3],
    /// Minimum risk:reward to emit a signal without a quad rotation.
    pub min_risk_reward: f64,

    /// Position sizing, percent of account.
    pub default_position_pct: f64,
    pub max_position_pct: f64,

    /// Volume spike: current volume must exceed this multiple of the
    /// trailing average.
    pub volume_spike_multiplier: f64,
    pub volume_avg_period: usize,

    /// Signals below this strength are discarded unless rotation-backed.
    pub min_notification_strength: SignalStrength,

    /// Same symbol+direction inside this window updates the existing
    /// active signal instead of creating a second one.
    pub duplicate_window_secs: i64,
    /// Oldest active signal is expired when the active set exceeds this.
    pub max_active_signals: usize,
    /// Closed history retained for persistence.
    pub history_cap: usize,

    /// Archive a signal as soon as it reaches target2 instead of letting
    /// it run for target3 or the stop.
    pub archive_on_target2: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            oversold: 20.0,
            overbought: 80.0,
            divergence_lookback: 50,
            swing_window: 3,
            min_swing_size: 0.001,
            min_divergence_span: 5,
            min_divergence_angle: 7.0,
            channel_lookback: 50,
            channel_extreme_threshold: 0.2,
            channel_min_height_pct: 0.01,
            channel_max_height_pct: 0.10,
            stop_buffer_pct: 0.001,
            target_pcts: [0.005, 0.01, 0.02],
            min_risk_reward: 1.5,
            default_position_pct: 2.0,
            max_position_pct: 5.0,
            volume_spike_multiplier: 1.5,
            volume_avg_period: 20,
            min_notification_strength: SignalStrength::Moderate,
            duplicate_window_secs: 300,
            max_active_signals: 20,
            history_cap: 100,
            archive_on_target2: false,
        }
    }
}

impl SignalConfig {
    /// Boundary validation. An invalid config is rejected before any
    /// evaluation begins; nothing downstream re-checks these.
    pub fn validate(&self) -> CoreResult<()> {
        if !self.oversold.is_finite() || !self.overbought.is_finite() {
            return Err(CoreError::config("oversold/overbought must be finite"));
        }
        if self.oversold >= self.overbought {
            return Err(CoreError::config(format!(
                "oversold ({}) must be below overbought ({})",
                self.oversold, self.overbought
            )));
        }
        if !(0.0..=100.0).contains(&self.oversold) || !(0.0..=100.0).contains(&self.overbought) {
            return Err(CoreError::config("zone thresholds must be within [0, 100]"));
        }
        if self.swing_window == 0 {
            return Err(CoreError::config("swing_window must be at least 1"));
        }
        if self.min_divergence_angle < 0.0 || self.min_divergence_angle >= 90.0 {
            return Err(CoreError::config(
                "min_divergence_angle must be within [0, 90)",
            ));
        }
        let [t1, t2, t3] = self.target_pcts;
        if !(t1 > 0.0 && t1 < t2 && t2 < t3) {
            return Err(CoreError::config(format!(
                "target_pcts must be positive and strictly increasing, got {:?}",
                self.target_pcts
            )));
        }
        if self.stop_buffer_pct < 0.0 {
            return Err(CoreError::config("stop_buffer_pct must not be negative"));
        }
        if self.channel_min_height_pct <= 0.0
            || self.channel_min_height_pct >= self.channel_max_height_pct
        {
            return Err(CoreError::config(
                "channel height band must satisfy 0 < min < max",
            ));
        }
        if self.default_position_pct <= 0.0 || self.default_position_pct > self.max_position_pct {
            return Err(CoreError::config(
                "position sizing must satisfy 0 < default <= max",
            ));
        }
        if self.volume_avg_period == 0 {
            return Err(CoreError::config("volume_avg_period must be at least 1"));
        }
        if self.max_active_signals == 0 {
            return Err(CoreError::config("max_active_signals must be at least 1"));
        }
        Ok(())
    }
}
