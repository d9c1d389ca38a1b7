// src/signals/factory.rs - Entry/stop/target construction
use chrono::Utc;
use log::{debug, error};
use uuid::Uuid;

use crate::config::SignalConfig;
use crate::types::{
    Candle, ChannelBoundary, ConfluenceFlags, Direction, Divergence, QuadSnapshot, Signal,
    SignalStatus, SignalStrength,
};

/// Candles considered for the structural stop behind the recent extreme.
const STOP_LOOKBACK: usize = 20;

/// Builds complete signal records for a chosen direction. Pure: same
/// inputs, same prices (ids and timestamps aside).
pub struct SignalFactory<'a> {
    config: &'a SignalConfig,
}

impl<'a> SignalFactory<'a> {
    pub fn new(config: &'a SignalConfig) -> Self {
        Self { config }
    }

    pub fn build(
        &self,
        symbol: &str,
        direction: Direction,
        candles: &[Candle],
        snapshot: QuadSnapshot,
        confluence: ConfluenceFlags,
        divergence: Option<Divergence>,
        channel: Option<ChannelBoundary>,
    ) -> Option<Signal> {
        let cfg = self.config;
        let last = candles.last().filter(|c| c.is_well_formed())?;
        let entry = last.close;
        if entry <= 0.0 {
            return None;
        }

        let tail = &candles[candles.len().saturating_sub(STOP_LOOKBACK)..];
        let buffer = entry * cfg.stop_buffer_pct;
        let [p1, p2, p3] = cfg.target_pcts;

        let (stop, t1, mut t2, t3) = match direction {
            Direction::Long => {
                let low = tail
                    .iter()
                    .filter(|c| c.is_well_formed())
                    .map(|c| c.low)
                    .fold(f64::INFINITY, f64::min);
                let stop = (entry * 0.99).min(low - buffer);
                (stop, entry * (1.0 + p1), entry * (1.0 + p2), entry * (1.0 + p3))
            }
            Direction::Short => {
                let high = tail
                    .iter()
                    .filter(|c| c.is_well_formed())
                    .map(|c| c.high)
                    .fold(f64::NEG_INFINITY, f64::max);
                let stop = (entry * 1.01).max(high + buffer);
                (stop, entry * (1.0 - p1), entry * (1.0 - p2), entry * (1.0 - p3))
            }
        };
        if !stop.is_finite() {
            return None;
        }

        // Snap the middle target to the channel's opposite boundary when a
        // valid channel exists and the snap keeps the ladder monotonic.
        if let Some(ch) = channel.filter(|ch| ch.is_valid) {
            match direction {
                Direction::Long if ch.upper > t1 && ch.upper < t3 => t2 = ch.upper,
                Direction::Short if ch.lower < t1 && ch.lower > t3 => t2 = ch.lower,
                _ => {}
            }
        }
        // A degenerate ladder (targets collapsing into each other) cannot
        // be repaired; drop the candidate.
        let ordered = match direction {
            Direction::Long => stop < entry && entry < t1 && t1 < t2 && t2 < t3,
            Direction::Short => stop > entry && entry > t1 && t1 > t2 && t2 > t3,
        };
        if !ordered {
            debug_assert!(false, "signal ladder failed price ordering for {}", symbol);
            error!(
                "[SignalFactory] Dropping {} {} candidate with unordered prices",
                symbol, direction
            );
            return None;
        }

        let risk = (entry - stop).abs();
        let reward = (t2 - entry).abs();
        if risk <= 0.0 {
            return None;
        }
        let risk_reward = reward / risk;
        if risk_reward < cfg.min_risk_reward && !confluence.quad_rotation {
            debug!(
                "[SignalFactory] {} {} discarded: rr {:.2} below {:.2} without rotation",
                symbol, direction, risk_reward, cfg.min_risk_reward
            );
            return None;
        }

        let position_size_percent = if confluence.strength >= SignalStrength::Super {
            cfg.max_position_pct
        } else {
            cfg.default_position_pct
        };

        let now = Utc::now();
        let signal = Signal {
            id: Uuid::new_v4().to_string(),
            symbol: symbol.to_string(),
            direction,
            strength: confluence.strength,
            entry_price: entry,
            stop_loss: stop,
            target1: t1,
            target2: t2,
            target3: t3,
            divergence,
            confluence,
            quad_snapshot: snapshot,
            status: SignalStatus::Pending,
            risk_reward,
            position_size_percent,
            pnl_percent: None,
            exit_price: None,
            created_at: now,
            updated_at: now,
            closed_at: None,
        };
        debug_assert!(signal.prices_are_ordered());
        Some(signal)
    }

    /// Cap a cycle's candidates to the top 3, ordered by strength, then
    /// score, then the divergence priority already used for merging.
    pub fn select_top(&self, mut candidates: Vec<Signal>) -> Vec<Signal> {
        candidates.sort_by(|a, b| {
            b.strength
                .cmp(&a.strength)
                .then_with(|| b.confluence.score.cmp(&a.confluence.score))
                .then_with(|| {
                    let pa = a.divergence.map(|d| d.band.priority()).unwrap_or(0);
                    let pb = b.divergence.map(|d| d.band.priority()).unwrap_or(0);
                    pb.cmp(&pa)
                })
                .then_with(|| {
                    let aa = a.divergence.map(|d| d.angle_degrees).unwrap_or(0.0);
                    let ab = b.divergence.map(|d| d.angle_degrees).unwrap_or(0.0);
                    ab.partial_cmp(&aa).unwrap_or(std::cmp::Ordering::Equal)
                })
        });
        candidates.truncate(3);
        candidates
    }
}
