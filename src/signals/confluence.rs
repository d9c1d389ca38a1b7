// src/signals/confluence.rs - Confirmation-condition scoring
use crate::config::SignalConfig;
use crate::indicators::{ma_stack, session_vwap, volume_spike};
use crate::types::{
    Candle, ChannelBoundary, ChannelPosition, ConfluenceFlags, Direction, Divergence,
    QuadSnapshot, RotationResult, RotationStrength, SignalStrength,
};

const MA_SHORT_PERIOD: usize = 20;
const MA_LONG_PERIOD: usize = 50;

/// Everything the scorer looks at for one direction. All derived from the
/// same candle series; nothing is fetched externally.
pub struct ConfluenceInputs<'a> {
    pub direction: Direction,
    pub candles: &'a [Candle],
    pub snapshot: &'a QuadSnapshot,
    pub rotation: RotationResult,
    pub divergence: Option<&'a Divergence>,
    pub channel: Option<(ChannelBoundary, ChannelPosition)>,
}

/// Reduces the fixed set of boolean confirmations to an integer score and
/// a strength tier.
pub struct ConfluenceScorer<'a> {
    config: &'a SignalConfig,
}

impl<'a> ConfluenceScorer<'a> {
    pub fn new(config: &'a SignalConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, inputs: &ConfluenceInputs<'_>) -> ConfluenceFlags {
        let cfg = self.config;
        let direction = inputs.direction;
        let price = inputs
            .candles
            .last()
            .map(|c| c.close)
            .unwrap_or(f64::NAN);

        let quad_rotation = match direction {
            Direction::Long => inputs.rotation.is_oversold_rotation,
            Direction::Short => inputs.rotation.is_overbought_rotation,
        };

        let channel_extreme = inputs
            .channel
            .map(|(boundary, position)| {
                boundary.is_valid
                    && match direction {
                        Direction::Long => position == ChannelPosition::Lower,
                        Direction::Short => position == ChannelPosition::Upper,
                    }
            })
            .unwrap_or(false);

        let flag_pattern = self.flag_pattern(inputs.snapshot, direction);

        let vwap_confluence = session_vwap(inputs.candles)
            .map(|vwap| match direction {
                Direction::Long => price < vwap,
                Direction::Short => price > vwap,
            })
            .unwrap_or(false);

        let ma_confluence = ma_stack(inputs.candles, MA_SHORT_PERIOD, MA_LONG_PERIOD)
            .map(|stack| match direction {
                Direction::Long => stack.short > stack.long,
                Direction::Short => stack.short < stack.long,
            })
            .unwrap_or(false);

        let spike = volume_spike(
            inputs.candles,
            cfg.volume_avg_period,
            cfg.volume_spike_multiplier,
        );

        let slow = inputs.snapshot.slow;
        let htf_alignment = match direction {
            Direction::Long => slow.k > slow.d,
            Direction::Short => slow.k < slow.d,
        };

        let aligned_divergence = inputs.divergence.filter(|d| match direction {
            Direction::Long => d.kind.is_bullish(),
            Direction::Short => !d.kind.is_bullish(),
        });

        let mut score = 0;
        score += divergence_bonus(aligned_divergence, cfg);
        if quad_rotation {
            score += rotation_bonus(inputs.rotation.strength);
        }
        if channel_extreme {
            score += 2;
        }
        if flag_pattern {
            score += 2;
        }
        if vwap_confluence {
            score += 1;
        }
        if ma_confluence {
            score += 1;
        }
        if spike {
            score += 1;
        }
        if htf_alignment {
            score += 1;
        }

        ConfluenceFlags {
            quad_rotation,
            channel_extreme,
            flag_pattern,
            vwap_confluence,
            ma_confluence,
            volume_spike: spike,
            htf_alignment,
            score,
            strength: strength_tier(score),
        }
    }

    /// A qualifying signal meets the notification floor, or carries a quad
    /// rotation, which always qualifies regardless of score.
    pub fn qualifies(&self, flags: &ConfluenceFlags) -> bool {
        flags.quad_rotation || flags.strength >= self.config.min_notification_strength
    }

    /// Flag pattern: the fastest band fully beyond one threshold while the
    /// slowest band holds beyond the opposite one (a pullback against a
    /// still-stretched higher-order trend).
    fn flag_pattern(&self, snapshot: &QuadSnapshot, direction: Direction) -> bool {
        let cfg = self.config;
        let fast = snapshot.fast;
        let slow = snapshot.slow;
        match direction {
            Direction::Long => {
                fast.k <= cfg.oversold && fast.d <= cfg.oversold && slow.k >= cfg.overbought
            }
            Direction::Short => {
                fast.k >= cfg.overbought && fast.d >= cfg.overbought && slow.k <= cfg.oversold
            }
        }
    }
}

fn rotation_bonus(strength: RotationStrength) -> i32 {
    match strength {
        RotationStrength::Extreme => 5,
        RotationStrength::Strong => 4,
        RotationStrength::Moderate => 3,
        RotationStrength::None => 0,
    }
}

/// Angle-tiered divergence bonus, 0-3.
fn divergence_bonus(divergence: Option<&Divergence>, config: &SignalConfig) -> i32 {
    let Some(d) = divergence else {
        return 0;
    };
    if d.angle_degrees >= 45.0 {
        3
    } else if d.angle_degrees >= 25.0 {
        2
    } else if d.angle_degrees >= config.min_divergence_angle {
        1
    } else {
        0
    }
}

fn strength_tier(score: i32) -> SignalStrength {
    if score >= 7 {
        SignalStrength::Super
    } else if score >= 5 {
        SignalStrength::Strong
    } else if score >= 3 {
        SignalStrength::Moderate
    } else {
        SignalStrength::Weak
    }
}
