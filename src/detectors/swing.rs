// src/detectors/swing.rs - Local extremum extraction shared by the
// divergence and channel detectors.
use crate::types::{Candle, OscillatorValue, SwingPoint};

/// A point is a swing low if its low is strictly below the lows of the
/// `window` candles on each side. `min_swing_size` (fraction of price)
/// filters out micro-wiggles: the point must sit at least that far below
/// the higher of its two neighborhoods' highs.
pub fn find_swing_lows(
    candles: &[Candle],
    oscillator: Option<&[OscillatorValue]>,
    window: usize,
    min_swing_size: f64,
) -> Vec<SwingPoint> {
    find_swings(candles, oscillator, window, min_swing_size, false)
}

/// Mirror of [`find_swing_lows`] for swing highs.
pub fn find_swing_highs(
    candles: &[Candle],
    oscillator: Option<&[OscillatorValue]>,
    window: usize,
    min_swing_size: f64,
) -> Vec<SwingPoint> {
    find_swings(candles, oscillator, window, min_swing_size, true)
}

fn find_swings(
    candles: &[Candle],
    oscillator: Option<&[OscillatorValue]>,
    window: usize,
    min_swing_size: f64,
    highs: bool,
) -> Vec<SwingPoint> {
    let n = candles.len();
    let mut swings = Vec::new();
    if n < 2 * window + 1 {
        return swings;
    }

    for i in window..n - window {
        let c = &candles[i];
        if !c.is_well_formed() {
            continue;
        }

        let price = if highs { c.high } else { c.low };
        let mut is_extreme = true;
        let mut opposite_extreme = f64::NEG_INFINITY;

        for j in i - window..=i + window {
            if j == i {
                continue;
            }
            let other = &candles[j];
            if !other.is_well_formed() {
                is_extreme = false;
                break;
            }
            let other_price = if highs { other.high } else { other.low };
            let strictly_beyond = if highs {
                price > other_price
            } else {
                price < other_price
            };
            if !strictly_beyond {
                is_extreme = false;
                break;
            }
            let reach = if highs { other.low } else { other.high };
            let depth = if highs { price - reach } else { reach - price };
            opposite_extreme = opposite_extreme.max(depth);
        }

        if !is_extreme {
            continue;
        }
        // Relative swing size filter against noise.
        if price > 0.0 && opposite_extreme / price < min_swing_size {
            continue;
        }

        let (osc_k, osc_d) = oscillator
            .and_then(|series| series.get(i))
            .map(|v| (v.k.unwrap_or(50.0), v.d.unwrap_or(50.0)))
            .unwrap_or((50.0, 50.0));

        swings.push(SwingPoint {
            index: i,
            time: c.time,
            price,
            oscillator_k: osc_k,
            oscillator_d: osc_d,
        });
    }

    swings
}
