// src/indicators/context.rs - Market context derived from the candle series
//
// VWAP and the moving averages are computed from the same candle window the
// rest of the pipeline sees; nothing here is fetched externally.
use crate::types::Candle;

/// Session VWAP over the supplied window (the window is the session).
pub fn session_vwap(candles: &[Candle]) -> Option<f64> {
    let mut pv = 0.0;
    let mut vol = 0.0;
    for c in candles.iter().filter(|c| c.is_well_formed()) {
        pv += c.typical_price() * c.volume;
        vol += c.volume;
    }
    if vol > 0.0 {
        Some(pv / vol)
    } else {
        None
    }
}

/// Simple moving average of closes over the last `period` candles.
pub fn sma(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period {
        return None;
    }
    let window = &candles[candles.len() - period..];
    Some(window.iter().map(|c| c.close).sum::<f64>() / period as f64)
}

/// Short/long moving-average stack used for trend confluence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaStack {
    pub short: f64,
    pub long: f64,
}

pub fn ma_stack(candles: &[Candle], short_period: usize, long_period: usize) -> Option<MaStack> {
    Some(MaStack {
        short: sma(candles, short_period)?,
        long: sma(candles, long_period)?,
    })
}

/// Volume spike: latest candle's volume above `multiplier` times the
/// trailing `period`-candle average (the latest candle excluded from the
/// average).
pub fn volume_spike(candles: &[Candle], period: usize, multiplier: f64) -> bool {
    if candles.len() < period + 1 {
        return false;
    }
    let current = candles[candles.len() - 1].volume;
    let trailing = &candles[candles.len() - 1 - period..candles.len() - 1];
    let avg = trailing.iter().map(|c| c.volume).sum::<f64>() / period as f64;
    avg > 0.0 && current > multiplier * avg
}
