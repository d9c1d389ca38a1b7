// src/indicators/stochastic.rs - Single stochastic band (%K / %D)
use log::warn;
use serde::{Deserialize, Serialize};

use crate::types::{Candle, OscillatorValue};

/// Period triple for one stochastic band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandParams {
    pub k_period: usize,
    pub d_period: usize,
    pub smoothing: usize,
}

impl BandParams {
    pub fn new(k_period: usize, d_period: usize, smoothing: usize) -> Self {
        Self {
            k_period,
            d_period,
            smoothing,
        }
    }

    /// First index at which %K is defined.
    pub fn k_warmup(&self) -> usize {
        self.k_period - 1 + self.smoothing - 1
    }

    /// First index at which %D (and so a fully valid reading) is defined.
    pub fn d_warmup(&self) -> usize {
        self.k_warmup() + self.d_period - 1
    }
}

/// Computes one %K/%D series from OHLC history.
///
/// rawK = (close - lowest low) / (highest high - lowest low) * 100 over the
/// last `k_period` candles, with rawK = 50 on a zero range (flat market).
/// A moving average of width `smoothing` turns rawK into %K and one of
/// width `d_period` turns %K into %D. Warm-up positions are undefined.
#[derive(Debug, Clone, Copy)]
pub struct OscillatorBand {
    params: BandParams,
}

impl OscillatorBand {
    pub fn new(params: BandParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> BandParams {
        self.params
    }

    /// Batch computation, same length as the input.
    pub fn compute(&self, candles: &[Candle]) -> Vec<OscillatorValue> {
        let p = self.params;
        let n = candles.len();
        let mut out: Vec<OscillatorValue> = candles
            .iter()
            .map(|c| OscillatorValue::undefined(c.time))
            .collect();

        if n < p.k_period {
            return out;
        }

        // rawK per index, None during the k_period warm-up.
        let mut raw_k: Vec<Option<f64>> = vec![None; n];
        for i in (p.k_period - 1)..n {
            let window = &candles[i + 1 - p.k_period..=i];
            raw_k[i] = Some(raw_k_value(candles[i].close, window));
        }

        // %K = MA(rawK, smoothing); %D = MA(%K, d_period).
        for i in p.k_warmup()..n {
            let k = window_mean(&raw_k[i + 1 - p.smoothing..=i]);
            out[i].k = Some(sanitize(k, "%K"));
        }
        for i in p.d_warmup()..n {
            let d_window: Vec<f64> = (i + 1 - p.d_period..=i)
                .map(|j| out[j].k.unwrap_or(50.0))
                .collect();
            let d = d_window.iter().sum::<f64>() / d_window.len() as f64;
            out[i].d = Some(sanitize(d, "%D"));
        }

        // %K without %D is not a usable reading; keep the pair atomic so
        // consumers only ever see fully valid values.
        for v in out.iter_mut() {
            if v.d.is_none() {
                v.k = None;
            }
        }

        out
    }
}

/// rawK for one window, neutral 50 on a flat (zero-range) window.
pub(crate) fn raw_k_value(close: f64, window: &[Candle]) -> f64 {
    let lowest = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let highest = window
        .iter()
        .map(|c| c.high)
        .fold(f64::NEG_INFINITY, f64::max);

    let range = highest - lowest;
    if range <= 0.0 || !range.is_finite() {
        return 50.0;
    }
    ((close - lowest) / range * 100.0).clamp(0.0, 100.0)
}

fn window_mean(window: &[Option<f64>]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in window {
        if let Some(x) = v {
            sum += x;
            count += 1;
        }
    }
    if count == 0 {
        50.0
    } else {
        sum / count as f64
    }
}

/// Any computed NaN is clamped to a neutral 50 with a diagnostic, never
/// propagated: a transient bad value must not poison the series.
pub(crate) fn sanitize(value: f64, label: &str) -> f64 {
    if value.is_nan() {
        warn!("[Stochastic] NaN {} clamped to neutral 50", label);
        return 50.0;
    }
    value.clamp(0.0, 100.0)
}
