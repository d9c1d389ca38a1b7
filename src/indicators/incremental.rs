// src/indicators/incremental.rs - O(period) per-tick oscillator updates
//
// Maintains, per (symbol, band), the rolling buffers needed so that a new
// candle or an amendment of the still-open candle updates %K/%D without
// rescanning history. The correctness contract: at every tick the latest
// values equal what a batch OscillatorBand::compute() over the same candle
// history would produce. The final reading only ever depends on the
// trailing k_period + smoothing + d_period candles, so evicting old
// candles past the retention cap never breaks the contract.
use std::collections::HashMap;
use std::collections::VecDeque;

use log::{debug, warn};

use crate::indicators::quad_band::band_params_for_interval;
use crate::indicators::stochastic::{raw_k_value, sanitize, BandParams};
use crate::types::{BandId, BandReading, Candle, OscillatorValue, QuadSnapshot};

const DEFAULT_RETENTION: usize = 500;

pub struct IncrementalEngine {
    band_params: [(BandId, BandParams); 4],
    retention_cap: usize,
    states: HashMap<String, SymbolState>,
}

struct SymbolState {
    candles: Vec<Candle>,
    bands: [BandState; 4],
}

struct BandState {
    params: BandParams,
    /// rawK tail, newest last. Long enough to rebuild %K and %D.
    raw_k: VecDeque<f64>,
    /// Smoothed %K tail, newest last.
    smooth_k: VecDeque<f64>,
}

impl BandState {
    fn new(params: BandParams) -> Self {
        Self {
            params,
            raw_k: VecDeque::with_capacity(params.smoothing + params.d_period + 2),
            smooth_k: VecDeque::with_capacity(params.d_period + 2),
        }
    }

    fn raw_cap(&self) -> usize {
        self.params.smoothing + self.params.d_period + 2
    }

    fn smooth_cap(&self) -> usize {
        self.params.d_period + 2
    }

    /// Fold in the newest candle. `candles` already contains it.
    fn push(&mut self, candles: &[Candle]) {
        let p = self.params;
        if candles.len() < p.k_period {
            return;
        }
        let window = &candles[candles.len() - p.k_period..];
        self.raw_k.push_back(raw_k_value(
            candles[candles.len() - 1].close,
            window,
        ));
        if self.raw_k.len() > self.raw_cap() {
            self.raw_k.pop_front();
        }

        if self.raw_k.len() >= p.smoothing {
            self.smooth_k.push_back(self.mean_of_raw_tail());
            if self.smooth_k.len() > self.smooth_cap() {
                self.smooth_k.pop_front();
            }
        }
    }

    /// The still-open candle changed in place; only the newest rawK and the
    /// newest %K can differ, everything earlier is settled history.
    fn amend(&mut self, candles: &[Candle]) {
        let p = self.params;
        if candles.len() < p.k_period {
            return;
        }
        let window = &candles[candles.len() - p.k_period..];
        let raw = raw_k_value(candles[candles.len() - 1].close, window);
        match self.raw_k.back_mut() {
            Some(back) => *back = raw,
            None => self.raw_k.push_back(raw),
        }

        if self.raw_k.len() >= p.smoothing {
            let smoothed = self.mean_of_raw_tail();
            // The %K for this candle exists iff it was produced on push.
            if self.smooth_k.len() == self.expected_smooth_len(candles.len()) {
                if let Some(back) = self.smooth_k.back_mut() {
                    *back = smoothed;
                }
            } else {
                self.smooth_k.push_back(smoothed);
                if self.smooth_k.len() > self.smooth_cap() {
                    self.smooth_k.pop_front();
                }
            }
        }
    }

    // Summed oldest-first so the result is bit-identical to the batch path.
    fn mean_of_raw_tail(&self) -> f64 {
        let s = self.params.smoothing;
        let sum: f64 = self.raw_k.iter().skip(self.raw_k.len() - s).sum();
        sanitize(sum / s as f64, "%K")
    }

    /// How many %K values the buffers should hold for `candle_count`
    /// candles, capped at the retained tail length.
    fn expected_smooth_len(&self, candle_count: usize) -> usize {
        let produced = candle_count.saturating_sub(self.params.k_warmup());
        produced.min(self.smooth_cap())
    }

    /// Latest reading; valid only once %D has warmed up, matching the
    /// batch path's atomic (k, d) validity.
    fn latest(&self, time: i64) -> OscillatorValue {
        let p = self.params;
        if self.smooth_k.len() < p.d_period {
            return OscillatorValue::undefined(time);
        }
        let k = *self.smooth_k.back().expect("non-empty checked above");
        let d_sum: f64 = self
            .smooth_k
            .iter()
            .skip(self.smooth_k.len() - p.d_period)
            .sum();
        OscillatorValue {
            time,
            k: Some(k),
            d: Some(sanitize(d_sum / p.d_period as f64, "%D")),
        }
    }
}

impl IncrementalEngine {
    pub fn new(interval: &str) -> Self {
        Self::with_retention(interval, DEFAULT_RETENTION)
    }

    pub fn with_retention(interval: &str, retention_cap: usize) -> Self {
        let band_params = band_params_for_interval(interval);
        let min_needed = band_params
            .iter()
            .map(|(_, p)| p.k_period + p.smoothing + p.d_period)
            .max()
            .unwrap_or(1);
        Self {
            band_params,
            retention_cap: retention_cap.max(min_needed),
            states: HashMap::new(),
        }
    }

    /// Single entry point for tick delivery: a freshly opened candle is a
    /// push, an update to the still-open candle is an amend.
    pub fn update(&mut self, symbol: &str, candle: Candle, is_new_candle: bool) {
        if !candle.is_well_formed() {
            warn!(
                "[Incremental] Dropping malformed candle for {} at {}",
                symbol, candle.time
            );
            return;
        }
        if is_new_candle {
            self.push_candle(symbol, candle);
        } else {
            self.amend_latest(symbol, candle);
        }
    }

    pub fn push_candle(&mut self, symbol: &str, candle: Candle) {
        let cap = self.retention_cap;
        let state = self.state_mut(symbol);
        if let Some(last) = state.candles.last() {
            if candle.time <= last.time {
                debug!(
                    "[Incremental] Out-of-order candle for {} ({} <= {}), treating as amend",
                    symbol, candle.time, last.time
                );
                Self::amend_state(state, candle);
                return;
            }
        }
        state.candles.push(candle);
        if state.candles.len() > cap {
            let excess = state.candles.len() - cap;
            state.candles.drain(..excess);
        }
        for band in state.bands.iter_mut() {
            band.push(&state.candles);
        }
    }

    pub fn amend_latest(&mut self, symbol: &str, candle: Candle) {
        let state = self.state_mut(symbol);
        if state.candles.is_empty() {
            // Nothing to amend yet; the first tick of a series opens it.
            state.candles.push(candle);
            for band in state.bands.iter_mut() {
                band.push(&state.candles);
            }
            return;
        }
        Self::amend_state(state, candle);
    }

    fn amend_state(state: &mut SymbolState, candle: Candle) {
        if let Some(last) = state.candles.last_mut() {
            *last = candle;
        }
        for band in state.bands.iter_mut() {
            band.amend(&state.candles);
        }
    }

    /// Latest per-band readings for the symbol; None until the slowest band
    /// has warmed up.
    pub fn snapshot(&self, symbol: &str) -> Option<QuadSnapshot> {
        let state = self.states.get(symbol)?;
        let time = state.candles.last()?.time;
        let mut readings = [BandReading { k: 50.0, d: 50.0 }; 4];
        for (i, band) in state.bands.iter().enumerate() {
            let v = band.latest(time);
            readings[i] = BandReading {
                k: v.k?,
                d: v.d?,
            };
        }
        Some(QuadSnapshot {
            fast: readings[0],
            standard: readings[1],
            medium: readings[2],
            slow: readings[3],
        })
    }

    /// Latest reading for one band, undefined while warming up.
    pub fn latest(&self, symbol: &str, band: BandId) -> Option<OscillatorValue> {
        let state = self.states.get(symbol)?;
        let time = state.candles.last()?.time;
        let idx = self
            .band_params
            .iter()
            .position(|(id, _)| *id == band)
            .expect("all four bands are always present");
        Some(state.bands[idx].latest(time))
    }

    /// The retained candle window for the symbol, oldest first. The batch
    /// pipeline runs over exactly this window on each tick.
    pub fn candles(&self, symbol: &str) -> Option<&[Candle]> {
        self.states.get(symbol).map(|s| s.candles.as_slice())
    }

    pub fn tracked_symbols(&self) -> Vec<String> {
        self.states.keys().cloned().collect()
    }

    fn state_mut(&mut self, symbol: &str) -> &mut SymbolState {
        let band_params = self.band_params;
        self.states
            .entry(symbol.to_string())
            .or_insert_with(|| SymbolState {
                candles: Vec::new(),
                bands: band_params.map(|(_, p)| BandState::new(p)),
            })
    }
}
