// src/indicators/mod.rs
mod context;
mod incremental;
mod quad_band;
mod stochastic;

pub use context::{ma_stack, session_vwap, sma, volume_spike, MaStack};
pub use incremental::IncrementalEngine;
pub use quad_band::{band_params_for_interval, QuadBandEngine, QuadSeries};
pub use stochastic::{BandParams, OscillatorBand};
