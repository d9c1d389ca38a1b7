// src/detectors/mod.rs
mod channel;
mod divergence;
mod swing;

pub use channel::ChannelDetector;
pub use divergence::DivergenceDetector;
pub use swing::{find_swing_highs, find_swing_lows};
