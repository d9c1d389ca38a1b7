// src/lib.rs
pub mod config;
pub mod detectors;
pub mod engine;
pub mod errors;
pub mod indicators;
pub mod scanner;
pub mod signals;
pub mod types;

pub use config::SignalConfig;
pub use engine::{evaluate, SignalEngine};
pub use errors::{CoreError, CoreResult};
pub use scanner::{CandleProvider, ReplayProvider, Scanner, ScannerConfig};
pub use signals::{SignalLifecycle, SignalRepository};
pub use types::{Candle, Direction, Signal, SignalStatus, SignalStrength};
