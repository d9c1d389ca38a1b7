// src/errors.rs

/// Error taxonomy for the analytic core.
///
/// Data-quality problems inside the pipeline do not surface here; they
/// degrade to empty results so a bad tick never halts a scan cycle. These
/// variants cover the boundaries: configuration rejection, provider
/// failures, and worker task failures caught at the Scanner.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Insufficient history: need {needed} candles, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Candle provider error: {0}")]
    Provider(String),

    #[error("Calculation task failed: {0}")]
    Task(String),
}

impl CoreError {
    pub fn config(msg: impl Into<String>) -> Self {
        CoreError::Config(msg.into())
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        CoreError::Provider(msg.into())
    }
}

/// Convenience alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;
