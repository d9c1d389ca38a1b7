// src/signals/mod.rs
mod confluence;
mod factory;
mod lifecycle;
mod repository;

pub use confluence::{ConfluenceInputs, ConfluenceScorer};
pub use factory::SignalFactory;
pub use lifecycle::{LifecycleEvent, SignalLifecycle};
pub use repository::{RepositorySummary, SignalRepository};
