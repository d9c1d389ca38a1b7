// src/signals/repository.rs - In-memory signal book
use std::collections::VecDeque;

use chrono::Utc;
use log::{info, warn};
use parking_lot::Mutex;

use crate::config::SignalConfig;
use crate::signals::lifecycle::{LifecycleEvent, SignalLifecycle};
use crate::types::{Signal, SignalStatus};

/// Aggregate outcome of everything the book has archived, plus the
/// signals still working.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepositorySummary {
    pub active_count: usize,
    pub closed_count: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate_pct: f64,
    pub total_pnl_percent: f64,
    pub avg_pnl_percent: f64,
}

struct Inner {
    active: Vec<Signal>,
    history: VecDeque<Signal>,
}

/// Thread-safe store for working and archived signals. Scanner workers
/// on different symbols share one instance.
pub struct SignalRepository {
    inner: Mutex<Inner>,
    duplicate_window_secs: i64,
    max_active: usize,
    history_cap: usize,
    archive_on_target2: bool,
}

impl SignalRepository {
    pub fn new(config: &SignalConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                active: Vec::new(),
                history: VecDeque::new(),
            }),
            duplicate_window_secs: config.duplicate_window_secs,
            max_active: config.max_active_signals,
            history_cap: config.history_cap,
            archive_on_target2: config.archive_on_target2,
        }
    }

    /// Admit a freshly built signal, or refresh the working signal it
    /// duplicates. A candidate for the same symbol and direction inside
    /// the duplicate window touches the existing signal's timestamp (and
    /// upgrades its grading when the new read is stronger) instead of
    /// opening a second position. Returns true only for a genuinely new
    /// entry. When the book is full the oldest working signal is expired
    /// and archived to make room.
    pub fn insert_or_refresh(&self, signal: Signal) -> bool {
        let mut inner = self.inner.lock();
        let cutoff = signal.created_at - chrono::Duration::seconds(self.duplicate_window_secs);
        if let Some(existing) = inner.active.iter_mut().find(|s| {
            s.symbol == signal.symbol && s.direction == signal.direction && s.created_at > cutoff
        }) {
            existing.updated_at = signal.created_at;
            if signal.confluence.score > existing.confluence.score {
                existing.confluence = signal.confluence;
                existing.strength = signal.strength;
                existing.quad_snapshot = signal.quad_snapshot;
            }
            info!(
                "[Repository] Refreshed duplicate {} {} signal inside {}s window",
                signal.symbol, signal.direction, self.duplicate_window_secs
            );
            return false;
        }
        if inner.active.len() >= self.max_active {
            if let Some(oldest) = inner
                .active
                .iter()
                .enumerate()
                .min_by_key(|(_, s)| s.created_at)
                .map(|(i, _)| i)
            {
                let mut evicted = inner.active.remove(oldest);
                warn!(
                    "[Repository] Book full ({} signals), expiring oldest {} {}",
                    self.max_active, evicted.symbol, evicted.id
                );
                SignalLifecycle::force_close(&mut evicted);
                Self::archive(&mut inner, evicted, self.history_cap);
            }
        }

        info!(
            "[Repository] Admitted {} {} {} signal {} (entry {:.4}, rr {:.2})",
            signal.strength, signal.symbol, signal.direction, signal.id, signal.entry_price,
            signal.risk_reward
        );
        inner.active.push(signal);
        true
    }

    /// Run one traded price through every working signal on the symbol.
    /// Signals that finish are moved to history.
    pub fn apply_price(&self, symbol: &str, price: f64) -> Vec<(String, LifecycleEvent)> {
        let mut inner = self.inner.lock();
        let mut out = Vec::new();
        let mut idx = 0;
        while idx < inner.active.len() {
            if inner.active[idx].symbol != symbol {
                idx += 1;
                continue;
            }
            let events = SignalLifecycle::on_price(&mut inner.active[idx], price);
            let id = inner.active[idx].id.clone();
            for event in &events {
                out.push((id.clone(), *event));
            }
            if self.should_retire(&inner.active[idx]) {
                let signal = inner.active.remove(idx);
                Self::retire(&mut inner, signal, self.history_cap);
            } else {
                idx += 1;
            }
        }
        out
    }

    pub fn partial_close(&self, id: &str, price: f64) -> bool {
        let mut inner = self.inner.lock();
        inner
            .active
            .iter_mut()
            .find(|s| s.id == id)
            .and_then(|s| SignalLifecycle::partial_close(s, price))
            .is_some()
    }

    /// Expire one signal by id and drop it without archiving.
    pub fn force_close(&self, id: &str) -> bool {
        let mut inner = self.inner.lock();
        if let Some(pos) = inner.active.iter().position(|s| s.id == id) {
            let mut signal = inner.active.remove(pos);
            SignalLifecycle::force_close(&mut signal);
            true
        } else {
            false
        }
    }

    pub fn active(&self) -> Vec<Signal> {
        self.inner.lock().active.clone()
    }

    pub fn active_for(&self, symbol: &str) -> Vec<Signal> {
        self.inner
            .lock()
            .active
            .iter()
            .filter(|s| s.symbol == symbol)
            .cloned()
            .collect()
    }

    pub fn history(&self) -> Vec<Signal> {
        self.inner.lock().history.iter().cloned().collect()
    }

    pub fn summary(&self) -> RepositorySummary {
        let inner = self.inner.lock();
        let closed_count = inner.history.len();
        let mut wins = 0;
        let mut losses = 0;
        let mut total_pnl = 0.0;
        for signal in &inner.history {
            let pnl = signal.pnl_percent.unwrap_or(0.0);
            total_pnl += pnl;
            if pnl > 0.0 {
                wins += 1;
            } else {
                losses += 1;
            }
        }
        let win_rate = if closed_count > 0 {
            wins as f64 / closed_count as f64 * 100.0
        } else {
            0.0
        };
        let avg_pnl = if closed_count > 0 {
            total_pnl / closed_count as f64
        } else {
            0.0
        };
        RepositorySummary {
            active_count: inner.active.len(),
            closed_count,
            wins,
            losses,
            win_rate_pct: win_rate,
            total_pnl_percent: total_pnl,
            avg_pnl_percent: avg_pnl,
        }
    }

    pub fn log_summary(&self) {
        let s = self.summary();
        info!(
            "[Repository] {} active | {} closed | {} wins / {} losses ({:.1}%) | total pnl {:+.2}% | avg {:+.2}%",
            s.active_count,
            s.closed_count,
            s.wins,
            s.losses,
            s.win_rate_pct,
            s.total_pnl_percent,
            s.avg_pnl_percent
        );
    }

    fn should_retire(&self, signal: &Signal) -> bool {
        match signal.status {
            SignalStatus::Stopped | SignalStatus::Target3Hit | SignalStatus::Expired => true,
            SignalStatus::Target2Hit => self.archive_on_target2,
            _ => false,
        }
    }

    fn retire(inner: &mut Inner, mut signal: Signal, history_cap: usize) {
        if signal.status == SignalStatus::Target2Hit && signal.closed_at.is_none() {
            signal.closed_at = Some(Utc::now());
        }
        Self::archive(inner, signal, history_cap);
    }

    fn archive(inner: &mut Inner, signal: Signal, history_cap: usize) {
        inner.history.push_back(signal);
        while inner.history.len() > history_cap {
            inner.history.pop_front();
        }
    }
}
