// src/signals/lifecycle.rs - Signal state machine
use chrono::Utc;
use log::info;

use crate::types::{Direction, Signal, SignalStatus};

/// What happened to a signal during one price update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Activated,
    Target1Hit,
    Target2Hit,
    Target3Hit,
    Stopped,
    PartialClose,
    Expired,
}

/// Drives signals through their states. Transitions only ever move
/// forward: a signal that reached target2 never reports target1 again,
/// and terminal signals ignore further prices.
pub struct SignalLifecycle;

impl SignalLifecycle {
    /// Feed one traded price to a signal. Returns every transition the
    /// price caused, in order. The stop is checked before targets; a bar
    /// that touches both resolves as stopped.
    pub fn on_price(signal: &mut Signal, price: f64) -> Vec<LifecycleEvent> {
        let mut events = Vec::new();
        if signal.status.is_terminal() || !price.is_finite() {
            return events;
        }

        if signal.status == SignalStatus::Pending {
            signal.status = SignalStatus::Active;
            signal.updated_at = Utc::now();
            info!(
                "[Lifecycle] {} {} {} activated at {:.4}",
                signal.symbol, signal.direction, signal.id, price
            );
            events.push(LifecycleEvent::Activated);
        }

        let stopped = match signal.direction {
            Direction::Long => price <= signal.stop_loss,
            Direction::Short => price >= signal.stop_loss,
        };
        if stopped {
            Self::close(signal, SignalStatus::Stopped, signal.stop_loss);
            info!(
                "[Lifecycle] {} {} {} stopped out at {:.4} ({:+.2}%)",
                signal.symbol,
                signal.direction,
                signal.id,
                signal.stop_loss,
                signal.pnl_percent.unwrap_or(0.0)
            );
            events.push(LifecycleEvent::Stopped);
            return events;
        }

        for (target, status, event) in [
            (signal.target1, SignalStatus::Target1Hit, LifecycleEvent::Target1Hit),
            (signal.target2, SignalStatus::Target2Hit, LifecycleEvent::Target2Hit),
            (signal.target3, SignalStatus::Target3Hit, LifecycleEvent::Target3Hit),
        ] {
            if status.progress() <= signal.status.progress() {
                continue;
            }
            let reached = match signal.direction {
                Direction::Long => price >= target,
                Direction::Short => price <= target,
            };
            if !reached {
                break;
            }
            if status == SignalStatus::Target3Hit {
                Self::close(signal, status, target);
            } else {
                signal.status = status;
                signal.updated_at = Utc::now();
            }
            info!(
                "[Lifecycle] {} {} {} reached {:?} at {:.4}",
                signal.symbol, signal.direction, signal.id, status, target
            );
            events.push(event);
        }
        events
    }

    /// Scale out part of the position at the given price. Only an active
    /// signal that has not yet hit a target can go partial.
    pub fn partial_close(signal: &mut Signal, price: f64) -> Option<LifecycleEvent> {
        if signal.status != SignalStatus::Active || !price.is_finite() {
            return None;
        }
        signal.status = SignalStatus::Partial;
        signal.updated_at = Utc::now();
        info!(
            "[Lifecycle] {} {} {} partially closed at {:.4}",
            signal.symbol, signal.direction, signal.id, price
        );
        Some(LifecycleEvent::PartialClose)
    }

    /// Retire a stale signal without realizing any outcome. Used when a
    /// setup goes untriggered for too long or the book is full.
    pub fn force_close(signal: &mut Signal) -> Option<LifecycleEvent> {
        if signal.status.is_terminal() {
            return None;
        }
        let now = Utc::now();
        signal.status = SignalStatus::Expired;
        signal.updated_at = now;
        signal.closed_at = Some(now);
        info!(
            "[Lifecycle] {} {} {} expired",
            signal.symbol, signal.direction, signal.id
        );
        Some(LifecycleEvent::Expired)
    }

    fn close(signal: &mut Signal, status: SignalStatus, exit_price: f64) {
        let now = Utc::now();
        signal.status = status;
        signal.exit_price = Some(exit_price);
        signal.pnl_percent = Some(Self::pnl_percent(signal, exit_price));
        signal.updated_at = now;
        signal.closed_at = Some(now);
    }

    fn pnl_percent(signal: &Signal, exit_price: f64) -> f64 {
        let raw = match signal.direction {
            Direction::Long => (exit_price - signal.entry_price) / signal.entry_price,
            Direction::Short => (signal.entry_price - exit_price) / signal.entry_price,
        };
        raw * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SignalConfig;
    use crate::signals::factory::SignalFactory;
    use crate::types::{BandReading, Candle, ConfluenceFlags, QuadSnapshot, SignalStrength};

    fn test_signal(direction: Direction) -> Signal {
        let cfg = SignalConfig::default();
        let factory = SignalFactory::new(&cfg);
        let candles: Vec<Candle> = (0..30)
            .map(|i| Candle {
                time: i * 60,
                open: 100.0,
                high: 100.1,
                low: 99.9,
                close: 100.0,
                volume: 50.0,
            })
            .collect();
        let reading = BandReading { k: 50.0, d: 50.0 };
        let snapshot = QuadSnapshot {
            fast: reading,
            standard: reading,
            medium: reading,
            slow: reading,
        };
        let flags = ConfluenceFlags {
            quad_rotation: true,
            channel_extreme: false,
            flag_pattern: false,
            vwap_confluence: false,
            ma_confluence: false,
            volume_spike: false,
            htf_alignment: false,
            score: 5,
            strength: SignalStrength::Strong,
        };
        factory
            .build("EURUSD", direction, &candles, snapshot, flags, None, None)
            .expect("fixture signal")
    }

    #[test]
    fn first_price_activates_pending_signal() {
        let mut signal = test_signal(Direction::Long);
        let entry_price = signal.entry_price;
        let events = SignalLifecycle::on_price(&mut signal, entry_price);
        assert_eq!(events, vec![LifecycleEvent::Activated]);
        assert_eq!(signal.status, SignalStatus::Active);
    }

    #[test]
    fn stop_breach_closes_with_negative_pnl() {
        let mut signal = test_signal(Direction::Long);
        let entry_price = signal.entry_price;
        SignalLifecycle::on_price(&mut signal, entry_price);
        let stop_price = signal.stop_loss - 0.01;
        let events = SignalLifecycle::on_price(&mut signal, stop_price);
        assert_eq!(events, vec![LifecycleEvent::Stopped]);
        assert_eq!(signal.status, SignalStatus::Stopped);
        assert!(signal.status.is_terminal());
        assert!(signal.pnl_percent.unwrap() < 0.0);
        assert!(signal.closed_at.is_some());

        // Terminal: further prices change nothing.
        let above_target3 = signal.target3 + 1.0;
        let after = SignalLifecycle::on_price(&mut signal, above_target3);
        assert!(after.is_empty());
        assert_eq!(signal.status, SignalStatus::Stopped);
    }

    #[test]
    fn one_tick_can_cross_several_targets() {
        let mut signal = test_signal(Direction::Long);
        let entry_price = signal.entry_price;
        SignalLifecycle::on_price(&mut signal, entry_price);
        let target2 = signal.target2;
        let events = SignalLifecycle::on_price(&mut signal, target2);
        assert_eq!(
            events,
            vec![LifecycleEvent::Target1Hit, LifecycleEvent::Target2Hit]
        );
        assert_eq!(signal.status, SignalStatus::Target2Hit);

        // Target1 is never reported again once past it.
        let target1 = signal.target1;
        let repeat = SignalLifecycle::on_price(&mut signal, target1);
        assert!(repeat.is_empty());
    }

    #[test]
    fn target3_realizes_positive_pnl() {
        let mut signal = test_signal(Direction::Long);
        let entry_price = signal.entry_price;
        SignalLifecycle::on_price(&mut signal, entry_price);
        let above_target3 = signal.target3 + 0.5;
        let events = SignalLifecycle::on_price(&mut signal, above_target3);
        assert_eq!(*events.last().unwrap(), LifecycleEvent::Target3Hit);
        assert_eq!(signal.status, SignalStatus::Target3Hit);
        assert!(signal.pnl_percent.unwrap() > 0.0);
    }

    #[test]
    fn short_direction_mirrors_stop_and_targets() {
        let mut signal = test_signal(Direction::Short);
        let entry_price = signal.entry_price;
        SignalLifecycle::on_price(&mut signal, entry_price);
        let target1 = signal.target1;
        let events = SignalLifecycle::on_price(&mut signal, target1);
        assert_eq!(events, vec![LifecycleEvent::Target1Hit]);

        let stop_price = signal.stop_loss + 0.01;
        let stopped = SignalLifecycle::on_price(&mut signal, stop_price);
        assert_eq!(stopped, vec![LifecycleEvent::Stopped]);
        assert!(signal.pnl_percent.unwrap() < 0.0);
    }

    #[test]
    fn partial_close_only_from_active() {
        let mut signal = test_signal(Direction::Long);
        assert!(SignalLifecycle::partial_close(&mut signal, 100.0).is_none());

        let entry_price = signal.entry_price;
        SignalLifecycle::on_price(&mut signal, entry_price);
        assert_eq!(
            SignalLifecycle::partial_close(&mut signal, 100.2),
            Some(LifecycleEvent::PartialClose)
        );
        assert_eq!(signal.status, SignalStatus::Partial);

        // Already partial: a second call is refused.
        assert!(SignalLifecycle::partial_close(&mut signal, 100.3).is_none());
    }

    #[test]
    fn force_close_expires_without_pnl() {
        let mut signal = test_signal(Direction::Long);
        assert_eq!(
            SignalLifecycle::force_close(&mut signal),
            Some(LifecycleEvent::Expired)
        );
        assert_eq!(signal.status, SignalStatus::Expired);
        assert!(signal.pnl_percent.is_none());
        assert!(SignalLifecycle::force_close(&mut signal).is_none());
    }
}
