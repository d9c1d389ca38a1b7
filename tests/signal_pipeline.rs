// tests/signal_pipeline.rs
//
// End-to-end pipeline scenarios: rotation entry, divergence detection,
// and the life of a signal from admission to the history book.
use signal_detector::detectors::DivergenceDetector;
use signal_detector::signals::SignalRepository;
use signal_detector::types::{BandId, Candle, DivergenceKind, OscillatorValue};
use signal_detector::{evaluate, Direction, SignalConfig, SignalStatus};

fn candle(i: usize, close: f64) -> Candle {
    Candle {
        time: i as i64 * 60,
        open: close * 1.0005,
        high: close * 1.001,
        low: close * 0.999,
        close,
        volume: 100.0,
    }
}

/// 150 candles falling 0.5% each, then three small up-closes. Every band
/// ends deep oversold with the fast band curling up.
fn oversold_reversal() -> Vec<Candle> {
    let mut candles = Vec::new();
    let mut price = 100.0;
    for i in 0..150 {
        candles.push(candle(i, price));
        price *= 0.995;
    }
    for i in 150..153 {
        price *= 1.0005;
        candles.push(candle(i, price));
    }
    candles
}

#[test]
fn flat_market_yields_nothing() {
    let cfg = SignalConfig::default();
    let flat: Vec<Candle> = (0..200)
        .map(|i| Candle {
            time: i * 60,
            open: 100.0,
            high: 100.0,
            low: 100.0,
            close: 100.0,
            volume: 100.0,
        })
        .collect();
    let signals = evaluate("EURUSD", &flat, &cfg).unwrap();
    assert!(signals.is_empty());
}

#[test]
fn oversold_rotation_fires_a_long_entry() {
    let cfg = SignalConfig::default();
    let signals = evaluate("EURUSD", &oversold_reversal(), &cfg).unwrap();
    assert_eq!(signals.len(), 1);

    let signal = &signals[0];
    assert_eq!(signal.direction, Direction::Long);
    assert!(signal.confluence.quad_rotation);
    assert!(signal.confluence.score >= 3);
    assert!(signal.prices_are_ordered());
    assert!(signal.stop_loss < signal.entry_price);
    assert!(signal.target1 < signal.target2 && signal.target2 < signal.target3);
}

#[test]
fn detection_is_idempotent_over_the_same_candles() {
    let cfg = SignalConfig::default();
    let candles = oversold_reversal();
    let first = evaluate("EURUSD", &candles, &cfg).unwrap();
    let second = evaluate("EURUSD", &candles, &cfg).unwrap();
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.direction, b.direction);
        assert_eq!(a.entry_price, b.entry_price);
        assert_eq!(a.stop_loss, b.stop_loss);
        assert_eq!(a.confluence, b.confluence);
    }
}

/// Two swing lows five candles apart: price lower low, oscillator higher
/// low. Exactly one fast-band bullish divergence, and re-running the
/// detector does not duplicate it.
#[test]
fn fast_band_bullish_divergence_exactly_once() {
    let cfg = SignalConfig::default();

    let mut closes = vec![103.0, 102.0, 101.0];
    closes.extend([100.5, 100.2, 100.0, 100.3, 100.6]); // trough at 100.0
    closes.extend([101.0, 101.5, 101.2, 100.6, 100.1]);
    closes.extend([99.8, 99.5, 99.9, 100.4, 101.0]); // lower trough at 99.5
    closes.extend([101.5, 102.0, 102.5]);
    let candles: Vec<Candle> = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Candle {
            time: i as i64 * 60,
            open: c,
            high: c + 0.05,
            low: c - 0.05,
            close: c,
            volume: 100.0,
        })
        .collect();

    // Oscillator makes a higher low (12 -> 35) where price makes a lower
    // low (100.0 at index 5 -> 99.5 at index 14).
    let oscillator: Vec<OscillatorValue> = candles
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let k = match i {
                5 => 12.0,
                14 => 35.0,
                _ => 55.0,
            };
            OscillatorValue {
                time: c.time,
                k: Some(k),
                d: Some(k),
            }
        })
        .collect();

    let detector = DivergenceDetector::new(&cfg);
    let found = detector.detect(&candles, &[(BandId::Fast, oscillator.as_slice())]);
    let bullish: Vec<_> = found
        .iter()
        .filter(|d| d.kind == DivergenceKind::Bullish)
        .collect();
    assert_eq!(bullish.len(), 1);
    let d = bullish[0];
    assert_eq!(d.band, BandId::Fast);
    assert_eq!(d.candle_span, 9);
    assert!(d.angle_degrees > cfg.min_divergence_angle);

    let again = detector.detect(&candles, &[(BandId::Fast, oscillator.as_slice())]);
    assert_eq!(found, again);
}

#[test]
fn stop_breach_retires_the_signal_into_history() {
    let cfg = SignalConfig::default();
    let candles = oversold_reversal();
    let signals = evaluate("EURUSD", &candles, &cfg).unwrap();
    assert!(!signals.is_empty());
    let stop = signals[0].stop_loss;
    let entry = signals[0].entry_price;

    let repo = SignalRepository::new(&cfg);
    for signal in signals {
        repo.insert_or_refresh(signal);
    }
    assert_eq!(repo.active().len(), 1);

    repo.apply_price("EURUSD", entry); // activates
    assert_eq!(repo.active()[0].status, SignalStatus::Active);

    let events = repo.apply_price("EURUSD", stop * 0.999);
    assert_eq!(events.len(), 1);

    assert!(repo.active().is_empty());
    let history = repo.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, SignalStatus::Stopped);
    assert!(history[0].pnl_percent.unwrap() < 0.0);
    assert!(history[0].closed_at.is_some());

    // Nothing left to stop a second time.
    assert!(repo.apply_price("EURUSD", stop * 0.99).is_empty());
    assert_eq!(repo.history().len(), 1);
}
