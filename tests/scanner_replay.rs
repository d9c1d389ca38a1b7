// tests/scanner_replay.rs
//
// Scanner over the file-replay provider: a full cycle against real candle
// files on disk, duplicate suppression across cycles.
use std::path::PathBuf;
use std::sync::Arc;

use signal_detector::scanner::{ReplayProvider, Scanner, ScannerConfig};
use signal_detector::signals::SignalRepository;
use signal_detector::types::Candle;
use signal_detector::SignalConfig;

fn oversold_reversal() -> Vec<Candle> {
    let mut candles = Vec::new();
    let mut price = 100.0;
    for i in 0..150i64 {
        candles.push(Candle {
            time: i * 60,
            open: price * 1.0005,
            high: price * 1.001,
            low: price * 0.999,
            close: price,
            volume: 100.0,
        });
        price *= 0.995;
    }
    for i in 150..153i64 {
        price *= 1.0005;
        candles.push(Candle {
            time: i * 60,
            open: price * 1.0005,
            high: price * 1.001,
            low: price * 0.999,
            close: price,
            volume: 100.0,
        });
    }
    candles
}

async fn write_feed(dir: &PathBuf, symbol: &str, candles: &[Candle]) {
    let path = dir.join(format!("{}.json", symbol));
    tokio::fs::write(&path, serde_json::to_vec(candles).unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn replay_scan_admits_and_then_refreshes() {
    let dir = std::env::temp_dir().join(format!("scan-{}", uuid::Uuid::new_v4()));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    write_feed(&dir, "EURUSD", &oversold_reversal()).await;

    let signal_config = SignalConfig::default();
    let repository = Arc::new(SignalRepository::new(&signal_config));
    let scanner = Scanner::new(
        ScannerConfig {
            symbols: vec!["EURUSD".to_string(), "GBPUSD".to_string()],
            ..ScannerConfig::default()
        },
        signal_config,
        Arc::new(ReplayProvider::new(&dir)),
        Arc::clone(&repository),
    )
    .unwrap();

    // GBPUSD has no file: one ok, one failed, cycle survives.
    let first = scanner.scan_cycle().await;
    assert_eq!(first.scanned, 1);
    assert_eq!(first.failed, 1);
    assert_eq!(first.signals_admitted, 1);
    assert_eq!(repository.active().len(), 1);

    let result = scanner.result_for("EURUSD").unwrap();
    assert!(result.has_signal);
    assert!(result.best_strength.is_some());

    // Same data a minute later: duplicate window swallows the re-detection.
    let second = scanner.scan_cycle().await;
    assert_eq!(second.signals_found, 1);
    assert_eq!(second.signals_admitted, 0);
    assert_eq!(repository.active().len(), 1);

    tokio::fs::remove_dir_all(&dir).await.ok();
}
