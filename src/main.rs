// src/main.rs
use std::sync::Arc;

use clap::Parser;
use dotenv::dotenv;
use log::{error, info};

use signal_detector::scanner::{ReplayProvider, Scanner, ScannerConfig};
use signal_detector::signals::SignalRepository;
use signal_detector::SignalConfig;

/// Multi-band stochastic signal scanner.
#[derive(Parser, Debug)]
#[command(name = "signal_detector", version, about)]
struct Args {
    /// Symbols to scan, comma separated.
    #[arg(long, value_delimiter = ',', default_value = "EURUSD,GBPUSD,USDJPY")]
    symbols: Vec<String>,

    /// Candle interval (1m, 3m, 5m, 15m).
    #[arg(long, default_value = "1m")]
    interval: String,

    /// Seconds between scan cycles.
    #[arg(long, default_value_t = 60)]
    cadence: u64,

    /// Symbols scanned concurrently per batch.
    #[arg(long, default_value_t = 4)]
    parallelism: usize,

    /// Directory of per-symbol replay files (<SYMBOL>.json).
    #[arg(long, default_value = "data/candles")]
    candle_dir: String,

    /// Run a single scan cycle and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init_from_env(
        env_logger::Env::new().default_filter_or("signal_detector=info,info"),
    );

    let args = Args::parse();
    let signal_config = SignalConfig::default();
    if let Err(e) = signal_config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let scanner_config = ScannerConfig {
        symbols: args.symbols.clone(),
        interval: args.interval.clone(),
        cadence_secs: args.cadence,
        parallelism: args.parallelism,
        ..ScannerConfig::default()
    };

    let repository = Arc::new(SignalRepository::new(&signal_config));
    let provider = Arc::new(ReplayProvider::new(&args.candle_dir));
    let scanner = match Scanner::new(scanner_config, signal_config, provider, repository) {
        Ok(scanner) => scanner,
        Err(e) => {
            error!("Failed to start scanner: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Scanning {:?} at {} from {}",
        args.symbols, args.interval, args.candle_dir
    );

    if args.once {
        let summary = scanner.scan_cycle().await;
        info!(
            "Single cycle: {} ok, {} failed, {} signals found",
            summary.scanned, summary.failed, summary.signals_found
        );
        for result in scanner.latest_results() {
            for signal in &result.signals {
                info!(
                    "  {} {} {} entry {:.5} stop {:.5} targets {:.5}/{:.5}/{:.5} (score {})",
                    signal.strength,
                    signal.symbol,
                    signal.direction,
                    signal.entry_price,
                    signal.stop_loss,
                    signal.target1,
                    signal.target2,
                    signal.target3,
                    signal.confluence.score
                );
            }
        }
        return;
    }

    tokio::select! {
        _ = scanner.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
            scanner.repository().log_summary();
        }
    }
}
