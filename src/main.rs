// ===============================
// src/main.rs
// ===============================
//
// Exit-ladder bot for a single spot instrument: protect an existing long
// position with a stop-limit, and as price climbs through the take-profit
// ladder, peel portions off into trailing stops while re-protecting the
// remainder.
//
// Venue via ENV:
//   VENUE_MODE=mock|binance_sandbox|binance_mainnet   (default sandbox)
//   SYMBOL / ASSET / STOP_PRICE / LIMIT_PRICE
//   TP_LEVELS=1.83:0.02:0.33,1.858:0.02:0.33,1.886:0.02:0.33
//   API_KEY / API_SECRET                               (binance modes)
//
// Exit codes: 0 = ran until inventory drained (clean), 1 = failed to start.
//
mod binance;          // signer / REST models for Binance
mod config;
mod domain;
mod gateway;          // trait + sim venue
mod gateway_binance;  // real Binance Spot (signed REST)
mod ladder;
mod metrics;
mod monitor;
mod orders;
mod qty;

use rust_decimal::Decimal;
use tracing::{error, info};

use crate::config::MarketMode;
use crate::gateway::SimGateway;
use crate::gateway_binance::BinanceGateway;
use crate::monitor::RunOutcome;

#[tokio::main]
async fn main() {
    // ---- Logging ----
    tracing_subscriber::fmt().with_env_filter("info").init();

    // ---- Load config ----
    let cfg = config::load();

    // ---- Metrics ----
    metrics::init();
    tokio::spawn(metrics::serve_metrics(cfg.metrics_port));

    info!(
        venue_mode = %cfg.venue_mode.as_str(),
        symbol = %cfg.symbol,
        asset = %cfg.asset,
        stop = %cfg.stop_price,
        limit = %cfg.limit_price,
        levels = cfg.levels.len(),
        poll_secs = cfg.poll_secs,
        binance_rest = %cfg.binance_rest_url,
        "startup config"
    );
    metrics::CONFIG_VENUE_MODE
        .with_label_values(&[cfg.venue_mode.as_str()])
        .set(1);
    metrics::CONFIG_SYMBOL
        .with_label_values(&[&cfg.symbol])
        .set(1);

    let outcome = match cfg.venue_mode {
        MarketMode::Mock => {
            // seeded sim venue: 100 units, 0.01 step, ticker random-walking
            // from just under the first trigger
            let start = cfg
                .levels
                .first()
                .map(|l| l.trigger - Decimal::new(5, 2))
                .unwrap_or(cfg.stop_price);
            let gw = SimGateway::random_walk(Decimal::from(100), Decimal::new(1, 2), start);
            monitor::run(&gw, &cfg).await
        }
        MarketMode::BinanceSandbox | MarketMode::BinanceMainnet => {
            let gw = match BinanceGateway::from_env(&cfg) {
                Ok(gw) => gw,
                Err(e) => {
                    error!(error = %e, "cannot construct Binance gateway");
                    std::process::exit(1);
                }
            };
            monitor::run(&gw, &cfg).await
        }
    };

    match outcome {
        Ok(RunOutcome::Drained) => {
            info!("run complete");
        }
        Err(e) => {
            error!(error = %e, "initialization failed");
            std::process::exit(1);
        }
    }
}
