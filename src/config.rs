// ===============================
// src/config.rs
// ===============================
use std::env;
use std::str::FromStr;

use dotenvy::dotenv;
use rust_decimal::Decimal;

use crate::domain::LadderLevel;

/// Mode venue trading
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarketMode {
    Mock,
    BinanceSandbox,
    BinanceMainnet,
}

impl MarketMode {
    pub fn from_env(key: &str, default_mode: MarketMode) -> MarketMode {
        match env::var(key).unwrap_or_default().to_ascii_lowercase().as_str() {
            "mock"             => MarketMode::Mock,
            "binance_sandbox"  => MarketMode::BinanceSandbox,
            "binance_mainnet"  => MarketMode::BinanceMainnet,
            _ => default_mode,
        }
    }

    pub fn default_rest_url(&self) -> &'static str {
        match self {
            MarketMode::Mock            => "https://testnet.binance.vision", // placeholder
            MarketMode::BinanceSandbox  => "https://testnet.binance.vision",
            MarketMode::BinanceMainnet  => "https://api.binance.com",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketMode::Mock           => "mock",
            MarketMode::BinanceSandbox => "binance_sandbox",
            MarketMode::BinanceMainnet => "binance_mainnet",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    // instrument
    pub symbol: String,
    pub asset: String, // base asset whose free balance we protect

    // protective stop prices (fixed for the run; limit sits below stop)
    pub stop_price: Decimal,
    pub limit_price: Decimal,

    // take-profit ladder, ascending triggers
    pub levels: Vec<LadderLevel>,

    // loop timing
    pub poll_secs: u64,
    pub backoff_secs: u64,

    // venue / metrics
    pub venue_mode: MarketMode,
    pub binance_rest_url: String,
    pub recv_window: u64,
    pub metrics_port: u16,
}

fn env_decimal(key: &str, default: Decimal) -> Decimal {
    env::var(key)
        .ok()
        .and_then(|s| Decimal::from_str(s.trim()).ok())
        .unwrap_or(default)
}

/// Satu level: "trigger:trail_fraction:portion", mis. "1.83:0.02:0.33"
fn parse_level(s: &str) -> Option<LadderLevel> {
    let mut it = s.trim().split(':');
    let trigger = Decimal::from_str(it.next()?.trim()).ok()?;
    let trail_fraction = Decimal::from_str(it.next()?.trim()).ok()?;
    let portion = Decimal::from_str(it.next()?.trim()).ok()?;
    if trail_fraction <= Decimal::ZERO || trail_fraction > Decimal::ONE {
        return None;
    }
    if portion <= Decimal::ZERO || portion > Decimal::ONE {
        return None;
    }
    Some(LadderLevel { trigger, trail_fraction, portion })
}

/// Baca ladder dari `TP_LEVELS` (comma separated); fallback ke ladder default.
pub fn parse_levels(val: &str, default_list: Vec<LadderLevel>) -> Vec<LadderLevel> {
    let mut out: Vec<LadderLevel> = val
        .split(',')
        .filter(|t| !t.trim().is_empty())
        .filter_map(parse_level)
        .collect();
    if out.is_empty() {
        return default_list;
    }
    // evaluation order assumes ascending triggers
    out.sort_by(|a, b| a.trigger.cmp(&b.trigger));
    out
}

fn default_levels() -> Vec<LadderLevel> {
    // ZRO reference ladder: 2% trail, a third of the balance per rung
    let mk = |trigger_milli: i64| LadderLevel {
        trigger: Decimal::new(trigger_milli, 3),
        trail_fraction: Decimal::new(2, 2),
        portion: Decimal::new(33, 2),
    };
    vec![mk(1830), mk(1858), mk(1886)]
}

pub fn load() -> Config {
    // Pastikan .env dibaca (API_KEY, TP_LEVELS, dll)
    let _ = dotenv();

    let symbol = env::var("SYMBOL")
        .unwrap_or_else(|_| "ZROUSDT".to_string())
        .to_ascii_uppercase();
    let asset = env::var("ASSET")
        .unwrap_or_else(|_| "ZRO".to_string())
        .to_ascii_uppercase();

    let stop_price = env_decimal("STOP_PRICE", Decimal::new(1736, 3));
    let limit_price = env_decimal("LIMIT_PRICE", Decimal::new(1733, 3));

    let levels = match env::var("TP_LEVELS") {
        Ok(val) => parse_levels(&val, default_levels()),
        Err(_) => default_levels(),
    };

    let poll_secs = env::var("POLL_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(5);
    let backoff_secs = env::var("BACKOFF_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(10);

    let venue_mode = MarketMode::from_env("VENUE_MODE", MarketMode::BinanceSandbox);
    let binance_rest_url = env::var("BINANCE_REST_URL")
        .unwrap_or_else(|_| venue_mode.default_rest_url().to_string());
    let recv_window = env::var("BINANCE_RECV_WINDOW")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(5000);
    let metrics_port = env::var("METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(9898);

    Config {
        symbol,
        asset,
        stop_price,
        limit_price,
        levels,
        poll_secs,
        backoff_secs,
        venue_mode,
        binance_rest_url,
        recv_window,
        metrics_port,
    }
}
