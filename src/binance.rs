// ===============================
// src/binance.rs
// ===============================
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

pub fn sign_query(secret: &str, query: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC key");
    mac.update(query.as_bytes());
    let sig = mac.finalize().into_bytes();
    hex::encode(sig)
}

// ---- Minimal Spot REST models ----

#[derive(Debug, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub balances: Vec<AssetBalance>,
}

#[derive(Debug, Deserialize)]
pub struct AssetBalance {
    pub asset: String,
    pub free: String, // decimal string, e.g. "100.00000000"
}

#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    #[serde(default)]
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

#[derive(Debug, Deserialize)]
pub struct SymbolFilter {
    #[serde(rename = "filterType")]
    pub filter_type: String,
    #[serde(rename = "stepSize", default)]
    pub step_size: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TickerPrice {
    pub price: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenOrderModel {
    #[serde(rename = "orderId")]
    pub order_id: u64,
    #[serde(rename = "type")]
    pub order_type: String,
}

#[derive(Debug, Deserialize)]
pub struct NewOrderAck {
    #[serde(rename = "orderId")]
    pub order_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_64_hex_chars_and_deterministic() {
        let q = "symbol=ZROUSDT&side=SELL&type=STOP_LOSS_LIMIT&timestamp=1499827319559";
        let a = sign_query("secret-a", q);
        let b = sign_query("secret-a", q);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, sign_query("secret-b", q));
    }

    #[test]
    fn parses_lot_size_filter() {
        let raw = r#"{"symbols":[{"symbol":"ZROUSDT","filters":[
            {"filterType":"PRICE_FILTER","tickSize":"0.001"},
            {"filterType":"LOT_SIZE","stepSize":"0.01","minQty":"0.01"}]}]}"#;
        let info: ExchangeInfo = serde_json::from_str(raw).unwrap();
        let step = info.symbols[0]
            .filters
            .iter()
            .find(|f| f.filter_type == "LOT_SIZE")
            .and_then(|f| f.step_size.as_deref());
        assert_eq!(step, Some("0.01"));
    }

    #[test]
    fn parses_open_orders() {
        let raw = r#"[{"orderId":42,"type":"STOP_LOSS_LIMIT","symbol":"ZROUSDT"}]"#;
        let orders: Vec<OpenOrderModel> = serde_json::from_str(raw).unwrap();
        assert_eq!(orders[0].order_id, 42);
        assert_eq!(orders[0].order_type, "STOP_LOSS_LIMIT");
    }
}
