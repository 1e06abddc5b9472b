// ===============================
// src/domain.rs
// ===============================
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side { Buy, Sell }
impl Side {
    pub fn as_str(&self) -> &'static str {
        match self { Side::Buy => "BUY", Side::Sell => "SELL" }
    }
}

/// Order types this bot cares about. Everything else (plain LIMIT etc.)
/// is carried through as `Other` so the clean-slate cancel can still see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    StopLossLimit,
    TrailingStopMarket,
    Other(String),
}

impl OrderKind {
    pub fn as_str(&self) -> &str {
        match self {
            OrderKind::StopLossLimit => "STOP_LOSS_LIMIT",
            OrderKind::TrailingStopMarket => "TRAILING_STOP_MARKET",
            OrderKind::Other(s) => s.as_str(),
        }
    }

    pub fn from_exchange(s: &str) -> Self {
        match s {
            "STOP_LOSS_LIMIT" => OrderKind::StopLossLimit,
            "TRAILING_STOP_MARKET" => OrderKind::TrailingStopMarket,
            other => OrderKind::Other(other.to_string()),
        }
    }
}

/// One rung of the take-profit ladder. `portion` is a fraction of the
/// balance available at fire time, not of the original total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderLevel {
    pub trigger: Decimal,
    pub trail_fraction: Decimal,
    pub portion: Decimal,
}

/// Everything a gateway needs to submit one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub kind: OrderKind,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    /// Trailing distance in basis points (exchange convention).
    pub trailing_delta: Option<i64>,
    pub time_in_force: Option<String>,
    pub client_order_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub order_id: u64,
    pub kind: OrderKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_kind_round_trips_exchange_strings() {
        assert_eq!(OrderKind::from_exchange("STOP_LOSS_LIMIT"), OrderKind::StopLossLimit);
        assert_eq!(OrderKind::from_exchange("TRAILING_STOP_MARKET"), OrderKind::TrailingStopMarket);
        assert_eq!(
            OrderKind::from_exchange("LIMIT"),
            OrderKind::Other("LIMIT".to_string())
        );
        assert_eq!(OrderKind::StopLossLimit.as_str(), "STOP_LOSS_LIMIT");
    }
}
