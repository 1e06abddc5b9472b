// ===============================
// src/gateway.rs (trait + sim venue)
// ===============================
//
// The exchange lives behind this trait so the monitor and controller can be
// tested against an in-process venue. `SimGateway` doubles as the MOCK venue
// mode for running the binary without credentials: its ticker random-walks
// around the seeded price.
//
// Balance semantics mirror spot exchanges: placing a SELL locks the quantity
// out of the free balance, cancelling unlocks it.
//
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::{OpenOrder, OrderRequest};

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Venue unreachable / timed out; next poll retries.
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    /// Venue answered but rejected the request (size/price/filter/balance).
    #[error("order rejected: {0}")]
    Rejected(String),

    /// Venue answered something we cannot interpret; treated as transient.
    #[error("bad response: {0}")]
    BadResponse(String),
}

impl GatewayError {
    /// Label used by logs and the error counter.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Transport(_) => "transport",
            GatewayError::Rejected(_) => "rejected",
            GatewayError::BadResponse(_) => "bad_response",
        }
    }
}

#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    async fn get_balance(&self, asset: &str) -> Result<Decimal, GatewayError>;
    async fn get_step_size(&self, symbol: &str) -> Result<Decimal, GatewayError>;
    async fn get_ticker_price(&self, symbol: &str) -> Result<Decimal, GatewayError>;
    async fn list_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, GatewayError>;
    async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<(), GatewayError>;
    async fn place_order(&self, req: OrderRequest) -> Result<u64, GatewayError>;
}

// -----------------------------------------------------------------------------
// Sim venue
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SimOrder {
    pub order_id: u64,
    pub req: OrderRequest,
}

#[derive(Debug, Default)]
struct SimState {
    free: Decimal,
    step: Decimal,
    last_price: Decimal,
    scripted: VecDeque<Decimal>,
    open: Vec<SimOrder>,
    placed_log: Vec<OrderRequest>,
    next_id: u64,
    reject_next_place: Option<String>,
}

pub struct SimGateway {
    st: Mutex<SimState>,
    random_walk: bool,
}

impl SimGateway {
    pub fn new(free: Decimal, step: Decimal, start_price: Decimal) -> Self {
        Self {
            st: Mutex::new(SimState {
                free,
                step,
                last_price: start_price,
                next_id: 1,
                ..SimState::default()
            }),
            random_walk: false,
        }
    }

    /// Mock-mode venue: ticker drifts randomly around the seed price.
    pub fn random_walk(free: Decimal, step: Decimal, start_price: Decimal) -> Self {
        let mut gw = Self::new(free, step, start_price);
        gw.random_walk = true;
        gw
    }

    /// Queue prices returned by successive `get_ticker_price` calls; once the
    /// script runs out the last price repeats.
    pub fn push_prices<I: IntoIterator<Item = Decimal>>(&self, prices: I) {
        let mut st = self.st.lock().unwrap();
        st.scripted.extend(prices);
    }

    /// Fail the next `place_order` with `Rejected(reason)`.
    pub fn reject_next_place(&self, reason: &str) {
        self.st.lock().unwrap().reject_next_place = Some(reason.to_string());
    }

    /// External balance change (deposit/withdrawal/manual trade).
    pub fn set_free(&self, free: Decimal) {
        self.st.lock().unwrap().free = free;
    }

    pub fn free(&self) -> Decimal {
        self.st.lock().unwrap().free
    }

    /// Every order ever accepted, in submission order.
    pub fn placed(&self) -> Vec<OrderRequest> {
        self.st.lock().unwrap().placed_log.clone()
    }

    pub fn open_orders(&self) -> Vec<SimOrder> {
        self.st.lock().unwrap().open.clone()
    }
}

#[async_trait]
impl ExchangeGateway for SimGateway {
    async fn get_balance(&self, _asset: &str) -> Result<Decimal, GatewayError> {
        Ok(self.st.lock().unwrap().free)
    }

    async fn get_step_size(&self, _symbol: &str) -> Result<Decimal, GatewayError> {
        Ok(self.st.lock().unwrap().step)
    }

    async fn get_ticker_price(&self, _symbol: &str) -> Result<Decimal, GatewayError> {
        let mut st = self.st.lock().unwrap();
        if let Some(p) = st.scripted.pop_front() {
            st.last_price = p;
        } else if self.random_walk {
            // +/- 3 ticks per poll, floored at one tick
            let ticks: i64 = rand::thread_rng().gen_range(-3..=3);
            let next = st.last_price + Decimal::from(ticks) * st.step;
            st.last_price = next.max(st.step);
        }
        Ok(st.last_price)
    }

    async fn list_open_orders(&self, _symbol: &str) -> Result<Vec<OpenOrder>, GatewayError> {
        let st = self.st.lock().unwrap();
        Ok(st
            .open
            .iter()
            .map(|o| OpenOrder { order_id: o.order_id, kind: o.req.kind.clone() })
            .collect())
    }

    async fn cancel_order(&self, _symbol: &str, order_id: u64) -> Result<(), GatewayError> {
        let mut st = self.st.lock().unwrap();
        let Some(idx) = st.open.iter().position(|o| o.order_id == order_id) else {
            return Err(GatewayError::Rejected(format!("unknown order {order_id}")));
        };
        let order = st.open.remove(idx);
        st.free += order.req.quantity; // unlock
        Ok(())
    }

    async fn place_order(&self, req: OrderRequest) -> Result<u64, GatewayError> {
        let mut st = self.st.lock().unwrap();
        if let Some(reason) = st.reject_next_place.take() {
            return Err(GatewayError::Rejected(reason));
        }
        if req.quantity <= Decimal::ZERO {
            return Err(GatewayError::Rejected("order size below minimum".into()));
        }
        if req.quantity > st.free {
            return Err(GatewayError::Rejected("insufficient balance".into()));
        }
        st.free -= req.quantity; // lock
        let order_id = st.next_id;
        st.next_id += 1;
        st.placed_log.push(req.clone());
        st.open.push(SimOrder { order_id, req });
        Ok(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderKind, Side};
    use rust_decimal_macros::dec;

    fn sell(kind: OrderKind, qty: Decimal) -> OrderRequest {
        OrderRequest {
            symbol: "ZROUSDT".into(),
            side: Side::Sell,
            kind,
            quantity: qty,
            price: None,
            stop_price: None,
            trailing_delta: None,
            time_in_force: None,
            client_order_id: None,
        }
    }

    #[tokio::test]
    async fn placing_locks_and_cancelling_unlocks_balance() {
        let gw = SimGateway::new(dec!(100), dec!(0.01), dec!(1.80));
        let id = gw.place_order(sell(OrderKind::StopLossLimit, dec!(100))).await.unwrap();
        assert_eq!(gw.free(), dec!(0));
        gw.cancel_order("ZROUSDT", id).await.unwrap();
        assert_eq!(gw.free(), dec!(100));
    }

    #[tokio::test]
    async fn over_balance_order_is_rejected() {
        let gw = SimGateway::new(dec!(10), dec!(0.01), dec!(1.80));
        let err = gw.place_order(sell(OrderKind::StopLossLimit, dec!(11))).await.unwrap_err();
        assert_eq!(err.kind(), "rejected");
        assert_eq!(gw.free(), dec!(10));
    }

    #[tokio::test]
    async fn scripted_prices_then_last_repeats() {
        let gw = SimGateway::new(dec!(1), dec!(0.01), dec!(1.80));
        gw.push_prices([dec!(1.84), dec!(1.87)]);
        assert_eq!(gw.get_ticker_price("ZROUSDT").await.unwrap(), dec!(1.84));
        assert_eq!(gw.get_ticker_price("ZROUSDT").await.unwrap(), dec!(1.87));
        assert_eq!(gw.get_ticker_price("ZROUSDT").await.unwrap(), dec!(1.87));
    }
}
