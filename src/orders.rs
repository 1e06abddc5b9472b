// ===============================
// src/orders.rs (order controller)
// ===============================
//
// Issues and cancels the protective stop-limit and the trailing stops.
// No retries here: every failure propagates so the monitor loop can decide.
// Trailing orders are fire-and-forget — once submitted they are never
// cancelled or modified by this bot.
//
use chrono::Utc;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::info;

use crate::config::Config;
use crate::domain::{OrderKind, OrderRequest, Side};
use crate::gateway::{ExchangeGateway, GatewayError};
use crate::metrics::{BALANCE_FREE, ORDERS_CANCELLED, ORDERS_PLACED};
use crate::qty::floor_to_step;

pub struct OrderController<'a, G: ExchangeGateway> {
    gw: &'a G,
    symbol: &'a str,
    asset: &'a str,
    stop_price: Decimal,
    limit_price: Decimal,
}

fn new_cl_id() -> String {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or(0);
    format!("CL-{}-{}", now, rand::thread_rng().gen::<u32>())
}

impl<'a, G: ExchangeGateway> OrderController<'a, G> {
    pub fn new(gw: &'a G, cfg: &'a Config) -> Self {
        Self {
            gw,
            symbol: &cfg.symbol,
            asset: &cfg.asset,
            stop_price: cfg.stop_price,
            limit_price: cfg.limit_price,
        }
    }

    /// Fresh free balance, floored to the step grid.
    pub async fn available_qty(&self, step: Decimal) -> Result<Decimal, GatewayError> {
        let free = self.gw.get_balance(self.asset).await?;
        BALANCE_FREE.set(free.to_f64().unwrap_or(0.0));
        Ok(floor_to_step(free, step))
    }

    /// SELL STOP_LOSS_LIMIT GTC at the configured stop/limit prices.
    /// Caller ensures `quantity > 0`; a zero order is the exchange's problem.
    pub async fn place_protective_stop(&self, quantity: Decimal) -> Result<u64, GatewayError> {
        let cl_id = new_cl_id();
        info!(symbol = %self.symbol, qty = %quantity, stop = %self.stop_price,
              limit = %self.limit_price, "placing protective stop");
        let order_id = self
            .gw
            .place_order(OrderRequest {
                symbol: self.symbol.to_string(),
                side: Side::Sell,
                kind: OrderKind::StopLossLimit,
                quantity,
                price: Some(self.limit_price),
                stop_price: Some(self.stop_price),
                trailing_delta: None,
                time_in_force: Some("GTC".to_string()),
                client_order_id: Some(cl_id),
            })
            .await?;
        ORDERS_PLACED.with_label_values(&["stop_loss_limit"]).inc();
        Ok(order_id)
    }

    /// SELL TRAILING_STOP_MARKET with an absolute trail distance of
    /// `reference_price * trail_fraction`, sent as truncated basis points.
    pub async fn place_trailing_stop(
        &self,
        reference_price: Decimal,
        quantity: Decimal,
        trail_fraction: Decimal,
    ) -> Result<u64, GatewayError> {
        let trail_value = reference_price * trail_fraction;
        // sub-basis-point precision is not meaningful, truncation intended
        let trailing_delta = (trail_value * Decimal::from(10_000))
            .trunc()
            .to_i64()
            .ok_or_else(|| GatewayError::Rejected("trailing delta out of range".into()))?;
        let cl_id = new_cl_id();
        info!(symbol = %self.symbol, qty = %quantity, at = %reference_price,
              trail = %trail_value, delta_bps = trailing_delta, "placing trailing stop");
        let order_id = self
            .gw
            .place_order(OrderRequest {
                symbol: self.symbol.to_string(),
                side: Side::Sell,
                kind: OrderKind::TrailingStopMarket,
                quantity,
                price: None,
                stop_price: None,
                trailing_delta: Some(trailing_delta),
                time_in_force: None,
                client_order_id: Some(cl_id),
            })
            .await?;
        ORDERS_PLACED.with_label_values(&["trailing_stop_market"]).inc();
        Ok(order_id)
    }

    /// Cancel every open STOP_LOSS_LIMIT for the instrument. Trailing stops
    /// are never touched. Zero matches is a no-op, not an error.
    pub async fn cancel_protective_stops(&self) -> Result<(), GatewayError> {
        let open = self.gw.list_open_orders(self.symbol).await?;
        for order in open {
            if order.kind != OrderKind::StopLossLimit {
                continue;
            }
            info!(symbol = %self.symbol, order_id = order.order_id, "cancelling protective stop");
            self.gw.cancel_order(self.symbol, order.order_id).await?;
            ORDERS_CANCELLED.inc();
        }
        Ok(())
    }
}
