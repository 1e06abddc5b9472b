// ===============================
// src/gateway_binance.rs
// ===============================
//
// Real Binance Spot venue over signed REST. Credentials come from ENV at
// construction (API_KEY / API_SECRET); the base URL and recvWindow come from
// config so sandbox and mainnet share the same code path.
//
use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::binance::{
    sign_query, timestamp_ms, AccountInfo, ExchangeInfo, NewOrderAck, OpenOrderModel, TickerPrice,
};
use crate::config::Config;
use crate::domain::{OpenOrder, OrderKind, OrderRequest};
use crate::gateway::{ExchangeGateway, GatewayError};

#[derive(Debug, Error)]
#[error("missing credential: {0}")]
pub struct MissingCredential(pub &'static str);

pub struct BinanceGateway {
    http: reqwest::Client,
    rest_base: String,
    api_key: String,
    api_secret: String,
    recv_window: u64,
}

impl BinanceGateway {
    pub fn from_env(cfg: &Config) -> Result<Self, MissingCredential> {
        let api_key = std::env::var("API_KEY").map_err(|_| MissingCredential("API_KEY"))?;
        let api_secret = std::env::var("API_SECRET").map_err(|_| MissingCredential("API_SECRET"))?;
        Ok(Self {
            http: reqwest::Client::new(),
            rest_base: cfg.binance_rest_url.trim_end_matches('/').to_string(),
            api_key,
            api_secret,
            recv_window: cfg.recv_window,
        })
    }

    fn signed_url(&self, path: &str, mut params: Vec<(&'static str, String)>) -> String {
        params.push(("timestamp", timestamp_ms().to_string()));
        params.push(("recvWindow", self.recv_window.to_string()));
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let sig = sign_query(&self.api_secret, &query);
        format!("{}{}?{}&signature={}", self.rest_base, path, query, sig)
    }

    async fn ok_or_rejected(rsp: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        if rsp.status().is_success() {
            return Ok(rsp);
        }
        let code = rsp.status();
        let body = rsp.text().await.unwrap_or_default();
        Err(GatewayError::Rejected(format!("{code}: {body}")))
    }

    fn parse_decimal(s: &str, what: &str) -> Result<Decimal, GatewayError> {
        Decimal::from_str(s)
            .map_err(|e| GatewayError::BadResponse(format!("{what} `{s}`: {e}")))
    }
}

#[async_trait]
impl ExchangeGateway for BinanceGateway {
    async fn get_balance(&self, asset: &str) -> Result<Decimal, GatewayError> {
        let url = self.signed_url("/api/v3/account", vec![]);
        let rsp = self.http.get(url).header("X-MBX-APIKEY", &self.api_key).send().await?;
        let account: AccountInfo = Self::ok_or_rejected(rsp).await?.json().await?;
        match account.balances.iter().find(|b| b.asset == asset) {
            Some(b) => Self::parse_decimal(&b.free, "free balance"),
            None => Ok(Decimal::ZERO),
        }
    }

    async fn get_step_size(&self, symbol: &str) -> Result<Decimal, GatewayError> {
        let url = format!("{}/api/v3/exchangeInfo?symbol={}", self.rest_base, symbol);
        let rsp = self.http.get(url).send().await?;
        let info: ExchangeInfo = Self::ok_or_rejected(rsp).await?.json().await?;
        let step = info
            .symbols
            .iter()
            .find(|s| s.symbol == symbol)
            .and_then(|s| {
                s.filters
                    .iter()
                    .find(|f| f.filter_type == "LOT_SIZE")
                    .and_then(|f| f.step_size.as_deref())
            })
            .ok_or_else(|| {
                GatewayError::BadResponse(format!("no LOT_SIZE filter for {symbol}"))
            })?;
        Self::parse_decimal(step, "stepSize")
    }

    async fn get_ticker_price(&self, symbol: &str) -> Result<Decimal, GatewayError> {
        let url = format!("{}/api/v3/ticker/price?symbol={}", self.rest_base, symbol);
        let rsp = self.http.get(url).send().await?;
        let ticker: TickerPrice = Self::ok_or_rejected(rsp).await?.json().await?;
        Self::parse_decimal(&ticker.price, "ticker price")
    }

    async fn list_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, GatewayError> {
        let url = self.signed_url("/api/v3/openOrders", vec![("symbol", symbol.to_string())]);
        let rsp = self.http.get(url).header("X-MBX-APIKEY", &self.api_key).send().await?;
        let orders: Vec<OpenOrderModel> = Self::ok_or_rejected(rsp).await?.json().await?;
        Ok(orders
            .into_iter()
            .map(|o| OpenOrder {
                order_id: o.order_id,
                kind: OrderKind::from_exchange(&o.order_type),
            })
            .collect())
    }

    async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<(), GatewayError> {
        let url = self.signed_url(
            "/api/v3/order",
            vec![("symbol", symbol.to_string()), ("orderId", order_id.to_string())],
        );
        let rsp = self.http.delete(url).header("X-MBX-APIKEY", &self.api_key).send().await?;
        Self::ok_or_rejected(rsp).await?;
        Ok(())
    }

    async fn place_order(&self, req: OrderRequest) -> Result<u64, GatewayError> {
        let mut params: Vec<(&'static str, String)> = vec![
            ("symbol", req.symbol.clone()),
            ("side", req.side.as_str().to_string()),
            ("type", req.kind.as_str().to_string()),
            ("quantity", req.quantity.normalize().to_string()),
        ];
        if let Some(p) = req.price {
            params.push(("price", p.normalize().to_string()));
        }
        if let Some(sp) = req.stop_price {
            params.push(("stopPrice", sp.normalize().to_string()));
        }
        if let Some(td) = req.trailing_delta {
            params.push(("trailingDelta", td.to_string()));
        }
        if let Some(tif) = &req.time_in_force {
            params.push(("timeInForce", tif.clone()));
        }
        if let Some(cl_id) = &req.client_order_id {
            params.push(("newClientOrderId", cl_id.clone()));
        }

        let url = self.signed_url("/api/v3/order", params);
        let rsp = self.http.post(url).header("X-MBX-APIKEY", &self.api_key).send().await?;
        let ack: NewOrderAck = Self::ok_or_rejected(rsp).await?.json().await?;
        Ok(ack.order_id)
    }
}
