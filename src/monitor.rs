// ===============================
// src/monitor.rs (init + polling loop)
// ===============================
//
// Single logical thread of control: one poll, one evaluate, one sleep.
// Correctness of cancel -> re-query -> place depends on nothing else
// mutating balance or open orders between the steps, so nothing here runs
// concurrently.
//
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::gateway::{ExchangeGateway, GatewayError};
use crate::ladder::{Advance, LadderEngine};
use crate::metrics::{GATEWAY_ERRORS, POLLS};
use crate::orders::OrderController;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("gateway during initialization: {0}")]
    Gateway(#[from] GatewayError),
    #[error("exchange reports non-positive step size {0}")]
    BadStepSize(Decimal),
}

/// How a run ended. A saturated ladder does not end the run — the loop keeps
/// polling harmlessly; only a drained balance does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// No inventory left (at startup or mid-run). Clean end, exit 0.
    Drained,
}

/// Clean-slate init: cancel everything open for the instrument, discover the
/// step size, protect the full balance. Returns `None` when there is no
/// inventory to manage (nothing was placed).
pub async fn initialize<G: ExchangeGateway>(
    gw: &G,
    cfg: &Config,
) -> Result<Option<LadderEngine>, InitError> {
    // Pre-existing orders are cancelled unconditionally, whatever the type:
    // stale trailing legs from a previous run would double-claim balance.
    let open = gw.list_open_orders(&cfg.symbol).await?;
    if !open.is_empty() {
        info!(count = open.len(), symbol = %cfg.symbol, "cancelling pre-existing open orders");
        for order in open {
            gw.cancel_order(&cfg.symbol, order.order_id).await?;
        }
    }

    let step = gw.get_step_size(&cfg.symbol).await?;
    if step <= Decimal::ZERO {
        return Err(InitError::BadStepSize(step));
    }

    let ctrl = OrderController::new(gw, cfg);
    let full_qty = ctrl.available_qty(step).await?;
    info!(symbol = %cfg.symbol, qty = %full_qty, step = %step, "available inventory");
    if full_qty.is_zero() {
        warn!(asset = %cfg.asset, "no inventory available, nothing to protect");
        return Ok(None);
    }

    ctrl.place_protective_stop(full_qty).await?;
    Ok(Some(LadderEngine::new(cfg.levels.clone(), step)))
}

/// One poll cycle: read the ticker, feed the ladder.
pub async fn poll_once<G: ExchangeGateway>(
    gw: &G,
    ctrl: &OrderController<'_, G>,
    ladder: &mut LadderEngine,
    cfg: &Config,
) -> Result<Advance, GatewayError> {
    let price = gw.get_ticker_price(&cfg.symbol).await?;
    POLLS.inc();
    ladder.evaluate(price, ctrl).await
}

/// Initialization phase plus the polling loop. Gateway/controller failures
/// are logged and retried on the next cycle with a longer sleep; only a
/// drained balance ends the loop.
pub async fn run<G: ExchangeGateway>(gw: &G, cfg: &Config) -> Result<RunOutcome, InitError> {
    let Some(mut ladder) = initialize(gw, cfg).await? else {
        return Ok(RunOutcome::Drained);
    };
    let ctrl = OrderController::new(gw, cfg);

    info!(symbol = %cfg.symbol, levels = cfg.levels.len(), "monitoring price for triggers");
    loop {
        match poll_once(gw, &ctrl, &mut ladder, cfg).await {
            Ok(Advance::Drained) => {
                info!("inventory drained, run complete");
                return Ok(RunOutcome::Drained);
            }
            Ok(Advance::Fired { level, trail_qty, remainder }) => {
                info!(level, trail_qty = %trail_qty, remainder = %remainder, "level fired");
                if ladder.saturated() {
                    info!("ladder saturated, continuing to hold the protective stop");
                }
                sleep(Duration::from_secs(cfg.poll_secs)).await;
            }
            Ok(Advance::NoAction) => {
                sleep(Duration::from_secs(cfg.poll_secs)).await;
            }
            Err(e) => {
                GATEWAY_ERRORS.with_label_values(&[e.kind()]).inc();
                error!(error = %e, kind = e.kind(), "poll cycle failed, backing off");
                sleep(Duration::from_secs(cfg.backoff_secs)).await;
            }
        }
    }
}
