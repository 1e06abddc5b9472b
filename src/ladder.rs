// ===============================
// src/ladder.rs (take-profit ladder state machine)
// ===============================
//
// Tracks which trigger levels have fired and sequences a fire:
// cancel protective stops -> re-query balance -> split portion ->
// place trailing stop -> re-protect the remainder.
//
// One trigger per evaluate call: when several triggers were crossed between
// polls, only the lowest unfired one acts and the scan breaks. Balance is
// re-queried at fire time ("late binding") so drift from partial fills or
// external transfers is picked up, never a stale snapshot.
//
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::LadderLevel;
use crate::gateway::{ExchangeGateway, GatewayError};
use crate::metrics::TRIGGERS_FIRED;
use crate::orders::OrderController;
use crate::qty::floor_to_step;

/// What one `evaluate` call did.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// No unfired trigger was crossed.
    NoAction,
    /// Level `level` fired: `trail_qty` went to a trailing stop and
    /// `remainder` (possibly zero) is back under the protective stop.
    Fired { level: usize, trail_qty: Decimal, remainder: Decimal },
    /// Balance re-queried to zero mid-fire: nothing left to protect or
    /// trail. Terminal for the run, not an error.
    Drained,
}

pub struct LadderEngine {
    levels: Vec<LadderLevel>,
    fired: Vec<bool>,
    step: Decimal,
}

impl LadderEngine {
    pub fn new(levels: Vec<LadderLevel>, step: Decimal) -> Self {
        let fired = vec![false; levels.len()];
        Self { levels, fired, step }
    }

    /// Lowest unfired level whose trigger is at or below `price`.
    fn next_qualifying(&self, price: Decimal) -> Option<usize> {
        self.levels
            .iter()
            .enumerate()
            .find(|(i, lvl)| !self.fired[*i] && price >= lvl.trigger)
            .map(|(i, _)| i)
    }

    pub fn fired(&self, level: usize) -> bool {
        self.fired.get(level).copied().unwrap_or(false)
    }

    /// All levels fired; further polls cannot act.
    pub fn saturated(&self) -> bool {
        self.fired.iter().all(|f| *f)
    }

    pub async fn evaluate<G: ExchangeGateway>(
        &mut self,
        price: Decimal,
        ctrl: &OrderController<'_, G>,
    ) -> Result<Advance, GatewayError> {
        let Some(level) = self.next_qualifying(price) else {
            return Ok(Advance::NoAction);
        };
        let lvl = self.levels[level].clone();
        info!(level, price = %price, trigger = %lvl.trigger, "take-profit trigger crossed");

        // Free the inventory held by the protective stop, then re-assess.
        ctrl.cancel_protective_stops().await?;
        let total = ctrl.available_qty(self.step).await?;
        if total.is_zero() {
            info!(level, "no inventory left at fire time");
            return Ok(Advance::Drained);
        }

        let trail_qty = floor_to_step(total * lvl.portion, self.step);
        if trail_qty.is_zero() {
            // Portion rounds below one step: nothing tradable exists at this
            // level. Mark it fired so the ladder cannot wedge, keep the full
            // quantity protected.
            warn!(level, total = %total, "portion rounds below step size, skipping level");
            self.fired[level] = true;
            ctrl.place_protective_stop(total).await?;
            return Ok(Advance::Fired { level, trail_qty: Decimal::ZERO, remainder: total });
        }

        if let Err(e) = ctrl.place_trailing_stop(price, trail_qty, lvl.trail_fraction).await {
            // Level stays unfired so the next poll retries. Best effort to
            // put the protective stop back before surfacing the failure;
            // a restore failure leaves the gap until the next cycle.
            warn!(level, error = %e, "trailing placement failed, restoring protective stop");
            if let Err(e2) = ctrl.place_protective_stop(total).await {
                warn!(level, error = %e2, "restore failed, position unprotected until next poll");
            }
            return Err(e);
        }
        self.fired[level] = true;
        TRIGGERS_FIRED.with_label_values(&[&level.to_string()]).inc();

        // Post-placement balance, not `total - trail_qty`: an exchange-side
        // fill between the two calls would otherwise oversize the stop.
        let remainder = ctrl.available_qty(self.step).await?;
        if remainder > Decimal::ZERO {
            ctrl.place_protective_stop(remainder).await?;
        } else {
            info!(level, "all inventory committed to trailing legs");
        }
        Ok(Advance::Fired { level, trail_qty, remainder })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, MarketMode};
    use crate::domain::OrderKind;
    use crate::gateway::SimGateway;
    use rust_decimal_macros::dec;

    fn cfg() -> Config {
        Config {
            symbol: "ZROUSDT".into(),
            asset: "ZRO".into(),
            stop_price: dec!(1.736),
            limit_price: dec!(1.733),
            levels: levels(),
            poll_secs: 5,
            backoff_secs: 10,
            venue_mode: MarketMode::Mock,
            binance_rest_url: String::new(),
            recv_window: 5000,
            metrics_port: 0,
        }
    }

    fn levels() -> Vec<LadderLevel> {
        let mk = |t: Decimal| LadderLevel {
            trigger: t,
            trail_fraction: dec!(0.02),
            portion: dec!(0.33),
        };
        vec![mk(dec!(1.830)), mk(dec!(1.858)), mk(dec!(1.886))]
    }

    #[test]
    fn lowest_unfired_trigger_wins() {
        let mut eng = LadderEngine::new(levels(), dec!(0.01));
        // price above all three -> level 0 qualifies first
        assert_eq!(eng.next_qualifying(dec!(1.90)), Some(0));
        eng.fired[0] = true;
        assert_eq!(eng.next_qualifying(dec!(1.90)), Some(1));
        assert_eq!(eng.next_qualifying(dec!(1.80)), None);
        eng.fired[1] = true;
        eng.fired[2] = true;
        assert!(eng.saturated());
        assert_eq!(eng.next_qualifying(dec!(1.90)), None);
    }

    #[tokio::test]
    async fn fire_splits_portion_and_reprotects_remainder() {
        let gw = SimGateway::new(dec!(100), dec!(0.01), dec!(1.84));
        let cfg = cfg();
        let ctrl = OrderController::new(&gw, &cfg);
        let mut eng = LadderEngine::new(cfg.levels.clone(), dec!(0.01));

        // run-start protective stop for the full quantity
        ctrl.place_protective_stop(dec!(100)).await.unwrap();

        let adv = eng.evaluate(dec!(1.84), &ctrl).await.unwrap();
        assert_eq!(
            adv,
            Advance::Fired { level: 0, trail_qty: dec!(33.00), remainder: dec!(67.00) }
        );
        assert!(eng.fired(0));

        // second crossing of the same level is inert
        assert_eq!(eng.evaluate(dec!(1.84), &ctrl).await.unwrap(), Advance::NoAction);

        // level 1 fires against the now-current balance of 67
        let adv = eng.evaluate(dec!(1.87), &ctrl).await.unwrap();
        assert_eq!(
            adv,
            Advance::Fired { level: 1, trail_qty: dec!(22.11), remainder: dec!(44.89) }
        );

        // order log: stop(100), trail(33), stop(67), trail(22.11), stop(44.89)
        let placed = gw.placed();
        let kinds_qtys: Vec<(OrderKind, Decimal)> =
            placed.iter().map(|r| (r.kind.clone(), r.quantity)).collect();
        assert_eq!(
            kinds_qtys,
            vec![
                (OrderKind::StopLossLimit, dec!(100)),
                (OrderKind::TrailingStopMarket, dec!(33.00)),
                (OrderKind::StopLossLimit, dec!(67.00)),
                (OrderKind::TrailingStopMarket, dec!(22.11)),
                (OrderKind::StopLossLimit, dec!(44.89)),
            ]
        );

        // committed + protected never exceeds the starting balance
        let open: Decimal = gw.open_orders().iter().map(|o| o.req.quantity).sum();
        assert!(open <= dec!(100));
    }

    #[tokio::test]
    async fn zero_balance_at_fire_time_is_terminal() {
        let gw = SimGateway::new(dec!(100), dec!(0.01), dec!(1.84));
        let cfg = cfg();
        let ctrl = OrderController::new(&gw, &cfg);
        let mut eng = LadderEngine::new(cfg.levels.clone(), dec!(0.01));

        // inventory gone behind our back; what is left normalizes to zero
        gw.set_free(dec!(0.005));

        let adv = eng.evaluate(dec!(1.84), &ctrl).await.unwrap();
        assert_eq!(adv, Advance::Drained);
        assert!(!eng.fired(0), "drained fire must not consume the level");
    }

    #[tokio::test]
    async fn rejected_trailing_leaves_level_unfired_and_restores_stop() {
        let gw = SimGateway::new(dec!(100), dec!(0.01), dec!(1.84));
        let cfg = cfg();
        let ctrl = OrderController::new(&gw, &cfg);
        let mut eng = LadderEngine::new(cfg.levels.clone(), dec!(0.01));

        ctrl.place_protective_stop(dec!(100)).await.unwrap();
        gw.reject_next_place("filter failure: PERCENT_PRICE");

        let err = eng.evaluate(dec!(1.84), &ctrl).await.unwrap_err();
        assert_eq!(err.kind(), "rejected");
        assert!(!eng.fired(0), "rejection must not mark the level fired");

        // protective stop was restored for the full quantity
        let open = gw.open_orders();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].req.kind, OrderKind::StopLossLimit);
        assert_eq!(open[0].req.quantity, dec!(100));

        // next poll retries the same level and succeeds
        let adv = eng.evaluate(dec!(1.84), &ctrl).await.unwrap();
        assert_eq!(
            adv,
            Advance::Fired { level: 0, trail_qty: dec!(33.00), remainder: dec!(67.00) }
        );
    }

    #[tokio::test]
    async fn sub_step_portion_skips_level_without_wedging() {
        let gw = SimGateway::new(dec!(0.02), dec!(0.01), dec!(1.84));
        let cfg = cfg();
        let ctrl = OrderController::new(&gw, &cfg);
        let mut eng = LadderEngine::new(cfg.levels.clone(), dec!(0.01));

        // 0.02 * 0.33 = 0.0066 -> floors to zero
        let adv = eng.evaluate(dec!(1.84), &ctrl).await.unwrap();
        assert_eq!(adv, Advance::Fired { level: 0, trail_qty: dec!(0), remainder: dec!(0.02) });
        assert!(eng.fired(0));
        let open = gw.open_orders();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].req.kind, OrderKind::StopLossLimit);
    }
}
