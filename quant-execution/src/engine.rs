use crate::error::ExecutionError;
use crate::order::{FilledOrder, OrderRequest, OrderSide, OrderSize, OrderState, OrderType, TimeInForce};
use crate::ports::{AccountPort, MarketDataPort, Quote};
use crate::pricing::{aggressive_marketable_limit, smart_limit_price, SmartPrice, Urgency};
use futures::future::join_all;
use indexmap::IndexMap;
use quant_instrument::money::{floor_to_six_dp, floor_to_whole_share, round_half_up_cents};
use quant_instrument::{StrategyId, Symbol};
use quant_integration::{retry_with_backoff, RetryPolicy, RunContext};
use quant_risk::{DailyTradeLimitState, PlanAction, RebalancePlan, RebalancePlanItem};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tunables for a single [`ExecutionEngine::execute`] call, owned here rather than pulled from
/// `quant-engine`'s configuration type so this crate stays independently testable.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    pub settlement_timeout: Duration,
    pub settlement_poll_interval: Duration,
    pub run_deadline: Duration,
    pub max_slippage_bps: Decimal,
    pub extended_hours: bool,
    pub retry_policy: RetryPolicy,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            settlement_timeout: Duration::from_secs(60),
            settlement_poll_interval: Duration::from_secs(2),
            run_deadline: Duration::from_secs(600),
            max_slippage_bps: dec!(20),
            extended_hours: false,
            retry_policy: RetryPolicy::default(),
        }
    }
}

/// What became of a single plan item by the time [`ExecutionEngine::execute`] returns.
#[derive(Debug, Clone)]
pub enum ItemOutcome {
    Filled(FilledOrder),
    PartiallyFilled(FilledOrder),
    Rejected { reason: String },
    Skipped { reason: String },
    TimedOut { order_id: String },
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub success: bool,
    pub filled_orders: Vec<FilledOrder>,
    pub orders_canceled: usize,
    pub outcomes: IndexMap<Symbol, ItemOutcome>,
    pub errors: Vec<String>,
    /// Set when either phase's daily-trade-value circuit breaker check failed, distinguishing
    /// a deliberate circuit-breaker trip (spec.md §6 exit code 2) from other execution
    /// incompleteness (exit code 1).
    pub circuit_breaker_tripped: bool,
}

enum PreparedOrder {
    /// A full liquidation of the position, submitted through the broker's dedicated
    /// liquidate-position primitive rather than a priced order.
    Liquidate,
    Submit { request: OrderRequest, estimated_notional: Decimal },
}

enum SubmissionOutcome {
    Submitted { symbol: Symbol, strategy_id: StrategyId, side: OrderSide, order_id: String },
    Failed { symbol: Symbol, reason: String },
}

fn has_fraction(value: Decimal) -> bool {
    value.fract() != Decimal::ZERO
}

/// Turns a [`RebalancePlan`]'s non-HOLD items into broker orders: stale-order cancellation,
/// a parallel SELL phase that frees capital, a settlement barrier, then a strictly sequential
/// BUY phase that never over-commits cash against buying-power accounting that only updates
/// after each prior submission settles.
pub struct ExecutionEngine {
    account: Arc<dyn AccountPort>,
    market: Arc<dyn MarketDataPort>,
    daily_limit: Arc<DailyTradeLimitState>,
    config: ExecutionConfig,
}

impl ExecutionEngine {
    pub fn new(
        account: Arc<dyn AccountPort>,
        market: Arc<dyn MarketDataPort>,
        daily_limit: Arc<DailyTradeLimitState>,
        config: ExecutionConfig,
    ) -> Self {
        Self { account, market, daily_limit, config }
    }

    pub async fn execute(&self, plan: &RebalancePlan, _ctx: &RunContext) -> ExecutionResult {
        let deadline = Instant::now() + self.config.run_deadline;
        let urgency: Urgency = plan.execution_urgency;
        let mut result = ExecutionResult { success: true, ..Default::default() };

        result.orders_canceled = self.cancel_stale_orders(plan).await;

        let sells: Vec<&RebalancePlanItem> = plan.sells().collect();
        let sell_orders = self.submit_sell_phase(sells, urgency, &mut result).await;
        self.wait_for_settlement(&sell_orders, &mut result).await;

        if Instant::now() >= deadline {
            result.success = false;
            result.errors.push(
                ExecutionError::RunDeadlineExceeded { deadline_seconds: self.config.run_deadline.as_secs() }
                    .to_string(),
            );
            return result;
        }

        if let Err(err) = self.account.get_account_snapshot().await {
            result.errors.push(format!("failed to refresh account snapshot after SELL settlement: {err}"));
        }

        let buys: Vec<&RebalancePlanItem> = plan.buys().collect();
        let buy_orders = self.submit_buy_phase_sequential(buys, urgency, &mut result, deadline).await;
        self.wait_for_settlement(&buy_orders, &mut result).await;

        result
    }

    async fn cancel_stale_orders(&self, plan: &RebalancePlan) -> usize {
        let symbols: HashSet<&Symbol> = plan.items.iter().map(|item| &item.symbol).collect();
        let open_orders = match self.account.get_open_orders().await {
            Ok(orders) => orders,
            Err(err) => {
                tracing::warn!(error = %err, "failed to list open orders, skipping stale-order cancellation");
                return 0;
            }
        };

        let mut canceled = 0;
        for order in open_orders.iter().filter(|o| symbols.contains(&o.symbol)) {
            match self.account.cancel_order(&order.order_id).await {
                Ok(true) => canceled += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(error = %err, order_id = %order.order_id, "failed to cancel stale order")
                }
            }
        }
        canceled
    }

    /// Build the broker-facing order (or liquidation directive) for one item: decides
    /// notional-vs-quantity sizing, fractional rounding, and smart-vs-aggressive pricing.
    async fn prepare_order(&self, item: &RebalancePlanItem, urgency: Urgency) -> Result<PreparedOrder, ItemOutcome> {
        let side = match item.action {
            PlanAction::Buy => OrderSide::Buy,
            PlanAction::Sell => OrderSide::Sell,
            PlanAction::Hold => return Err(ItemOutcome::Skipped { reason: "hold".to_string() }),
        };

        if matches!(side, OrderSide::Sell) && item.target_value.is_zero() {
            return Ok(PreparedOrder::Liquidate);
        }

        let notional = item.trade_amount.abs();
        let price = match self.market.get_current_price(&item.symbol).await {
            Ok(Some(price)) if price > Decimal::ZERO => price,
            Ok(_) => return Err(ItemOutcome::Skipped { reason: "no current price available".to_string() }),
            Err(err) => return Err(ItemOutcome::Rejected { reason: format!("market data error: {err}") }),
        };

        let fractionable = self.market.is_fractionable(&item.symbol).await.unwrap_or(false);
        let raw_quantity = notional / price;

        let (order_type, size) = if matches!(side, OrderSide::Buy) && !fractionable && has_fraction(raw_quantity) {
            (OrderType::NotionalMarket, OrderSize::Notional(round_half_up_cents(notional)))
        } else {
            let quantity = if fractionable { floor_to_six_dp(raw_quantity) } else { floor_to_whole_share(raw_quantity) };
            if quantity.is_zero() {
                return Err(ItemOutcome::Skipped { reason: "rounded_to_zero".to_string() });
            }
            (OrderType::Limit, OrderSize::Quantity(quantity))
        };

        let (order_type, limit_price) = if matches!(order_type, OrderType::NotionalMarket) {
            (OrderType::NotionalMarket, None)
        } else {
            match self.market.get_latest_quote(&item.symbol).await {
                Ok(Some(quote)) => self.choose_price(side, &quote, urgency),
                _ => (OrderType::Market, None),
            }
        };

        let estimated_notional = match size {
            OrderSize::Notional(n) => n,
            OrderSize::Quantity(q) => q * price,
        };

        let request = OrderRequest {
            symbol: item.symbol.clone(),
            side,
            order_type,
            size,
            limit_price,
            time_in_force: TimeInForce::Day,
            extended_hours: self.config.extended_hours,
            strategy_id: item.strategy_id.clone(),
        };

        Ok(PreparedOrder::Submit { request, estimated_notional })
    }

    fn choose_price(&self, side: OrderSide, quote: &Quote, urgency: Urgency) -> (OrderType, Option<Decimal>) {
        if matches!(urgency, Urgency::Urgent) {
            if quote.is_valid() {
                return (OrderType::Limit, Some(aggressive_marketable_limit(side, quote)));
            }
            return (OrderType::Market, None);
        }
        match smart_limit_price(side, quote, urgency, self.config.max_slippage_bps) {
            SmartPrice::Limit(price) => (OrderType::Limit, Some(price)),
            SmartPrice::FallBackToMarket => (OrderType::Market, None),
        }
    }

    async fn submit_with_retry(&self, request: OrderRequest) -> Result<String, ExecutionError> {
        let account = Arc::clone(&self.account);
        retry_with_backoff(
            self.config.retry_policy,
            |err: &ExecutionError| matches!(err, ExecutionError::Broker(_) | ExecutionError::BrokerConnectivity { .. }),
            || {
                let account = Arc::clone(&account);
                let request = request.clone();
                async move { account.submit_order(&request).await }
            },
        )
        .await
    }

    /// SELL phase: fan out all submissions concurrently (parallel SELLs free capital faster),
    /// gated by a single circuit-breaker check against the phase's combined notional since the
    /// items go out together rather than one settlement apart.
    async fn submit_sell_phase(
        &self,
        items: Vec<&RebalancePlanItem>,
        urgency: Urgency,
        result: &mut ExecutionResult,
    ) -> Vec<(Symbol, StrategyId, OrderSide, String)> {
        let mut prepared = Vec::new();
        for item in items {
            match self.prepare_order(item, urgency).await {
                Ok(p) => prepared.push((item, p)),
                Err(outcome) => {
                    result.outcomes.insert(item.symbol.clone(), outcome);
                }
            }
        }
        if prepared.is_empty() {
            return Vec::new();
        }

        let total_notional: Decimal = prepared
            .iter()
            .map(|(_, p)| match p {
                PreparedOrder::Liquidate => Decimal::ZERO,
                PreparedOrder::Submit { estimated_notional, .. } => *estimated_notional,
            })
            .sum();

        let check = self.daily_limit.check_limit(total_notional);
        if !check.is_within_limit {
            result.success = false;
            result.circuit_breaker_tripped = true;
            result.errors.push(format!(
                "daily trade limit would be exceeded by the SELL phase: proposed {total_notional}, headroom {}",
                check.headroom
            ));
            for (item, _) in &prepared {
                result.outcomes.insert(item.symbol.clone(), ItemOutcome::Skipped { reason: "daily trade limit".to_string() });
            }
            return Vec::new();
        }

        let submissions = prepared.into_iter().map(|(item, prep)| {
            let symbol = item.symbol.clone();
            let strategy_id = item.strategy_id.clone();
            async move {
                match prep {
                    PreparedOrder::Liquidate => match self.account.liquidate_position(&item.symbol).await {
                        Ok(order_id) => {
                            SubmissionOutcome::Submitted { symbol, strategy_id, side: OrderSide::Sell, order_id }
                        }
                        Err(err) => SubmissionOutcome::Failed { symbol, reason: err.to_string() },
                    },
                    PreparedOrder::Submit { request, .. } => {
                        let side = request.side;
                        match self.submit_with_retry(request).await {
                            Ok(order_id) => SubmissionOutcome::Submitted { symbol, strategy_id, side, order_id },
                            Err(err) => SubmissionOutcome::Failed { symbol, reason: err.to_string() },
                        }
                    }
                }
            }
        });

        let outcomes = join_all(submissions).await;
        self.collect_submission_outcomes(outcomes, result)
    }

    /// BUY phase: strictly sequential, refreshing buying power (and the circuit-breaker
    /// check) after each submission so cash is never committed twice over.
    async fn submit_buy_phase_sequential(
        &self,
        items: Vec<&RebalancePlanItem>,
        urgency: Urgency,
        result: &mut ExecutionResult,
        deadline: Instant,
    ) -> Vec<(Symbol, StrategyId, OrderSide, String)> {
        let mut submitted = Vec::new();
        // Orders submitted earlier in this same loop haven't settled (and so haven't hit
        // `daily_limit`'s recorded cumulative) yet, but still need to count against headroom —
        // otherwise two large BUYs submitted back to back in one run could each individually
        // pass the check and blow through the limit together before either settles.
        let mut reserved = Decimal::ZERO;

        for item in items {
            if Instant::now() >= deadline {
                result.success = false;
                let deadline_err =
                    ExecutionError::RunDeadlineExceeded { deadline_seconds: self.config.run_deadline.as_secs() };
                result.errors.push(format!("{deadline_err} (while submitting BUY {})", item.symbol));
                result.outcomes.insert(item.symbol.clone(), ItemOutcome::Skipped { reason: "run deadline exceeded".to_string() });
                continue;
            }

            let prepared = match self.prepare_order(item, urgency).await {
                Ok(p) => p,
                Err(outcome) => {
                    result.outcomes.insert(item.symbol.clone(), outcome);
                    continue;
                }
            };

            let estimated_notional = match &prepared {
                PreparedOrder::Liquidate => Decimal::ZERO,
                PreparedOrder::Submit { estimated_notional, .. } => *estimated_notional,
            };

            let check = self.daily_limit.check_limit(reserved + estimated_notional);
            if !check.is_within_limit {
                result.success = false;
                result.circuit_breaker_tripped = true;
                result.errors.push(format!(
                    "daily trade limit exceeded: proposed {} (this BUY {estimated_notional} plus {reserved} already reserved this phase), headroom {}, would_exceed_by {}",
                    reserved + estimated_notional, check.headroom, check.would_exceed_by
                ));
                result.outcomes.insert(item.symbol.clone(), ItemOutcome::Skipped { reason: "daily trade limit".to_string() });
                // fatal for remaining submissions: stop the BUY phase here.
                break;
            }

            // refresh buying power before committing further cash against this submission.
            if let Err(err) = self.account.get_account_snapshot().await {
                result.errors.push(format!("failed to refresh buying power before BUY {}: {err}", item.symbol));
            }

            let PreparedOrder::Submit { request, .. } = prepared else {
                unreachable!("BUYs never resolve to a liquidation directive")
            };
            let side = request.side;
            match self.submit_with_retry(request).await {
                Ok(order_id) => {
                    reserved += estimated_notional;
                    submitted.push((item.symbol.clone(), item.strategy_id.clone(), side, order_id));
                }
                Err(err) => {
                    result.success = false;
                    result.outcomes.insert(item.symbol.clone(), ItemOutcome::Rejected { reason: err.to_string() });
                }
            }
        }

        submitted
    }

    fn collect_submission_outcomes(
        &self,
        outcomes: Vec<SubmissionOutcome>,
        result: &mut ExecutionResult,
    ) -> Vec<(Symbol, StrategyId, OrderSide, String)> {
        let mut submitted = Vec::new();
        for outcome in outcomes {
            match outcome {
                SubmissionOutcome::Submitted { symbol, strategy_id, side, order_id } => {
                    submitted.push((symbol, strategy_id, side, order_id));
                }
                SubmissionOutcome::Failed { symbol, reason } => {
                    result.success = false;
                    result.outcomes.insert(symbol, ItemOutcome::Rejected { reason });
                }
            }
        }
        submitted
    }

    /// Poll every submitted order until it reaches a terminal (or quasi-terminal,
    /// PARTIALLY_FILLED) state or the settlement timeout expires. Orders still pending at
    /// timeout are left outstanding with the broker — never canceled behind its back.
    async fn wait_for_settlement(
        &self,
        orders: &[(Symbol, StrategyId, OrderSide, String)],
        result: &mut ExecutionResult,
    ) {
        if orders.is_empty() {
            return;
        }

        let deadline = Instant::now() + self.config.settlement_timeout;
        let mut pending: Vec<&(Symbol, StrategyId, OrderSide, String)> = orders.iter().collect();

        loop {
            let mut still_pending = Vec::new();
            for entry @ (symbol, strategy_id, side, order_id) in pending {
                match self.account.get_order_status(order_id).await {
                    Ok(report) if report.state.is_settled_for_sequencing() => {
                        let filled = FilledOrder {
                            order_id: order_id.clone(),
                            symbol: symbol.clone(),
                            side: *side,
                            filled_quantity: report.filled_quantity,
                            avg_fill_price: report.filled_avg_price,
                            strategy_id: strategy_id.clone(),
                            filled_at: report.updated_at,
                        };

                        if !filled.filled_quantity.is_zero() {
                            self.daily_limit.record_trade(filled.notional());
                            result.filled_orders.push(filled.clone());
                        }

                        let outcome = match report.state {
                            OrderState::Filled => ItemOutcome::Filled(filled),
                            OrderState::PartiallyFilled => ItemOutcome::PartiallyFilled(filled),
                            _ => {
                                result.success = false;
                                ItemOutcome::Rejected { reason: format!("{:?}", report.state) }
                            }
                        };
                        result.outcomes.insert(symbol.clone(), outcome);
                    }
                    Ok(_) => still_pending.push(entry),
                    Err(err) => {
                        result.errors.push(format!("failed to poll order status for {order_id}: {err}"));
                        still_pending.push(entry);
                    }
                }
            }

            if still_pending.is_empty() || Instant::now() >= deadline {
                if !still_pending.is_empty() {
                    result.success = false;
                }
                for (symbol, _, _, order_id) in &still_pending {
                    result.errors.push(
                        ExecutionError::SettlementTimeout {
                            order_id: order_id.clone(),
                            waited_seconds: self.config.settlement_timeout.as_secs(),
                        }
                        .to_string(),
                    );
                    result.outcomes.insert((*symbol).clone(), ItemOutcome::TimedOut { order_id: order_id.clone() });
                }
                break;
            }

            pending = still_pending;
            tokio::time::sleep(self.config.settlement_poll_interval).await;
        }
    }
}
