use thiserror::Error;

/// The Planner validates prices and the daily trade limit up front (`PlannerError::MissingPrice`,
/// `quant_risk::DailyTradeLimitState`), so this taxonomy only covers what can still go wrong once
/// a plan reaches the broker: a per-order rejection, a settlement/run-deadline timeout, or a
/// connectivity failure. Per-item outcomes that stop short of a broker error (no quote, rounded
/// to zero, daily limit headroom exhausted) are reported as `ItemOutcome`s on `ExecutionResult`,
/// not as this error type.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("order {order_id} rejected: {reason}")]
    OrderRejected { order_id: String, reason: String },

    #[error("settlement wait for {order_id} timed out after {waited_seconds}s")]
    SettlementTimeout { order_id: String, waited_seconds: u64 },

    #[error("run deadline of {deadline_seconds}s exceeded before all items could be submitted")]
    RunDeadlineExceeded { deadline_seconds: u64 },

    #[error("lost connectivity to the broker: {detail}")]
    BrokerConnectivity { detail: String },

    #[error("broker call failed: {0}")]
    Broker(String),
}
