use crate::error::EngineError;
use chrono::{DateTime, Utc};
use quant_execution::{ExecutionResult, FilledOrder};
use quant_risk::RebalancePlan;
use quant_strategy::{AggregateWarning, ConsolidatedPortfolio, StrategySignal};
use serde::Serialize;
use uuid::Uuid;

/// A categorized, user-facing error: an error-code string plus a human message, never a stack
/// trace, matching spec.md §6's "no stack traces reach the user surface."
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
    pub exit_code: i32,
}

impl From<&EngineError> for ErrorReport {
    fn from(err: &EngineError) -> Self {
        let code = match err {
            EngineError::Configuration(_) => "CONFIGURATION_ERROR",
            EngineError::Strategy(_) => "STRATEGY_ERROR",
            EngineError::Planner(_) => "PLANNER_ERROR",
            EngineError::Execution(_) => "EXECUTION_ERROR",
        };
        Self { code: code.to_string(), message: err.to_string(), exit_code: err.exit_code() }
    }
}

/// The single return value of [`crate::run::run`]: every artifact produced along the pipeline,
/// serializable for downstream reporting as spec.md §6 requires.
#[derive(Debug, Clone, Serialize)]
pub struct TradeRunResult {
    pub success: bool,
    pub correlation_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub signals_by_strategy: Vec<StrategySignal>,
    pub consolidated_portfolio: Option<ConsolidatedPortfolio>,
    pub rebalance_plan: Option<RebalancePlan>,
    pub filled_orders: Vec<FilledOrder>,
    pub orders_canceled: usize,
    pub warnings: Vec<String>,
    pub error: Option<ErrorReport>,
}

impl TradeRunResult {
    pub fn exit_code(&self) -> i32 {
        self.error.as_ref().map(|e| e.exit_code).unwrap_or(0)
    }
}

pub(crate) fn warnings_from_aggregate(warnings: &[AggregateWarning]) -> Vec<String> {
    warnings.iter().map(|w| format!("{w:?}")).collect()
}

pub(crate) fn warnings_from_execution(result: &ExecutionResult) -> Vec<String> {
    result.errors.clone()
}
