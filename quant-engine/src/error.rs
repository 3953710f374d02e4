use quant_execution::ExecutionError;
use quant_risk::PlannerError;
use quant_strategy::StrategyError;
use thiserror::Error;

/// Top-level error taxonomy, composed from every sub-crate's error type via `#[from]` —
/// matching the teacher's layered `ClientError`/`ApiError`/`ConnectivityError` composition.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl EngineError {
    /// Maps the error taxonomy to the spec's CLI exit codes: 0 success, 1 fatal, 3 configuration
    /// error. Exit code 2 (circuit-breaker trip) is a `run()`-only concern: a trip during
    /// execution never reaches this type, since `run()` builds a `TradeRunResult` straight from
    /// the `ExecutionResult` it gets back rather than converting it into an `EngineError` — see
    /// `ExecutionResult::circuit_breaker_tripped` and its handling in `crate::run::run`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 3,
            _ => 1,
        }
    }
}
