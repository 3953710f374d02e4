use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Explicit correlation/causation pair threaded through every artifact produced by a run
/// (signals, consolidated portfolio, plan, execution result, persisted records).
///
/// There is deliberately no ambient/thread-local storage here (see the redesign notes on
/// context-variable correlation ids) — every function that needs these ids takes a
/// `&RunContext` parameter.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunContext {
    pub correlation_id: Uuid,
    pub causation_id: Uuid,
}

impl RunContext {
    /// Start a new run: the causation id defaults to the correlation id, as spec'd for the
    /// top-level invocation (causation_id = correlation_id if unspecified).
    pub fn root(correlation_id: Uuid) -> Self {
        Self { correlation_id, causation_id: correlation_id }
    }

    /// Derive a child context for an artifact caused by `self`, keeping the run's
    /// correlation id but recording `self` as the immediate cause.
    pub fn caused_by(&self, causation_id: Uuid) -> Self {
        Self { correlation_id: self.correlation_id, causation_id }
    }
}
