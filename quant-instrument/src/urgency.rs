use serde::{Deserialize, Serialize};

/// How urgently a rebalance plan (or a single item within it) needs to trade. Drives the
/// Execution Engine's smart-pricing aggressiveness (`inside_factor`) and its choice between
/// a smart limit and an aggressive marketable limit.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
pub enum ExecutionUrgency {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}
