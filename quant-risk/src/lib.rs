//! Rebalance planning and capital-safety checks: turns a consolidated target portfolio into a
//! concrete, ordered set of trades, and guards cumulative daily trade value with a process-wide
//! circuit breaker.

pub mod config;
pub mod daily_limit;
pub mod error;
pub mod plan;
pub mod planner;

pub use config::PlannerConfig;
pub use daily_limit::{DailyTradeLimitState, LimitCheck};
pub use error::PlannerError;
pub use plan::{PlanAction, RebalancePlan, RebalancePlanItem};
pub use planner::build_plan;
