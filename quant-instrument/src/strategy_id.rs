use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Identifier of a configured strategy (e.g. `NUCLEAR`, `TECL`, `KLM`).
///
/// Strategies are registered by name at startup (see the `Strategy` trait and
/// `StrategyRegistry` in `quant-strategy`) rather than modelled as a closed Rust enum, so new
/// strategies can be added purely through configuration.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
pub struct StrategyId(SmolStr);

impl StrategyId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(SmolStr::new(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for StrategyId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for StrategyId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
