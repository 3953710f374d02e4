use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::str::FromStr;
use thiserror::Error;

/// Ticker identifying a tradable equity or ETF.
///
/// Immutable once constructed; a [`Symbol`] is created on first reference and is never
/// destroyed for the lifetime of a process (it may simply stop appearing in subsequent runs).
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
#[serde(try_from = "SmolStr", into = "SmolStr")]
pub struct Symbol(SmolStr);

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum SymbolError {
    #[error("symbol cannot be empty")]
    Empty,
    #[error("symbol '{0}' exceeds 10 characters")]
    TooLong(String),
    #[error("symbol '{0}' contains non-uppercase-alphanumeric characters")]
    InvalidChars(String),
}

impl Symbol {
    pub fn new(ticker: impl AsRef<str>) -> Result<Self, SymbolError> {
        let ticker = ticker.as_ref();
        if ticker.is_empty() {
            return Err(SymbolError::Empty);
        }
        if ticker.len() > 10 {
            return Err(SymbolError::TooLong(ticker.to_string()));
        }
        if !ticker.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
            return Err(SymbolError::InvalidChars(ticker.to_string()));
        }
        Ok(Self(SmolStr::new(ticker)))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for Symbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<SmolStr> for Symbol {
    type Error = SymbolError;

    fn try_from(value: SmolStr) -> Result<Self, Self::Error> {
        Self::new(value.as_str())
    }
}

impl From<Symbol> for SmolStr {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_tickers() {
        assert!(Symbol::new("AAPL").is_ok());
        assert!(Symbol::new("BIL").is_ok());
        assert!(Symbol::new("A").is_ok());
        assert!(Symbol::new("BRK2").is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(Symbol::new("").unwrap_err(), SymbolError::Empty);
    }

    #[test]
    fn rejects_too_long() {
        assert!(matches!(Symbol::new("ABCDEFGHIJK"), Err(SymbolError::TooLong(_))));
    }

    #[test]
    fn rejects_lowercase() {
        assert!(matches!(Symbol::new("aapl"), Err(SymbolError::InvalidChars(_))));
    }
}
