//! Trading signals emitted by strategies.

use serde::Serialize;
use std::fmt;

/// What a strategy wants to do on the current tick.
///
/// A quantity, when present, is used as-is instead of the engine's sizing
/// policy. Its sign is ignored; the variant decides the side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "UPPERCASE")]
pub enum Signal {
    Buy { quantity: Option<i64> },
    Sell { quantity: Option<i64> },
    Hold,
}

impl Signal {
    pub fn buy() -> Self {
        Signal::Buy { quantity: None }
    }

    pub fn sell() -> Self {
        Signal::Sell { quantity: None }
    }

    pub fn buy_qty(quantity: i64) -> Self {
        Signal::Buy {
            quantity: Some(quantity),
        }
    }

    pub fn sell_qty(quantity: i64) -> Self {
        Signal::Sell {
            quantity: Some(quantity),
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self, Signal::Hold)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy { quantity: Some(q) } => write!(f, "BUY {}", q),
            Signal::Buy { quantity: None } => write!(f, "BUY"),
            Signal::Sell { quantity: Some(q) } => write!(f, "SELL {}", q),
            Signal::Sell { quantity: None } => write!(f, "SELL"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}
