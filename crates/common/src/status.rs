//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The persisted status of an order.
///
/// State transitions:
/// ```text
/// Saved ──confirm──► Confirmed
///   │                    │
///   └──delete──┐   ┌─────┴─delete (stock released first)
///              ▼   ▼
///             (removed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Persisted but not yet committed against inventory.
    #[default]
    Saved,

    /// Stock has been reserved for every line.
    Confirmed,
}

impl OrderStatus {
    /// Returns true if the line items may be replaced in this status.
    pub fn can_edit(&self) -> bool {
        matches!(self, OrderStatus::Saved)
    }

    /// Returns true if the order may be confirmed from this status.
    pub fn can_confirm(&self) -> bool {
        matches!(self, OrderStatus::Saved)
    }

    /// Returns true if deleting an order in this status must return stock.
    pub fn releases_stock_on_delete(&self) -> bool {
        matches!(self, OrderStatus::Confirmed)
    }

    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Saved => "Saved",
            OrderStatus::Confirmed => "Confirmed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a stored status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError(pub String);

impl std::fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown order status: {}", self.0)
    }
}

impl std::error::Error for ParseStatusError {}

impl std::str::FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Saved" => Ok(OrderStatus::Saved),
            "Confirmed" => Ok(OrderStatus::Confirmed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}
