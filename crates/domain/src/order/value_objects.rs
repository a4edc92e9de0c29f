//! Read models returned by the order service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::{BookId, CustomerId, Money, OrderId, OrderItemId, OrderStatus};

/// One order line with its book resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineDetails {
    pub item_id: OrderItemId,
    pub book_id: BookId,
    pub title: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

/// An order with its lines and computed total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub lines: Vec<OrderLineDetails>,
    pub total: Money,
}

impl OrderDetails {
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }
}

/// A row of the order history listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub line_count: usize,
    pub total: Money,
}

impl From<&OrderDetails> for OrderSummary {
    fn from(details: &OrderDetails) -> Self {
        Self {
            id: details.id,
            customer_id: details.customer_id,
            created_at: details.created_at,
            status: details.status,
            line_count: details.lines.len(),
            total: details.total,
        }
    }
}
