//! Order aggregate implementation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use store::{
    BookId, CustomerId, LineItem, Money, NewOrder, OrderId, OrderItemRecord, OrderRecord,
    OrderStatus,
};

use super::OrderError;

/// Order aggregate root: a header plus its line items.
///
/// Lines keep their insertion order. Duplicate books are allowed and treated
/// as independent lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Assigned by the store on insert.
    id: Option<OrderId>,
    customer_id: CustomerId,
    created_at: DateTime<Utc>,
    status: OrderStatus,
    lines: Vec<LineItem>,
}

impl Order {
    /// Builds a new, not yet persisted order.
    pub fn new(
        customer_id: CustomerId,
        created_at: DateTime<Utc>,
        status: OrderStatus,
        lines: Vec<LineItem>,
    ) -> Result<Self, OrderError> {
        validate_lines(&lines)?;
        Ok(Self {
            id: None,
            customer_id,
            created_at,
            status,
            lines,
        })
    }

    /// Rehydrates an order from its stored rows.
    pub fn from_records(record: &OrderRecord, items: &[OrderItemRecord]) -> Self {
        Self {
            id: Some(record.id),
            customer_id: record.customer_id,
            created_at: record.created_at,
            status: record.status,
            lines: items.iter().map(OrderItemRecord::line).collect(),
        }
    }

    pub fn id(&self) -> Option<OrderId> {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    /// Returns the referenced books without duplicates, in ascending order.
    pub fn book_ids(&self) -> Vec<BookId> {
        let mut ids: Vec<BookId> = self.lines.iter().map(|l| l.book_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Sums `price × quantity` over every line whose book has a known price.
    pub fn total(&self, prices: &HashMap<BookId, Money>) -> Result<Money, OrderError> {
        self.lines
            .iter()
            .filter_map(|line| prices.get(&line.book_id).map(|p| (p, line.quantity)))
            .try_fold(Money::zero(), |total, (price, quantity)| {
                price
                    .checked_multiply(quantity)
                    .and_then(|line_total| total.checked_add(line_total))
                    .ok_or(OrderError::TotalOutOfRange)
            })
    }

    /// Header columns for inserting this order.
    pub fn to_new_order(&self) -> NewOrder {
        NewOrder {
            customer_id: self.customer_id,
            created_at: self.created_at,
            status: self.status,
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Moves a Saved order to Confirmed.
    ///
    /// The caller is responsible for reserving stock in the same transaction.
    pub fn confirm(&mut self) -> Result<(), OrderError> {
        if !self.status.can_confirm() {
            return Err(OrderError::NotEditable {
                status: self.status,
                action: "confirmed",
            });
        }
        self.status = OrderStatus::Confirmed;
        Ok(())
    }

    /// Replaces every line of a Saved order.
    pub fn replace_lines(&mut self, lines: Vec<LineItem>) -> Result<(), OrderError> {
        if !self.status.can_edit() {
            return Err(OrderError::NotEditable {
                status: self.status,
                action: "edited",
            });
        }
        validate_lines(&lines)?;
        self.lines = lines;
        Ok(())
    }

    /// Lines whose stock must be returned before the order is removed.
    pub fn stock_to_release(&self) -> &[LineItem] {
        if self.status.releases_stock_on_delete() {
            &self.lines
        } else {
            &[]
        }
    }
}

fn validate_lines(lines: &[LineItem]) -> Result<(), OrderError> {
    if lines.is_empty() {
        return Err(OrderError::NoItems);
    }
    if let Some(line) = lines.iter().find(|l| l.quantity == 0) {
        return Err(OrderError::InvalidQuantity {
            book_id: line.book_id,
            quantity: line.quantity,
        });
    }
    Ok(())
}
