use chrono::{DateTime, Utc};

use crate::{CustomerId, OrderRecord, OrderStatus};

/// Builder for constructing order queries.
///
/// Results are ordered newest first (`created_at` descending, then id
/// descending).
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Filter by owning customer.
    pub customer_id: Option<CustomerId>,

    /// Filter by status.
    pub status: Option<OrderStatus>,

    /// Filter by orders created at or after this timestamp.
    pub from_timestamp: Option<DateTime<Utc>>,

    /// Filter by orders created at or before this timestamp.
    pub to_timestamp: Option<DateTime<Utc>>,

    /// Maximum number of orders to return.
    pub limit: Option<usize>,

    /// Number of orders to skip.
    pub offset: Option<usize>,
}

impl OrderQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for one customer's orders.
    pub fn for_customer(customer_id: CustomerId) -> Self {
        Self {
            customer_id: Some(customer_id),
            ..Default::default()
        }
    }

    pub fn customer_id(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filters to orders created at or after this timestamp.
    pub fn from_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.from_timestamp = Some(timestamp);
        self
    }

    /// Filters to orders created at or before this timestamp.
    pub fn to_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.to_timestamp = Some(timestamp);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the order passes every filter (ignores paging).
    pub fn matches(&self, order: &OrderRecord) -> bool {
        if let Some(customer_id) = self.customer_id
            && order.customer_id != customer_id
        {
            return false;
        }
        if let Some(status) = self.status
            && order.status != status
        {
            return false;
        }
        if let Some(from) = self.from_timestamp
            && order.created_at < from
        {
            return false;
        }
        if let Some(to) = self.to_timestamp
            && order.created_at > to
        {
            return false;
        }
        true
    }
}
