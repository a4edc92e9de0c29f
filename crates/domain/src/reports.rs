//! Revenue reporting for administrators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::{Money, OrderQuery, OrderRecord, OrderStatus, Store};

use crate::auth::Caller;
use crate::error::DomainError;
use crate::retry::with_retry;

/// Revenue of Confirmed orders over an optional date range.
///
/// Lines are valued at the book's current price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueReport {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub confirmed_orders: usize,
    pub revenue: Money,
}

pub struct ReportService<S: Store> {
    store: S,
}

impl<S: Store> ReportService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn revenue(
        &self,
        caller: &Caller,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<RevenueReport, DomainError> {
        caller.require_admin("view reports")?;

        let mut query = OrderQuery::new().status(OrderStatus::Confirmed);
        query.from_timestamp = from;
        query.to_timestamp = to;
        let query = &query;

        with_retry("revenue_report", || async move {
            let mut tx = self.store.begin().await?;
            let revenue = tx.confirmed_revenue(query).await?;
            let confirmed_orders = tx.query_orders(query).await?.len();
            tx.rollback().await?;
            Ok(RevenueReport {
                from,
                to,
                confirmed_orders,
                revenue,
            })
        })
        .await
    }

    /// Lists order headers of any customer.
    #[tracing::instrument(skip(self))]
    pub async fn orders(
        &self,
        caller: &Caller,
        query: OrderQuery,
    ) -> Result<Vec<OrderRecord>, DomainError> {
        caller.require_admin("list all orders")?;

        let query = &query;
        with_retry("orders_report", || async move {
            let mut tx = self.store.begin().await?;
            let orders = tx.query_orders(query).await?;
            tx.rollback().await?;
            Ok(orders)
        })
        .await
    }
}
