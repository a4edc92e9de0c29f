//! Order workflow service: every operation runs in one store transaction.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::Utc;
use store::{
    Book, BookId, CustomerId, OrderId, OrderItemRecord, OrderQuery, OrderRecord, OrderStatus,
    Store, Transaction,
};

use crate::auth::{Caller, authorize};
use crate::error::DomainError;
use crate::inventory::InventoryLedger;
use crate::retry::with_retry;

use super::{
    ConfirmOrder, CreateOrder, DeleteOrder, EditOrder, Order, OrderDetails, OrderError,
    OrderLineDetails, OrderSummary, SubmitMode,
};

/// Service for managing orders.
///
/// Business-rule failures leave every row unchanged: the transaction is
/// dropped without being committed. Transient store failures are retried
/// in a fresh transaction.
pub struct OrderService<S: Store> {
    store: S,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates an order, reserving its stock first when `mode` is Confirm.
    ///
    /// Either the order, its lines and every reservation are committed, or
    /// nothing is.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(
        &self,
        caller: &Caller,
        cmd: CreateOrder,
    ) -> Result<OrderDetails, DomainError> {
        let owner = resolve_owner(caller, cmd.customer_id)?;
        let order = Order::new(owner, Utc::now(), cmd.mode.initial_status(), cmd.lines)?;

        let details = with_retry("create_order", || self.try_create(&order, cmd.mode)).await?;

        metrics::counter!("orders_created_total", "mode" => cmd.mode.as_str()).increment(1);
        tracing::info!(order_id = %details.id, status = %details.status, "order created");
        Ok(details)
    }

    /// Reserves stock for every line of a Saved order and marks it Confirmed.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_order(
        &self,
        caller: &Caller,
        cmd: ConfirmOrder,
    ) -> Result<OrderDetails, DomainError> {
        caller.require_authenticated()?;

        let details =
            with_retry("confirm_order", || self.try_confirm(caller, cmd.order_id)).await?;

        metrics::counter!("orders_confirmed_total").increment(1);
        tracing::info!(order_id = %cmd.order_id, "order confirmed");
        Ok(details)
    }

    /// Replaces every line of a Saved order. Stock is not touched.
    #[tracing::instrument(skip(self))]
    pub async fn edit_order(
        &self,
        caller: &Caller,
        cmd: EditOrder,
    ) -> Result<OrderDetails, DomainError> {
        caller.require_authenticated()?;

        with_retry("edit_order", || self.try_edit(caller, &cmd)).await
    }

    /// Deletes an order and its lines, releasing stock first if it was
    /// Confirmed.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, caller: &Caller, cmd: DeleteOrder) -> Result<(), DomainError> {
        caller.require_authenticated()?;

        let status = with_retry("delete_order", || self.try_delete(caller, cmd.order_id)).await?;

        metrics::counter!("orders_deleted_total", "status" => status.as_str()).increment(1);
        tracing::info!(order_id = %cmd.order_id, %status, "order deleted");
        Ok(())
    }

    /// Loads an order with its lines resolved against the catalog.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(
        &self,
        caller: &Caller,
        order_id: OrderId,
    ) -> Result<OrderDetails, DomainError> {
        caller.require_authenticated()?;

        with_retry("get_order", || async move {
            let mut tx = self.store.begin().await?;
            let record = tx
                .get_order(order_id)
                .await?
                .ok_or(DomainError::OrderNotFound(order_id))?;
            let items = tx.order_items(order_id).await?;
            if !authorize(caller, &Order::from_records(&record, &items)) {
                return Err(DomainError::forbidden("view", order_id));
            }
            let details = load_details(tx.as_mut(), &record, &items).await?;
            tx.rollback().await?;
            Ok(details)
        })
        .await
    }

    /// Lists orders newest first.
    ///
    /// Customers only ever see their own orders, whatever the query says.
    #[tracing::instrument(skip(self))]
    pub async fn order_history(
        &self,
        caller: &Caller,
        query: OrderQuery,
    ) -> Result<Vec<OrderSummary>, DomainError> {
        let query = match caller {
            Caller::Anonymous => return Err(DomainError::Unauthenticated),
            Caller::Customer(id) => query.customer_id(*id),
            Caller::Admin(_) => query,
        };

        let query = &query;
        with_retry("order_history", || async move {
            let mut tx = self.store.begin().await?;
            let records = tx.query_orders(query).await?;
            let mut summaries = Vec::with_capacity(records.len());
            for record in &records {
                let items = tx.order_items(record.id).await?;
                let details = load_details(tx.as_mut(), record, &items).await?;
                summaries.push(OrderSummary::from(&details));
            }
            tx.rollback().await?;
            Ok(summaries)
        })
        .await
    }

    // =========================================================================
    // Single attempts
    // =========================================================================

    async fn try_create(&self, order: &Order, mode: SubmitMode) -> Result<OrderDetails, DomainError> {
        let mut tx = self.store.begin().await?;

        match mode {
            SubmitMode::Confirm => {
                InventoryLedger::new(tx.as_mut())
                    .reserve_all(order.lines())
                    .await?
            }
            SubmitMode::Save => ensure_books_exist(tx.as_mut(), &order.book_ids()).await?,
        }

        let record = tx.insert_order(order.to_new_order()).await?;
        let items = tx.insert_items(record.id, order.lines()).await?;
        let details = load_details(tx.as_mut(), &record, &items).await?;

        tx.commit().await?;
        Ok(details)
    }

    async fn try_confirm(
        &self,
        caller: &Caller,
        order_id: OrderId,
    ) -> Result<OrderDetails, DomainError> {
        let mut tx = self.store.begin().await?;
        let (mut record, items) = lock_authorized(tx.as_mut(), caller, order_id, "confirm").await?;

        let mut order = Order::from_records(&record, &items);
        order.confirm()?;
        InventoryLedger::new(tx.as_mut())
            .reserve_all(order.lines())
            .await?;
        tx.set_order_status(order_id, order.status()).await?;
        record.status = order.status();

        let details = load_details(tx.as_mut(), &record, &items).await?;
        tx.commit().await?;
        Ok(details)
    }

    async fn try_edit(&self, caller: &Caller, cmd: &EditOrder) -> Result<OrderDetails, DomainError> {
        let mut tx = self.store.begin().await?;
        let (record, items) = lock_authorized(tx.as_mut(), caller, cmd.order_id, "edit").await?;

        let mut order = Order::from_records(&record, &items);
        order.replace_lines(cmd.lines.clone())?;
        ensure_books_exist(tx.as_mut(), &order.book_ids()).await?;

        tx.delete_items(cmd.order_id).await?;
        let items = tx.insert_items(cmd.order_id, order.lines()).await?;

        let details = load_details(tx.as_mut(), &record, &items).await?;
        tx.commit().await?;
        Ok(details)
    }

    async fn try_delete(
        &self,
        caller: &Caller,
        order_id: OrderId,
    ) -> Result<OrderStatus, DomainError> {
        let mut tx = self.store.begin().await?;
        let (record, items) = lock_authorized(tx.as_mut(), caller, order_id, "delete").await?;

        let order = Order::from_records(&record, &items);
        let to_release = order.stock_to_release();
        if !to_release.is_empty() {
            InventoryLedger::new(tx.as_mut())
                .release_all(to_release)
                .await?;
        }

        tx.delete_items(order_id).await?;
        tx.delete_order(order_id).await?;
        tx.commit().await?;
        Ok(order.status())
    }
}

/// Picks the owner of a new order.
fn resolve_owner(
    caller: &Caller,
    requested: Option<CustomerId>,
) -> Result<CustomerId, DomainError> {
    match (caller, requested) {
        (Caller::Anonymous, _) => Err(DomainError::Unauthenticated),
        (Caller::Customer(id), None) => Ok(*id),
        (Caller::Customer(id), Some(other)) if *id == other => Ok(*id),
        (Caller::Customer(_), Some(_)) => Err(DomainError::Forbidden(
            "customers may only create their own orders".to_string(),
        )),
        (Caller::Admin(_), Some(owner)) => Ok(owner),
        (Caller::Admin(_), None) => Err(OrderError::CustomerIdRequired.into()),
    }
}

/// Locks an order row and checks the caller may act on it.
async fn lock_authorized(
    tx: &mut dyn Transaction,
    caller: &Caller,
    order_id: OrderId,
    action: &'static str,
) -> Result<(OrderRecord, Vec<OrderItemRecord>), DomainError> {
    let record = tx
        .lock_order(order_id)
        .await?
        .ok_or(DomainError::OrderNotFound(order_id))?;
    let items = tx.order_items(order_id).await?;

    if !authorize(caller, &Order::from_records(&record, &items)) {
        tracing::warn!(%order_id, ?caller, action, "caller is not allowed");
        return Err(DomainError::forbidden(action, order_id));
    }
    Ok((record, items))
}

async fn ensure_books_exist(tx: &mut dyn Transaction, ids: &[BookId]) -> Result<(), DomainError> {
    for &id in ids {
        if tx.get_book(id).await?.is_none() {
            return Err(DomainError::BookNotFound(id));
        }
    }
    Ok(())
}

/// Resolves every line's book and computes the totals.
async fn load_details(
    tx: &mut dyn Transaction,
    record: &OrderRecord,
    items: &[OrderItemRecord],
) -> Result<OrderDetails, DomainError> {
    let mut books: HashMap<BookId, Book> = HashMap::new();
    let mut lines = Vec::with_capacity(items.len());

    for item in items {
        let book = match books.entry(item.book_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let book = tx
                    .get_book(item.book_id)
                    .await?
                    .ok_or(DomainError::BookNotFound(item.book_id))?;
                entry.insert(book)
            }
        };
        lines.push(OrderLineDetails {
            item_id: item.id,
            book_id: item.book_id,
            title: book.title.clone(),
            unit_price: book.price,
            quantity: item.quantity,
            line_total: book
                .price
                .checked_multiply(item.quantity)
                .ok_or(OrderError::TotalOutOfRange)?,
        });
    }

    let prices = books.iter().map(|(id, book)| (*id, book.price)).collect();
    let total = Order::from_records(record, items).total(&prices)?;

    Ok(OrderDetails {
        id: record.id,
        customer_id: record.customer_id,
        created_at: record.created_at,
        status: record.status,
        lines,
        total,
    })
}
