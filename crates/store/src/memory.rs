use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::store::lock_order_ids;
use crate::{
    Book, BookId, LineItem, Money, NewBook, NewOrder, OrderId, OrderItemId, OrderItemRecord,
    OrderQuery, OrderRecord, OrderStatus, Result, Store, StoreError, Transaction,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    books: BTreeMap<BookId, Book>,
    orders: BTreeMap<OrderId, OrderRecord>,
    items: BTreeMap<OrderItemId, OrderItemRecord>,
    last_book_id: i64,
    last_order_id: i64,
    last_item_id: i64,
}

/// In-memory store implementation for testing and local runs.
///
/// A transaction holds the store lock from `begin` until it is committed,
/// rolled back or dropped, so transactions run strictly one at a time. Writes
/// go to a private copy of the tables that replaces the shared copy on commit.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a book outside of any workflow and returns it.
    pub async fn seed_book(&self, book: NewBook) -> Book {
        let mut tables = self.tables.lock().await;
        tables.last_book_id += 1;
        let book = book.into_book(BookId::new(tables.last_book_id));
        tables.books.insert(book.id, book.clone());
        book
    }

    /// Returns the committed stock of a book.
    pub async fn stock_of(&self, id: BookId) -> Option<u32> {
        self.tables.lock().await.books.get(&id).map(|b| b.stock)
    }

    /// Returns the number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    /// Returns the number of committed order lines.
    pub async fn item_count(&self) -> usize {
        self.tables.lock().await.items.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, working }))
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

impl InMemoryTransaction {
    fn sorted_orders<'a>(&'a self, query: &'a OrderQuery) -> Vec<&'a OrderRecord> {
        let mut orders: Vec<_> = self
            .working
            .orders
            .values()
            .filter(|o| query.matches(o))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn get_book(&mut self, id: BookId) -> Result<Option<Book>> {
        Ok(self.working.books.get(&id).cloned())
    }

    async fn list_books(&mut self) -> Result<Vec<Book>> {
        Ok(self.working.books.values().cloned().collect())
    }

    async fn insert_book(&mut self, book: NewBook) -> Result<Book> {
        self.working.last_book_id += 1;
        let book = book.into_book(BookId::new(self.working.last_book_id));
        self.working.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update_book(&mut self, id: BookId, book: NewBook) -> Result<Option<Book>> {
        match self.working.books.get_mut(&id) {
            Some(existing) => {
                *existing = book.into_book(id);
                Ok(Some(existing.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_book(&mut self, id: BookId) -> Result<bool> {
        if self.book_in_use(id).await? {
            return Err(StoreError::Constraint(format!(
                "book {id} is referenced by order_items"
            )));
        }
        Ok(self.working.books.remove(&id).is_some())
    }

    async fn book_in_use(&mut self, id: BookId) -> Result<bool> {
        Ok(self.working.items.values().any(|i| i.book_id == id))
    }

    async fn lock_books(&mut self, ids: &[BookId]) -> Result<Vec<Book>> {
        // The whole store is already exclusively held by this transaction.
        Ok(lock_order_ids(ids)
            .into_iter()
            .filter_map(|id| self.working.books.get(&id).cloned())
            .collect())
    }

    async fn adjust_stock(&mut self, id: BookId, delta: i64) -> Result<Option<u32>> {
        let Some(book) = self.working.books.get_mut(&id) else {
            return Ok(None);
        };

        let new_stock = i64::from(book.stock) + delta;
        let new_stock = u32::try_from(new_stock).map_err(|_| {
            StoreError::Constraint(format!(
                "stock of book {id} would become {new_stock}, must be >= 0"
            ))
        })?;
        book.stock = new_stock;
        Ok(Some(new_stock))
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<OrderRecord> {
        self.working.last_order_id += 1;
        let record = OrderRecord {
            id: OrderId::new(self.working.last_order_id),
            customer_id: order.customer_id,
            created_at: order.created_at,
            status: order.status,
        };
        self.working.orders.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>> {
        self.get_order(id).await
    }

    async fn set_order_status(&mut self, id: OrderId, status: OrderStatus) -> Result<bool> {
        match self.working.orders.get_mut(&id) {
            Some(order) => {
                order.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<bool> {
        // Mirrors ON DELETE CASCADE.
        self.working.items.retain(|_, item| item.order_id != id);
        Ok(self.working.orders.remove(&id).is_some())
    }

    async fn insert_items(
        &mut self,
        order_id: OrderId,
        lines: &[LineItem],
    ) -> Result<Vec<OrderItemRecord>> {
        if !self.working.orders.contains_key(&order_id) {
            return Err(StoreError::Constraint(format!(
                "order {order_id} does not exist"
            )));
        }

        let mut records = Vec::with_capacity(lines.len());
        for line in lines {
            if line.quantity == 0 {
                return Err(StoreError::Constraint(
                    "order item quantity must be > 0".to_string(),
                ));
            }
            if !self.working.books.contains_key(&line.book_id) {
                return Err(StoreError::Constraint(format!(
                    "book {} does not exist",
                    line.book_id
                )));
            }

            self.working.last_item_id += 1;
            let record = OrderItemRecord {
                id: OrderItemId::new(self.working.last_item_id),
                order_id,
                book_id: line.book_id,
                quantity: line.quantity,
            };
            self.working.items.insert(record.id, record.clone());
            records.push(record);
        }
        Ok(records)
    }

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        Ok(self
            .working
            .items
            .values()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn delete_items(&mut self, order_id: OrderId) -> Result<u64> {
        let before = self.working.items.len();
        self.working.items.retain(|_, item| item.order_id != order_id);
        Ok((before - self.working.items.len()) as u64)
    }

    async fn query_orders(&mut self, query: &OrderQuery) -> Result<Vec<OrderRecord>> {
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(self
            .sorted_orders(query)
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn confirmed_revenue(&mut self, query: &OrderQuery) -> Result<Money> {
        let query = OrderQuery {
            status: Some(OrderStatus::Confirmed),
            limit: None,
            offset: None,
            ..query.clone()
        };

        let mut total = Money::zero();
        for item in self.working.items.values() {
            let Some(order) = self.working.orders.get(&item.order_id) else {
                continue;
            };
            if !query.matches(order) {
                continue;
            }
            if let Some(book) = self.working.books.get(&item.book_id) {
                total = book
                    .price
                    .checked_multiply(item.quantity)
                    .and_then(|line_total| total.checked_add(line_total))
                    .ok_or_else(|| StoreError::OutOfRange("confirmed revenue".into()))?;
            }
        }
        Ok(total)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
