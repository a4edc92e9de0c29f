use async_trait::async_trait;

use crate::{
    Book, BookId, LineItem, Money, NewBook, NewOrder, OrderId, OrderItemRecord, OrderQuery,
    OrderRecord, OrderStatus, Result,
};

/// Entry point to a relational store.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a new transaction.
    ///
    /// Nothing written through the transaction is visible to other
    /// transactions until [`Transaction::commit`] succeeds. Dropping the
    /// transaction without committing discards every write.
    async fn begin(&self) -> Result<Box<dyn Transaction>>;
}

/// A unit of work against the store.
///
/// Writes are visible to later reads on the same transaction.
#[async_trait]
pub trait Transaction: Send {
    async fn get_book(&mut self, id: BookId) -> Result<Option<Book>>;

    /// Lists every book ordered by id.
    async fn list_books(&mut self) -> Result<Vec<Book>>;

    async fn insert_book(&mut self, book: NewBook) -> Result<Book>;

    /// Overwrites every column of a book. Returns None if it doesn't exist.
    async fn update_book(&mut self, id: BookId, book: NewBook) -> Result<Option<Book>>;

    /// Deletes a book. Returns false if it didn't exist.
    async fn delete_book(&mut self, id: BookId) -> Result<bool>;

    /// Returns true if any order line references the book.
    async fn book_in_use(&mut self, id: BookId) -> Result<bool>;

    /// Reads the given books and locks their rows until the transaction ends.
    ///
    /// Rows are locked in ascending id order so that concurrent callers
    /// never deadlock on each other. Ids that don't exist are skipped.
    async fn lock_books(&mut self, ids: &[BookId]) -> Result<Vec<Book>>;

    /// Adds `delta` to a book's stock and returns the new stock.
    ///
    /// Returns None if the book doesn't exist. Fails with
    /// [`StoreError::Constraint`](crate::StoreError::Constraint) if the
    /// result would be negative.
    async fn adjust_stock(&mut self, id: BookId, delta: i64) -> Result<Option<u32>>;

    /// Inserts an order header and returns it with its generated id.
    async fn insert_order(&mut self, order: NewOrder) -> Result<OrderRecord>;

    async fn get_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Reads an order header and locks its row until the transaction ends.
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Returns false if the order doesn't exist.
    async fn set_order_status(&mut self, id: OrderId, status: OrderStatus) -> Result<bool>;

    /// Deletes an order header. Returns false if it didn't exist.
    ///
    /// Callers delete the order's items first.
    async fn delete_order(&mut self, id: OrderId) -> Result<bool>;

    /// Inserts lines for an order, preserving their order.
    async fn insert_items(
        &mut self,
        order_id: OrderId,
        lines: &[LineItem],
    ) -> Result<Vec<OrderItemRecord>>;

    /// Lists an order's lines ordered by id.
    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItemRecord>>;

    /// Deletes every line of an order and returns how many were removed.
    async fn delete_items(&mut self, order_id: OrderId) -> Result<u64>;

    /// Lists order headers matching a query, newest first.
    async fn query_orders(&mut self, query: &OrderQuery) -> Result<Vec<OrderRecord>>;

    /// Sums `price × quantity` over the lines of Confirmed orders matching
    /// the query. The query's status, limit and offset are ignored.
    async fn confirmed_revenue(&mut self, query: &OrderQuery) -> Result<Money>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Extension trait providing read-only conveniences for stores.
///
/// Each call runs in its own short transaction that is rolled back.
#[async_trait]
pub trait StoreExt: Store {
    async fn book(&self, id: BookId) -> Result<Option<Book>> {
        let mut tx = self.begin().await?;
        let book = tx.get_book(id).await?;
        tx.rollback().await?;
        Ok(book)
    }

    async fn books(&self) -> Result<Vec<Book>> {
        let mut tx = self.begin().await?;
        let books = tx.list_books().await?;
        tx.rollback().await?;
        Ok(books)
    }

    async fn order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        let mut tx = self.begin().await?;
        let order = tx.get_order(id).await?;
        tx.rollback().await?;
        Ok(order)
    }

    async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        let mut tx = self.begin().await?;
        let items = tx.order_items(order_id).await?;
        tx.rollback().await?;
        Ok(items)
    }

    async fn orders(&self, query: OrderQuery) -> Result<Vec<OrderRecord>> {
        let mut tx = self.begin().await?;
        let orders = tx.query_orders(&query).await?;
        tx.rollback().await?;
        Ok(orders)
    }
}

// Blanket implementation for all Store implementations
impl<T: Store + ?Sized> StoreExt for T {}

/// Returns the ids sorted and without duplicates, the order rows are locked in.
pub(crate) fn lock_order_ids(ids: &[BookId]) -> Vec<BookId> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_order_ids_sorts_and_dedups() {
        let ids = [BookId::new(3), BookId::new(1), BookId::new(3), BookId::new(2)];
        assert_eq!(
            lock_order_ids(&ids),
            vec![BookId::new(1), BookId::new(2), BookId::new(3)]
        );
    }
}
