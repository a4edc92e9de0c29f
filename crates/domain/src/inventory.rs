//! Inventory ledger: the per-book stock counters and the only place stock
//! is changed.

use std::collections::{BTreeMap, HashMap};

use store::{BookId, LineItem, Transaction};

use crate::error::DomainError;

/// Reserves and releases stock inside a caller-owned transaction.
///
/// Every change is visible to later reads on the same transaction and is
/// discarded if the transaction is not committed.
pub struct InventoryLedger<'t> {
    tx: &'t mut dyn Transaction,
}

impl<'t> InventoryLedger<'t> {
    pub fn new(tx: &'t mut dyn Transaction) -> Self {
        Self { tx }
    }

    /// Decrements a book's stock by `quantity` and returns the new stock.
    pub async fn reserve(&mut self, book_id: BookId, quantity: u32) -> Result<u32, DomainError> {
        self.reserve_all(&[LineItem::new(book_id, quantity)]).await?;
        self.stock_of(book_id).await
    }

    /// Increments a book's stock by `quantity` and returns the new stock.
    pub async fn release(&mut self, book_id: BookId, quantity: u32) -> Result<u32, DomainError> {
        self.tx
            .adjust_stock(book_id, i64::from(quantity))
            .await?
            .ok_or(DomainError::BookNotFound(book_id))
    }

    /// Reserves stock for every line, or for none of them.
    ///
    /// Demand is summed per book across duplicate lines. All referenced books
    /// are locked and validated before any counter is written.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn reserve_all(&mut self, lines: &[LineItem]) -> Result<(), DomainError> {
        let demand = demand_by_book(lines);
        let ids: Vec<BookId> = demand.keys().copied().collect();
        let available: HashMap<BookId, u32> = self
            .tx
            .lock_books(&ids)
            .await?
            .into_iter()
            .map(|book| (book.id, book.stock))
            .collect();

        for (&book_id, &requested) in &demand {
            let Some(&stock) = available.get(&book_id) else {
                return Err(DomainError::BookNotFound(book_id));
            };
            if requested > u64::from(stock) {
                metrics::counter!("stock_reservation_failures_total").increment(1);
                tracing::info!(%book_id, requested, available = stock, "insufficient stock");
                return Err(DomainError::InsufficientStock {
                    book_id,
                    requested,
                    available: stock,
                });
            }
        }

        for (book_id, requested) in demand {
            // Bounded by the u32 stock it was validated against.
            let delta = -(requested as i64);
            self.tx
                .adjust_stock(book_id, delta)
                .await?
                .ok_or(DomainError::BookNotFound(book_id))?;
        }
        Ok(())
    }

    /// Returns the stock of every line to its book.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn release_all(&mut self, lines: &[LineItem]) -> Result<(), DomainError> {
        let demand = demand_by_book(lines);
        let ids: Vec<BookId> = demand.keys().copied().collect();
        self.tx.lock_books(&ids).await?;

        for (book_id, quantity) in demand {
            let delta = i64::try_from(quantity).unwrap_or(i64::MAX);
            self.tx
                .adjust_stock(book_id, delta)
                .await?
                .ok_or(DomainError::BookNotFound(book_id))?;
        }
        Ok(())
    }

    async fn stock_of(&mut self, book_id: BookId) -> Result<u32, DomainError> {
        self.tx
            .get_book(book_id)
            .await?
            .map(|book| book.stock)
            .ok_or(DomainError::BookNotFound(book_id))
    }
}

/// Sums quantities per book, ordered by book id.
pub fn demand_by_book(lines: &[LineItem]) -> BTreeMap<BookId, u64> {
    let mut demand = BTreeMap::new();
    for line in lines {
        *demand.entry(line.book_id).or_insert(0) += u64::from(line.quantity);
    }
    demand
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{InMemoryStore, Money, NewBook, Store, StoreExt};

    async fn store_with_books(stocks: &[u32]) -> (InMemoryStore, Vec<BookId>) {
        let store = InMemoryStore::new();
        let mut ids = Vec::new();
        for (i, &stock) in stocks.iter().enumerate() {
            let book = store
                .seed_book(NewBook::new(
                    format!("Book {i}"),
                    "Author",
                    "Genre",
                    Money::from_cents(1000),
                    stock,
                ))
                .await;
            ids.push(book.id);
        }
        (store, ids)
    }

    #[test]
    fn test_demand_by_book_sums_duplicates() {
        let a = BookId::new(1);
        let b = BookId::new(2);
        let demand = demand_by_book(&[
            LineItem::new(b, 1),
            LineItem::new(a, 2),
            LineItem::new(b, 3),
        ]);

        assert_eq!(demand.into_iter().collect::<Vec<_>>(), vec![(a, 2), (b, 4)]);
    }

    #[tokio::test]
    async fn test_reserve_and_release_single_book() {
        let (store, ids) = store_with_books(&[5]).await;
        let mut tx = store.begin().await.unwrap();
        let mut ledger = InventoryLedger::new(tx.as_mut());

        assert_eq!(ledger.reserve(ids[0], 5).await.unwrap(), 0);
        assert_eq!(ledger.release(ids[0], 2).await.unwrap(), 2);
        tx.commit().await.unwrap();

        assert_eq!(store.stock_of(ids[0]).await, Some(2));
    }

    #[tokio::test]
    async fn test_reserve_more_than_stock_fails() {
        let (store, ids) = store_with_books(&[1]).await;
        let mut tx = store.begin().await.unwrap();
        let mut ledger = InventoryLedger::new(tx.as_mut());

        let result = ledger.reserve(ids[0], 2).await;
        assert!(matches!(
            result,
            Err(DomainError::InsufficientStock {
                requested: 2,
                available: 1,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_reserve_all_validates_before_mutating() {
        let (store, ids) = store_with_books(&[5, 1]).await;
        let mut tx = store.begin().await.unwrap();

        let result = InventoryLedger::new(tx.as_mut())
            .reserve_all(&[LineItem::new(ids[0], 3), LineItem::new(ids[1], 2)])
            .await;
        assert!(
            matches!(result, Err(DomainError::InsufficientStock { book_id, .. }) if book_id == ids[1])
        );

        // Nothing was written, even within the open transaction.
        assert_eq!(tx.get_book(ids[0]).await.unwrap().unwrap().stock, 5);
        assert_eq!(tx.get_book(ids[1]).await.unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_reserve_all_aggregates_duplicate_lines() {
        let (store, ids) = store_with_books(&[4]).await;
        let mut tx = store.begin().await.unwrap();

        let result = InventoryLedger::new(tx.as_mut())
            .reserve_all(&[LineItem::new(ids[0], 3), LineItem::new(ids[0], 2)])
            .await;
        assert!(matches!(
            result,
            Err(DomainError::InsufficientStock {
                requested: 5,
                available: 4,
                ..
            })
        ));

        InventoryLedger::new(tx.as_mut())
            .reserve_all(&[LineItem::new(ids[0], 3), LineItem::new(ids[0], 1)])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.book(ids[0]).await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_reserve_all_unknown_book() {
        let (store, _) = store_with_books(&[]).await;
        let mut tx = store.begin().await.unwrap();

        let result = InventoryLedger::new(tx.as_mut())
            .reserve_all(&[LineItem::new(BookId::new(99), 1)])
            .await;
        assert!(matches!(result, Err(DomainError::BookNotFound(id)) if id == BookId::new(99)));
    }

    #[tokio::test]
    async fn test_release_all_restores_every_line() {
        let (store, ids) = store_with_books(&[0, 2]).await;
        let mut tx = store.begin().await.unwrap();

        InventoryLedger::new(tx.as_mut())
            .release_all(&[
                LineItem::new(ids[0], 2),
                LineItem::new(ids[1], 1),
                LineItem::new(ids[0], 3),
            ])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.stock_of(ids[0]).await, Some(5));
        assert_eq!(store.stock_of(ids[1]).await, Some(3));
    }
}
