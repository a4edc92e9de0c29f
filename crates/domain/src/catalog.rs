//! Book catalog management.

use store::{Book, BookId, NewBook, Store, StoreExt};

use crate::auth::Caller;
use crate::error::DomainError;
use crate::retry::with_retry;

/// Largest stock an administrator may set on a book.
///
/// Far enough below `u32::MAX` that stock returned by deleting confirmed
/// orders still fits.
pub const MAX_STOCK: u32 = 1_000_000;

/// Service for reading and, as an administrator, changing the catalog.
///
/// Stock set here is the starting point the inventory ledger works from.
pub struct CatalogService<S: Store> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_books(&self) -> Result<Vec<Book>, DomainError> {
        Ok(self.store.books().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_book(&self, id: BookId) -> Result<Book, DomainError> {
        self.store
            .book(id)
            .await?
            .ok_or(DomainError::BookNotFound(id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_book(&self, caller: &Caller, book: NewBook) -> Result<Book, DomainError> {
        caller.require_admin("add books")?;
        validate_book(&book)?;

        let book = &book;
        let created = with_retry("add_book", || async move {
            let mut tx = self.store.begin().await?;
            let created = tx.insert_book(book.clone()).await?;
            tx.commit().await?;
            Ok(created)
        })
        .await?;

        tracing::info!(book_id = %created.id, "book added");
        Ok(created)
    }

    /// Overwrites every field of a book, stock included.
    #[tracing::instrument(skip(self))]
    pub async fn update_book(
        &self,
        caller: &Caller,
        id: BookId,
        book: NewBook,
    ) -> Result<Book, DomainError> {
        caller.require_admin("update books")?;
        validate_book(&book)?;

        let book = &book;
        with_retry("update_book", || async move {
            let mut tx = self.store.begin().await?;
            tx.lock_books(&[id]).await?;
            let updated = tx
                .update_book(id, book.clone())
                .await?
                .ok_or(DomainError::BookNotFound(id))?;
            tx.commit().await?;
            Ok(updated)
        })
        .await
    }

    /// Removes a book that no order line references.
    #[tracing::instrument(skip(self))]
    pub async fn delete_book(&self, caller: &Caller, id: BookId) -> Result<(), DomainError> {
        caller.require_admin("delete books")?;

        with_retry("delete_book", || async move {
            let mut tx = self.store.begin().await?;
            if tx.book_in_use(id).await? {
                return Err(DomainError::BookInUse(id));
            }
            if !tx.delete_book(id).await? {
                return Err(DomainError::BookNotFound(id));
            }
            tx.commit().await?;
            Ok(())
        })
        .await?;

        tracing::info!(book_id = %id, "book deleted");
        Ok(())
    }
}

fn validate_book(book: &NewBook) -> Result<(), DomainError> {
    if book.title.trim().is_empty() {
        return Err(DomainError::InvalidBook("title must not be empty".into()));
    }
    if book.price.is_negative() {
        return Err(DomainError::InvalidBook(format!(
            "price must not be negative, got {}",
            book.price
        )));
    }
    if book.stock > MAX_STOCK {
        return Err(DomainError::InvalidBook(format!(
            "stock must be at most {MAX_STOCK}, got {}",
            book.stock
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{AdminId, CustomerId, InMemoryStore, LineItem, Money};

    use crate::order::{CreateOrder, DeleteOrder, OrderService, SubmitMode};

    fn admin() -> Caller {
        Caller::Admin(AdminId::new(1))
    }

    fn book(title: &str, stock: u32) -> NewBook {
        NewBook::new(title, "Ursula K. Le Guin", "Fantasy", Money::from_cents(899), stock)
    }

    #[tokio::test]
    async fn test_admin_manages_books() {
        let catalog = CatalogService::new(InMemoryStore::new());

        let created = catalog
            .add_book(&admin(), book("A Wizard of Earthsea", 3))
            .await
            .unwrap();
        assert_eq!(catalog.get_book(created.id).await.unwrap(), created);

        let updated = catalog
            .update_book(&admin(), created.id, book("The Tombs of Atuan", 7))
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.stock, 7);
        assert_eq!(catalog.list_books().await.unwrap(), vec![updated]);

        catalog.delete_book(&admin(), created.id).await.unwrap();
        assert!(matches!(
            catalog.get_book(created.id).await,
            Err(DomainError::BookNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_customers_cannot_change_the_catalog() {
        let catalog = CatalogService::new(InMemoryStore::new());
        let caller = Caller::Customer(CustomerId::new(1));

        assert!(matches!(
            catalog.add_book(&caller, book("Tehanu", 1)).await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(catalog.list_books().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_books_are_rejected() {
        let catalog = CatalogService::new(InMemoryStore::new());

        let mut negative = book("Tales from Earthsea", 1);
        negative.price = Money::from_cents(-1);

        assert!(matches!(
            catalog.add_book(&admin(), book("  ", 1)).await,
            Err(DomainError::InvalidBook(_))
        ));
        assert!(matches!(
            catalog.add_book(&admin(), negative).await,
            Err(DomainError::InvalidBook(_))
        ));
        assert!(matches!(
            catalog
                .add_book(&admin(), book("The Other Wind", MAX_STOCK + 1))
                .await,
            Err(DomainError::InvalidBook(_))
        ));
        assert!(catalog.list_books().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restock_to_limit_keeps_reservations_releasable() {
        let store = InMemoryStore::new();
        let catalog = CatalogService::new(store.clone());
        let orders = OrderService::new(store.clone());
        let customer = Caller::Customer(CustomerId::new(1));

        let created = catalog
            .add_book(&admin(), book("Lavinia", 5))
            .await
            .unwrap();
        let order = orders
            .create_order(
                &customer,
                CreateOrder::new(vec![LineItem::new(created.id, 5)], SubmitMode::Confirm),
            )
            .await
            .unwrap();

        catalog
            .update_book(&admin(), created.id, book("Lavinia", MAX_STOCK))
            .await
            .unwrap();
        orders
            .delete_order(&customer, DeleteOrder::new(order.id))
            .await
            .unwrap();

        assert_eq!(store.stock_of(created.id).await, Some(MAX_STOCK + 5));
    }

    #[tokio::test]
    async fn test_update_missing_book() {
        let catalog = CatalogService::new(InMemoryStore::new());

        let result = catalog
            .update_book(&admin(), BookId::new(5), book("The Other Wind", 1))
            .await;
        assert!(matches!(result, Err(DomainError::BookNotFound(_))));
    }

    #[tokio::test]
    async fn test_book_in_use_cannot_be_deleted() {
        let store = InMemoryStore::new();
        let catalog = CatalogService::new(store.clone());
        let orders = OrderService::new(store);

        let created = catalog
            .add_book(&admin(), book("The Farthest Shore", 2))
            .await
            .unwrap();
        orders
            .create_order(
                &Caller::Customer(CustomerId::new(1)),
                CreateOrder::new(vec![LineItem::new(created.id, 1)], SubmitMode::Save),
            )
            .await
            .unwrap();

        let result = catalog.delete_book(&admin(), created.id).await;
        assert!(matches!(result, Err(DomainError::BookInUse(id)) if id == created.id));
        assert!(catalog.get_book(created.id).await.is_ok());
    }
}
