//! Domain error types.

use store::{BookId, OrderId, StoreError};
use thiserror::Error;

use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A reservation asked for more copies than a book has in stock.
    #[error(
        "Insufficient stock for book {book_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        book_id: BookId,
        requested: u64,
        available: u32,
    },

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Book not found: {0}")]
    BookNotFound(BookId),

    /// The caller is authenticated but may not perform the action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Authentication required")]
    Unauthenticated,

    /// The book is referenced by at least one order line.
    #[error("Book {0} is referenced by existing orders")]
    BookInUse(BookId),

    #[error("Invalid book: {0}")]
    InvalidBook(String),

    /// An error occurred in the order aggregate.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DomainError {
    /// Returns true if the operation may succeed when run again in a new
    /// transaction.
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::Store(e) if e.is_transient())
    }

    pub(crate) fn forbidden(action: &str, order_id: OrderId) -> Self {
        DomainError::Forbidden(format!("caller may not {action} order {order_id}"))
    }
}
