//! Order aggregate and related types.

mod aggregate;
mod commands;
mod service;
mod value_objects;

pub use aggregate::Order;
pub use commands::{ConfirmOrder, CreateOrder, DeleteOrder, EditOrder, SubmitMode};
pub use service::OrderService;
pub use value_objects::{OrderDetails, OrderLineDetails, OrderSummary};

use store::{BookId, OrderStatus};
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// An admin created an order without naming its owner.
    #[error("Customer ID is required")]
    CustomerIdRequired,

    /// Order is not in a status that allows the action.
    #[error("Order is {status} and cannot be {action}")]
    NotEditable {
        status: OrderStatus,
        action: &'static str,
    },

    /// Invalid quantity.
    #[error("Invalid quantity for book {book_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { book_id: BookId, quantity: u32 },

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// A line or order total does not fit in a money amount.
    #[error("Order total is out of range")]
    TotalOutOfRange,
}
