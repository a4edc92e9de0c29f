//! Shared types for the bookstore ordering service.

mod status;
mod types;

pub use status::{OrderStatus, ParseStatusError};
pub use types::{AdminId, BookId, CustomerId, Money, OrderId, OrderItemId};
