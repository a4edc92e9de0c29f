//! Relational storage for the bookstore ordering service.
//!
//! The [`Store`] trait opens [`Transaction`]s; every read and write the
//! order workflow performs goes through one. Two backends are provided:
//! [`InMemoryStore`] for tests and local runs, and [`PostgresStore`].

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod records;
pub mod store;

pub use common::{AdminId, BookId, CustomerId, Money, OrderId, OrderItemId, OrderStatus};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::OrderQuery;
pub use records::{Book, LineItem, NewBook, NewOrder, OrderItemRecord, OrderRecord};
pub use store::{Store, StoreExt, Transaction};
