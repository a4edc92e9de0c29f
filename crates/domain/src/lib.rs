//! Domain layer for the bookstore ordering service.
//!
//! This crate provides:
//! - the inventory ledger, the only code that changes book stock
//! - the order aggregate and its Saved → Confirmed state machine
//! - the order workflow service, which runs each operation in one store
//!   transaction
//! - catalog management and revenue reports for administrators

pub mod auth;
pub mod catalog;
pub mod error;
pub mod inventory;
pub mod order;
pub mod reports;
pub mod retry;

pub use auth::{Caller, authorize};
pub use catalog::{CatalogService, MAX_STOCK};
pub use error::DomainError;
pub use inventory::InventoryLedger;
pub use order::{
    ConfirmOrder, CreateOrder, DeleteOrder, EditOrder, Order, OrderDetails, OrderError,
    OrderLineDetails, OrderService, OrderSummary, SubmitMode,
};
pub use reports::{ReportService, RevenueReport};
pub use retry::MAX_ATTEMPTS;
