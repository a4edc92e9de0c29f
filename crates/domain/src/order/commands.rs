//! Order commands.

use serde::{Deserialize, Serialize};
use store::{CustomerId, LineItem, OrderId, OrderStatus};

/// Whether a new order is only saved or confirmed straight away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitMode {
    #[default]
    Save,
    Confirm,
}

impl SubmitMode {
    /// The status the order is stored with.
    pub fn initial_status(&self) -> OrderStatus {
        match self {
            SubmitMode::Save => OrderStatus::Saved,
            SubmitMode::Confirm => OrderStatus::Confirmed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitMode::Save => "save",
            SubmitMode::Confirm => "confirm",
        }
    }
}

/// Command to create a new order.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    /// Owner of the order. Customers may omit it; admins must set it.
    pub customer_id: Option<CustomerId>,

    pub lines: Vec<LineItem>,

    pub mode: SubmitMode,
}

impl CreateOrder {
    /// Creates an order owned by the calling customer.
    pub fn new(lines: Vec<LineItem>, mode: SubmitMode) -> Self {
        Self {
            customer_id: None,
            lines,
            mode,
        }
    }

    /// Creates an order on behalf of a specific customer.
    pub fn for_customer(customer_id: CustomerId, lines: Vec<LineItem>, mode: SubmitMode) -> Self {
        Self {
            customer_id: Some(customer_id),
            lines,
            mode,
        }
    }
}

/// Command to confirm a saved order.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmOrder {
    pub order_id: OrderId,
}

impl ConfirmOrder {
    pub fn new(order_id: OrderId) -> Self {
        Self { order_id }
    }
}

/// Command to replace every line of a saved order.
#[derive(Debug, Clone)]
pub struct EditOrder {
    pub order_id: OrderId,
    pub lines: Vec<LineItem>,
}

impl EditOrder {
    pub fn new(order_id: OrderId, lines: Vec<LineItem>) -> Self {
        Self { order_id, lines }
    }
}

/// Command to delete an order, returning its stock if it was confirmed.
#[derive(Debug, Clone, Copy)]
pub struct DeleteOrder {
    pub order_id: OrderId,
}

impl DeleteOrder {
    pub fn new(order_id: OrderId) -> Self {
        Self { order_id }
    }
}
