//! Caller identity and the ownership check shared by every order operation.

use serde::{Deserialize, Serialize};
use store::{AdminId, CustomerId};

use crate::error::DomainError;
use crate::order::Order;

/// The identity a request was made under, resolved by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Caller {
    #[default]
    Anonymous,
    Customer(CustomerId),
    Admin(AdminId),
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        matches!(self, Caller::Admin(_))
    }

    /// Returns the customer id for customer callers.
    pub fn customer_id(&self) -> Option<CustomerId> {
        match self {
            Caller::Customer(id) => Some(*id),
            _ => None,
        }
    }

    /// Fails with [`DomainError::Unauthenticated`] for anonymous callers.
    pub fn require_authenticated(&self) -> Result<(), DomainError> {
        match self {
            Caller::Anonymous => Err(DomainError::Unauthenticated),
            _ => Ok(()),
        }
    }

    /// Fails unless the caller holds the administrative role.
    pub fn require_admin(&self, action: &str) -> Result<(), DomainError> {
        match self {
            Caller::Admin(_) => Ok(()),
            Caller::Anonymous => Err(DomainError::Unauthenticated),
            Caller::Customer(_) => Err(DomainError::Forbidden(format!(
                "only administrators may {action}"
            ))),
        }
    }
}

/// Returns true if the caller owns the order or is an administrator.
pub fn authorize(caller: &Caller, order: &Order) -> bool {
    match caller {
        Caller::Admin(_) => true,
        Caller::Customer(id) => *id == order.customer_id(),
        Caller::Anonymous => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use store::{BookId, LineItem, OrderStatus};

    fn order_owned_by(customer: i64) -> Order {
        Order::new(
            CustomerId::new(customer),
            Utc::now(),
            OrderStatus::Saved,
            vec![LineItem::new(BookId::new(1), 1)],
        )
        .unwrap()
    }

    #[test]
    fn test_owner_and_admin_are_authorized() {
        let order = order_owned_by(1);

        assert!(authorize(&Caller::Customer(CustomerId::new(1)), &order));
        assert!(authorize(&Caller::Admin(AdminId::new(9)), &order));
    }

    #[test]
    fn test_other_customers_and_anonymous_are_not() {
        let order = order_owned_by(1);

        assert!(!authorize(&Caller::Customer(CustomerId::new(2)), &order));
        assert!(!authorize(&Caller::Anonymous, &order));
    }

    #[test]
    fn test_require_admin() {
        assert!(Caller::Admin(AdminId::new(1)).require_admin("add books").is_ok());
        assert!(matches!(
            Caller::Customer(CustomerId::new(1)).require_admin("add books"),
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            Caller::Anonymous.require_admin("add books"),
            Err(DomainError::Unauthenticated)
        ));
    }

    #[test]
    fn test_caller_serialization() {
        let json = serde_json::to_string(&Caller::Customer(CustomerId::new(4))).unwrap();
        assert_eq!(json, r#"{"role":"customer","id":4}"#);
    }
}
