use thiserror::Error;

use crate::{db_types::OrderStatusType, traits::StoreError};

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("A complete delivery address (street, city, postal code and phone) is required")]
    InvalidAddress,
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Medicine {0} does not exist")]
    MedicineNotFound(i64),
    #[error("Insufficient stock for {medicine}. Only {remaining} left.")]
    InsufficientStock { medicine: String, remaining: i64 },
    /// An online line that could not be filled after payment. `cause` is [`SettlementError::InsufficientStock`] or
    /// [`SettlementError::MedicineNotFound`], and `settled` lists the orders of the same session paid before it.
    #[error("Order {order_id} was cancelled. Orders already paid: {}. {cause}", id_list(.settled))]
    LineCancelled { order_id: i64, cause: Box<SettlementError>, settled: Vec<i64> },
    #[error("The cart changed while the payment was being prepared. Please try again.")]
    CartChanged,
    #[error("Payment session {0} has nothing to settle. The cart was changed after the payment was started.")]
    SessionReleased(String),
    #[error("Payment verification failed. The signature does not match.")]
    InvalidSignature,
    #[error("Online payments are not available")]
    GatewayUnavailable,
    #[error("The payment gateway returned an error. {0}")]
    GatewayError(String),
    #[error("The order could not be saved because of a concurrent update. Please retry. {0}")]
    StorageConflict(String),
    #[error("Quantity must be a positive whole number, got {0}")]
    InvalidQuantity(i64),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Cannot move an order from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("Invalid request: {0}")]
    ValidationError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StoreError> for SettlementError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DatabaseError(s) => Self::DatabaseError(s),
            StoreError::StorageConflict(s) => Self::StorageConflict(s),
            StoreError::MedicineNotFound(id) => Self::MedicineNotFound(id),
            StoreError::OrderNotFound(id) => Self::OrderNotFound(id),
            StoreError::CartItemNotFound(id) => Self::ValidationError(format!("Medicine {id} is not in the cart")),
            StoreError::InsufficientStock { name, remaining, .. } => Self::InsufficientStock { medicine: name, remaining },
            StoreError::CartChanged => Self::CartChanged,
            StoreError::EmptyCart => Self::EmptyCart,
            StoreError::InvalidQuantity(q) => Self::InvalidQuantity(q),
            StoreError::InvalidStatusTransition { from, to } => Self::InvalidStatusTransition { from, to },
            StoreError::ValidationError(s) => Self::ValidationError(s),
        }
    }
}

fn id_list(ids: &[i64]) -> String {
    if ids.is_empty() {
        return "none".to_string();
    }
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}
