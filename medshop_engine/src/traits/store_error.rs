use thiserror::Error;

use crate::db_types::OrderStatusType;

/// SQLite result codes that mean another connection holds the write lock: `SQLITE_BUSY`, `SQLITE_LOCKED` and their
/// extended variants.
const CONFLICT_CODES: [&str; 7] = ["5", "6", "261", "262", "517", "773", "SQLITE_BUSY"];

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The database is busy. Please retry. {0}")]
    StorageConflict(String),
    #[error("Medicine {0} does not exist")]
    MedicineNotFound(i64),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Medicine {0} is not in the cart")]
    CartItemNotFound(i64),
    #[error("Insufficient stock for {name}. Only {remaining} left.")]
    InsufficientStock { medicine_id: i64, name: String, remaining: i64 },
    #[error("The cart is empty")]
    EmptyCart,
    #[error("The cart changed while the payment was being prepared. Please try again.")]
    CartChanged,
    #[error("Quantity must be a positive whole number, got {0}")]
    InvalidQuantity(i64),
    #[error("Cannot move an order from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("Invalid request: {0}")]
    ValidationError(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::StorageConflict(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db_err) => {
                let busy = db_err.code().map(|c| CONFLICT_CODES.iter().any(|code| *code == c)).unwrap_or(false) ||
                    db_err.message().contains("database is locked");
                if busy {
                    StoreError::StorageConflict(db_err.message().to_string())
                } else {
                    StoreError::DatabaseError(e.to_string())
                }
            },
            _ => StoreError::DatabaseError(e.to_string()),
        }
    }
}
