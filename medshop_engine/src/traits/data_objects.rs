use serde::{Deserialize, Serialize};

use crate::db_types::Order;

/// The outcome of a conditional stock decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecrementResult {
    /// Stock was decremented. Holds the remaining stock.
    Decremented(i64),
    /// The item has fewer units than requested. Nothing was changed.
    InsufficientStock { name: String, remaining: i64 },
    NotFound,
}

/// The outcome of settling a single online-payment line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LineSettlement {
    /// Stock was committed and the line is now `Processing` / `Paid`.
    Settled(Order),
    /// The line is no longer a pending line of this payment session (e.g. a concurrent confirm got there first).
    Skipped,
    /// There was not enough stock. The line has been marked `Cancelled` / `Failed`.
    InsufficientStock { order: Order, name: String, remaining: i64 },
    /// The catalog item no longer exists. The line has been marked `Cancelled` / `Failed`.
    MedicineNotFound(Order),
}
