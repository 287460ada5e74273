use crate::{db_types::Order, order_objects::CartItem, traits::StoreError};

/// Cart lines are order records in the `Pending` state. Every method here only ever touches the caller's own pending
/// lines.
#[allow(async_fn_in_trait)]
pub trait CartManagement {
    async fn cart_items(&self, user_id: &str) -> Result<Vec<CartItem>, StoreError>;

    /// Adds `quantity` units of the medicine to the cart. A repeat add accumulates onto the existing line; the price
    /// snapshot is only taken when the line is first created.
    ///
    /// Changing a line that is part of a payment session releases the whole session, so that a payment reserved for
    /// the old cart can never settle the new one. The same holds for `set_cart_quantity` and `remove_from_cart`.
    ///
    /// Returns the line and `true` if it was newly created.
    async fn add_to_cart(&self, user_id: &str, medicine_id: i64, quantity: i64) -> Result<(Order, bool), StoreError>;

    /// Sets the quantity of an existing line, checking it against current stock.
    async fn set_cart_quantity(&self, user_id: &str, medicine_id: i64, quantity: i64) -> Result<Order, StoreError>;

    /// Returns true if a line was removed.
    async fn remove_from_cart(&self, user_id: &str, medicine_id: i64) -> Result<bool, StoreError>;
}
