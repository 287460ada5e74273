use crate::{
    db_types::{Order, OrderStatusType},
    order_objects::{OrderQueryFilter, OrderTransition},
    traits::StoreError,
};

/// Read access and partial updates for order records.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, StoreError>;

    /// All records (cart lines included) belonging to the user, newest first.
    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, StoreError>;

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StoreError>;

    /// The user's cart lines.
    async fn find_pending(&self, user_id: &str) -> Result<Vec<Order>, StoreError>;

    async fn find_by_payment_session(
        &self,
        user_id: &str,
        session_id: &str,
        status: OrderStatusType,
    ) -> Result<Vec<Order>, StoreError>;

    /// Writes the fields set in `transition` and leaves the others untouched.
    ///
    /// Returns [`StoreError::OrderNotFound`] if there is no such order.
    async fn transition(&self, order_id: i64, transition: OrderTransition) -> Result<Order, StoreError>;

    /// Attaches the payment session to exactly the given cart lines, all or none. Each line must still be pending with
    /// the quantity it carries in `lines`, otherwise nothing is stamped and [`StoreError::CartChanged`] is returned.
    async fn stamp_payment_session(&self, user_id: &str, session_id: &str, lines: &[Order]) -> Result<u64, StoreError>;
}
