use std::fmt::Debug;

use crate::{
    db_types::Order,
    order_objects::OrderQueryFilter,
    traits::{OrderManagement, StoreError},
};

/// `OrderApi` answers order history queries.
pub struct OrderApi<B> {
    db: B,
}

impl<B> Debug for OrderApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderApi")
    }
}

impl<B> OrderApi<B>
where B: OrderManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn order(&self, id: i64) -> Result<Order, StoreError> {
        self.db.fetch_order(id).await?.ok_or(StoreError::OrderNotFound(id))
    }

    /// Every order record of the user, including current cart lines, newest first.
    pub async fn orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, StoreError> {
        self.db.fetch_orders_for_user(user_id).await
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StoreError> {
        self.db.search_orders(query).await
    }
}
