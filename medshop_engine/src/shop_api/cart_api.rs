use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Order, MAX_QUANTITY},
    order_objects::CartView,
    traits::{CartManagement, StoreError},
};

/// `CartApi` reads and writes a user's pending order lines.
pub struct CartApi<B> {
    db: B,
}

impl<B> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi")
    }
}

impl<B> CartApi<B>
where B: CartManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn cart(&self, user_id: &str) -> Result<CartView, StoreError> {
        let items = self.db.cart_items(user_id).await?;
        let cart = CartView::new(items)
            .ok_or_else(|| StoreError::ValidationError(format!("The cart total for {user_id} is too large")))?;
        trace!("🛒️ Cart for {user_id} has {} lines totalling {}", cart.items.len(), cart.total);
        Ok(cart)
    }

    /// Adds `quantity` units of a medicine to the user's cart. Returns the cart line, and whether it was newly created
    /// (as opposed to accumulated onto an existing line).
    pub async fn add_to_cart(&self, user_id: &str, medicine_id: i64, quantity: i64) -> Result<(Order, bool), StoreError> {
        if !(1..=MAX_QUANTITY).contains(&quantity) {
            return Err(StoreError::InvalidQuantity(quantity));
        }
        let (order, created) = self.db.add_to_cart(user_id, medicine_id, quantity).await?;
        let verb = if created { "added to" } else { "updated in" };
        debug!("🛒️ Medicine #{medicine_id} {verb} cart of {user_id}. Quantity is now {}", order.quantity);
        Ok((order, created))
    }

    pub async fn update_quantity(&self, user_id: &str, medicine_id: i64, quantity: i64) -> Result<Order, StoreError> {
        if !(1..=MAX_QUANTITY).contains(&quantity) {
            return Err(StoreError::InvalidQuantity(quantity));
        }
        let order = self.db.set_cart_quantity(user_id, medicine_id, quantity).await?;
        debug!("🛒️ Quantity of medicine #{medicine_id} in cart of {user_id} set to {quantity}");
        Ok(order)
    }

    pub async fn remove_from_cart(&self, user_id: &str, medicine_id: i64) -> Result<(), StoreError> {
        if self.db.remove_from_cart(user_id, medicine_id).await? {
            debug!("🛒️ Medicine #{medicine_id} removed from cart of {user_id}");
            Ok(())
        } else {
            Err(StoreError::CartItemNotFound(medicine_id))
        }
    }
}
