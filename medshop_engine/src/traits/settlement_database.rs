use crate::{
    db_types::{Address, Order, OrderStatusType},
    traits::{CartManagement, CatalogManagement, LineSettlement, OrderManagement, StoreError},
};

/// The atomic units of work behind order settlement.
///
/// Each method runs in its own database transaction. When one returns an error, none of its writes persist.
/// [`StoreError::StorageConflict`] means the transaction lost a write race and can be retried as a whole.
#[allow(async_fn_in_trait)]
pub trait SettlementDatabase: Clone + OrderManagement {
    /// Converts every cart line of the user into a cash-on-delivery order.
    ///
    /// For each line, the stock is decremented and the line moves to `Processing` with the address attached. If any
    /// line is short of stock ([`StoreError::InsufficientStock`]) or refers to a deleted medicine
    /// ([`StoreError::MedicineNotFound`]), the whole transaction is rolled back. An empty cart gives
    /// [`StoreError::EmptyCart`].
    async fn checkout_cod(
        &self,
        user_id: &str,
        address: &Address,
        prescription: Option<String>,
    ) -> Result<Vec<Order>, StoreError>;

    /// Settles one line of a verified online payment.
    ///
    /// The line is re-read inside the transaction. If it is no longer a pending line of `session_id`, nothing
    /// happens. When stock is short, or the medicine is gone, the line is marked `Cancelled` / `Failed` and the
    /// change is committed.
    async fn settle_online_line(
        &self,
        order_id: i64,
        session_id: &str,
        transaction_id: &str,
        address: &Address,
    ) -> Result<LineSettlement, StoreError>;

    /// Marks every pending line of the payment session as `Cancelled` / `Failed`. Returns the number of lines changed.
    async fn fail_payment_session(&self, user_id: &str, session_id: &str) -> Result<u64, StoreError>;

    /// Creates a settled cash-on-delivery order for a single item, bypassing the cart.
    async fn place_direct_order(
        &self,
        user_id: &str,
        medicine_id: i64,
        quantity: i64,
        address: &Address,
        prescription: Option<String>,
    ) -> Result<Order, StoreError>;

    /// Moves a settled order to `new_status`.
    ///
    /// Delivering a COD order marks it `Paid`. Cancelling an order returns its quantity to stock.
    async fn update_order_status(&self, order_id: i64, new_status: OrderStatusType) -> Result<Order, StoreError>;
}

/// Everything the settlement API needs from a backend, as a single bound.
pub trait ShopDatabase: SettlementDatabase + CatalogManagement + CartManagement {}

impl<T> ShopDatabase for T where T: SettlementDatabase + CatalogManagement + CartManagement {}
