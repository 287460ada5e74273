//! Order settlement: turning cart lines into confirmed orders.
//!
//! There are two settlement paths with different atomicity.
//!
//! * **Cash on delivery** is all-or-nothing. Every line of the cart is decremented and confirmed in one transaction,
//!   or none is.
//! * **Online payment** is settled line by line once the gateway signature checks out. The customer has already
//!   paid, so a line that runs out of stock is cancelled on its own and the lines before it stay paid.
//!
//! Both paths re-check stock at write time through the ledger's conditional decrement, so concurrent checkouts can
//! never oversell. A unit of work that loses a write race ([`StoreError::StorageConflict`]) is retried a bounded
//! number of times.
use std::{fmt::Debug, future::Future, time::Duration};

use chrono::Utc;
use log::*;

use crate::{
    db_types::{Address, Order, OrderStatusType, PaymentMethod, PaymentStatusType, MAX_QUANTITY},
    order_objects::{DirectOrder, OrderQueryFilter, PaymentConfirmation, PaymentReservation},
    shop_api::{
        errors::SettlementError,
        payment_verifier::{PaymentSessionProvider, PaymentVerifier},
    },
    traits::{CartManagement, CatalogManagement, LineSettlement, SettlementDatabase, StoreError},
};

pub const DEFAULT_SETTLEMENT_RETRIES: u32 = 5;
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

pub struct SettlementApi<B, G> {
    db: B,
    verifier: PaymentVerifier<G>,
    max_retries: u32,
}

impl<B, G> Debug for SettlementApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi({:?}, retries: {})", self.verifier, self.max_retries)
    }
}

impl<B, G> SettlementApi<B, G> {
    pub fn new(db: B, verifier: PaymentVerifier<G>) -> Self {
        Self { db, verifier, max_retries: DEFAULT_SETTLEMENT_RETRIES }
    }

    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn verifier(&self) -> &PaymentVerifier<G> {
        &self.verifier
    }

    /// Runs a unit of work, retrying it from scratch after a storage conflict, with a linear back-off between
    /// attempts. Any other result is returned as is.
    async fn retry_on_conflict<T, F, Fut>(&self, label: &str, mut unit_of_work: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0;
        loop {
            match unit_of_work().await {
                Err(StoreError::StorageConflict(msg)) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!("💳️ {label} hit a storage conflict ({msg}). Retry {attempt} of {}", self.max_retries);
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                },
                result => return result,
            }
        }
    }
}

impl<B, G> SettlementApi<B, G>
where
    B: SettlementDatabase + CatalogManagement + CartManagement,
    G: PaymentSessionProvider,
{
    /// Confirms every cart line of the user as a cash-on-delivery order.
    ///
    /// Either every line is decremented and moved to `Processing` with the address attached, or, on any error, the
    /// cart and stock are left exactly as they were. Payment stays `Pending` until the cash is collected.
    pub async fn checkout_cash_on_delivery(
        &self,
        user_id: &str,
        address: &Address,
        prescription: Option<&str>,
    ) -> Result<Vec<Order>, SettlementError> {
        if !address.is_complete() {
            return Err(SettlementError::InvalidAddress);
        }
        let label = format!("COD checkout for {user_id}");
        let orders = self
            .retry_on_conflict(&label, || self.db.checkout_cod(user_id, address, prescription.map(String::from)))
            .await?;
        info!("💳️ {label} complete. {} orders confirmed", orders.len());
        Ok(orders)
    }

    /// Opens a gateway payment session for the whole cart and stamps exactly the lines that were charged with its id.
    /// If the cart changes before the lines are stamped, nothing is stamped and [`SettlementError::CartChanged`] is
    /// returned.
    pub async fn reserve_payment(&self, user_id: &str) -> Result<PaymentReservation, SettlementError> {
        if !self.verifier.is_available() {
            return Err(SettlementError::GatewayUnavailable);
        }
        let lines = self.db.find_pending(user_id).await?;
        if lines.is_empty() {
            return Err(SettlementError::EmptyCart);
        }
        for line in &lines {
            if self.db.fetch_medicine(line.medicine_id).await?.is_none() {
                return Err(SettlementError::MedicineNotFound(line.medicine_id));
            }
        }
        let amount = Order::sum_totals(&lines)
            .ok_or_else(|| SettlementError::ValidationError(format!("The cart total for {user_id} is too large")))?;
        let receipt = format!("receipt_{user_id}_{}", Utc::now().timestamp_millis());
        let session = self.verifier.create_session(amount, &receipt).await?;
        let stamped = self.db.stamp_payment_session(user_id, &session.session_id, &lines).await?;
        info!("💳️ Payment session {} reserved for {user_id}: {amount} over {stamped} lines", session.session_id);
        Ok(PaymentReservation { session_id: session.session_id, amount: session.amount, currency: session.currency })
    }

    /// Settles the lines of a payment session after checking the gateway signature.
    ///
    /// A bad signature cancels every pending line of the session and fails with
    /// [`SettlementError::InvalidSignature`]. Otherwise each line is settled in its own transaction. The first line
    /// that cannot be filled is cancelled and processing stops with [`SettlementError::LineCancelled`], which names the
    /// cancelled order and the orders paid before it. Those stay paid.
    ///
    /// Confirming the same session twice is harmless: the second call finds no pending lines and settles nothing. A
    /// session with no pending lines that never paid or failed a line was released by a cart edit, and fails with
    /// [`SettlementError::SessionReleased`].
    pub async fn confirm_payment(
        &self,
        user_id: &str,
        confirmation: PaymentConfirmation,
    ) -> Result<Vec<Order>, SettlementError> {
        let PaymentConfirmation { session_id, transaction_id, signature, address } = confirmation;
        if !address.is_complete() {
            return Err(SettlementError::InvalidAddress);
        }
        if !self.verifier.verify(&session_id, &transaction_id, &signature)? {
            let failed = self.db.fail_payment_session(user_id, &session_id).await?;
            warn!("💳️ Invalid signature for session {session_id} of {user_id}. {failed} lines cancelled");
            return Err(SettlementError::InvalidSignature);
        }
        let lines = self.db.find_by_payment_session(user_id, &session_id, OrderStatusType::Pending).await?;
        if lines.is_empty() {
            let query = OrderQueryFilter::default().with_user_id(user_id).with_payment_session(session_id.as_str());
            let resolved = self
                .db
                .search_orders(query)
                .await?
                .iter()
                .any(|o| matches!(o.payment_status, PaymentStatusType::Paid | PaymentStatusType::Failed));
            if !resolved {
                warn!("💳️ Payment session {session_id} of {user_id} was released before it was confirmed");
                return Err(SettlementError::SessionReleased(session_id));
            }
            info!("💳️ Payment session {session_id} of {user_id} has no pending lines. Nothing to settle");
            return Ok(Vec::new());
        }
        let mut settled = Vec::with_capacity(lines.len());
        for line in lines {
            let label = format!("Settlement of order #{}", line.id);
            let result = self
                .retry_on_conflict(&label, || {
                    self.db.settle_online_line(line.id, &session_id, &transaction_id, &address)
                })
                .await?;
            match result {
                LineSettlement::Settled(order) => {
                    debug!("💳️ Order #{} paid with transaction {transaction_id}", order.id);
                    settled.push(order);
                },
                LineSettlement::Skipped => {
                    debug!("💳️ Order #{} was settled elsewhere. Skipped", line.id);
                },
                LineSettlement::InsufficientStock { order, name, remaining } => {
                    warn!(
                        "💳️ Order #{} cancelled. Not enough {name} ({remaining} left). {} lines of session {session_id} \
                         were settled before it",
                        order.id,
                        settled.len()
                    );
                    let cause = SettlementError::InsufficientStock { medicine: name, remaining };
                    return Err(line_cancelled(&order, cause, &settled));
                },
                LineSettlement::MedicineNotFound(order) => {
                    warn!("💳️ Order #{} cancelled. Medicine #{} no longer exists", order.id, order.medicine_id);
                    let cause = SettlementError::MedicineNotFound(order.medicine_id);
                    return Err(line_cancelled(&order, cause, &settled));
                },
            }
        }
        info!("💳️ Payment session {session_id} of {user_id} settled. {} orders paid", settled.len());
        Ok(settled)
    }

    /// "Buy now" for a single item.
    ///
    /// A cash-on-delivery order is created, decremented and confirmed in one transaction. An online order is placed in
    /// the cart instead, to be paid for through [`Self::reserve_payment`] and [`Self::confirm_payment`].
    pub async fn place_direct_order(&self, user_id: &str, order: DirectOrder) -> Result<Order, SettlementError> {
        if !(1..=MAX_QUANTITY).contains(&order.quantity) {
            return Err(SettlementError::InvalidQuantity(order.quantity));
        }
        if order.payment_method == PaymentMethod::Online {
            let (line, _) = self.db.add_to_cart(user_id, order.medicine_id, order.quantity).await?;
            debug!("💳️ Online direct order from {user_id} added to the cart as line #{}", line.id);
            return Ok(line);
        }
        if !order.address.is_complete() {
            return Err(SettlementError::InvalidAddress);
        }
        let DirectOrder { medicine_id, quantity, address, prescription, .. } = order;
        let label = format!("Direct order from {user_id}");
        let order = self
            .retry_on_conflict(&label, || {
                self.db.place_direct_order(user_id, medicine_id, quantity, &address, prescription.clone())
            })
            .await?;
        Ok(order)
    }

    /// Admin: moves a settled order along `Processing -> Shipped -> Delivered`, or cancels it from `Processing`.
    pub async fn update_order_status(
        &self,
        order_id: i64,
        new_status: OrderStatusType,
    ) -> Result<Order, SettlementError> {
        let label = format!("Status change of order #{order_id}");
        let order = self.retry_on_conflict(&label, || self.db.update_order_status(order_id, new_status)).await?;
        Ok(order)
    }

    /// Admin: every order matching the filter, newest first.
    pub async fn all_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, SettlementError> {
        trace!("💳️ Fetching orders. {query}");
        let orders = self.db.search_orders(query).await?;
        Ok(orders)
    }
}

fn line_cancelled(order: &Order, cause: SettlementError, settled: &[Order]) -> SettlementError {
    let settled = settled.iter().map(|o| o.id).collect();
    SettlementError::LineCancelled { order_id: order.id, cause: Box::new(cause), settled }
}
