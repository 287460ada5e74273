use std::fmt::Display;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db_types::{
    Address,
    Medicine,
    Money,
    Order,
    OrderStatusType,
    PaymentMethod,
    PaymentStatusType,
};

pub const MEDICINES_PER_PAGE: i64 = 8;

//--------------------------------------   OrderQueryFilter    ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub user_id: Option<String>,
    pub medicine_id: Option<i64>,
    pub status: Option<Vec<OrderStatusType>>,
    pub payment_status: Option<PaymentStatusType>,
    pub payment_session: Option<String>,
}

impl OrderQueryFilter {
    pub fn with_user_id(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_payment_status(mut self, status: PaymentStatusType) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn with_payment_session(mut self, session_id: &str) -> Self {
        self.payment_session = Some(session_id.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() &&
            self.medicine_id.is_none() &&
            self.status.is_none() &&
            self.payment_status.is_none() &&
            self.payment_session.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "No filters.")?;
            return Ok(());
        }
        if let Some(user_id) = &self.user_id {
            write!(f, "user_id: {user_id}. ")?;
        }
        if let Some(medicine_id) = &self.medicine_id {
            write!(f, "medicine_id: {medicine_id}. ")?;
        }
        if let Some(statuses) = &self.status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        if let Some(status) = &self.payment_status {
            write!(f, "payment_status: {status}. ")?;
        }
        if let Some(session) = &self.payment_session {
            write!(f, "payment_session: {session}. ")?;
        }
        Ok(())
    }
}

//--------------------------------------    OrderTransition    ---------------------------------------------------------
/// A partial update of an order record. Only the fields that are set are written.
///
/// The line's identity (`user_id`, `medicine_id`), its `quantity` and its `price_at_order` cannot be changed through a
/// transition.
#[derive(Debug, Clone, Default)]
pub struct OrderTransition {
    pub order_status: Option<OrderStatusType>,
    pub payment_status: Option<PaymentStatusType>,
    pub payment_method: Option<PaymentMethod>,
    pub address: Option<Address>,
    pub prescription: Option<String>,
    pub payment_session: Option<String>,
    pub transaction_id: Option<String>,
}

impl OrderTransition {
    pub fn with_order_status(mut self, status: OrderStatusType) -> Self {
        self.order_status = Some(status);
        self
    }

    pub fn with_payment_status(mut self, status: PaymentStatusType) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_prescription(mut self, prescription: Option<String>) -> Self {
        self.prescription = prescription;
        self
    }

    pub fn with_payment_session(mut self, session_id: &str) -> Self {
        self.payment_session = Some(session_id.to_string());
        self
    }

    pub fn with_transaction_id(mut self, transaction_id: &str) -> Self {
        self.transaction_id = Some(transaction_id.to_string());
        self
    }

    /// A cash-on-delivery confirmation. Payment stays `Pending` until the cash is collected.
    pub fn cod_confirmed(address: &Address, prescription: Option<&str>) -> Self {
        Self::default()
            .with_order_status(OrderStatusType::Processing)
            .with_payment_method(PaymentMethod::Cod)
            .with_address(address.clone())
            .with_prescription(prescription.map(String::from))
    }

    pub fn online_paid(address: &Address, transaction_id: &str) -> Self {
        Self::default()
            .with_order_status(OrderStatusType::Processing)
            .with_payment_status(PaymentStatusType::Paid)
            .with_payment_method(PaymentMethod::Online)
            .with_address(address.clone())
            .with_transaction_id(transaction_id)
    }

    pub fn payment_failed() -> Self {
        Self::default()
            .with_order_status(OrderStatusType::Cancelled)
            .with_payment_status(PaymentStatusType::Failed)
    }

    pub fn is_empty(&self) -> bool {
        self.order_status.is_none() &&
            self.payment_status.is_none() &&
            self.payment_method.is_none() &&
            self.address.is_none() &&
            self.prescription.is_none() &&
            self.payment_session.is_none() &&
            self.transaction_id.is_none()
    }
}

//--------------------------------------        Cart           ---------------------------------------------------------
/// A pending order line joined with its catalog item. The catalog fields are `None` if the item has since been
/// deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CartItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    pub medicine_name: Option<String>,
    pub unit_price: Option<Money>,
    pub image: Option<String>,
    pub stock: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    /// Sum of `price_at_order * quantity` over all lines
    pub total: Money,
}

impl CartView {
    /// Returns `None` if the cart total does not fit in a `Money`.
    pub fn new(items: Vec<CartItem>) -> Option<Self> {
        let total = Order::sum_totals(items.iter().map(|i| &i.order))?;
        Some(Self { items, total })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

//--------------------------------------       Catalog         ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicineQuery {
    pub search: Option<String>,
    pub page: Option<i64>,
}

impl MedicineQuery {
    pub fn with_search(mut self, search: &str) -> Self {
        self.search = Some(search.to_string());
        self
    }

    pub fn with_page(mut self, page: i64) -> Self {
        self.page = Some(page);
        self
    }

    /// The requested page, clamped to 1 or more.
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicinePage {
    pub medicines: Vec<Medicine>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

impl MedicinePage {
    pub fn new(medicines: Vec<Medicine>, total: i64, current_page: i64) -> Self {
        let total_pages = (total + MEDICINES_PER_PAGE - 1) / MEDICINES_PER_PAGE;
        Self { medicines, total, total_pages, current_page }
    }
}

//--------------------------------------      Settlement       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReservation {
    pub session_id: String,
    /// The amount to be collected, in minor currency units
    pub amount: Money,
    pub currency: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    pub session_id: String,
    pub transaction_id: String,
    pub signature: String,
    #[serde(default)]
    pub address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectOrder {
    pub medicine_id: i64,
    pub quantity: i64,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub prescription: Option<String>,
}
