use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
pub use medshop_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

/// Largest unit price the catalog accepts, in minor units.
pub const MAX_UNIT_PRICE: i64 = 10_000_000_000;
/// Upper bound on stock levels, stock adjustments and line quantities.
pub const MAX_QUANTITY: i64 = 1_000_000;

//--------------------------------------        Role           ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "USER"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USER" => Ok(Self::User),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The fulfilment axis of an order record. A record in the `Pending` state is a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The record is an unsettled cart line.
    Pending,
    /// Stock has been committed to the order and it is waiting to be shipped.
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatusType {
    /// Whether an administrator may move a settled order from this status to `next`.
    ///
    /// `Processing -> Shipped -> Delivered`, and `Processing -> Cancelled`.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!((self, next), (Processing, Shipped) | (Shipped, Delivered) | (Processing, Cancelled))
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Processing => write!(f, "Processing"),
            OrderStatusType::Shipped => write!(f, "Shipped"),
            OrderStatusType::Delivered => write!(f, "Delivered"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------  PaymentStatusType    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatusType {
    Pending,
    Paid,
    Failed,
}

impl Display for PaymentStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatusType::Pending => write!(f, "Pending"),
            PaymentStatusType::Paid => write!(f, "Paid"),
            PaymentStatusType::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for PaymentStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------    PaymentMethod      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    /// Cash on delivery
    #[default]
    Cod,
    Online,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cod => write!(f, "COD"),
            PaymentMethod::Online => write!(f, "ONLINE"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "COD" => Ok(Self::Cod),
            "ONLINE" => Ok(Self::Online),
            _ => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

//--------------------------------------      OrderState       ---------------------------------------------------------
/// The two independent status axes of an order record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderState {
    pub order_status: OrderStatusType,
    pub payment_status: PaymentStatusType,
}

impl OrderState {
    pub fn new(order_status: OrderStatusType, payment_status: PaymentStatusType) -> Self {
        Self { order_status, payment_status }
    }
}

impl Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.order_status, self.payment_status)
    }
}

//--------------------------------------        Address        ---------------------------------------------------------
/// A delivery address. Missing fields deserialize as empty strings and make the address incomplete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub phone: String,
}

impl Address {
    pub fn new<S: Into<String>>(street: S, city: S, postal_code: S, phone: S) -> Self {
        Self { street: street.into(), city: city.into(), postal_code: postal_code.into(), phone: phone.into() }
    }

    /// All four fields must be present and non-blank.
    pub fn is_complete(&self) -> bool {
        [&self.street, &self.city, &self.postal_code, &self.phone].iter().all(|f| !f.trim().is_empty())
    }
}

//--------------------------------------       Medicine        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Medicine {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: i64,
    pub category: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      NewMedicine      ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMedicine {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price in minor currency units
    pub price: Money,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl NewMedicine {
    pub fn new(name: &str, price: Money, stock: i64) -> Self {
        Self { name: name.to_string(), price, stock, ..Default::default() }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Medicine name is required".to_string());
        }
        if !self.price.is_positive() {
            return Err("Price must be positive".to_string());
        }
        if self.price > Money::from(MAX_UNIT_PRICE) {
            return Err(format!("Price cannot exceed {}", Money::from(MAX_UNIT_PRICE)));
        }
        if !(0..=MAX_QUANTITY).contains(&self.stock) {
            return Err(format!("Stock must be between 0 and {MAX_QUANTITY}"));
        }
        Ok(())
    }
}

//--------------------------------------    MedicineUpdate     ---------------------------------------------------------
/// A partial update to a catalog item. Stock is never overwritten; `stock_adjustment` is applied as a delta.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicineUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub stock_adjustment: Option<i64>,
}

impl MedicineUpdate {
    pub fn with_price(mut self, price: Money) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_stock_adjustment(mut self, delta: i64) -> Self {
        self.stock_adjustment = Some(delta);
        self
    }

    /// True if none of the catalog columns change. A stock adjustment on its own still counts as empty here.
    pub fn has_no_field_changes(&self) -> bool {
        self.name.is_none() &&
            self.description.is_none() &&
            self.price.is_none() &&
            self.category.is_none() &&
            self.image.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.has_no_field_changes() && self.stock_adjustment.is_none()
    }

    pub fn validate(&self) -> Result<(), String> {
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            return Err("Medicine name cannot be blank".to_string());
        }
        if matches!(self.price, Some(p) if !p.is_positive()) {
            return Err("Price must be positive".to_string());
        }
        if matches!(self.price, Some(p) if p > Money::from(MAX_UNIT_PRICE)) {
            return Err(format!("Price cannot exceed {}", Money::from(MAX_UNIT_PRICE)));
        }
        if matches!(self.stock_adjustment, Some(d) if d.unsigned_abs() > MAX_QUANTITY.unsigned_abs()) {
            return Err(format!("Stock adjustments are limited to {MAX_QUANTITY} units"));
        }
        Ok(())
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
/// An order record. While `order_status` is `Pending` the record is a cart line.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: String,
    pub medicine_id: i64,
    pub quantity: i64,
    /// Unit price captured when the line was created. Never rewritten.
    pub price_at_order: Money,
    pub payment_method: PaymentMethod,
    pub order_status: OrderStatusType,
    pub payment_status: PaymentStatusType,
    pub payment_session: Option<String>,
    pub transaction_id: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub prescription: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn state(&self) -> OrderState {
        OrderState::new(self.order_status, self.payment_status)
    }

    pub fn is_pending(&self) -> bool {
        self.order_status == OrderStatusType::Pending
    }

    /// `None` if the line total does not fit in a `Money`.
    pub fn line_total(&self) -> Option<Money> {
        self.price_at_order.checked_mul(self.quantity)
    }

    /// The combined total of several lines, or `None` if it does not fit in a `Money`.
    pub fn sum_totals<'a, I: IntoIterator<Item = &'a Order>>(lines: I) -> Option<Money> {
        let totals = lines.into_iter().map(Order::line_total).collect::<Option<Vec<_>>>()?;
        Money::checked_sum(totals)
    }

    pub fn address(&self) -> Option<Address> {
        match (&self.street, &self.city, &self.postal_code, &self.phone) {
            (Some(street), Some(city), Some(postal_code), Some(phone)) => Some(Address {
                street: street.clone(),
                city: city.clone(),
                postal_code: postal_code.clone(),
                phone: phone.clone(),
            }),
            _ => None,
        }
    }
}

//--------------------------------------      NewCartLine      ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewCartLine {
    pub user_id: String,
    pub medicine_id: i64,
    pub quantity: i64,
    pub price_at_order: Money,
    pub payment_method: PaymentMethod,
}

impl NewCartLine {
    pub fn new(user_id: &str, medicine: &Medicine, quantity: i64) -> Self {
        Self {
            user_id: user_id.to_string(),
            medicine_id: medicine.id,
            quantity,
            price_at_order: medicine.price,
            payment_method: PaymentMethod::default(),
        }
    }
}
