use std::fmt::Display;

use medshop_engine::db_types::{Address, Order, OrderStatusType, PaymentStatusType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

/// The result of a checkout or payment confirmation: a message plus the orders that were settled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementResult {
    pub success: bool,
    pub message: String,
    pub orders: Vec<Order>,
}

impl SettlementResult {
    pub fn new<S: Display>(message: S, orders: Vec<Order>) -> Self {
        Self { success: true, message: message.to_string(), orders }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartParams {
    pub medicine_id: i64,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateQuantityParams {
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutParams {
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub prescription: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusParams {
    pub status: OrderStatusType,
}

/// Query string of the admin order listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderQuery {
    pub status: Option<OrderStatusType>,
    pub payment_status: Option<PaymentStatusType>,
    pub user_id: Option<String>,
}
