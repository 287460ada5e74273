use serde::{Deserialize, Serialize};

/// Request body for a new payment session.
#[derive(Debug, Clone, Serialize)]
pub struct NewPaymentSession {
    /// The amount to collect, in minor currency units.
    pub amount: i64,
    pub currency: String,
    /// Merchant-side reference for the session.
    pub receipt: String,
}

/// A payment session as issued by the gateway.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PaymentSession {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: String,
}
