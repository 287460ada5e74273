//! Online payment capability and signature checks.
//!
//! The gateway is handed to the engine at construction time as a [`GatewayCapability`]. When the shop runs without
//! gateway credentials the capability is [`GatewayCapability::Unavailable`], and every online-payment operation fails
//! with [`SettlementError::GatewayUnavailable`] instead of reaching for a missing client.
use std::fmt::Debug;

use gateway_tools::verify_signature;
use log::*;
use medshop_common::Secret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{db_types::Money, shop_api::errors::SettlementError};

/// A payment session issued by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSessionInfo {
    pub session_id: String,
    pub amount: Money,
    pub currency: String,
}

#[derive(Debug, Clone, Error)]
#[error("Payment session could not be created: {0}")]
pub struct ProviderError(pub String);

/// Anything that can open a payment session with the gateway.
#[allow(async_fn_in_trait)]
pub trait PaymentSessionProvider {
    async fn create_payment_session(
        &self,
        amount: Money,
        currency: &str,
        receipt: &str,
    ) -> Result<PaymentSessionInfo, ProviderError>;
}

#[derive(Clone)]
pub enum GatewayCapability<G> {
    Available {
        provider: G,
        /// The merchant key secret. Payment signatures are keyed with it.
        secret: Secret<String>,
        currency: String,
    },
    Unavailable,
}

impl<G> Debug for GatewayCapability<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayCapability::Available { currency, .. } => write!(f, "GatewayCapability::Available({currency})"),
            GatewayCapability::Unavailable => write!(f, "GatewayCapability::Unavailable"),
        }
    }
}

#[derive(Clone)]
pub struct PaymentVerifier<G> {
    capability: GatewayCapability<G>,
}

impl<G> Debug for PaymentVerifier<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentVerifier({:?})", self.capability)
    }
}

impl<G> PaymentVerifier<G> {
    pub fn new(capability: GatewayCapability<G>) -> Self {
        Self { capability }
    }

    pub fn available(provider: G, secret: Secret<String>, currency: &str) -> Self {
        Self::new(GatewayCapability::Available { provider, secret, currency: currency.to_string() })
    }

    pub fn unavailable() -> Self {
        Self::new(GatewayCapability::Unavailable)
    }

    pub fn is_available(&self) -> bool {
        matches!(self.capability, GatewayCapability::Available { .. })
    }

    /// Checks `signature` against `HMAC-SHA256(session_id | transaction_id)` keyed with the gateway secret.
    ///
    /// Returns `Ok(false)` on a mismatch. The comparison is constant-time.
    pub fn verify(&self, session_id: &str, transaction_id: &str, signature: &str) -> Result<bool, SettlementError> {
        match &self.capability {
            GatewayCapability::Available { secret, .. } => {
                let valid = verify_signature(secret.reveal(), session_id, transaction_id, signature);
                if !valid {
                    warn!("💳️ Signature mismatch for payment session {session_id}, transaction {transaction_id}");
                }
                Ok(valid)
            },
            GatewayCapability::Unavailable => Err(SettlementError::GatewayUnavailable),
        }
    }
}

impl<G> PaymentVerifier<G>
where G: PaymentSessionProvider
{
    pub async fn create_session(&self, amount: Money, receipt: &str) -> Result<PaymentSessionInfo, SettlementError> {
        match &self.capability {
            GatewayCapability::Available { provider, currency, .. } => {
                let session = provider
                    .create_payment_session(amount, currency, receipt)
                    .await
                    .map_err(|e| SettlementError::GatewayError(e.to_string()))?;
                debug!("💳️ Payment session {} opened for {amount} {currency}", session.session_id);
                Ok(session)
            },
            GatewayCapability::Unavailable => Err(SettlementError::GatewayUnavailable),
        }
    }
}
