//! Binds the gateway REST client to the engine's payment session contract.
use gateway_tools::{GatewayApi, GatewayConfig};
use log::*;
use medshop_engine::{db_types::Money, PaymentSessionInfo, PaymentSessionProvider, PaymentVerifier, ProviderError};

use crate::errors::ServerError;

#[derive(Clone)]
pub struct GatewaySessions {
    api: GatewayApi,
}

impl GatewaySessions {
    pub fn new(api: GatewayApi) -> Self {
        Self { api }
    }
}

impl PaymentSessionProvider for GatewaySessions {
    async fn create_payment_session(
        &self,
        amount: Money,
        currency: &str,
        receipt: &str,
    ) -> Result<PaymentSessionInfo, ProviderError> {
        let session = self
            .api
            .create_payment_session(amount.value(), currency, receipt)
            .await
            .map_err(|e| ProviderError(e.to_string()))?;
        Ok(PaymentSessionInfo { session_id: session.id, amount: Money::from(session.amount), currency: session.currency })
    }
}

/// Builds the payment verifier from the gateway configuration. Without credentials, online payments are unavailable
/// and the rest of the shop keeps working.
pub fn payment_verifier(config: Option<GatewayConfig>) -> Result<PaymentVerifier<GatewaySessions>, ServerError> {
    match config {
        Some(config) => {
            let secret = config.key_secret.clone();
            let currency = config.currency.clone();
            let api = GatewayApi::new(config).map_err(|e| ServerError::InitializeError(e.to_string()))?;
            info!("💳️ Online payments enabled ({currency})");
            Ok(PaymentVerifier::available(GatewaySessions::new(api), secret, &currency))
        },
        None => {
            warn!("💳️ Online payments are disabled. Only cash on delivery is available.");
            Ok(PaymentVerifier::unavailable())
        },
    }
}
