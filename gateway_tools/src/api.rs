use std::sync::Arc;

use log::*;
use reqwest::{header::HeaderMap, Client, Method};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::GatewayConfig,
    data_objects::{NewPaymentSession, PaymentSession},
    helpers::verify_signature,
    GatewayApiError,
};

#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl GatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        if config.key_id.is_empty() || config.key_secret.is_empty() {
            return Err(GatewayApiError::Initialization("Gateway key id and secret are required".to_string()));
        }
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", "application/json".parse().map_err(|_| {
            GatewayApiError::Initialization("Invalid content type header".to_string())
        })?);
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, GatewayApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {url}");
        let mut req = self
            .client
            .request(method, url)
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.reveal()));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| GatewayApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayApiError::RestResponseError(e.to_string()))?;
            Err(GatewayApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.base_url)
    }

    /// Asks the gateway to open a payment session for `amount` minor units.
    pub async fn create_payment_session(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<PaymentSession, GatewayApiError> {
        if amount <= 0 {
            return Err(GatewayApiError::RestRequestError(format!("Cannot open a session for {amount}")));
        }
        let body = NewPaymentSession { amount, currency: currency.to_string(), receipt: receipt.to_string() };
        debug!("Creating payment session for {amount} {currency} ({receipt})");
        let session = self.rest_query::<PaymentSession, NewPaymentSession>(Method::POST, "/orders", Some(body)).await?;
        info!("Payment session {} created for {} {}", session.id, session.amount, session.currency);
        Ok(session)
    }

    /// Verifies a payment signature using the configured key secret.
    pub fn verify_payment_signature(&self, session_id: &str, transaction_id: &str, signature: &str) -> bool {
        verify_signature(self.config.key_secret.reveal(), session_id, transaction_id, signature)
    }
}
