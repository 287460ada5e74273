//! # Payment gateway tools
//!
//! A thin client for the online payment gateway used by the medicine shop. The gateway issues *payment sessions*
//! (an amount to be collected, identified by a session id) and, once the customer has paid, hands the browser a
//! transaction id together with a signature over both ids. This crate provides:
//!
//! * [`GatewayApi`], the REST client used to create payment sessions;
//! * [`GatewayConfig`], loaded from the environment. A missing key pair means the gateway is disabled;
//! * [`calculate_signature`] and [`verify_signature`] for the `HMAC-SHA256(session_id|transaction_id)` scheme.
mod api;
mod config;
mod error;
mod helpers;

mod data_objects;

pub use api::GatewayApi;
pub use config::GatewayConfig;
pub use data_objects::{NewPaymentSession, PaymentSession};
pub use error::GatewayApiError;
pub use helpers::{calculate_signature, verify_signature};
