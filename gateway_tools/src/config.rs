use log::*;
use medshop_common::{Secret, DEFAULT_CURRENCY_CODE};

const DEFAULT_GATEWAY_URL: &str = "https://api.razorpay.com";

#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// Base URL of the gateway REST API, without a trailing slash.
    pub base_url: String,
    /// The public key id. Used as the basic-auth user name.
    pub key_id: String,
    /// The key secret. Used as the basic-auth password, and as the HMAC key for payment signatures.
    pub key_secret: Secret<String>,
    /// ISO currency code that payment sessions are raised in.
    pub currency: String,
}

impl GatewayConfig {
    pub fn new(base_url: &str, key_id: &str, key_secret: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id: key_id.to_string(),
            key_secret: Secret::new(key_secret.to_string()),
            currency: DEFAULT_CURRENCY_CODE.to_string(),
        }
    }

    /// Loads the gateway configuration from the environment.
    ///
    /// Returns `None` if either `MSP_GATEWAY_KEY_ID` or `MSP_GATEWAY_KEY_SECRET` is missing. Online payments are
    /// disabled in that case.
    pub fn from_env() -> Option<Self> {
        let key_id = std::env::var("MSP_GATEWAY_KEY_ID").ok().filter(|s| !s.trim().is_empty());
        let key_secret = std::env::var("MSP_GATEWAY_KEY_SECRET").ok().filter(|s| !s.trim().is_empty());
        let (key_id, key_secret) = match (key_id, key_secret) {
            (Some(id), Some(secret)) => (id, secret),
            _ => {
                warn!("MSP_GATEWAY_KEY_ID or MSP_GATEWAY_KEY_SECRET is not set. Online payments are disabled.");
                return None;
            },
        };
        let base_url = std::env::var("MSP_GATEWAY_URL").unwrap_or_else(|_| {
            info!("MSP_GATEWAY_URL not set, using {DEFAULT_GATEWAY_URL}");
            DEFAULT_GATEWAY_URL.to_string()
        });
        let currency = std::env::var("MSP_CURRENCY").unwrap_or_else(|_| {
            info!("MSP_CURRENCY not set, using {DEFAULT_CURRENCY_CODE}");
            DEFAULT_CURRENCY_CODE.to_string()
        });
        let mut config = Self::new(&base_url, &key_id, &key_secret);
        config.currency = currency;
        Some(config)
    }
}
