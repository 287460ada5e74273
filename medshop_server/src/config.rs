use std::{env, io::Write};

use gateway_tools::GatewayConfig;
use log::*;
use medshop_common::{helpers::parse_boolean_flag, Secret};
use medshop_engine::DEFAULT_SETTLEMENT_RETRIES;
use rand::RngCore;
use tempfile::NamedTempFile;

use crate::errors::ServerError;

const DEFAULT_MSP_HOST: &str = "127.0.0.1";
const DEFAULT_MSP_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/medshop.db";
const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// How many times a settlement unit of work is retried after losing a write race.
    pub settlement_retries: u32,
    /// If true, pending database migrations are applied at startup.
    pub run_migrations: bool,
    /// Online payment gateway credentials. `None` disables online payments.
    pub gateway: Option<GatewayConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MSP_HOST.to_string(),
            port: DEFAULT_MSP_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            auth: AuthConfig::default(),
            settlement_retries: DEFAULT_SETTLEMENT_RETRIES,
            run_migrations: true,
            gateway: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MSP_HOST").ok().unwrap_or_else(|| DEFAULT_MSP_HOST.into());
        let port = env::var("MSP_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for MSP_PORT. {e} Using the default, {DEFAULT_MSP_PORT}, instead."
                    );
                    DEFAULT_MSP_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MSP_PORT);
        let database_url = env::var("MSP_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ MSP_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!("🪛️ Could not load the authentication configuration from environment variables. {e}");
            AuthConfig::default()
        });
        let settlement_retries = env::var("MSP_SETTLEMENT_RETRIES")
            .map_err(|_| {
                info!("🪛️ MSP_SETTLEMENT_RETRIES is not set. Using the default value of {DEFAULT_SETTLEMENT_RETRIES}.")
            })
            .and_then(|s| {
                s.parse::<u32>().map_err(|e| warn!("🪛️ Invalid configuration value for MSP_SETTLEMENT_RETRIES. {e}"))
            })
            .ok()
            .unwrap_or(DEFAULT_SETTLEMENT_RETRIES);
        let run_migrations = parse_boolean_flag(env::var("MSP_RUN_MIGRATIONS").ok(), true);
        let gateway = GatewayConfig::from_env();
        Self { host, port, database_url, auth, settlement_retries, run_migrations, gateway }
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 secret shared with the user service, which issues the access tokens.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate on \
             production like this, since no token issued by the user service will be accepted. 🚨️🚨️🚨️"
        );
        let mut key = [0u8; MIN_JWT_SECRET_LENGTH];
        rand::thread_rng().fill_bytes(&mut key);
        let secret = hex::encode(key);
        match NamedTempFile::new().ok().and_then(|f| f.keep().ok()) {
            Some((mut f, p)) => match writeln!(f, "{secret}") {
                Ok(()) => warn!(
                    "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production instance, \
                     you are doing it wrong! Set the MSP_JWT_SECRET environment variable instead. 🚨️🚨️🚨️",
                    p.to_str().unwrap_or("???")
                ),
                Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
            },
            None => warn!("🪛️ Could not create a temporary file to store the JWT secret."),
        }
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn new(secret: &str) -> Self {
        Self { jwt_secret: Secret::new(secret.to_string()) }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret = env::var("MSP_JWT_SECRET")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [MSP_JWT_SECRET]")))?;
        if secret.trim().is_empty() {
            return Err(ServerError::ConfigurationError("MSP_JWT_SECRET is empty".to_string()));
        }
        if secret.len() < MIN_JWT_SECRET_LENGTH {
            warn!("🪛️ MSP_JWT_SECRET is shorter than {MIN_JWT_SECRET_LENGTH} characters. Consider a longer secret.");
        }
        Ok(Self::new(&secret))
    }
}
