//! Configuration for the acquirer adapter

use gateway_core::Environment;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Acquirer endpoint and timeout configuration.
///
/// Authorization latency is dominated by the card-network round trip, so the
/// payment submission timeout is much longer than the auth/tokenize/query
/// ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquirerConfig {
    /// Base URL for sandbox/homologation credentials
    pub sandbox_url: String,

    /// Base URL for production credentials
    pub production_url: String,

    /// Token endpoint timeout (seconds)
    pub auth_timeout_seconds: u64,

    /// Tokenization endpoint timeout (seconds)
    pub tokenize_timeout_seconds: u64,

    /// Payment submission timeout (seconds)
    pub payment_timeout_seconds: u64,

    /// Payment query timeout (seconds)
    pub query_timeout_seconds: u64,
}

impl Default for AcquirerConfig {
    fn default() -> Self {
        Self {
            sandbox_url: "https://ecommerce-hml.adiq.io".to_string(),
            production_url: "https://ecommerce.adiq.io".to_string(),
            auth_timeout_seconds: 30,
            tokenize_timeout_seconds: 30,
            payment_timeout_seconds: 90,
            query_timeout_seconds: 30,
        }
    }
}

impl AcquirerConfig {
    /// Base URL for the given credential environment.
    pub fn base_url(&self, environment: Environment) -> &str {
        match environment {
            Environment::Sandbox => &self.sandbox_url,
            Environment::Production => &self.production_url,
        }
    }

    /// Token endpoint timeout
    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_seconds)
    }

    /// Tokenization endpoint timeout
    pub fn tokenize_timeout(&self) -> Duration {
        Duration::from_secs(self.tokenize_timeout_seconds)
    }

    /// Payment submission timeout
    pub fn payment_timeout(&self) -> Duration {
        Duration::from_secs(self.payment_timeout_seconds)
    }

    /// Payment query timeout
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_seconds)
    }

    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("ACQUIRER_SANDBOX_URL") {
            config.sandbox_url = url;
        }
        if let Ok(url) = std::env::var("ACQUIRER_PRODUCTION_URL") {
            config.production_url = url;
        }
        if let Ok(secs) = std::env::var("ACQUIRER_PAYMENT_TIMEOUT_SECONDS") {
            if let Ok(secs) = secs.parse() {
                config.payment_timeout_seconds = secs;
            }
        }

        config
    }
}
