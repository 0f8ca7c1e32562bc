//! Configuration for the payment engine

use acquirer::AcquirerConfig;
use serde::{Deserialize, Serialize};

/// Antifraud integration code sent when the caller supplies none.
const DEFAULT_ANTIFRAUD_CODE: &str = "00000000-0000-0000-0000-000000000000";

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Acquirer endpoints and timeouts
    pub acquirer: AcquirerConfig,

    /// Default descriptor on the cardholder's statement
    pub soft_descriptor: String,

    /// Antifraud integration code for the seller block
    pub code_anti_fraud: String,

    /// Default page size for invoice listings
    pub default_page_size: usize,

    /// Upper bound on requested page sizes
    pub max_page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            acquirer: AcquirerConfig::default(),
            soft_descriptor: "PAG*CARDRAIL".to_string(),
            code_anti_fraud: DEFAULT_ANTIFRAUD_CODE.to_string(),
            default_page_size: 50,
            max_page_size: 200,
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Validation(format!("cannot read config file: {e}")))?;
        toml::from_str(&content)
            .map_err(|e| crate::Error::Validation(format!("cannot parse config file: {e}")))
    }

    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self {
            acquirer: AcquirerConfig::from_env(),
            ..Self::default()
        };

        if let Ok(descriptor) = std::env::var("ENGINE_SOFT_DESCRIPTOR") {
            config.soft_descriptor = descriptor;
        }

        config
    }

    /// Clamp a requested page size to the configured bounds.
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size)
    }
}
