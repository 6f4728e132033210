//! Client configuration read from the environment.

use crate::{Error, Result};
use serde::Deserialize;

/// The public AI Horde API.
pub const AI_HORDE_BASE_URL: &str = "https://aihorde.net/api";

/// The image ratings API.
pub const RATINGS_BASE_URL: &str = "https://ratings.aihorde.net/api";

/// Settings read from `HORDE_`-prefixed environment variables.
///
/// | Variable             | Field         |
/// |----------------------|---------------|
/// | `HORDE_BASE_URL`     | `base_url`    |
/// | `HORDE_CLIENT_AGENT` | `client_agent`|
/// | `HORDE_API_KEY`      | `api_key`     |
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HordeConfig {
    pub base_url: Option<String>,
    pub client_agent: Option<String>,
    /// Sent as the default `apikey` header by [`crate::ClientBuilder::from_config`].
    pub api_key: Option<String>,
}

impl HordeConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        envy::prefixed("HORDE_")
            .from_env::<Self>()
            .map_err(|e| Error::ConfigurationError(format!("Invalid HORDE_ environment: {}", e)))
    }

    /// Reads the configuration from explicit `(name, value)` pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed("HORDE_")
            .from_iter::<_, Self>(vars)
            .map_err(|e| Error::ConfigurationError(format!("Invalid HORDE_ variables: {}", e)))
    }

    /// The anonymous key the horde accepts for low-priority requests.
    pub fn api_key_or_anonymous(&self) -> &str {
        self.api_key.as_deref().unwrap_or("0000000000")
    }
}
