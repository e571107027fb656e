//! Configuration for the agent platform client

use crate::{PlatformError, Result};
use diligence_utils::{env_duration_secs, env_non_empty};
use std::fmt;
use std::time::Duration;
use url::Url;

const DEFAULT_API_VERSION: &str = "2024-12-01-preview";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_FILE_POLL_MILLIS: u64 = 500;

/// How requests are authenticated
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Sent as the `api-key` header
    ApiKey(String),
    /// Sent as `Authorization: Bearer <token>`
    Bearer(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(***)"),
            Self::Bearer(_) => f.write_str("Bearer(***)"),
        }
    }
}

/// Configuration for [`crate::AgentsClient`]
#[derive(Debug, Clone)]
pub struct AgentsConfig {
    /// Project endpoint, e.g. `https://<resource>.services.ai.azure.com/api/projects/<project>`
    pub endpoint: String,

    /// Credential attached to every request
    pub credential: Credential,

    /// Value of the `api-version` query parameter
    pub api_version: String,

    /// Per-request timeout (default: 120s)
    pub timeout: Duration,

    /// Delay between status checks of an uploaded file
    pub file_poll_interval: Duration,
}

impl AgentsConfig {
    /// Create a new config with the given endpoint and credential
    pub fn new(endpoint: impl Into<String>, credential: Credential) -> Self {
        Self {
            endpoint: endpoint.into(),
            credential,
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            file_poll_interval: Duration::from_millis(DEFAULT_FILE_POLL_MILLIS),
        }
    }

    /// Create config from environment variables
    ///
    /// Reads `AGENTS_ENDPOINT` and either `AGENTS_API_KEY` or
    /// `AGENTS_BEARER_TOKEN`. `AGENTS_API_VERSION` and `AGENTS_TIMEOUT_SECS`
    /// are optional.
    pub fn from_env() -> Result<Self> {
        let endpoint = env_non_empty("AGENTS_ENDPOINT").ok_or_else(|| {
            PlatformError::ConfigurationError(
                "AGENTS_ENDPOINT environment variable not set".to_string(),
            )
        })?;

        let credential = match (
            env_non_empty("AGENTS_API_KEY"),
            env_non_empty("AGENTS_BEARER_TOKEN"),
        ) {
            (Some(key), _) => Credential::ApiKey(key),
            (None, Some(token)) => Credential::Bearer(token),
            (None, None) => {
                return Err(PlatformError::ConfigurationError(
                    "Set AGENTS_API_KEY or AGENTS_BEARER_TOKEN".to_string(),
                ));
            }
        };

        let mut config = Self::new(endpoint, credential);
        if let Some(version) = env_non_empty("AGENTS_API_VERSION") {
            config.api_version = version;
        }
        if let Some(timeout) = env_duration_secs("AGENTS_TIMEOUT_SECS") {
            config.timeout = timeout;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the API version
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the upload status poll interval
    pub fn with_file_poll_interval(mut self, interval: Duration) -> Self {
        self.file_poll_interval = interval;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.endpoint).map_err(|e| {
            PlatformError::ConfigurationError(format!("Invalid endpoint '{}': {e}", self.endpoint))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(PlatformError::ConfigurationError(format!(
                "Endpoint must be http(s), got '{}'",
                url.scheme()
            )));
        }

        let secret = match &self.credential {
            Credential::ApiKey(s) | Credential::Bearer(s) => s,
        };
        if secret.trim().is_empty() {
            return Err(PlatformError::ConfigurationError(
                "Credential must not be empty".to_string(),
            ));
        }

        if self.api_version.trim().is_empty() {
            return Err(PlatformError::ConfigurationError(
                "api_version must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Absolute URL for a path below the endpoint
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AgentsConfig {
        AgentsConfig::new(
            "https://example.services.ai.azure.com/api/projects/dd/",
            Credential::ApiKey("secret".to_string()),
        )
    }

    #[test]
    fn test_defaults() {
        let config = config();
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_url_joining() {
        let config = config();
        assert_eq!(
            config.url("/threads/t1/messages"),
            "https://example.services.ai.azure.com/api/projects/dd/threads/t1/messages"
        );
        assert_eq!(
            config.url("assistants"),
            "https://example.services.ai.azure.com/api/projects/dd/assistants"
        );
    }

    #[test]
    fn test_validation() {
        let bad_scheme = AgentsConfig::new("ftp://example.com", Credential::ApiKey("k".into()));
        assert!(bad_scheme.validate().is_err());

        let not_a_url = AgentsConfig::new("example", Credential::ApiKey("k".into()));
        assert!(not_a_url.validate().is_err());

        let empty_key = AgentsConfig::new("https://example.com", Credential::Bearer("  ".into()));
        assert!(empty_key.validate().is_err());

        let empty_version = config().with_api_version("");
        assert!(empty_version.validate().is_err());
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let debug = format!("{:?}", config());
        assert!(debug.contains("ApiKey(***)"));
        assert!(!debug.contains("secret"));
    }
}
