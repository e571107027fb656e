//! Configuration for report generation

use crate::error::{ReportError, Result};
use diligence_utils::{env_duration_secs, env_non_empty};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_MODEL: &str = "gpt-4o";

/// Configuration for [`crate::DueDiligence`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiligenceConfig {
    /// Deployed model every agent session uses
    pub model: String,

    /// Where CSV exports and documents are written
    pub output_dir: PathBuf,

    /// Where agent charts are saved; defaults to `output_dir`
    pub charts_dir: Option<PathBuf>,

    /// Name of the web-search connection bound to report agents.
    /// Without one, agents run without web grounding.
    pub bing_connection_name: Option<String>,

    /// Delay between run status checks
    pub poll_interval: Duration,

    /// How long a resolved ticker is remembered
    pub resolver_cache_ttl: Duration,
}

impl Default for DiligenceConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            output_dir: PathBuf::from("."),
            charts_dir: None,
            bing_connection_name: None,
            poll_interval: Duration::from_secs(1),
            resolver_cache_ttl: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl DiligenceConfig {
    /// Create a new configuration builder
    pub fn builder() -> DiligenceConfigBuilder {
        DiligenceConfigBuilder::default()
    }

    /// Load configuration from environment variables
    ///
    /// Reads `DILIGENCE_MODEL`, `DILIGENCE_OUTPUT_DIR`, `DILIGENCE_CHARTS_DIR`,
    /// `BING_CONNECTION_NAME`, `DILIGENCE_POLL_SECS` and
    /// `DILIGENCE_CACHE_TTL_SECS`; unset values keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::builder().with_env().build()
    }

    /// Directory charts are saved to
    pub fn charts_dir(&self) -> &Path {
        self.charts_dir.as_deref().unwrap_or(&self.output_dir)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(ReportError::Config("model must not be empty".to_string()));
        }

        if self.output_dir.as_os_str().is_empty() {
            return Err(ReportError::Config(
                "output_dir must not be empty".to_string(),
            ));
        }

        if self.poll_interval.is_zero() {
            return Err(ReportError::Config(
                "poll_interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for DiligenceConfig
#[derive(Debug, Default)]
pub struct DiligenceConfigBuilder {
    model: Option<String>,
    output_dir: Option<PathBuf>,
    charts_dir: Option<PathBuf>,
    bing_connection_name: Option<String>,
    poll_interval: Option<Duration>,
    resolver_cache_ttl: Option<Duration>,
}

impl DiligenceConfigBuilder {
    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the output directory
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Set the charts directory
    pub fn charts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.charts_dir = Some(dir.into());
        self
    }

    /// Set the web-search connection name
    pub fn bing_connection_name(mut self, name: impl Into<String>) -> Self {
        self.bing_connection_name = Some(name.into());
        self
    }

    /// Set the run poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Set the resolver cache TTL
    pub fn resolver_cache_ttl(mut self, ttl: Duration) -> Self {
        self.resolver_cache_ttl = Some(ttl);
        self
    }

    /// Fill every field not set yet from the environment
    pub fn with_env(mut self) -> Self {
        if self.model.is_none() {
            self.model = env_non_empty("DILIGENCE_MODEL");
        }
        if self.output_dir.is_none() {
            self.output_dir = env_non_empty("DILIGENCE_OUTPUT_DIR").map(PathBuf::from);
        }
        if self.charts_dir.is_none() {
            self.charts_dir = env_non_empty("DILIGENCE_CHARTS_DIR").map(PathBuf::from);
        }
        if self.bing_connection_name.is_none() {
            self.bing_connection_name = env_non_empty("BING_CONNECTION_NAME");
        }
        if self.poll_interval.is_none() {
            self.poll_interval = env_duration_secs("DILIGENCE_POLL_SECS");
        }
        if self.resolver_cache_ttl.is_none() {
            self.resolver_cache_ttl = env_duration_secs("DILIGENCE_CACHE_TTL_SECS");
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<DiligenceConfig> {
        let defaults = DiligenceConfig::default();

        let config = DiligenceConfig {
            model: self.model.unwrap_or(defaults.model),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            charts_dir: self.charts_dir,
            bing_connection_name: self.bing_connection_name,
            poll_interval: self.poll_interval.unwrap_or(defaults.poll_interval),
            resolver_cache_ttl: self
                .resolver_cache_ttl
                .unwrap_or(defaults.resolver_cache_ttl),
        };

        config.validate()?;
        Ok(config)
    }
}
