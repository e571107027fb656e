//! Error types for report generation

use chrono::NaiveDate;
use diligence_platform::PlatformError;
use thiserror::Error;

/// Report workflow errors
#[derive(Debug, Error)]
pub enum ReportError {
    /// Neither the market-data provider nor the resolver agent knew the input
    #[error("Could not resolve a valid ticker symbol for '{0}'")]
    TickerUnresolved(String),

    /// The provider returned no prices for the range
    #[error("No data found for ticker {ticker} between {start} and {end}")]
    NoMarketData {
        ticker: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// Market-data provider failure
    #[error("Market data error: {0}")]
    MarketData(String),

    /// Remote agent failure
    #[error("Agent platform error: {0}")]
    Platform(#[from] PlatformError),

    /// PDF could not be written or read back
    #[error("Document error: {0}")]
    Document(String),

    /// Prompt template failed to render
    #[error("Prompt error: {0}")]
    Prompt(#[from] minijinja::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Console input could not be parsed
    #[error("Command error: {0}")]
    Command(String),

    /// The action does not apply to the current report state
    #[error("{0}")]
    InvalidState(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for report operations
pub type Result<T> = std::result::Result<T, ReportError>;

impl From<lopdf::Error> for ReportError {
    fn from(err: lopdf::Error) -> Self {
        Self::Document(err.to_string())
    }
}
