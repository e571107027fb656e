//! Due diligence reports for listed companies
//!
//! This crate turns a company name or ticker and a date range into a PDF
//! report. It combines market prices with the narrative of a remote analysis
//! agent. It includes:
//!
//! - Ticker resolution (direct market-data lookup, then a resolver agent)
//! - Daily price history from Yahoo Finance and a CSV export of it
//! - A labeled statistics block (start/end price, change, volatility)
//! - An initial report and an optional comprehensive pass with a pass/fail verdict
//! - PDF rendering with embedded charts and text extraction for chat
//! - Follow-up questions answered from the report text
//! - A console front end driving all of the above
//!
//! # Architecture
//!
//! [`DueDiligence`] sequences the steps. Every remote call goes through a
//! short-lived agent session from `diligence-platform` that is torn down when
//! the call returns. The report lives in a [`ReportState`] that handlers never
//! mutate in place, so a failed action keeps the previous state.
//!
//! # Example
//!
//! ```rust,ignore
//! use diligence_platform::{AgentsClient, AgentsConfig};
//! use diligence_report::{DateRange, DiligenceConfig, DueDiligence, GenerateRequest, ReportState, YahooMarketData};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let platform = Arc::new(AgentsClient::new(AgentsConfig::from_env()?)?);
//!     let service = DueDiligence::new(platform, Arc::new(YahooMarketData::new()), DiligenceConfig::from_env()?)?;
//!
//!     let range = DateRange::new("2024-06-01".parse()?, "2024-06-10".parse()?)?;
//!     let state = service
//!         .generate(&ReportState::empty(), &GenerateRequest::new("Microsoft", range))
//!         .await?;
//!     println!("{}", state.narrative_text());
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod chat;
pub mod config;
pub mod console;
pub mod document;
pub mod error;
pub mod market;
pub mod narrative;
pub mod prompts;
pub mod resolver;
pub mod state;
pub mod stats;
pub mod workflow;

// Re-export main types for convenience
pub use chat::DocumentChat;
pub use config::DiligenceConfig;
pub use console::{Command, ConsoleConfig, ConsoleView, DiligenceConsole, Reply};
pub use error::{ReportError, Result};
pub use market::{DailyBar, DateRange, MarketData, YahooMarketData};
pub use narrative::{LineStyle, Narrative};
pub use resolver::TickerResolver;
pub use state::{ChatTurn, Report, ReportState};
pub use stats::PriceSummary;
pub use workflow::{DueDiligence, GenerateRequest};
