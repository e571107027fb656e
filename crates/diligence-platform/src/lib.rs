//! Remote agent platform abstraction for the due diligence workspace
//!
//! This crate wraps an Assistants-style agent service (agents, threads,
//! messages, runs and files). It includes:
//!
//! - Wire types for thread messages, content segments and runs
//! - The [`AgentPlatform`] trait that the report workflow depends on
//! - An HTTP implementation ([`AgentsClient`]) configured by [`AgentsConfig`]
//! - [`AgentSession`], a short-lived agent + thread pair that is always torn down
//!
//! # Example
//!
//! ```no_run
//! use diligence_platform::{AgentsClient, AgentsConfig, SessionOptions, SessionSpec, run_once};
//! use std::sync::Arc;
//!
//! # async fn example() -> diligence_platform::Result<()> {
//! let client = Arc::new(AgentsClient::new(AgentsConfig::from_env()?)?);
//! let spec = SessionSpec::new("greeter", "gpt-4o", "Answer in one word.");
//! let output = run_once(client, &spec, "Say hello", &SessionOptions::default()).await?;
//! println!("{}", output.narrative());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod platform;
pub mod session;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-export main types
pub use client::AgentsClient;
pub use config::{AgentsConfig, Credential};
pub use error::{PlatformError, Result};
pub use platform::AgentPlatform;
pub use session::{
    AgentSession, SessionOptions, SessionOutput, SessionSpec, run_once, run_to_completion,
};
pub use types::{
    AgentDefinition, ContentSegment, ImageFile, Role, Run, RunError, RunStatus, TextValue,
    ThreadMessage, ToolBinding, Transcript,
};
