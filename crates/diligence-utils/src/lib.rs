//! Shared utilities for the due diligence workspace
//!
//! This crate provides the functionality every other crate in the workspace
//! leans on: tracing setup for the binary and small helpers for reading
//! configuration from the environment.

pub mod env;
pub mod logging;

pub use env::{env_duration_secs, env_non_empty};
pub use logging::{init_tracing, init_tracing_with_default};
