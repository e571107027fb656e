//! Agent platform trait definition

use crate::{AgentDefinition, Result, Run, ThreadMessage};
use async_trait::async_trait;
use std::path::Path;

/// Trait for remote agent platforms
///
/// Implementations expose the primitive operations of an Assistants-style
/// service. Composite behavior (running to completion, session teardown) is
/// built on top of these in [`crate::session`].
#[async_trait]
pub trait AgentPlatform: Send + Sync {
    /// Create an agent and return its id
    async fn create_agent(&self, definition: &AgentDefinition) -> Result<String>;

    /// Delete an agent
    async fn delete_agent(&self, agent_id: &str) -> Result<()>;

    /// Create an empty conversation thread and return its id
    async fn create_thread(&self) -> Result<String>;

    /// Delete a thread
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    /// Post a user message to a thread
    async fn post_user_message(&self, thread_id: &str, content: &str) -> Result<()>;

    /// Start a run of `agent_id` over `thread_id`
    async fn start_run(&self, thread_id: &str, agent_id: &str) -> Result<Run>;

    /// Fetch the current state of a run
    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// List every message of a thread, oldest first
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>>;

    /// Upload a local file for use by agent tools and return its id
    ///
    /// Returns as soon as the file exists remotely, which may be before it
    /// is ready; see [`AgentPlatform::wait_for_file`].
    async fn upload_file(&self, path: &Path) -> Result<String>;

    /// Wait until an uploaded file is ready for tools
    ///
    /// Fails if the platform could not process the file. The file still
    /// exists in that case and must be deleted by the caller.
    async fn wait_for_file(&self, file_id: &str) -> Result<()>;

    /// Delete an uploaded or generated file
    async fn delete_file(&self, file_id: &str) -> Result<()>;

    /// Download the content of a platform file
    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>>;

    /// Resolve a named external connection (e.g. web search) to its id
    async fn connection_id(&self, name: &str) -> Result<String>;

    /// Get the platform name (e.g. "azure-agents")
    fn name(&self) -> &str;
}
