//! In-memory [`AgentPlatform`] for tests
//!
//! [`ScriptedPlatform`] hands out sequential ids, records every call and
//! answers each run with the next scripted reply. Enable the `test-util`
//! feature to use it from another crate's tests.

use crate::{
    AgentDefinition, AgentPlatform, ContentSegment, PlatformError, Result, Role, Run, RunStatus,
    ThreadMessage,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A small valid RGB PNG returned for every download
pub const SAMPLE_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x02, 0x08, 0x02, 0x00, 0x00, 0x00, 0xfd, 0xd4, 0x9a,
    0x73, 0x00, 0x00, 0x00, 0x10, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x10, 0x48, 0x38, 0x00,
    0x44, 0x0c, 0x10, 0x0a, 0x00, 0x1e, 0x8e, 0x04, 0xc1, 0xc8, 0xdf, 0x7e, 0xb3, 0x00, 0x00, 0x00,
    0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Platform operation that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAgent,
    DeleteAgent,
    CreateThread,
    DeleteThread,
    PostMessage,
    StartRun,
    GetRun,
    ListMessages,
    UploadFile,
    WaitForFile,
    DeleteFile,
    DownloadFile,
    ConnectionId,
}

#[derive(Default)]
struct State {
    replies: VecDeque<Vec<Vec<ContentSegment>>>,
    threads: HashMap<String, Vec<ThreadMessage>>,
    pending: HashMap<String, VecDeque<RunStatus>>,
    run_threads: HashMap<String, String>,
    definitions: Vec<AgentDefinition>,
    created_agents: Vec<String>,
    deleted_agents: Vec<String>,
    created_threads: Vec<String>,
    deleted_threads: Vec<String>,
    uploaded: Vec<(String, PathBuf)>,
    deleted_files: Vec<String>,
    downloads: Vec<String>,
    posted: Vec<String>,
    status_reads: usize,
}

/// Scripted, call-recording agent platform
pub struct ScriptedPlatform {
    state: Mutex<State>,
    progress: Vec<RunStatus>,
    failures: Vec<Operation>,
    next_id: AtomicU64,
}

impl Default for ScriptedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedPlatform {
    /// Every run completes immediately with no assistant output
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            progress: vec![RunStatus::Completed],
            failures: Vec::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Queue the assistant messages produced by the next run
    pub fn with_reply(self, messages: Vec<Vec<ContentSegment>>) -> Self {
        self.lock().replies.push_back(messages);
        self
    }

    /// Queue a run that answers with a single message
    pub fn with_assistant_message(self, segments: Vec<ContentSegment>) -> Self {
        self.with_reply(vec![segments])
    }

    /// Queue a run that answers with plain text
    pub fn reply_text(self, text: impl Into<String>) -> Self {
        self.with_assistant_message(vec![ContentSegment::text(text)])
    }

    /// Statuses each run reports, starting with the one returned on start
    pub fn with_run_progress(mut self, statuses: Vec<RunStatus>) -> Self {
        if !statuses.is_empty() {
            self.progress = statuses;
        }
        self
    }

    /// Make every call of `operation` fail
    pub fn failing_at(mut self, operation: Operation) -> Self {
        self.failures.push(operation);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn check(&self, operation: Operation) -> Result<()> {
        if self.failures.contains(&operation) {
            Err(PlatformError::RequestFailed(format!(
                "scripted failure at {operation:?}"
            )))
        } else {
            Ok(())
        }
    }

    fn message(&self, role: Role, content: Vec<ContentSegment>) -> ThreadMessage {
        ThreadMessage {
            id: self.id("msg"),
            role,
            content,
            created_at: 0,
        }
    }

    pub fn agent_definitions(&self) -> Vec<AgentDefinition> {
        self.lock().definitions.clone()
    }

    pub fn created_agents(&self) -> Vec<String> {
        self.lock().created_agents.clone()
    }

    pub fn deleted_agents(&self) -> Vec<String> {
        self.lock().deleted_agents.clone()
    }

    pub fn created_threads(&self) -> Vec<String> {
        self.lock().created_threads.clone()
    }

    pub fn deleted_threads(&self) -> Vec<String> {
        self.lock().deleted_threads.clone()
    }

    /// Local paths that were uploaded, in order
    pub fn uploaded_paths(&self) -> Vec<PathBuf> {
        self.lock().uploaded.iter().map(|(_, p)| p.clone()).collect()
    }

    pub fn deleted_files(&self) -> Vec<String> {
        self.lock().deleted_files.clone()
    }

    /// File ids that were downloaded, in order
    pub fn downloads(&self) -> Vec<String> {
        self.lock().downloads.clone()
    }

    /// User messages posted across all threads, in order
    pub fn posted_messages(&self) -> Vec<String> {
        self.lock().posted.clone()
    }

    /// How many run statuses were handed out (start plus polls)
    pub fn run_polls(&self) -> usize {
        self.lock().status_reads
    }

    /// Scripted replies not yet consumed by a run
    pub fn remaining_replies(&self) -> usize {
        self.lock().replies.len()
    }

    /// Whether every created agent, thread and uploaded file was deleted
    pub fn all_released(&self) -> bool {
        let state = self.lock();
        state
            .created_agents
            .iter()
            .all(|id| state.deleted_agents.contains(id))
            && state
                .created_threads
                .iter()
                .all(|id| state.deleted_threads.contains(id))
            && state
                .uploaded
                .iter()
                .all(|(id, _)| state.deleted_files.contains(id))
    }

    fn advance(&self, run_id: &str) -> Result<Run> {
        let mut state = self.lock();
        state.status_reads += 1;

        let queue = state
            .pending
            .get_mut(run_id)
            .ok_or_else(|| PlatformError::NotFound(format!("run {run_id}")))?;
        let status = if queue.len() > 1 {
            queue.pop_front().unwrap_or(RunStatus::Completed)
        } else {
            queue.front().copied().unwrap_or(RunStatus::Completed)
        };

        if status == RunStatus::Completed && queue.len() == 1 {
            queue.clear();
            let reply = state.replies.pop_front().unwrap_or_default();
            let messages: Vec<ThreadMessage> = reply
                .into_iter()
                .map(|segments| self.message(Role::Assistant, segments))
                .collect();
            if let Some(thread_id) = state.run_threads.get(run_id).cloned() {
                state.threads.entry(thread_id).or_default().extend(messages);
            }
        }

        Ok(Run {
            id: run_id.to_string(),
            status,
            last_error: None,
        })
    }
}

#[async_trait]
impl AgentPlatform for ScriptedPlatform {
    async fn create_agent(&self, definition: &AgentDefinition) -> Result<String> {
        self.check(Operation::CreateAgent)?;
        let id = self.id("asst");
        let mut state = self.lock();
        state.definitions.push(definition.clone());
        state.created_agents.push(id.clone());
        Ok(id)
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<()> {
        self.check(Operation::DeleteAgent)?;
        self.lock().deleted_agents.push(agent_id.to_string());
        Ok(())
    }

    async fn create_thread(&self) -> Result<String> {
        self.check(Operation::CreateThread)?;
        let id = self.id("thread");
        let mut state = self.lock();
        state.threads.insert(id.clone(), Vec::new());
        state.created_threads.push(id.clone());
        Ok(id)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.check(Operation::DeleteThread)?;
        self.lock().deleted_threads.push(thread_id.to_string());
        Ok(())
    }

    async fn post_user_message(&self, thread_id: &str, content: &str) -> Result<()> {
        self.check(Operation::PostMessage)?;
        let message = self.message(Role::User, vec![ContentSegment::text(content)]);
        let mut state = self.lock();
        state.posted.push(content.to_string());
        state
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| PlatformError::NotFound(format!("thread {thread_id}")))?
            .push(message);
        Ok(())
    }

    async fn start_run(&self, thread_id: &str, _agent_id: &str) -> Result<Run> {
        self.check(Operation::StartRun)?;
        let run_id = self.id("run");
        {
            let mut state = self.lock();
            state
                .pending
                .insert(run_id.clone(), self.progress.iter().copied().collect());
            state
                .run_threads
                .insert(run_id.clone(), thread_id.to_string());
        }
        self.advance(&run_id)
    }

    async fn get_run(&self, _thread_id: &str, run_id: &str) -> Result<Run> {
        self.check(Operation::GetRun)?;
        self.advance(run_id)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        self.check(Operation::ListMessages)?;
        Ok(self
            .lock()
            .threads
            .get(thread_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upload_file(&self, path: &Path) -> Result<String> {
        self.check(Operation::UploadFile)?;
        let id = self.id("file");
        self.lock().uploaded.push((id.clone(), path.to_path_buf()));
        Ok(id)
    }

    async fn wait_for_file(&self, file_id: &str) -> Result<()> {
        self.check(Operation::WaitForFile)?;
        if self.lock().uploaded.iter().any(|(id, _)| id == file_id) {
            Ok(())
        } else {
            Err(PlatformError::NotFound(format!("file {file_id}")))
        }
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        self.check(Operation::DeleteFile)?;
        self.lock().deleted_files.push(file_id.to_string());
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        self.check(Operation::DownloadFile)?;
        self.lock().downloads.push(file_id.to_string());
        Ok(SAMPLE_PNG.to_vec())
    }

    async fn connection_id(&self, name: &str) -> Result<String> {
        self.check(Operation::ConnectionId)?;
        Ok(format!("conn-{name}"))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
