//! Scoped agent sessions
//!
//! An [`AgentSession`] owns every remote resource created for one exchange:
//! uploaded attachments, the agent and the thread. It is opened, used for
//! exactly one user message, and closed. Closing is best effort and never
//! fails; a session dropped without being closed schedules the same teardown
//! on the current tokio runtime.

use crate::{
    AgentDefinition, AgentPlatform, PlatformError, Result, Run, RunStatus, ToolBinding,
    Transcript,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_POLL_INTERVAL_MILLIS: u64 = 1000;

/// What to create for a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSpec {
    /// Agent display name
    pub name: String,
    /// Deployed model name
    pub model: String,
    /// Agent instructions
    pub instructions: String,
    /// Name of the web search connection to bind, if any
    pub web_search: Option<String>,
    /// Local files to upload and bind to code execution
    pub attachments: Vec<PathBuf>,
}

impl SessionSpec {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            instructions: instructions.into(),
            web_search: None,
            attachments: Vec::new(),
        }
    }

    /// Bind web-grounded search through the named connection
    pub fn with_web_search(mut self, connection_name: Option<String>) -> Self {
        self.web_search = connection_name;
        self
    }

    /// Upload `path` and expose it to code execution
    pub fn with_attachment(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(path.into());
        self
    }
}

/// How an exchange is carried out
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Delay between run status checks
    pub poll_interval: Duration,
    /// Where the first returned image is saved; `None` ignores images
    pub charts_dir: Option<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MILLIS),
            charts_dir: None,
        }
    }
}

impl SessionOptions {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_charts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.charts_dir = Some(dir.into());
        self
    }
}

/// Result of one exchange
#[derive(Debug, Clone)]
pub struct SessionOutput {
    /// Messages of the thread, oldest first
    pub transcript: Transcript,
    /// Local copy of the first image the agent produced
    pub chart: Option<PathBuf>,
}

impl SessionOutput {
    /// Assistant text segments joined by a blank line
    pub fn narrative(&self) -> String {
        self.transcript.narrative()
    }

    /// First non-blank assistant text segment
    pub fn first_text(&self) -> Option<&str> {
        self.transcript.first_assistant_text()
    }
}

/// An agent + thread pair used for exactly one exchange
pub struct AgentSession {
    platform: Arc<dyn AgentPlatform>,
    agent_id: Option<String>,
    thread_id: Option<String>,
    file_ids: Vec<String>,
    closed: bool,
}

impl AgentSession {
    /// Create the remote resources described by `spec`.
    ///
    /// If any step fails, whatever was already created is deleted before the
    /// error is returned.
    pub async fn open(platform: Arc<dyn AgentPlatform>, spec: &SessionSpec) -> Result<Self> {
        let mut session = Self {
            platform,
            agent_id: None,
            thread_id: None,
            file_ids: Vec::new(),
            closed: false,
        };

        match session.provision(spec).await {
            Ok(()) => Ok(session),
            Err(e) => {
                warn!("Opening session '{}' failed: {e}", spec.name);
                session.close().await;
                Err(e)
            }
        }
    }

    async fn provision(&mut self, spec: &SessionSpec) -> Result<()> {
        for path in &spec.attachments {
            let file_id = self.platform.upload_file(path).await?;
            self.file_ids.push(file_id.clone());
            self.platform.wait_for_file(&file_id).await?;
        }

        let mut definition = AgentDefinition::new(&spec.name, &spec.model, &spec.instructions);
        if let Some(connection) = &spec.web_search {
            let connection_id = self.platform.connection_id(connection).await?;
            definition = definition.with_tool(ToolBinding::WebSearch { connection_id });
        }
        if !self.file_ids.is_empty() {
            definition = definition.with_tool(ToolBinding::CodeInterpreter {
                file_ids: self.file_ids.clone(),
            });
        }

        self.agent_id = Some(self.platform.create_agent(&definition).await?);
        self.thread_id = Some(self.platform.create_thread().await?);

        debug!(
            "Session '{}' open: agent={:?} thread={:?} files={}",
            spec.name,
            self.agent_id,
            self.thread_id,
            self.file_ids.len()
        );
        Ok(())
    }

    /// Id of the remote agent
    pub fn agent_id(&self) -> Option<&str> {
        self.agent_id.as_deref()
    }

    /// Id of the remote thread
    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// Ids of the files uploaded for this session
    pub fn file_ids(&self) -> &[String] {
        &self.file_ids
    }

    /// Post `message`, run the agent to completion and collect its output
    pub async fn exchange(&self, message: &str, options: &SessionOptions) -> Result<SessionOutput> {
        let (Some(agent_id), Some(thread_id)) = (self.agent_id(), self.thread_id()) else {
            return Err(PlatformError::SessionClosed);
        };

        self.platform.post_user_message(thread_id, message).await?;
        run_to_completion(self.platform.as_ref(), thread_id, agent_id, options.poll_interval)
            .await?;

        let transcript = Transcript::new(self.platform.list_messages(thread_id).await?);

        let chart = match (&options.charts_dir, transcript.first_image_file_id()) {
            (Some(dir), Some(file_id)) => Some(self.save_image(file_id, dir).await?),
            _ => None,
        };

        Ok(SessionOutput { transcript, chart })
    }

    async fn save_image(&self, file_id: &str, dir: &Path) -> Result<PathBuf> {
        let bytes = self.platform.download_file(file_id).await?;
        tokio::fs::create_dir_all(dir).await?;

        let path = dir.join(format!("{file_id}_image_file.png"));
        tokio::fs::write(&path, bytes).await?;

        info!("Saved chart {}", path.display());
        Ok(path)
    }

    /// Delete the agent, thread and uploaded files
    pub async fn close(mut self) {
        let agent_id = self.agent_id.take();
        let thread_id = self.thread_id.take();
        let file_ids = std::mem::take(&mut self.file_ids);
        self.closed = true;

        teardown(self.platform.as_ref(), agent_id, thread_id, file_ids).await;
    }
}

impl Drop for AgentSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        let agent_id = self.agent_id.take();
        let thread_id = self.thread_id.take();
        let file_ids = std::mem::take(&mut self.file_ids);
        if agent_id.is_none() && thread_id.is_none() && file_ids.is_empty() {
            return;
        }

        // Best effort cleanup - no async drop, so hand it to the runtime
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let platform = Arc::clone(&self.platform);
                handle.spawn(async move {
                    teardown(platform.as_ref(), agent_id, thread_id, file_ids).await;
                });
            }
            Err(_) => warn!(
                "Session dropped outside a runtime; leaking agent={agent_id:?} thread={thread_id:?}"
            ),
        }
    }
}

async fn teardown(
    platform: &dyn AgentPlatform,
    agent_id: Option<String>,
    thread_id: Option<String>,
    file_ids: Vec<String>,
) {
    if let Some(id) = agent_id {
        if let Err(e) = platform.delete_agent(&id).await {
            warn!("Failed to delete agent {id}: {e}");
        }
    }
    if let Some(id) = thread_id {
        if let Err(e) = platform.delete_thread(&id).await {
            warn!("Failed to delete thread {id}: {e}");
        }
    }
    for id in file_ids {
        if let Err(e) = platform.delete_file(&id).await {
            warn!("Failed to delete file {id}: {e}");
        }
    }
}

/// Start a run and poll it until it reaches a terminal status.
///
/// Only `completed` counts as success. There is no timeout: a run that never
/// finishes keeps the caller waiting.
pub async fn run_to_completion(
    platform: &dyn AgentPlatform,
    thread_id: &str,
    agent_id: &str,
    poll_interval: Duration,
) -> Result<Run> {
    let mut run = platform.start_run(thread_id, agent_id).await?;
    debug!("Run {} started as {}", run.id, run.status);

    while !run.status.is_terminal() {
        tokio::time::sleep(poll_interval).await;
        run = platform.get_run(thread_id, &run.id).await?;
    }

    if run.status == RunStatus::Completed {
        Ok(run)
    } else {
        Err(PlatformError::RunFailed {
            status: run.status,
            detail: run.failure_detail(),
        })
    }
}

/// Open a session, perform one exchange and close it on every path
pub async fn run_once(
    platform: Arc<dyn AgentPlatform>,
    spec: &SessionSpec,
    message: &str,
    options: &SessionOptions,
) -> Result<SessionOutput> {
    let session = AgentSession::open(platform, spec).await?;
    let output = session.exchange(message, options).await;
    session.close().await;
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContentSegment;
    use crate::testing::{Operation, ScriptedPlatform};

    fn options() -> SessionOptions {
        SessionOptions::default().with_poll_interval(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_run_once_tears_down_on_success() {
        let platform = Arc::new(
            ScriptedPlatform::new()
                .with_assistant_message(vec![ContentSegment::text("Report body")])
                .with_run_progress(vec![RunStatus::InProgress, RunStatus::Completed]),
        );
        let spec = SessionSpec::new("due-diligence", "gpt-4o", "Be thorough");

        let output = run_once(platform.clone(), &spec, "Analyze MSFT", &options())
            .await
            .unwrap();

        assert_eq!(output.narrative(), "Report body");
        assert!(output.chart.is_none());
        assert_eq!(platform.posted_messages(), vec!["Analyze MSFT".to_string()]);
        assert_eq!(platform.run_polls(), 2);
        assert!(platform.all_released());
    }

    #[tokio::test]
    async fn test_failed_run_is_error_and_still_torn_down() {
        let platform = Arc::new(
            ScriptedPlatform::new().with_run_progress(vec![RunStatus::Failed]),
        );
        let spec = SessionSpec::new("due-diligence", "gpt-4o", "Be thorough");

        let err = run_once(platform.clone(), &spec, "Analyze MSFT", &options())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PlatformError::RunFailed {
                status: RunStatus::Failed,
                ..
            }
        ));
        assert_eq!(platform.deleted_agents().len(), 1);
        assert_eq!(platform.deleted_threads().len(), 1);
        assert!(platform.all_released());
    }

    #[tokio::test]
    async fn test_open_failure_releases_partial_resources() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("MSFT.csv");
        std::fs::write(&csv, "Date,Close\n").unwrap();

        let platform = Arc::new(ScriptedPlatform::new().failing_at(Operation::CreateThread));
        let spec = SessionSpec::new("due-diligence", "gpt-4o", "Be thorough")
            .with_attachment(&csv);

        let result = AgentSession::open(platform.clone(), &spec).await;

        assert!(result.is_err());
        assert_eq!(platform.created_agents().len(), 1);
        assert_eq!(platform.deleted_agents().len(), 1);
        assert_eq!(platform.deleted_files().len(), 1);
        assert!(platform.created_threads().is_empty());
        assert!(platform.all_released());
    }

    #[tokio::test]
    async fn test_file_failing_processing_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("MSFT.csv");
        std::fs::write(&csv, "Date,Close\n").unwrap();

        let platform = Arc::new(ScriptedPlatform::new().failing_at(Operation::WaitForFile));
        let spec = SessionSpec::new("due-diligence", "gpt-4o", "Be thorough")
            .with_attachment(&csv);

        let result = AgentSession::open(platform.clone(), &spec).await;

        assert!(result.is_err());
        assert_eq!(platform.uploaded_paths(), vec![csv]);
        assert_eq!(platform.deleted_files().len(), 1);
        assert!(platform.created_agents().is_empty());
        assert!(platform.all_released());
    }

    #[tokio::test]
    async fn test_tools_are_bound_from_spec() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("MSFT.csv");
        std::fs::write(&csv, "Date,Close\n").unwrap();

        let platform = Arc::new(ScriptedPlatform::new());
        let spec = SessionSpec::new("due-diligence", "gpt-4o", "Be thorough")
            .with_web_search(Some("bing".to_string()))
            .with_attachment(&csv);

        let session = AgentSession::open(platform.clone(), &spec).await.unwrap();
        let file_id = session.file_ids()[0].clone();
        session.close().await;

        let definitions = platform.agent_definitions();
        assert_eq!(definitions.len(), 1);
        assert_eq!(
            definitions[0].tools,
            vec![
                ToolBinding::WebSearch {
                    connection_id: "conn-bing".to_string()
                },
                ToolBinding::CodeInterpreter {
                    file_ids: vec![file_id]
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_only_first_image_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(
            ScriptedPlatform::new()
                .with_reply(vec![
                    vec![
                        ContentSegment::text("Chart attached"),
                        ContentSegment::image("img-1"),
                    ],
                    vec![ContentSegment::image("img-2")],
                ]),
        );
        let spec = SessionSpec::new("due-diligence", "gpt-4o", "Be thorough");
        let options = options().with_charts_dir(dir.path());

        let output = run_once(platform.clone(), &spec, "Chart MSFT", &options)
            .await
            .unwrap();

        let chart = output.chart.unwrap();
        assert_eq!(chart, dir.path().join("img-1_image_file.png"));
        assert!(chart.exists());
        assert!(!dir.path().join("img-2_image_file.png").exists());
        assert_eq!(platform.downloads(), vec!["img-1".to_string()]);
    }

    #[tokio::test]
    async fn test_dropped_session_is_cleaned_up() {
        let platform = Arc::new(ScriptedPlatform::new());
        let spec = SessionSpec::new("ticker-resolver", "gpt-4o", "Return a ticker");

        let session = AgentSession::open(platform.clone(), &spec).await.unwrap();
        drop(session);

        for _ in 0..10 {
            if platform.all_released() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(platform.all_released());
        assert_eq!(platform.deleted_agents().len(), 1);
    }

    #[tokio::test]
    async fn test_exchange_after_close_is_rejected() {
        let platform = Arc::new(ScriptedPlatform::new());
        let spec = SessionSpec::new("pdf-chat-agent", "gpt-4o", "Answer");
        let session = AgentSession::open(platform.clone(), &spec).await.unwrap();

        // Simulate a session whose ids were already released
        let mut session = session;
        let agent = session.agent_id.take();
        let thread = session.thread_id.take();
        let result = session.exchange("hi", &options()).await;
        assert!(matches!(result, Err(PlatformError::SessionClosed)));

        session.agent_id = agent;
        session.thread_id = thread;
        session.close().await;
        assert!(platform.all_released());
    }
}
