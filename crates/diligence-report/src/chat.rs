//! Follow-up questions answered from the report text

use crate::config::DiligenceConfig;
use crate::prompts::Prompts;
use diligence_platform::{AgentPlatform, SessionOptions, SessionSpec, run_once};
use std::sync::Arc;
use tracing::warn;

const CHAT_AGENT_NAME: &str = "pdf-chat-agent";

/// Prefix of every answer that stands in for a failure
pub const ANSWER_ERROR_PREFIX: &str = "Error retrieving answer:";

/// Answers questions about a report with a fresh agent per question
pub struct DocumentChat {
    platform: Arc<dyn AgentPlatform>,
    prompts: Arc<Prompts>,
    model: String,
    options: SessionOptions,
}

impl DocumentChat {
    pub fn new(
        platform: Arc<dyn AgentPlatform>,
        prompts: Arc<Prompts>,
        config: &DiligenceConfig,
    ) -> Self {
        Self {
            platform,
            prompts,
            model: config.model.clone(),
            options: SessionOptions::default().with_poll_interval(config.poll_interval),
        }
    }

    /// Answer `question` from `document`
    ///
    /// Never fails: errors, including an empty reply, come back as an answer
    /// starting with [`ANSWER_ERROR_PREFIX`].
    pub async fn answer(&self, document: &str, question: &str) -> String {
        match self.try_answer(document, question).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Chat answer failed: {e}");
                format!("{ANSWER_ERROR_PREFIX} {e}")
            }
        }
    }

    async fn try_answer(&self, document: &str, question: &str) -> crate::Result<String> {
        let instructions = self.prompts.chat_instructions(document, question)?;
        let spec = SessionSpec::new(CHAT_AGENT_NAME, &self.model, instructions);

        let output = run_once(Arc::clone(&self.platform), &spec, question, &self.options).await?;

        output
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| crate::ReportError::Other("the agent returned no text".to_string()))
    }
}
