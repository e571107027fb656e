//! Wire types for agent platform communication
//!
//! These mirror the Assistants-style REST payloads: a thread holds messages,
//! each message carries a list of typed content segments (text or image file),
//! and a run executes an agent against a thread.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a thread message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message posted by the caller
    User,
    /// Message produced by the agent
    Assistant,
}

/// Text payload of a content segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextValue {
    /// The text itself
    pub value: String,
    /// Citations and file references; kept opaque
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<serde_json::Value>,
}

/// Reference to an image produced by the agent (e.g. a chart)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFile {
    /// Platform file identifier
    pub file_id: String,
}

/// One typed piece of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentSegment {
    /// Text content
    Text {
        /// Text payload
        text: TextValue,
    },
    /// Image artifact stored on the platform
    ImageFile {
        /// Image reference
        image_file: ImageFile,
    },
    /// Any segment type this client does not consume
    #[serde(other)]
    Unsupported,
}

impl ContentSegment {
    /// Build a plain text segment
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            text: TextValue {
                value: value.into(),
                annotations: Vec::new(),
            },
        }
    }

    /// Build an image segment
    pub fn image(file_id: impl Into<String>) -> Self {
        Self::ImageFile {
            image_file: ImageFile {
                file_id: file_id.into(),
            },
        }
    }
}

/// A message in a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    /// Message identifier
    pub id: String,
    /// Author
    pub role: Role,
    /// Ordered content segments
    #[serde(default)]
    pub content: Vec<ContentSegment>,
    /// Unix timestamp
    #[serde(default)]
    pub created_at: i64,
}

impl ThreadMessage {
    /// Text segments of this message, in order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|segment| match segment {
            ContentSegment::Text { text } => Some(text.value.as_str()),
            _ => None,
        })
    }

    /// Image file ids of this message, in order
    pub fn image_file_ids(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|segment| match segment {
            ContentSegment::ImageFile { image_file } => Some(image_file.file_id.as_str()),
            _ => None,
        })
    }
}

/// Ordered message list of a finished exchange
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<ThreadMessage>,
}

impl Transcript {
    /// Wrap messages that are already in arrival order
    pub fn new(messages: Vec<ThreadMessage>) -> Self {
        Self { messages }
    }

    /// All messages, oldest first
    pub fn messages(&self) -> &[ThreadMessage] {
        &self.messages
    }

    /// Every assistant text segment in arrival order
    pub fn assistant_texts(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .flat_map(|m| m.texts())
            .collect()
    }

    /// First assistant text segment that is not blank
    pub fn first_assistant_text(&self) -> Option<&str> {
        self.assistant_texts()
            .into_iter()
            .find(|text| !text.trim().is_empty())
    }

    /// Assistant text segments joined by a blank line
    pub fn narrative(&self) -> String {
        self.assistant_texts().join("\n\n")
    }

    /// The first image produced by the assistant, if any
    pub fn first_image_file_id(&self) -> Option<&str> {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .flat_map(|m| m.image_file_ids())
            .next()
    }
}

/// Capability attached to an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolBinding {
    /// Web-grounded search through a named platform connection
    WebSearch {
        /// Resolved connection id
        connection_id: String,
    },
    /// Sandboxed code execution over uploaded files
    CodeInterpreter {
        /// Files available to the sandbox
        file_ids: Vec<String>,
    },
}

/// Everything needed to create a remote agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDefinition {
    pub name: String,
    pub model: String,
    pub instructions: String,
    pub tools: Vec<ToolBinding>,
}

impl AgentDefinition {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            instructions: instructions.into(),
            tools: Vec::new(),
        }
    }

    /// Attach a capability
    pub fn with_tool(mut self, tool: ToolBinding) -> Self {
        self.tools.push(tool);
        self
    }
}

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
}

impl RunStatus {
    /// Whether polling can stop
    ///
    /// `requires_action` is terminal here: sessions never bind function tools,
    /// so nothing would ever submit the outputs the run is waiting for.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Queued | Self::InProgress | Self::Cancelling)
    }

    /// Wire name of the status
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error reported by the platform for a failed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// A run of an agent over a thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

impl Run {
    /// Human readable reason for a non-completed run
    pub fn failure_detail(&self) -> String {
        match &self.last_error {
            Some(err) if !err.message.is_empty() => format!("{} ({})", err.message, err.code),
            _ => format!("run {} finished as {}", self.id, self.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(role: Role, content: Vec<ContentSegment>) -> ThreadMessage {
        ThreadMessage {
            id: "msg".to_string(),
            role,
            content,
            created_at: 0,
        }
    }

    #[test]
    fn test_message_deserialization() {
        let raw = json!({
            "id": "msg_1",
            "object": "thread.message",
            "role": "assistant",
            "created_at": 1_717_000_000,
            "content": [
                {"type": "text", "text": {"value": "## Summary", "annotations": []}},
                {"type": "image_file", "image_file": {"file_id": "assistant-abc"}},
                {"type": "image_url", "image_url": {"url": "https://example.com/x.png"}}
            ]
        });

        let msg: ThreadMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content.len(), 3);
        assert_eq!(msg.texts().collect::<Vec<_>>(), vec!["## Summary"]);
        assert_eq!(
            msg.image_file_ids().collect::<Vec<_>>(),
            vec!["assistant-abc"]
        );
        assert_eq!(msg.content[2], ContentSegment::Unsupported);
    }

    #[test]
    fn test_transcript_collects_assistant_text_in_order() {
        let transcript = Transcript::new(vec![
            message(Role::User, vec![ContentSegment::text("question")]),
            message(
                Role::Assistant,
                vec![ContentSegment::text("first"), ContentSegment::image("img-1")],
            ),
            message(
                Role::Assistant,
                vec![ContentSegment::text("second"), ContentSegment::image("img-2")],
            ),
        ]);

        assert_eq!(transcript.assistant_texts(), vec!["first", "second"]);
        assert_eq!(transcript.narrative(), "first\n\nsecond");
        assert_eq!(transcript.first_image_file_id(), Some("img-1"));
    }

    #[test]
    fn test_first_assistant_text_skips_blank_segments() {
        let transcript = Transcript::new(vec![message(
            Role::Assistant,
            vec![ContentSegment::text("  "), ContentSegment::text("MSFT")],
        )]);
        assert_eq!(transcript.first_assistant_text(), Some("MSFT"));

        assert_eq!(Transcript::default().first_assistant_text(), None);
        assert_eq!(Transcript::default().first_image_file_id(), None);
    }

    #[test]
    fn test_run_status_terminal() {
        assert!(!RunStatus::Queued.is_terminal());
        assert!(!RunStatus::InProgress.is_terminal());
        assert!(!RunStatus::Cancelling.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::RequiresAction.is_terminal());

        let run: Run = serde_json::from_value(json!({
            "id": "run_1",
            "status": "in_progress"
        }))
        .unwrap();
        assert_eq!(run.status, RunStatus::InProgress);
        assert!(run.last_error.is_none());
    }

    #[test]
    fn test_run_failure_detail() {
        let run: Run = serde_json::from_value(json!({
            "id": "run_2",
            "status": "failed",
            "last_error": {"code": "rate_limit_exceeded", "message": "Too many requests"}
        }))
        .unwrap();
        assert_eq!(run.failure_detail(), "Too many requests (rate_limit_exceeded)");

        let run = Run {
            id: "run_3".to_string(),
            status: RunStatus::Expired,
            last_error: None,
        };
        assert_eq!(run.failure_detail(), "run run_3 finished as expired");
    }
}
