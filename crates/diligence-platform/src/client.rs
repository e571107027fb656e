//! HTTP client for Assistants-style agent services
//!
//! Implements [`AgentPlatform`] over the REST surface shared by Azure AI Agent
//! Service and OpenAI-compatible assistants endpoints:
//!
//! - `POST /assistants`, `DELETE /assistants/{id}`
//! - `POST /threads`, `DELETE /threads/{id}`
//! - `POST /threads/{id}/messages`, `GET /threads/{id}/messages`
//! - `POST /threads/{id}/runs`, `GET /threads/{id}/runs/{run}`
//! - `POST /files`, `GET /files/{id}`, `GET /files/{id}/content`, `DELETE /files/{id}`
//! - `GET /connections/{name}`

use crate::{
    AgentDefinition, AgentPlatform, AgentsConfig, Credential, PlatformError, Result, Run,
    ThreadMessage, ToolBinding,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::Path;
use tracing::{debug, instrument};

const MESSAGE_PAGE_SIZE: u32 = 100;

/// HTTP implementation of [`AgentPlatform`]
pub struct AgentsClient {
    client: Client,
    config: AgentsConfig,
}

impl AgentsClient {
    /// Create a new client with the given configuration
    pub fn new(config: AgentsConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, config })
    }

    /// Create a client from environment variables (see [`AgentsConfig::from_env`])
    pub fn from_env() -> Result<Self> {
        Self::new(AgentsConfig::from_env()?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &AgentsConfig {
        &self.config
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, self.config.url(path))
            .query(&[("api-version", self.config.api_version.as_str())]);

        match &self.config.credential {
            Credential::ApiKey(key) => builder.header("api-key", key),
            Credential::Bearer(token) => builder.bearer_auth(token),
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        let response = check_status(builder.send().await?, what).await?;
        response.json::<T>().await.map_err(|e| {
            PlatformError::UnexpectedResponse(format!("Failed to parse {what} response: {e}"))
        })
    }

    async fn send_empty(&self, builder: RequestBuilder, what: &str) -> Result<()> {
        check_status(builder.send().await?, what).await?;
        Ok(())
    }

    async fn file_status(&self, file_id: &str) -> Result<FileObject> {
        self.send_json(
            self.request(reqwest::Method::GET, &format!("files/{file_id}")),
            "file status",
        )
        .await
    }
}

#[async_trait]
impl AgentPlatform for AgentsClient {
    #[instrument(skip(self, definition), fields(agent = %definition.name, model = %definition.model))]
    async fn create_agent(&self, definition: &AgentDefinition) -> Result<String> {
        let (tools, tool_resources) = tool_payload(&definition.tools);
        let body = CreateAgentRequest {
            model: &definition.model,
            name: &definition.name,
            instructions: &definition.instructions,
            tools,
            tool_resources,
        };

        let created: IdResponse = self
            .send_json(
                self.request(reqwest::Method::POST, "assistants").json(&body),
                "create agent",
            )
            .await?;

        debug!("Created agent {}", created.id);
        Ok(created.id)
    }

    #[instrument(skip(self))]
    async fn delete_agent(&self, agent_id: &str) -> Result<()> {
        self.send_empty(
            self.request(reqwest::Method::DELETE, &format!("assistants/{agent_id}")),
            "delete agent",
        )
        .await
    }

    #[instrument(skip(self))]
    async fn create_thread(&self) -> Result<String> {
        let created: IdResponse = self
            .send_json(
                self.request(reqwest::Method::POST, "threads").json(&json!({})),
                "create thread",
            )
            .await?;

        debug!("Created thread {}", created.id);
        Ok(created.id)
    }

    #[instrument(skip(self))]
    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.send_empty(
            self.request(reqwest::Method::DELETE, &format!("threads/{thread_id}")),
            "delete thread",
        )
        .await
    }

    #[instrument(skip(self, content), fields(len = content.len()))]
    async fn post_user_message(&self, thread_id: &str, content: &str) -> Result<()> {
        self.send_empty(
            self.request(reqwest::Method::POST, &format!("threads/{thread_id}/messages"))
                .json(&json!({ "role": "user", "content": content })),
            "post message",
        )
        .await
    }

    #[instrument(skip(self))]
    async fn start_run(&self, thread_id: &str, agent_id: &str) -> Result<Run> {
        self.send_json(
            self.request(reqwest::Method::POST, &format!("threads/{thread_id}/runs"))
                .json(&json!({ "assistant_id": agent_id })),
            "start run",
        )
        .await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.send_json(
            self.request(
                reqwest::Method::GET,
                &format!("threads/{thread_id}/runs/{run_id}"),
            ),
            "get run",
        )
        .await
    }

    #[instrument(skip(self))]
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        let mut messages = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut builder = self
                .request(reqwest::Method::GET, &format!("threads/{thread_id}/messages"))
                .query(&[("order", "asc")])
                .query(&[("limit", MESSAGE_PAGE_SIZE)]);
            if let Some(cursor) = &after {
                builder = builder.query(&[("after", cursor.as_str())]);
            }

            let page: ListResponse<ThreadMessage> =
                self.send_json(builder, "list messages").await?;
            let next = page.next_cursor();
            messages.extend(page.data);

            match next {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }

        debug!("Listed {} messages", messages.len());
        Ok(messages)
    }

    #[instrument(skip(self, path), fields(path = %path.display()))]
    async fn upload_file(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload.bin".to_string(), |n| n.to_string_lossy().into_owned());

        let form = Form::new()
            .text("purpose", "assistants")
            .part("file", Part::bytes(bytes).file_name(file_name));

        let file: IdResponse = self
            .send_json(
                self.request(reqwest::Method::POST, "files").multipart(form),
                "upload file",
            )
            .await?;

        debug!("Uploaded file {}", file.id);
        Ok(file.id)
    }

    #[instrument(skip(self))]
    async fn wait_for_file(&self, file_id: &str) -> Result<()> {
        loop {
            let file = self.file_status(file_id).await?;
            if !file.is_pending() {
                return file.ensure_processed();
            }
            tokio::time::sleep(self.config.file_poll_interval).await;
        }
    }

    #[instrument(skip(self))]
    async fn delete_file(&self, file_id: &str) -> Result<()> {
        self.send_empty(
            self.request(reqwest::Method::DELETE, &format!("files/{file_id}")),
            "delete file",
        )
        .await
    }

    #[instrument(skip(self))]
    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        let response = check_status(
            self.request(reqwest::Method::GET, &format!("files/{file_id}/content"))
                .send()
                .await?,
            "download file",
        )
        .await?;

        Ok(response.bytes().await?.to_vec())
    }

    #[instrument(skip(self))]
    async fn connection_id(&self, name: &str) -> Result<String> {
        let connection: IdResponse = self
            .send_json(
                self.request(reqwest::Method::GET, &format!("connections/{name}")),
                "get connection",
            )
            .await?;
        Ok(connection.id)
    }

    fn name(&self) -> &'static str {
        "azure-agents"
    }
}

/// Map a non-success HTTP status to a [`PlatformError`]
async fn check_status(response: Response, what: &str) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_text = response.text().await?;

    Err(match status.as_u16() {
        401 | 403 => PlatformError::AuthenticationFailed,
        429 => PlatformError::RateLimitExceeded(error_text),
        400 => PlatformError::InvalidRequest(format!("{what}: {error_text}")),
        404 => PlatformError::NotFound(format!("{what}: {error_text}")),
        _ => PlatformError::RequestFailed(format!("{what}: HTTP {status}: {error_text}")),
    })
}

/// Split tool bindings into the `tools` array and `tool_resources` object
fn tool_payload(bindings: &[ToolBinding]) -> (Vec<Value>, Option<Value>) {
    let mut tools = Vec::new();
    let mut code_files: Vec<String> = Vec::new();

    for binding in bindings {
        match binding {
            ToolBinding::WebSearch { connection_id } => tools.push(json!({
                "type": "bing_grounding",
                "bing_grounding": {
                    "connections": [{ "connection_id": connection_id }]
                }
            })),
            ToolBinding::CodeInterpreter { file_ids } => {
                tools.push(json!({ "type": "code_interpreter" }));
                code_files.extend(file_ids.iter().cloned());
            }
        }
    }

    let resources = (!code_files.is_empty())
        .then(|| json!({ "code_interpreter": { "file_ids": code_files } }));

    (tools, resources)
}

// ============================================================================
// Request / response payloads
// ============================================================================

#[derive(Debug, Serialize)]
struct CreateAgentRequest<'a> {
    model: &'a str,
    name: &'a str,
    instructions: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_resources: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    last_id: Option<String>,
}

impl<T> ListResponse<T> {
    fn next_cursor(&self) -> Option<String> {
        if self.has_more && !self.data.is_empty() {
            self.last_id.clone()
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileObject {
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    status_details: Option<String>,
}

impl FileObject {
    fn is_pending(&self) -> bool {
        matches!(self.status.as_deref(), Some("uploaded" | "pending" | "running"))
    }

    fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }

    /// `Ok` unless processing ended in `error`
    fn ensure_processed(self) -> Result<()> {
        if self.is_error() {
            return Err(PlatformError::RequestFailed(format!(
                "File {} failed processing: {}",
                self.id,
                self.status_details.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = AgentsConfig::new(
            "https://example.com/api/projects/dd",
            Credential::ApiKey("test-key".to_string()),
        );
        let client = AgentsClient::new(config).unwrap();
        assert_eq!(client.name(), "azure-agents");
        assert_eq!(client.config().api_version, "2024-12-01-preview");
    }

    #[test]
    fn test_client_rejects_invalid_config() {
        let config = AgentsConfig::new("not a url", Credential::ApiKey("k".to_string()));
        assert!(AgentsClient::new(config).is_err());
    }

    #[test]
    fn test_tool_payload() {
        let (tools, resources) = tool_payload(&[
            ToolBinding::WebSearch {
                connection_id: "conn-1".to_string(),
            },
            ToolBinding::CodeInterpreter {
                file_ids: vec!["file-a".to_string()],
            },
        ]);

        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0]["type"], "bing_grounding");
        assert_eq!(
            tools[0]["bing_grounding"]["connections"][0]["connection_id"],
            "conn-1"
        );
        assert_eq!(tools[1]["type"], "code_interpreter");
        assert_eq!(
            resources.unwrap()["code_interpreter"]["file_ids"],
            json!(["file-a"])
        );
    }

    #[test]
    fn test_tool_payload_without_tools() {
        let (tools, resources) = tool_payload(&[]);
        assert!(tools.is_empty());
        assert!(resources.is_none());

        let body = CreateAgentRequest {
            model: "gpt-4o",
            name: "pdf-chat-agent",
            instructions: "Answer from the report",
            tools,
            tool_resources: resources,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("tools").is_none());
        assert!(value.get("tool_resources").is_none());
    }

    #[test]
    fn test_list_response_cursor() {
        let page: ListResponse<ThreadMessage> = serde_json::from_value(json!({
            "object": "list",
            "data": [{"id": "m1", "role": "user", "content": []}],
            "first_id": "m1",
            "last_id": "m1",
            "has_more": true
        }))
        .unwrap();
        assert_eq!(page.next_cursor(), Some("m1".to_string()));

        let last: ListResponse<ThreadMessage> = serde_json::from_value(json!({
            "data": [],
            "has_more": false
        }))
        .unwrap();
        assert_eq!(last.next_cursor(), None);
    }

    #[test]
    fn test_file_status() {
        let file: FileObject =
            serde_json::from_value(json!({"id": "f1", "status": "uploaded"})).unwrap();
        assert!(file.is_pending());

        let file: FileObject =
            serde_json::from_value(json!({"id": "f1", "status": "processed"})).unwrap();
        assert!(!file.is_pending());
        assert!(!file.is_error());

        let file: FileObject = serde_json::from_value(json!({"id": "f1"})).unwrap();
        assert!(!file.is_pending());
        assert!(file.ensure_processed().is_ok());
    }

    #[test]
    fn test_file_processing_error() {
        let file: FileObject = serde_json::from_value(json!({
            "id": "f1",
            "status": "error",
            "status_details": "unsupported encoding"
        }))
        .unwrap();
        assert!(!file.is_pending());

        let err = file.ensure_processed().unwrap_err();
        assert_eq!(
            err.to_string(),
            PlatformError::RequestFailed("File f1 failed processing: unsupported encoding".to_string())
                .to_string()
        );
    }
}
