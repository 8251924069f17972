//! In-process host command channel, router and push sender.
//!
//! A Rust host implements [`HostHandler`]; [`command_channel`] wires it to a
//! [`HostCommandClient`] that the shell talks to through
//! [`BridgeHost`](crate::host::api::BridgeHost). The host pushes events back
//! through a [`PushSender`].

use crate::attachment::{Attachment, EncodedAttachment};
use crate::error::{Result, ShellError};
use crate::host::api::{CommandTransport, ExecutionResult, FileEntry, TaskBoard};
use crate::host::contract::{CommandEnvelope, CommandName, ResponseEnvelope};
use crate::host::push::HostPush;
use crate::state::agent::AgentStatePatch;
use crate::state::logs::{LogEntry, LogLevel};
use crate::state::models::{OllamaModel, Role, RoleModels};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Host-side implementation of the outbound calls.
///
/// Only readiness and message delivery are mandatory; everything else has a
/// conservative default so small hosts can opt in piecemeal.
#[async_trait]
pub trait HostHandler: Send + Sync + 'static {
    /// The shell registered its handlers and is waiting for `initialize`.
    async fn on_ready(&self) -> Result<()>;
    async fn send_message(&self, text: &str, attachments: Vec<EncodedAttachment>) -> Result<()>;
    async fn pull_model(&self, _name: &str) -> Result<()> {
        Ok(())
    }
    async fn save_model_selection(&self, _role: Role, _model: &str) -> Result<()> {
        Ok(())
    }
    async fn list_files(&self, _path: &str) -> Result<Vec<FileEntry>> {
        Ok(Vec::new())
    }
    async fn read_file(&self, _path: &str) -> Result<String> {
        Ok(String::new())
    }
    async fn write_file(&self, _path: &str, _content: &str) -> Result<bool> {
        Ok(false)
    }
    async fn execute_code(&self, _code: &str) -> Result<ExecutionResult> {
        Ok(ExecutionResult {
            stdout: String::new(),
            stderr: "code execution unavailable".to_owned(),
            returncode: 1,
        })
    }
    async fn get_tasks(&self) -> Result<TaskBoard> {
        Ok(TaskBoard::default())
    }
}

/// Broadcast handle the host uses to push events to every connected shell.
#[derive(Debug, Clone)]
pub struct PushSender {
    tx: broadcast::Sender<HostPush>,
}

impl PushSender {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Send a push. Returns how many subscribers received it.
    pub fn push(&self, push: HostPush) -> usize {
        let event = push.event_name();
        match self.tx.send(push) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!(event = event.as_str(), "no push subscribers; dropping");
                0
            }
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<HostPush> {
        self.tx.subscribe()
    }

    pub fn initialize(&self, models: Vec<OllamaModel>, role_models: RoleModels) {
        self.push(HostPush::Initialize {
            models,
            role_models,
        });
    }

    pub fn agent_message(&self, content: impl Into<String>, attachments: Vec<Attachment>) {
        self.push(HostPush::AgentMessage {
            content: content.into(),
            attachments,
        });
    }

    pub fn system_message(&self, content: impl Into<String>) {
        self.push(HostPush::SystemMessage {
            content: content.into(),
        });
    }

    pub fn agent_state(&self, patch: AgentStatePatch) {
        self.push(HostPush::AgentState(patch));
    }

    pub fn pull_progress(&self, status: impl Into<String>) {
        self.push(HostPush::PullProgress {
            status: status.into(),
        });
    }

    pub fn refresh_models(&self, models: Vec<OllamaModel>) {
        self.push(HostPush::RefreshModels { models });
    }

    pub fn log(&self, level: LogLevel, source: impl Into<String>, message: impl Into<String>) {
        self.push(HostPush::Log(LogEntry::now(level, source, message)));
    }
}

/// Host with no agent behind it: answers readiness with an empty snapshot and
/// reports every message as undeliverable.
#[derive(Debug, Clone)]
pub struct NoopHostHandler {
    pushes: PushSender,
}

impl NoopHostHandler {
    #[must_use]
    pub fn new(pushes: PushSender) -> Self {
        Self { pushes }
    }
}

#[async_trait]
impl HostHandler for NoopHostHandler {
    async fn on_ready(&self) -> Result<()> {
        self.pushes.initialize(Vec::new(), RoleModels::default());
        self.pushes
            .log(LogLevel::Info, "Host", "Shell connected; no agent attached.");
        Ok(())
    }

    async fn send_message(&self, _text: &str, _attachments: Vec<EncodedAttachment>) -> Result<()> {
        self.pushes
            .system_message("No agent is attached to this host.");
        Ok(())
    }
}

struct HostCommandRequest {
    envelope: CommandEnvelope,
    response_tx: oneshot::Sender<ResponseEnvelope>,
}

#[derive(Clone)]
pub struct HostCommandClient {
    request_tx: mpsc::Sender<HostCommandRequest>,
    pushes: PushSender,
}

impl HostCommandClient {
    pub async fn send(&self, envelope: CommandEnvelope) -> Result<ResponseEnvelope> {
        envelope.validate()?;

        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(HostCommandRequest {
                envelope,
                response_tx,
            })
            .await
            .map_err(|e| {
                ShellError::Channel(format!("failed to send host command request: {e}"))
            })?;

        response_rx
            .await
            .map_err(|e| ShellError::Channel(format!("host command response dropped: {e}")))
    }

    #[must_use]
    pub fn subscribe_pushes(&self) -> broadcast::Receiver<HostPush> {
        self.pushes.subscribe()
    }
}

#[async_trait]
impl CommandTransport for HostCommandClient {
    async fn request(
        &self,
        command: CommandName,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let envelope = CommandEnvelope::new(uuid::Uuid::new_v4().to_string(), command, payload);
        self.send(envelope).await?.into_result()
    }
}

pub struct HostCommandServer<H: HostHandler> {
    request_rx: mpsc::Receiver<HostCommandRequest>,
    handler: Arc<H>,
}

#[must_use]
pub fn command_channel<H: HostHandler>(
    request_capacity: usize,
    event_capacity: usize,
    handler: H,
) -> (HostCommandClient, HostCommandServer<H>) {
    command_channel_with_pushes(request_capacity, PushSender::new(event_capacity), handler)
}

/// Create a command channel around an existing push sender.
///
/// The handler usually holds a clone of `pushes`, so pushes it emits while
/// serving a command reach the same subscribers as the client's.
#[must_use]
pub fn command_channel_with_pushes<H: HostHandler>(
    request_capacity: usize,
    pushes: PushSender,
    handler: H,
) -> (HostCommandClient, HostCommandServer<H>) {
    let (request_tx, request_rx) = mpsc::channel(request_capacity.max(1));

    (
        HostCommandClient { request_tx, pushes },
        HostCommandServer {
            request_rx,
            handler: Arc::new(handler),
        },
    )
}

impl<H: HostHandler> HostCommandServer<H> {
    /// Serve requests until every client is dropped. Each request runs on
    /// its own task so a slow call never blocks the others.
    pub async fn run(mut self) {
        while let Some(request) = self.request_rx.recv().await {
            let handler = Arc::clone(&self.handler);
            tokio::spawn(async move {
                let request_id = request.envelope.request_id.clone();
                let command = request.envelope.command;
                let response = match route(handler.as_ref(), &request.envelope).await {
                    Ok(response) => response,
                    Err(e) => {
                        tracing::warn!(
                            request_id = %request_id,
                            command = command.as_str(),
                            error = %e,
                            "host command failed"
                        );
                        ResponseEnvelope::error(request_id, e.to_string())
                    }
                };
                let _ = request.response_tx.send(response);
            });
        }
    }

    /// Route a command envelope to the appropriate handler.
    pub async fn route(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        route(self.handler.as_ref(), envelope).await
    }
}

async fn route<H: HostHandler>(handler: &H, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
    let request_id = envelope.request_id.clone();
    let payload = &envelope.payload;
    let accepted = || serde_json::json!({"accepted": true});

    let response = match envelope.command {
        CommandName::UiReady => {
            handler.on_ready().await?;
            accepted()
        }
        CommandName::ConversationSendMessage => {
            let (text, attachments) = parse_send_message(payload)?;
            handler.send_message(&text, attachments).await?;
            accepted()
        }
        CommandName::ModelsPull => {
            let name = parse_non_empty_field(payload, "name", "models.pull")?;
            handler.pull_model(&name).await?;
            serde_json::json!({"accepted": true, "name": name})
        }
        CommandName::ModelsSaveSelection => {
            let (role, model) = parse_model_selection(payload)?;
            handler.save_model_selection(role, &model).await?;
            serde_json::json!({"accepted": true, "role": role.as_str(), "model": model})
        }
        CommandName::FilesList => {
            let path = payload
                .get("path")
                .and_then(serde_json::Value::as_str)
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .unwrap_or(".");
            serde_json::to_value(handler.list_files(path).await?)?
        }
        CommandName::FilesRead => {
            let path = parse_non_empty_field(payload, "path", "files.read")?;
            serde_json::Value::String(handler.read_file(&path).await?)
        }
        CommandName::FilesWrite => {
            let path = parse_non_empty_field(payload, "path", "files.write")?;
            let content = parse_string_field(payload, "content", "files.write")?;
            serde_json::Value::Bool(handler.write_file(&path, &content).await?)
        }
        CommandName::CodeExecute => {
            let code = parse_string_field(payload, "code", "code.execute")?;
            serde_json::to_value(handler.execute_code(&code).await?)?
        }
        CommandName::TasksGet => serde_json::to_value(handler.get_tasks().await?)?,
    };

    Ok(ResponseEnvelope::ok(request_id, response))
}

fn parse_send_message(payload: &serde_json::Value) -> Result<(String, Vec<EncodedAttachment>)> {
    let text = parse_string_field(payload, "text", "conversation.send_message")?;
    let attachments = match payload.get("attachments") {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| {
            ShellError::Host(format!(
                "conversation.send_message has malformed payload.attachments: {e}"
            ))
        })?,
    };
    if text.trim().is_empty() && attachments.is_empty() {
        return Err(ShellError::Host(
            "conversation.send_message requires text or attachments".to_owned(),
        ));
    }
    Ok((text, attachments))
}

fn parse_model_selection(payload: &serde_json::Value) -> Result<(Role, String)> {
    let raw_role = parse_non_empty_field(payload, "role", "models.save_selection")?;
    let Some(role) = Role::parse(&raw_role) else {
        return Err(ShellError::Host(format!("unknown model role `{raw_role}`")));
    };
    let model = parse_string_field(payload, "model", "models.save_selection")?;
    Ok((role, model.trim().to_owned()))
}

fn parse_string_field(payload: &serde_json::Value, field: &str, command: &str) -> Result<String> {
    payload
        .get(field)
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| ShellError::Host(format!("{command} requires payload.{field}")))
}

fn parse_non_empty_field(
    payload: &serde_json::Value,
    field: &str,
    command: &str,
) -> Result<String> {
    let raw = parse_string_field(payload, field, command)?;
    let value = raw.trim();
    if value.is_empty() {
        return Err(ShellError::Host(format!(
            "{command} requires a non-empty payload.{field}"
        )));
    }
    Ok(value.to_owned())
}
