//! Typed host pushes and their event envelope encoding.

use crate::attachment::Attachment;
use crate::bridge::InboundHandlers;
use crate::error::Result;
use crate::host::contract::{EventEnvelope, EventName};
use crate::state::agent::AgentStatePatch;
use crate::state::logs::LogEntry;
use crate::state::models::{OllamaModel, RoleModels};
use serde::Deserialize;

/// A push from the host. Pushes can arrive at any time, in any order.
#[derive(Debug, Clone, PartialEq)]
pub enum HostPush {
    /// Initial snapshot; connects the shell.
    Initialize {
        models: Vec<OllamaModel>,
        role_models: RoleModels,
    },
    AgentMessage {
        content: String,
        attachments: Vec<Attachment>,
    },
    SystemMessage {
        content: String,
    },
    /// Partial agent activity update.
    AgentState(AgentStatePatch),
    PullProgress {
        status: String,
    },
    RefreshModels {
        models: Vec<OllamaModel>,
    },
    Log(LogEntry),
}

#[derive(Deserialize)]
struct InitializePayload {
    #[serde(default)]
    models: Vec<OllamaModel>,
    #[serde(default)]
    role_models: RoleModels,
}

#[derive(Deserialize)]
struct MessagePayload {
    content: String,
    #[serde(default)]
    attachments: Vec<Attachment>,
}

#[derive(Deserialize)]
struct PullProgressPayload {
    #[serde(default)]
    status: String,
}

#[derive(Deserialize)]
struct ModelsPayload {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

impl HostPush {
    #[must_use]
    pub fn event_name(&self) -> EventName {
        match self {
            Self::Initialize { .. } => EventName::UiInitialize,
            Self::AgentMessage { .. } => EventName::ConversationAgentMessage,
            Self::SystemMessage { .. } => EventName::ConversationSystemMessage,
            Self::AgentState(_) => EventName::AgentState,
            Self::PullProgress { .. } => EventName::ModelsPullProgress,
            Self::RefreshModels { .. } => EventName::ModelsRefresh,
            Self::Log(_) => EventName::LogEntry,
        }
    }

    /// Encode as a v1 event envelope with a fresh event id.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn to_envelope(&self) -> Result<EventEnvelope> {
        let payload = match self {
            Self::Initialize {
                models,
                role_models,
            } => serde_json::json!({"models": models, "role_models": role_models}),
            Self::AgentMessage {
                content,
                attachments,
            } => serde_json::json!({"content": content, "attachments": attachments}),
            Self::SystemMessage { content } => serde_json::json!({"content": content}),
            Self::AgentState(patch) => serde_json::to_value(patch)?,
            Self::PullProgress { status } => serde_json::json!({"status": status}),
            Self::RefreshModels { models } => serde_json::json!({"models": models}),
            Self::Log(entry) => serde_json::to_value(entry)?,
        };
        Ok(EventEnvelope::new(
            uuid::Uuid::new_v4().to_string(),
            self.event_name().as_str(),
            payload,
        ))
    }

    /// Decode a validated event envelope.
    ///
    /// # Errors
    ///
    /// Returns a contract error for a wrong version or unknown event name, and
    /// a JSON error when the payload does not match the event.
    pub fn from_envelope(envelope: &EventEnvelope) -> Result<Self> {
        let name = envelope.validate()?;
        let payload = envelope.payload.clone();
        let push = match name {
            EventName::UiInitialize => {
                let p: InitializePayload = serde_json::from_value(payload)?;
                Self::Initialize {
                    models: p.models,
                    role_models: p.role_models,
                }
            }
            EventName::ConversationAgentMessage => {
                let p: MessagePayload = serde_json::from_value(payload)?;
                Self::AgentMessage {
                    content: p.content,
                    attachments: p.attachments,
                }
            }
            EventName::ConversationSystemMessage => {
                let p: MessagePayload = serde_json::from_value(payload)?;
                Self::SystemMessage { content: p.content }
            }
            EventName::AgentState => Self::AgentState(serde_json::from_value(payload)?),
            EventName::ModelsPullProgress => {
                let p: PullProgressPayload = serde_json::from_value(payload)?;
                Self::PullProgress { status: p.status }
            }
            EventName::ModelsRefresh => {
                let p: ModelsPayload = serde_json::from_value(payload)?;
                Self::RefreshModels { models: p.models }
            }
            EventName::LogEntry => Self::Log(serde_json::from_value(payload)?),
        };
        Ok(push)
    }

    /// Deliver this push to the matching inbound handler.
    pub fn dispatch<H: InboundHandlers + ?Sized>(self, handlers: &mut H) {
        match self {
            Self::Initialize {
                models,
                role_models,
            } => handlers.initialize(models, role_models),
            Self::AgentMessage {
                content,
                attachments,
            } => handlers.add_agent_message(content, attachments),
            Self::SystemMessage { content } => handlers.add_system_message(content),
            Self::AgentState(patch) => handlers.update_agent_state(patch),
            Self::PullProgress { status } => handlers.update_model_pull_progress(status),
            Self::RefreshModels { models } => handlers.refresh_ollama_models(models),
            Self::Log(entry) => handlers.add_log_message(entry),
        }
    }
}
