//! Versioned command/response/event envelopes exchanged with the host.

use crate::error::{Result, ShellError};
use serde::{Deserialize, Serialize};

/// Contract version for host command/event envelopes.
pub const EVENT_VERSION: u32 = 1;

/// Calls the shell makes into the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandName {
    #[serde(rename = "ui.ready")]
    UiReady,
    #[serde(rename = "conversation.send_message")]
    ConversationSendMessage,
    #[serde(rename = "models.pull")]
    ModelsPull,
    #[serde(rename = "models.save_selection")]
    ModelsSaveSelection,
    #[serde(rename = "files.list")]
    FilesList,
    #[serde(rename = "files.read")]
    FilesRead,
    #[serde(rename = "files.write")]
    FilesWrite,
    #[serde(rename = "code.execute")]
    CodeExecute,
    #[serde(rename = "tasks.get")]
    TasksGet,
}

impl CommandName {
    /// Render command name to wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UiReady => "ui.ready",
            Self::ConversationSendMessage => "conversation.send_message",
            Self::ModelsPull => "models.pull",
            Self::ModelsSaveSelection => "models.save_selection",
            Self::FilesList => "files.list",
            Self::FilesRead => "files.read",
            Self::FilesWrite => "files.write",
            Self::CodeExecute => "code.execute",
            Self::TasksGet => "tasks.get",
        }
    }

    /// Parse a command name from wire format.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ui.ready" => Some(Self::UiReady),
            "conversation.send_message" => Some(Self::ConversationSendMessage),
            "models.pull" => Some(Self::ModelsPull),
            "models.save_selection" => Some(Self::ModelsSaveSelection),
            "files.list" => Some(Self::FilesList),
            "files.read" => Some(Self::FilesRead),
            "files.write" => Some(Self::FilesWrite),
            "code.execute" => Some(Self::CodeExecute),
            "tasks.get" => Some(Self::TasksGet),
            _ => None,
        }
    }
}

/// Pushes the host sends to the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    #[serde(rename = "ui.initialize")]
    UiInitialize,
    #[serde(rename = "conversation.agent_message")]
    ConversationAgentMessage,
    #[serde(rename = "conversation.system_message")]
    ConversationSystemMessage,
    #[serde(rename = "agent.state")]
    AgentState,
    #[serde(rename = "models.pull_progress")]
    ModelsPullProgress,
    #[serde(rename = "models.refresh")]
    ModelsRefresh,
    #[serde(rename = "log.entry")]
    LogEntry,
}

impl EventName {
    /// Render event name to wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UiInitialize => "ui.initialize",
            Self::ConversationAgentMessage => "conversation.agent_message",
            Self::ConversationSystemMessage => "conversation.system_message",
            Self::AgentState => "agent.state",
            Self::ModelsPullProgress => "models.pull_progress",
            Self::ModelsRefresh => "models.refresh",
            Self::LogEntry => "log.entry",
        }
    }

    /// Parse an event name from wire format.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ui.initialize" => Some(Self::UiInitialize),
            "conversation.agent_message" => Some(Self::ConversationAgentMessage),
            "conversation.system_message" => Some(Self::ConversationSystemMessage),
            "agent.state" => Some(Self::AgentState),
            "models.pull_progress" => Some(Self::ModelsPullProgress),
            "models.refresh" => Some(Self::ModelsRefresh),
            "log.entry" => Some(Self::LogEntry),
            _ => None,
        }
    }
}

/// A versioned response envelope from host -> shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub v: u32,
    pub request_id: String,
    pub ok: bool,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// Build a successful response envelope.
    #[must_use]
    pub fn ok(request_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: true,
            payload,
            error: None,
        }
    }

    /// Build an error response envelope.
    #[must_use]
    pub fn error(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: false,
            payload: serde_json::Value::Null,
            error: Some(message.into()),
        }
    }

    /// Unwrap the payload of a successful response.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Host`] carrying the host's message when `ok` is
    /// false.
    pub fn into_result(self) -> Result<serde_json::Value> {
        if self.ok {
            Ok(self.payload)
        } else {
            Err(ShellError::Host(
                self.error
                    .unwrap_or_else(|| "host call failed".to_owned()),
            ))
        }
    }
}

/// A versioned command envelope from shell -> host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub v: u32,
    pub request_id: String,
    pub command: CommandName,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl CommandEnvelope {
    /// Build a v1 command envelope.
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        command: CommandName,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            command,
            payload,
        }
    }

    /// Validate envelope version and required identifiers.
    pub fn validate(&self) -> std::result::Result<(), ContractError> {
        check_version(self.v)?;
        if self.request_id.trim().is_empty() {
            return Err(ContractError::new(
                ContractErrorKind::InvalidEnvelope,
                "request_id cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// A versioned event envelope from host -> shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub v: u32,
    pub event_id: String,
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Build a v1 event envelope.
    #[must_use]
    pub fn new(
        event_id: impl Into<String>,
        event: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            event_id: event_id.into(),
            event: event.into(),
            payload,
        }
    }

    /// Validate the version and resolve the event name.
    pub fn validate(&self) -> std::result::Result<EventName, ContractError> {
        check_version(self.v)?;
        EventName::parse(&self.event).ok_or_else(|| {
            ContractError::new(
                ContractErrorKind::UnknownEvent,
                format!("unknown event `{}`", self.event),
            )
        })
    }
}

fn check_version(v: u32) -> std::result::Result<(), ContractError> {
    if v != EVENT_VERSION {
        return Err(ContractError::new(
            ContractErrorKind::UnsupportedVersion,
            format!("unsupported contract version {v}; expected {EVENT_VERSION}"),
        ));
    }
    Ok(())
}

/// Contract validation error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractErrorKind {
    UnsupportedVersion,
    InvalidEnvelope,
    UnknownEvent,
}

/// Contract validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractError {
    pub kind: ContractErrorKind,
    pub message: String,
}

impl ContractError {
    #[must_use]
    pub fn new(kind: ContractErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

impl std::fmt::Display for ContractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ContractError {}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    const COMMANDS: [CommandName; 9] = [
        CommandName::UiReady,
        CommandName::ConversationSendMessage,
        CommandName::ModelsPull,
        CommandName::ModelsSaveSelection,
        CommandName::FilesList,
        CommandName::FilesRead,
        CommandName::FilesWrite,
        CommandName::CodeExecute,
        CommandName::TasksGet,
    ];

    #[test]
    fn command_names_match_serde_names() {
        for command in COMMANDS {
            let json = serde_json::to_value(command).unwrap();
            assert_eq!(json, command.as_str());
            assert_eq!(CommandName::parse(command.as_str()), Some(command));
        }
        assert_eq!(CommandName::parse("host.ping"), None);
    }

    #[test]
    fn command_validation_rejects_bad_version_and_blank_id() {
        let mut envelope = CommandEnvelope::new("req-1", CommandName::UiReady, serde_json::json!({}));
        assert!(envelope.validate().is_ok());

        envelope.v = 2;
        let err = envelope.validate().unwrap_err();
        assert_eq!(err.kind, ContractErrorKind::UnsupportedVersion);

        envelope.v = EVENT_VERSION;
        envelope.request_id = "  ".to_owned();
        let err = envelope.validate().unwrap_err();
        assert_eq!(err.kind, ContractErrorKind::InvalidEnvelope);
    }

    #[test]
    fn event_validation_resolves_known_names() {
        let envelope = EventEnvelope::new("evt-1", "agent.state", serde_json::json!({}));
        assert_eq!(envelope.validate().unwrap(), EventName::AgentState);

        let unknown = EventEnvelope::new("evt-2", "orb.flash", serde_json::json!({}));
        assert_eq!(
            unknown.validate().unwrap_err().kind,
            ContractErrorKind::UnknownEvent
        );
    }

    #[test]
    fn error_response_maps_to_host_error() {
        let err = ResponseEnvelope::error("req-1", "no such model")
            .into_result()
            .unwrap_err();
        assert!(matches!(err, ShellError::Host(ref m) if m == "no such model"));

        let mut missing = ResponseEnvelope::error("req-2", "x");
        missing.error = None;
        assert!(missing.into_result().unwrap_err().to_string().contains("host call failed"));

        let ok = ResponseEnvelope::ok("req-3", serde_json::json!({"accepted": true}));
        assert_eq!(ok.into_result().unwrap()["accepted"], true);
    }

    #[test]
    fn response_without_optional_fields_parses() {
        let parsed: ResponseEnvelope =
            serde_json::from_str(r#"{"v":1,"request_id":"r","ok":true}"#).unwrap();
        assert!(parsed.payload.is_null());
        assert!(parsed.error.is_none());
    }
}
