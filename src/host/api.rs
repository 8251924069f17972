//! Outbound host API: the calls the shell can make and their result types.

use crate::attachment::EncodedAttachment;
use crate::error::{Result, ShellError};
use crate::host::contract::CommandName;
use crate::state::models::Role;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Whether a file tree entry is a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Folder,
}

/// One entry of a host directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub path: String,
}

impl FileEntry {
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }
}

/// Output of a host code execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub returncode: i32,
}

/// A task card on the project board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub status: String,
}

/// Task board columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskBoard {
    pub todo: Vec<Task>,
    pub inprogress: Vec<Task>,
    pub done: Vec<Task>,
}

impl TaskBoard {
    #[must_use]
    pub fn total(&self) -> usize {
        self.todo.len() + self.inprogress.len() + self.done.len()
    }
}

/// Calls from the shell into the host. Every call may be rejected; callers
/// surface rejections to the user instead of failing.
#[async_trait]
pub trait HostApi: Send + Sync {
    /// Tell the host the shell has registered its push handlers.
    async fn ready(&self) -> Result<()>;
    async fn send_message(&self, text: &str, attachments: Vec<EncodedAttachment>) -> Result<()>;
    async fn pull_ollama_model(&self, name: &str) -> Result<()>;
    async fn save_model_selection(&self, role: Role, model: &str) -> Result<()>;
    async fn list_files(&self, path: &str) -> Result<Vec<FileEntry>>;
    async fn read_file_content(&self, path: &str) -> Result<String>;
    /// Returns whether the host actually wrote the file.
    async fn write_file_content(&self, path: &str, content: &str) -> Result<bool>;
    async fn execute_code(&self, code: &str) -> Result<ExecutionResult>;
    async fn get_tasks(&self) -> Result<TaskBoard>;
}

/// Request/response transport carrying command envelopes to a host.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Send one command and return the payload of a successful response.
    async fn request(&self, command: CommandName, payload: serde_json::Value)
    -> Result<serde_json::Value>;
}

/// [`HostApi`] over any [`CommandTransport`]: builds command payloads and
/// decodes typed results.
pub struct BridgeHost<T> {
    transport: T,
}

impl<T: CommandTransport> BridgeHost<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call<R: DeserializeOwned>(
        &self,
        command: CommandName,
        payload: serde_json::Value,
    ) -> Result<R> {
        let value = self.transport.request(command, payload).await?;
        serde_json::from_value(value).map_err(|e| {
            ShellError::Host(format!(
                "{} returned an unexpected payload: {e}",
                command.as_str()
            ))
        })
    }

    async fn fire(&self, command: CommandName, payload: serde_json::Value) -> Result<()> {
        self.transport.request(command, payload).await.map(|_| ())
    }
}

#[async_trait]
impl<T: CommandTransport> HostApi for BridgeHost<T> {
    async fn ready(&self) -> Result<()> {
        self.fire(CommandName::UiReady, serde_json::json!({})).await
    }

    async fn send_message(&self, text: &str, attachments: Vec<EncodedAttachment>) -> Result<()> {
        self.fire(
            CommandName::ConversationSendMessage,
            serde_json::json!({"text": text, "attachments": attachments}),
        )
        .await
    }

    async fn pull_ollama_model(&self, name: &str) -> Result<()> {
        self.fire(CommandName::ModelsPull, serde_json::json!({"name": name}))
            .await
    }

    async fn save_model_selection(&self, role: Role, model: &str) -> Result<()> {
        self.fire(
            CommandName::ModelsSaveSelection,
            serde_json::json!({"role": role.as_str(), "model": model}),
        )
        .await
    }

    async fn list_files(&self, path: &str) -> Result<Vec<FileEntry>> {
        self.call(CommandName::FilesList, serde_json::json!({"path": path}))
            .await
    }

    async fn read_file_content(&self, path: &str) -> Result<String> {
        self.call(CommandName::FilesRead, serde_json::json!({"path": path}))
            .await
    }

    async fn write_file_content(&self, path: &str, content: &str) -> Result<bool> {
        self.call(
            CommandName::FilesWrite,
            serde_json::json!({"path": path, "content": content}),
        )
        .await
    }

    async fn execute_code(&self, code: &str) -> Result<ExecutionResult> {
        self.call(CommandName::CodeExecute, serde_json::json!({"code": code}))
            .await
    }

    async fn get_tasks(&self) -> Result<TaskBoard> {
        self.call(CommandName::TasksGet, serde_json::json!({})).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::sync::Mutex;

    /// Replays a canned payload and records what was requested.
    struct Canned {
        reply: serde_json::Value,
        seen: Mutex<Vec<(CommandName, serde_json::Value)>>,
    }

    impl Canned {
        fn new(reply: serde_json::Value) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CommandTransport for Canned {
        async fn request(
            &self,
            command: CommandName,
            payload: serde_json::Value,
        ) -> Result<serde_json::Value> {
            self.seen.lock().unwrap().push((command, payload));
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn send_message_carries_encoded_attachments() {
        let host = BridgeHost::new(Canned::new(serde_json::json!({"accepted": true})));
        let attachment = EncodedAttachment {
            name: "a.txt".to_owned(),
            mime_type: "text/plain".to_owned(),
            content: "aGk=".to_owned(),
        };
        host.send_message("hi", vec![attachment]).await.unwrap();

        let seen = host.transport().seen.lock().unwrap();
        let (command, payload) = &seen[0];
        assert_eq!(*command, CommandName::ConversationSendMessage);
        assert_eq!(payload["text"], "hi");
        assert_eq!(payload["attachments"][0]["type"], "text/plain");
        assert_eq!(payload["attachments"][0]["content"], "aGk=");
    }

    #[tokio::test]
    async fn save_selection_uses_wire_role_name() {
        let host = BridgeHost::new(Canned::new(serde_json::json!({"accepted": true})));
        host.save_model_selection(Role::Coder, "llama3").await.unwrap();
        let seen = host.transport().seen.lock().unwrap();
        assert_eq!(seen[0].1["role"], "CODER_MODEL");
        assert_eq!(seen[0].1["model"], "llama3");
    }

    #[tokio::test]
    async fn typed_results_are_decoded() {
        let host = BridgeHost::new(Canned::new(serde_json::json!([
            {"name": "src", "type": "folder", "path": "./src"},
            {"name": "main.py", "type": "file", "path": "./main.py"}
        ])));
        let entries = host.list_files(".").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(!entries[0].is_file());
        assert!(entries[1].is_file());

        let host = BridgeHost::new(Canned::new(serde_json::json!({
            "todo": [{"id": 1, "title": "a", "status": "todo"}],
            "done": []
        })));
        let board = host.get_tasks().await.unwrap();
        assert_eq!(board.todo.len(), 1);
        assert!(board.inprogress.is_empty());
        assert_eq!(board.total(), 1);
    }

    #[tokio::test]
    async fn unexpected_payload_is_a_host_error() {
        let host = BridgeHost::new(Canned::new(serde_json::json!({"accepted": true})));
        let err = host.read_file_content("a.py").await.unwrap_err();
        assert!(matches!(err, ShellError::Host(ref m) if m.contains("files.read")));
    }
}
