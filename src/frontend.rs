//! The shell's single view-state owner.
//!
//! [`Frontend`] holds every piece of UI state and is only ever mutated from
//! the UI event loop: user actions call its methods directly, host pushes and
//! outbound completions arrive through [`InboundHandlers`]. Outbound calls
//! run as detached tasks and report back as [`Completion`] events, so no
//! method ever blocks on the host.

use crate::attachment::{Attachment, SelectedFile, encode_all};
use crate::bridge::{InboundHandlers, PushSink};
use crate::config::UiConfig;
use crate::host::api::{ExecutionResult, FileEntry, HostApi, TaskBoard};
use crate::state::{
    AgentState, AgentStatePatch, ConnectionState, ConversationStore, Feedback, LogEntry,
    LogRingBuffer, Message, MessageAuthor, ModelRegistry, OllamaModel, Panel, PanelSet,
    ProjectBoard, Role, RoleModels, WorkspaceView,
};
use crate::theme::Theme;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

/// Outcome of a detached outbound call. Errors are already rendered to text.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    MessageSent(Result<(), String>),
    PullRequested {
        name: String,
        result: Result<(), String>,
    },
    SelectionSaved {
        role: Role,
        model: String,
        result: Result<(), String>,
    },
    FilesListed(Result<Vec<FileEntry>, String>),
    FileRead {
        path: String,
        result: Result<String, String>,
    },
    FileWritten {
        path: String,
        result: Result<bool, String>,
    },
    CodeExecuted {
        path: String,
        result: Result<ExecutionResult, String>,
    },
    TasksLoaded(Result<TaskBoard, String>),
}

/// Serializable snapshot of everything a presentation layer draws.
#[derive(Debug, Clone, Serialize)]
pub struct ViewModel {
    pub connection: ConnectionState,
    pub messages: Vec<Message>,
    pub agent: AgentState,
    pub active_panels: Vec<Panel>,
    pub right_panel: Option<Panel>,
    pub theme: Theme,
    pub models: Vec<OllamaModel>,
    pub role_models: RoleModels,
    pub pull_progress: String,
    pub logs: Vec<LogEntry>,
    pub workspace: WorkspaceView,
    pub board: TaskBoard,
}

pub struct Frontend {
    host: Option<Arc<dyn HostApi>>,
    sink: PushSink,
    max_attachment_bytes: u64,
    connection: ConnectionState,
    conversation: ConversationStore,
    agent: AgentState,
    panels: PanelSet,
    theme: Theme,
    registry: ModelRegistry,
    logs: LogRingBuffer,
    workspace: WorkspaceView,
    board: ProjectBoard,
}

impl Frontend {
    #[must_use]
    pub fn new(host: Option<Arc<dyn HostApi>>, sink: PushSink, config: &UiConfig) -> Self {
        Self {
            host,
            sink,
            max_attachment_bytes: config.max_attachment_bytes,
            connection: ConnectionState::default(),
            conversation: ConversationStore::new(),
            agent: AgentState::idle(),
            panels: PanelSet::default(),
            theme: config.theme,
            registry: ModelRegistry::new(),
            logs: LogRingBuffer::seeded(config.log_capacity),
            workspace: WorkspaceView::new(),
            board: ProjectBoard::default(),
        }
    }

    /// Host handle, but only once connected. User-initiated calls go
    /// through here so nothing reaches the host before `initialize`.
    fn connected_host(&self, action: &str) -> Option<Arc<dyn HostApi>> {
        if !self.connection.is_connected() {
            tracing::debug!(action, "ignoring user action while disconnected");
            return None;
        }
        let host = self.host.clone();
        if host.is_none() {
            tracing::error!(action, "no host attached; dropping outbound call");
        }
        host
    }

    fn spawn_call<F>(&self, call: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            let completion = call.await;
            if !sink.complete(completion) {
                tracing::debug!("event loop gone; dropping outbound completion");
            }
        });
    }

    fn report_error(&mut self, description: &str) {
        self.conversation
            .append(MessageAuthor::System, format!("Error: {description}"), Vec::new());
    }

    /// Send a chat message with optional attachments.
    ///
    /// Returns `false` (and changes nothing) while disconnected or when there
    /// is neither text nor a file. Otherwise the user message is appended and
    /// the agent marked thinking before the host is called.
    pub fn send_message(&mut self, text: &str, files: Vec<SelectedFile>) -> bool {
        if text.trim().is_empty() && files.is_empty() {
            return false;
        }
        let Some(host) = self.connected_host("send_message") else {
            return false;
        };

        let metadata: Vec<Attachment> = files.iter().map(SelectedFile::metadata).collect();
        let id = self
            .conversation
            .append(MessageAuthor::User, text, metadata);
        self.agent = AgentState::thinking();
        tracing::info!(message_id = %id, attachments = files.len(), "sending message");

        let text = text.to_owned();
        let max_bytes = self.max_attachment_bytes;
        self.spawn_call(async move {
            let result: crate::error::Result<()> = async {
                let encoded = encode_all(&files, max_bytes).await?;
                host.send_message(&text, encoded).await
            }
            .await;
            Completion::MessageSent(result.map_err(|e| e.to_string()))
        });
        true
    }

    /// Assign `model` to `role` immediately and persist it in the background.
    /// The local assignment stands whatever the host answers.
    pub fn change_role(&mut self, role: Role, model: &str) -> bool {
        let Some(host) = self.connected_host("change_role") else {
            return false;
        };
        self.registry.assign(role, model);

        let model = model.to_owned();
        self.spawn_call(async move {
            let result = host.save_model_selection(role, &model).await;
            Completion::SelectionSaved {
                role,
                model,
                result: result.map_err(|e| e.to_string()),
            }
        });
        true
    }

    /// Ask the host to pull a model. Ignored while another pull is in flight
    /// or when the trimmed name is blank.
    pub fn pull_model(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        if self.registry.is_pulling() {
            tracing::debug!(
                progress = self.registry.pull_progress(),
                "pull already in flight; ignoring"
            );
            return false;
        }
        let Some(host) = self.connected_host("pull_model") else {
            return false;
        };

        let name = name.to_owned();
        self.spawn_call(async move {
            let result = host.pull_ollama_model(&name).await;
            Completion::PullRequested {
                name,
                result: result.map_err(|e| e.to_string()),
            }
        });
        true
    }

    /// Toggle a panel and return whether it is shown afterwards. Opening the
    /// code panel or the project board fetches its data.
    pub fn toggle_panel(&mut self, panel: Panel) -> bool {
        let shown = self.panels.toggle(panel);
        if shown {
            self.load_panel_data(panel);
        }
        shown
    }

    fn load_panel_data(&mut self, panel: Panel) {
        match panel {
            Panel::Code => {
                self.refresh_files();
            }
            Panel::ProjectBoard => {
                self.refresh_tasks();
            }
            Panel::Sidebar | Panel::Logs | Panel::Canvas => {}
        }
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    /// Rate a message. Returns `false` for an unknown id.
    pub fn set_feedback(&mut self, message_id: &str, feedback: Feedback) -> bool {
        self.conversation.set_feedback(message_id, feedback)
    }

    /// Reload the root file listing.
    pub fn refresh_files(&mut self) -> bool {
        let Some(host) = self.connected_host("list_files") else {
            return false;
        };
        self.spawn_call(async move {
            Completion::FilesListed(host.list_files(".").await.map_err(|e| e.to_string()))
        });
        true
    }

    /// Reload the project board.
    pub fn refresh_tasks(&mut self) -> bool {
        let Some(host) = self.connected_host("get_tasks") else {
            return false;
        };
        self.spawn_call(async move {
            Completion::TasksLoaded(host.get_tasks().await.map_err(|e| e.to_string()))
        });
        true
    }

    /// Open a file in the code panel and load its content.
    pub fn open_file(&mut self, path: &str) -> bool {
        let Some(host) = self.connected_host("open_file") else {
            return false;
        };
        self.workspace.select(path);

        let path = path.to_owned();
        self.spawn_call(async move {
            let result = host.read_file_content(&path).await;
            Completion::FileRead {
                path,
                result: result.map_err(|e| e.to_string()),
            }
        });
        true
    }

    /// Replace the edit buffer. Local only.
    pub fn edit_buffer(&mut self, text: &str) -> bool {
        self.workspace.edit(text)
    }

    /// Write the edit buffer back to the open file.
    pub fn save_file(&mut self) -> bool {
        let Some(path) = self.workspace.open_file().map(str::to_owned) else {
            return false;
        };
        let Some(host) = self.connected_host("save_file") else {
            return false;
        };

        let content = self.workspace.buffer().to_owned();
        self.spawn_call(async move {
            let result = host.write_file_content(&path, &content).await;
            Completion::FileWritten {
                path,
                result: result.map_err(|e| e.to_string()),
            }
        });
        true
    }

    /// Execute the edit buffer of the open file.
    pub fn run_code(&mut self) -> bool {
        let Some(path) = self.workspace.open_file().map(str::to_owned) else {
            return false;
        };
        let Some(host) = self.connected_host("run_code") else {
            return false;
        };
        self.workspace.begin_run(&path);

        let code = self.workspace.buffer().to_owned();
        self.spawn_call(async move {
            let result = host.execute_code(&code).await;
            Completion::CodeExecuted {
                path,
                result: result.map_err(|e| e.to_string()),
            }
        });
        true
    }

    #[must_use]
    pub fn view(&self) -> ViewModel {
        ViewModel {
            connection: self.connection,
            messages: self.conversation.messages().to_vec(),
            agent: self.agent,
            active_panels: self.panels.iter().collect(),
            right_panel: self.panels.active_right_panel(),
            theme: self.theme,
            models: self.registry.models().to_vec(),
            role_models: self.registry.roles().clone(),
            pull_progress: self.registry.pull_progress().to_owned(),
            logs: self.logs.to_vec(),
            workspace: self.workspace.clone(),
            board: self.board.board().clone(),
        }
    }

    #[must_use]
    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    #[must_use]
    pub fn conversation(&self) -> &ConversationStore {
        &self.conversation
    }

    #[must_use]
    pub fn agent(&self) -> AgentState {
        self.agent
    }

    #[must_use]
    pub fn panels(&self) -> &PanelSet {
        &self.panels
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    #[must_use]
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    #[must_use]
    pub fn logs(&self) -> &LogRingBuffer {
        &self.logs
    }

    #[must_use]
    pub fn workspace(&self) -> &WorkspaceView {
        &self.workspace
    }

    #[must_use]
    pub fn board(&self) -> &ProjectBoard {
        &self.board
    }
}

impl InboundHandlers for Frontend {
    fn initialize(&mut self, models: Vec<OllamaModel>, role_models: RoleModels) {
        let first = self.connection.mark_initialized();
        tracing::info!(models = models.len(), first, "host initialized");
        self.registry.replace_models(models);
        self.registry.replace_roles(role_models);
        if first {
            if let Some(panel) = self.panels.active_right_panel() {
                self.load_panel_data(panel);
            }
        }
    }

    fn add_agent_message(&mut self, content: String, attachments: Vec<Attachment>) {
        self.conversation
            .append(MessageAuthor::Agent, content, attachments);
        self.agent = AgentState::idle();
    }

    fn add_system_message(&mut self, content: String) {
        self.conversation
            .append(MessageAuthor::System, content, Vec::new());
    }

    fn update_agent_state(&mut self, patch: AgentStatePatch) {
        self.agent.apply(patch);
    }

    fn update_model_pull_progress(&mut self, status: String) {
        self.registry.set_pull_progress(status);
    }

    fn refresh_ollama_models(&mut self, models: Vec<OllamaModel>) {
        self.registry.replace_models(models);
    }

    fn add_log_message(&mut self, entry: LogEntry) {
        self.logs.append(entry);
    }

    fn outbound_completed(&mut self, completion: Completion) {
        match completion {
            Completion::MessageSent(Ok(())) => tracing::debug!("message delivered to host"),
            Completion::MessageSent(Err(e)) => {
                tracing::warn!(error = %e, "send failed");
                self.report_error(&e);
                self.agent = AgentState::idle();
            }
            Completion::PullRequested { name, result } => match result {
                Ok(()) => tracing::info!(model = %name, "pull accepted"),
                Err(e) => {
                    tracing::warn!(model = %name, error = %e, "pull failed");
                    self.report_error(&e);
                    self.registry.clear_pull_progress();
                }
            },
            Completion::SelectionSaved {
                role,
                model,
                result,
            } => match result {
                Ok(()) => tracing::debug!(role = role.as_str(), model = %model, "selection saved"),
                Err(e) => {
                    tracing::warn!(
                        role = role.as_str(),
                        model = %model,
                        error = %e,
                        "failed to persist model selection; keeping local choice"
                    );
                    self.report_error(&e);
                }
            },
            Completion::FilesListed(result) => match result {
                Ok(entries) => self.workspace.set_tree(entries),
                Err(e) => self.report_error(&e),
            },
            Completion::FileRead { path, result } => match result {
                Ok(content) => {
                    if !self.workspace.apply_content(&path, content) {
                        tracing::debug!(path = %path, "discarding content for closed file");
                    }
                }
                Err(e) => self.report_error(&e),
            },
            Completion::FileWritten { path, result } => match result {
                Ok(saved) => {
                    self.workspace.apply_save(&path, saved);
                }
                Err(e) => {
                    self.report_error(&e);
                    self.workspace.apply_save(&path, false);
                }
            },
            Completion::CodeExecuted { path, result } => match result {
                Ok(output) => {
                    if !self.workspace.apply_run(&path, &output) {
                        tracing::debug!(path = %path, "discarding output for closed file");
                    }
                }
                Err(e) => {
                    self.report_error(&e);
                    self.workspace.apply_failure(&path, &e);
                }
            },
            Completion::TasksLoaded(result) => match result {
                Ok(board) => self.board.replace(board),
                Err(e) => self.report_error(&e),
            },
        }
    }
}
