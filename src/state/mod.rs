//! View-state machines driven by host pushes and user actions.

pub mod agent;
pub mod connection;
pub mod conversation;
pub mod logs;
pub mod models;
pub mod panels;
pub mod workspace;

pub use agent::{AgentState, AgentStatePatch};
pub use connection::ConnectionState;
pub use conversation::{ConversationStore, Feedback, Message, MessageAuthor};
pub use logs::{DEFAULT_LOG_CAPACITY, LogEntry, LogLevel, LogRingBuffer};
pub use models::{ModelRegistry, OllamaModel, Role, RoleModels};
pub use panels::{Panel, PanelSet, RIGHT_PANELS};
pub use workspace::{ProjectBoard, WorkspaceView};
