//! Singularity: the shell core of a chat-style desktop front end for an AI
//! agent.
//!
//! The crate owns the UI state and the bridge to the host process that runs
//! the agent:
//!
//! - **Bridge**: handler registration, the readiness handshake and a single
//!   ordered event loop for host pushes and call completions
//! - **Frontend**: conversation, agent flags, panels, models, logs and the
//!   code workspace, updated only from that loop
//! - **Host**: versioned NDJSON envelopes, a typed call surface and the
//!   in-process, stdio and child-process transports

pub mod attachment;
pub mod bridge;
pub mod config;
pub mod error;
pub mod frontend;
pub mod host;
pub mod shell;
pub mod state;
pub mod theme;

pub use bridge::{BridgeAdapter, FrontendLoop, InboundHandlers, PushSink};
pub use config::ShellConfig;
pub use error::{Result, ShellError};
pub use frontend::{Completion, Frontend, ViewModel};
pub use host::api::{BridgeHost, HostApi};
pub use theme::Theme;
