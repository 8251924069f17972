//! Shell side of the bridge: handler registration, the readiness handshake
//! and the single-owner UI event loop.
//!
//! Host pushes and outbound call completions are funnelled through one
//! unbounded queue and applied to the registered [`InboundHandlers`] strictly
//! in arrival order.

use crate::attachment::Attachment;
use crate::config::UiConfig;
use crate::error::{Result, ShellError};
use crate::frontend::{Completion, Frontend};
use crate::host::api::HostApi;
use crate::host::push::HostPush;
use crate::state::agent::AgentStatePatch;
use crate::state::logs::LogEntry;
use crate::state::models::{OllamaModel, RoleModels};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Callbacks the host drives. They may fire at any time, in any order, and
/// before any outbound call has completed.
pub trait InboundHandlers: Send {
    fn initialize(&mut self, models: Vec<OllamaModel>, role_models: RoleModels);
    fn add_agent_message(&mut self, content: String, attachments: Vec<Attachment>);
    fn add_system_message(&mut self, content: String);
    fn update_agent_state(&mut self, patch: AgentStatePatch);
    fn update_model_pull_progress(&mut self, status: String);
    fn refresh_ollama_models(&mut self, models: Vec<OllamaModel>);
    fn add_log_message(&mut self, entry: LogEntry);

    /// A detached outbound call finished.
    fn outbound_completed(&mut self, completion: Completion) {
        tracing::debug!(?completion, "outbound call completed");
    }
}

/// One item on the UI event queue.
#[derive(Debug)]
pub enum UiEvent {
    Push(HostPush),
    Completed(Completion),
}

/// Cloneable handle feeding the UI event queue. Transports deliver host
/// pushes through it; detached outbound calls report back through it.
#[derive(Debug, Clone)]
pub struct PushSink {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl PushSink {
    /// Queue a host push. Returns `false` once the event loop is gone.
    pub fn push(&self, push: HostPush) -> bool {
        self.tx.send(UiEvent::Push(push)).is_ok()
    }

    pub(crate) fn complete(&self, completion: Completion) -> bool {
        self.tx.send(UiEvent::Completed(completion)).is_ok()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Owns the UI event queue and the host handle until handlers register.
pub struct BridgeAdapter {
    sink: PushSink,
    rx: Option<mpsc::UnboundedReceiver<UiEvent>>,
    host: Option<Arc<dyn HostApi>>,
    ready_sent: bool,
}

impl Default for BridgeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeAdapter {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            sink: PushSink { tx },
            rx: Some(rx),
            host: None,
            ready_sent: false,
        }
    }

    /// Sink a transport uses to deliver host pushes.
    #[must_use]
    pub fn push_sink(&self) -> PushSink {
        self.sink.clone()
    }

    pub fn attach_host(&mut self, host: Arc<dyn HostApi>) {
        self.host = Some(host);
    }

    #[must_use]
    pub fn host(&self) -> Option<Arc<dyn HostApi>> {
        self.host.clone()
    }

    /// Build a [`Frontend`] wired to this adapter's host and queue.
    #[must_use]
    pub fn frontend(&self, config: &UiConfig) -> Frontend {
        Frontend::new(self.host.clone(), self.sink.clone(), config)
    }

    /// Register the inbound handlers. Allowed exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Bridge`] on a second registration.
    pub fn register<H: InboundHandlers>(&mut self, handlers: H) -> Result<FrontendLoop<H>> {
        let rx = self
            .rx
            .take()
            .ok_or_else(|| ShellError::Bridge("inbound handlers already registered".to_owned()))?;
        tracing::debug!("inbound handlers registered");
        Ok(FrontendLoop { handlers, rx })
    }

    /// Tell the host the shell is ready for `initialize`.
    ///
    /// Sent at most once per adapter; later calls are no-ops. Handlers must
    /// be registered first.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Bridge`] if handlers are not registered or no
    /// host is attached, and the host's error if it rejects the call.
    pub async fn signal_ready(&mut self) -> Result<()> {
        if self.rx.is_some() {
            return Err(ShellError::Bridge(
                "inbound handlers must be registered before signalling readiness".to_owned(),
            ));
        }
        if self.ready_sent {
            tracing::debug!("readiness already signalled; ignoring");
            return Ok(());
        }
        let Some(host) = self.host.clone() else {
            tracing::error!("host bridge unavailable; the shell will stay disconnected");
            return Err(ShellError::Bridge("no host attached".to_owned()));
        };

        self.ready_sent = true;
        host.ready().await.inspect_err(|e| {
            tracing::error!(error = %e, "host rejected readiness signal");
        })?;
        tracing::info!("readiness signalled to host");
        Ok(())
    }

    #[must_use]
    pub fn ready_sent(&self) -> bool {
        self.ready_sent
    }
}

/// Registered handlers plus the queue feeding them.
pub struct FrontendLoop<H> {
    handlers: H,
    rx: mpsc::UnboundedReceiver<UiEvent>,
}

impl<H: InboundHandlers> FrontendLoop<H> {
    /// Wait for the next event and apply it.
    ///
    /// Returns `false` only after every [`PushSink`] clone is dropped: the
    /// adapter's, any transport's, and the one a registered [`Frontend`]
    /// keeps for its outbound calls. A loop driving a `Frontend` therefore
    /// never sees `false` while that `Frontend` is alive.
    pub async fn next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    /// Apply every event already queued without waiting. Returns how many
    /// were applied.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::Push(push) => {
                tracing::trace!(event = push.event_name().as_str(), "applying host push");
                push.dispatch(&mut self.handlers);
            }
            UiEvent::Completed(completion) => self.handlers.outbound_completed(completion),
        }
    }

    #[must_use]
    pub fn handlers(&self) -> &H {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut H {
        &mut self.handlers
    }

    pub fn into_handlers(self) -> H {
        self.handlers
    }
}
