//! Out-of-process host: speaks the NDJSON protocol to a child process.
//!
//! Commands are written to the child's stdin; a reader task parses its
//! stdout, completing pending requests by `request_id` and forwarding events
//! to the shell's [`PushSink`]. When the child's output closes, every pending
//! and future request fails with a channel error.

use crate::bridge::PushSink;
use crate::config::HostConfig;
use crate::error::{Result, ShellError};
use crate::host::api::CommandTransport;
use crate::host::contract::{CommandEnvelope, CommandName, EventEnvelope, ResponseEnvelope};
use crate::host::push::HostPush;
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<ResponseEnvelope>>>>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

pub struct ProcessHost {
    writer: tokio::sync::Mutex<BoxedWriter>,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    reader: JoinHandle<()>,
    child: Option<Child>,
}

impl ProcessHost {
    /// Launch the configured host command with piped stdio.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Host`] if the process cannot be started.
    pub fn spawn(config: &HostConfig, sink: PushSink) -> Result<Self> {
        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            ShellError::Host(format!("failed to start host `{}`: {e}", config.command))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ShellError::Host("host stdin was not captured".to_owned()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ShellError::Host("host stdout was not captured".to_owned()))?;

        tracing::info!(command = %config.command, pid = ?child.id(), "host process started");
        let mut host = Self::from_io(stdout, stdin, sink);
        host.child = Some(child);
        Ok(host)
    }

    /// Speak the protocol over an existing reader/writer pair.
    pub fn from_io<R, W>(reader: R, writer: W, sink: PushSink) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let reader = tokio::spawn(read_loop(
            reader,
            Arc::clone(&pending),
            Arc::clone(&closed),
            sink,
        ));

        Self {
            writer: tokio::sync::Mutex::new(Box::new(writer)),
            pending,
            closed,
            reader,
            child: None,
        }
    }

    /// Whether the host's output has closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn take_pending(&self, request_id: &str) -> Option<oneshot::Sender<ResponseEnvelope>> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(request_id)
    }

    async fn write_envelope(&self, envelope: &CommandEnvelope) -> Result<()> {
        let mut line = serde_json::to_string(envelope)?;
        line.push('\n');
        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ShellError::Channel(format!("failed to write to host: {e}")))?;
        writer
            .flush()
            .await
            .map_err(|e| ShellError::Channel(format!("failed to flush host input: {e}")))
    }
}

#[async_trait]
impl CommandTransport for ProcessHost {
    async fn request(
        &self,
        command: CommandName,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value> {
        if self.is_closed() {
            return Err(ShellError::Channel("host process has exited".to_owned()));
        }

        let request_id = uuid::Uuid::new_v4().to_string();
        let envelope = CommandEnvelope::new(request_id.clone(), command, payload);
        let (response_tx, response_rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(request_id.clone(), response_tx);

        // The reader may have closed between the first check and the insert;
        // it only clears entries that existed when it shut down.
        if self.is_closed() {
            self.take_pending(&request_id);
            return Err(ShellError::Channel("host process has exited".to_owned()));
        }

        if let Err(e) = self.write_envelope(&envelope).await {
            self.take_pending(&request_id);
            return Err(e);
        }
        tracing::debug!(request_id = %request_id, command = command.as_str(), "command sent to host");

        let response = response_rx.await.map_err(|_| {
            ShellError::Channel(format!(
                "host exited before answering {}",
                command.as_str()
            ))
        })?;
        response.into_result()
    }
}

impl Drop for ProcessHost {
    fn drop(&mut self) {
        self.reader.abort();
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        }
    }
}

async fn read_loop<R>(reader: R, pending: PendingMap, closed: Arc<AtomicBool>, sink: PushSink)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                tracing::info!("host output closed");
                break;
            }
            Ok(_) => match std::str::from_utf8(&buf) {
                Ok(line) => route_line(line.trim(), &pending, &sink),
                Err(e) => {
                    tracing::warn!(error = %e, bytes = buf.len(), "host wrote a non-UTF-8 line");
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to read host output");
                break;
            }
        }
    }

    closed.store(true, Ordering::SeqCst);
    // Dropping the senders fails every waiting request.
    let abandoned = {
        let mut map = pending.lock().unwrap_or_else(|e| e.into_inner());
        let count = map.len();
        map.clear();
        count
    };
    if abandoned > 0 {
        tracing::warn!(abandoned, "host exited with requests in flight");
    }
}

fn route_line(line: &str, pending: &PendingMap, sink: &PushSink) {
    if line.is_empty() {
        return;
    }
    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, raw_line = %line, "host wrote a non-JSON line");
            return;
        }
    };

    if value.get("ok").is_some() {
        route_response(value, pending);
    } else if value.get("event").is_some() {
        route_event(value, sink);
    } else {
        tracing::warn!(raw_line = %line, "host wrote an unrecognised envelope");
    }
}

fn route_response(value: serde_json::Value, pending: &PendingMap) {
    let response: ResponseEnvelope = match serde_json::from_value(value) {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "malformed response envelope from host");
            return;
        }
    };
    let waiter = pending
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .remove(&response.request_id);
    match waiter {
        Some(tx) => {
            let _ = tx.send(response);
        }
        None => tracing::warn!(
            request_id = %response.request_id,
            error = ?response.error,
            "response for unknown request"
        ),
    }
}

fn route_event(value: serde_json::Value, sink: &PushSink) {
    let push = serde_json::from_value::<EventEnvelope>(value)
        .map_err(ShellError::from)
        .and_then(|envelope| HostPush::from_envelope(&envelope));
    match push {
        Ok(push) => {
            if !sink.push(push) {
                tracing::debug!("event loop gone; dropping host push");
            }
        }
        Err(e) => tracing::warn!(error = %e, "ignoring undecodable host event"),
    }
}
