//! Stdin/stdout JSON bridge for a Rust host.
//!
//! Reads newline-delimited JSON `CommandEnvelope` messages from stdin,
//! dispatches them through the `HostCommandServer` router, and writes
//! `ResponseEnvelope` and `EventEnvelope` messages as newline-delimited
//! JSON to stdout.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use crate::error::{Result, ShellError};
use crate::host::channel::{HostCommandClient, HostHandler, PushSender, command_channel_with_pushes};
use crate::host::contract::{CommandEnvelope, ResponseEnvelope};
use crate::host::push::HostPush;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinSet;

type SharedWriter<W> = Arc<Mutex<BufWriter<W>>>;

/// Run the bridge on the process's stdin/stdout until stdin closes.
pub async fn run_stdio_bridge<H: HostHandler>(
    handler: H,
    pushes: PushSender,
    request_capacity: usize,
) -> Result<()> {
    serve_lines(
        tokio::io::stdin(),
        tokio::io::stdout(),
        handler,
        pushes,
        request_capacity,
    )
    .await
}

/// Serve the NDJSON protocol over an arbitrary reader/writer pair.
///
/// Three kinds of task run concurrently:
///
/// 1. **Reader** -- reads lines from `reader` and spawns one dispatch task
///    per command, so a slow call does not hold up later ones. Responses
///    carry the request id and may be written out of order.
/// 2. **Push forwarder** -- encodes every host push as an `EventEnvelope`
///    line.
/// 3. **Server** -- runs the `HostCommandServer` router loop.
///
/// `request_capacity` bounds commands queued for the router before the
/// dispatch tasks wait. Returns once `reader` reaches EOF and every in-flight
/// command has been answered.
pub async fn serve_lines<R, W, H>(
    reader: R,
    writer: W,
    handler: H,
    pushes: PushSender,
    request_capacity: usize,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    H: HostHandler,
{
    // Subscribe before anything runs so no early push is missed.
    let mut push_rx = pushes.subscribe();
    let (client, server) = command_channel_with_pushes(request_capacity, pushes, handler);
    let writer: SharedWriter<W> = Arc::new(Mutex::new(BufWriter::new(writer)));

    let server_handle = tokio::spawn(server.run());

    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    let push_writer = Arc::clone(&writer);
    let push_handle = tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                biased;
                received = push_rx.recv() => received,
                _ = &mut shutdown_rx => {
                    // Flush whatever was pushed before shutdown.
                    while let Ok(push) = push_rx.try_recv() {
                        if !forward_push(&push_writer, &push).await {
                            break;
                        }
                    }
                    break;
                }
            };
            match received {
                Ok(push) => {
                    if !forward_push(&push_writer, &push).await {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "push forwarder lagged; some pushes were dropped");
                }
                Err(RecvError::Closed) => {
                    tracing::info!("push channel closed; stopping push forwarder");
                    break;
                }
            }
        }
    });

    let reader_result = run_reader(reader, client, Arc::clone(&writer)).await;

    // The reader dropped the last client, so the server drains and exits.
    let _ = server_handle.await;
    let _ = shutdown_tx.send(());
    let _ = push_handle.await;

    reader_result
}

/// Write one push as an event line. Returns `false` once the output is gone.
async fn forward_push<W>(writer: &SharedWriter<W>, push: &HostPush) -> bool
where
    W: AsyncWrite + Unpin,
{
    let json = match push.to_envelope() {
        Ok(envelope) => match serde_json::to_string(&envelope) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize event envelope; skipping");
                return true;
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "failed to encode host push; skipping");
            return true;
        }
    };
    let mut w = writer.lock().await;
    if let Err(e) = write_line(&mut w, &json).await {
        tracing::warn!(error = %e, "failed to write event envelope; stopping push forwarder");
        return false;
    }
    true
}

async fn run_reader<R, W>(reader: R, client: HostCommandClient, writer: SharedWriter<W>) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    let mut in_flight = JoinSet::new();

    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| ShellError::Channel(format!("failed to read command line: {e}")))?;

        // EOF
        if bytes_read == 0 {
            tracing::info!("input closed (EOF); shutting down stdio bridge");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let envelope: CommandEnvelope = match serde_json::from_str(trimmed) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    raw_line = %trimmed,
                    "failed to parse command envelope"
                );
                let error_response = ResponseEnvelope::error(
                    "parse-error",
                    format!("failed to parse command envelope: {e}"),
                );
                write_response(&writer, &error_response).await?;
                continue;
            }
        };

        let client = client.clone();
        let writer = Arc::clone(&writer);
        in_flight.spawn(async move {
            let request_id = envelope.request_id.clone();
            let response = match client.send(envelope).await {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::error!(request_id = %request_id, error = %e, "host command dispatch failed");
                    ResponseEnvelope::error(request_id, format!("dispatch failed: {e}"))
                }
            };
            if let Err(e) = write_response(&writer, &response).await {
                tracing::warn!(error = %e, "failed to write response envelope");
            }
        });
    }

    drop(client);
    while in_flight.join_next().await.is_some() {}
    Ok(())
}

async fn write_response<W>(writer: &SharedWriter<W>, response: &ResponseEnvelope) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(response)?;
    let mut w = writer.lock().await;
    write_line(&mut w, &json).await
}

/// Write a single JSON line to the buffered writer and flush.
async fn write_line<W: AsyncWrite + Unpin>(writer: &mut BufWriter<W>, json: &str) -> Result<()> {
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| ShellError::Channel(format!("failed to write line: {e}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| ShellError::Channel(format!("failed to write newline: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| ShellError::Channel(format!("failed to flush output: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::host::channel::NoopHostHandler;
    use crate::host::contract::{CommandName, EVENT_VERSION, EventEnvelope};
    use tokio::io::AsyncReadExt;

    #[test]
    fn parse_error_response_is_well_formed() {
        let resp = ResponseEnvelope::error("parse-error", "bad json");
        assert!(!resp.ok);
        assert_eq!(resp.request_id, "parse-error");
        assert_eq!(resp.v, EVENT_VERSION);
        assert!(resp.error.is_some());
    }

    async fn run_script(input: String) -> Vec<serde_json::Value> {
        run_script_with_capacity(input, 64).await
    }

    async fn run_script_with_capacity(input: String, capacity: usize) -> Vec<serde_json::Value> {
        let (mut out_rx, out_tx) = tokio::io::duplex(64 * 1024);
        let pushes = PushSender::new(16);
        let handler = NoopHostHandler::new(pushes.clone());

        serve_lines(input.as_bytes(), out_tx, handler, pushes, capacity)
            .await
            .unwrap();

        let mut raw = String::new();
        out_rx.read_to_string(&mut raw).await.unwrap();
        raw.lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn malformed_line_gets_parse_error_response() {
        let lines = run_script("not json\n".to_owned()).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["request_id"], "parse-error");
        assert_eq!(lines[0]["ok"], false);
    }

    #[tokio::test]
    async fn ready_command_yields_response_and_initialize_event() {
        let command = CommandEnvelope::new("req-1", CommandName::UiReady, serde_json::json!({}));
        let input = format!("{}\n\n", serde_json::to_string(&command).unwrap());
        let lines = run_script(input).await;

        let response = lines
            .iter()
            .find(|l| l.get("ok").is_some())
            .expect("response line");
        assert_eq!(response["request_id"], "req-1");
        assert_eq!(response["ok"], true);

        let events: Vec<EventEnvelope> = lines
            .iter()
            .filter(|l| l.get("event").is_some())
            .map(|l| serde_json::from_value(l.clone()).unwrap())
            .collect();
        assert_eq!(events[0].event, "ui.initialize");
    }

    #[tokio::test]
    async fn single_slot_request_queue_answers_every_command() {
        let mut input = String::new();
        for i in 0..5 {
            let command = CommandEnvelope::new(
                format!("req-{i}"),
                CommandName::FilesRead,
                serde_json::json!({"path": "a.py"}),
            );
            input.push_str(&serde_json::to_string(&command).unwrap());
            input.push('\n');
        }

        let lines = run_script_with_capacity(input, 1).await;
        let mut ids: Vec<String> = lines
            .iter()
            .filter(|l| l["ok"] == true)
            .map(|l| l["request_id"].as_str().unwrap().to_owned())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["req-0", "req-1", "req-2", "req-3", "req-4"]);
    }
}
