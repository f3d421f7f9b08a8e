//! JSON-lines transport over stdio.
//!
//! Each input line is a request:
//!
//! ```text
//! {"id": 7, "channel": "process-query", "args": ["Bonjour", {"autoRoute": true}]}
//! ```
//!
//! and gets exactly one response line carrying the same id. Events such as
//! `translation-progress` and `log` are interleaved as
//! `{"event": ..., "payload": ...}` lines. A single writer task owns the
//! output stream, so lines never interleave mid-way.

use crate::app::AppState;
use crate::commands::{self, CommandError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinSet;

pub const EVENT_TRANSLATION_PROGRESS: &str = "translation-progress";
pub const EVENT_LOG: &str = "log";

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub id: u64,
    pub channel: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// `None` only when the request line could not be parsed.
    pub id: Option<u64>,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            id: Some(id),
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<u64>, error: CommandError) -> Self {
        Self {
            id,
            ok: false,
            result: None,
            error: Some(ErrorBody {
                code: error.code,
                message: error.message,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event: String,
    pub payload: Value,
}

/// Everything the writer task puts on the output stream.
#[derive(Debug)]
pub enum Outbound {
    Response(Response),
    Event(Event),
    /// Stops the writer once everything queued before it is written.
    Close,
}

/// Cloneable handle for pushing events to the UI.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: UnboundedSender<Outbound>,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<Outbound>) -> Self {
        Self { tx }
    }

    /// A sink and the receiver the writer task drains.
    pub fn channel() -> (Self, UnboundedReceiver<Outbound>) {
        let (tx, rx) = unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Queues an event. Silently dropped once the writer is gone.
    pub fn emit(&self, event: &str, payload: Value) {
        let _ = self.tx.send(Outbound::Event(Event {
            event: event.to_string(),
            payload,
        }));
    }

    fn respond(&self, response: Response) {
        let _ = self.tx.send(Outbound::Response(response));
    }

    fn close(&self) {
        let _ = self.tx.send(Outbound::Close);
    }
}

async fn write_loop<W>(mut output: W, mut rx: UnboundedReceiver<Outbound>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        let line = match &message {
            Outbound::Response(response) => serde_json::to_string(response),
            Outbound::Event(event) => serde_json::to_string(event),
            Outbound::Close => break,
        };
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("[Ipc] Failed to serialize outbound message: {}", e);
                continue;
            }
        };
        let written = async {
            output.write_all(line.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await
        }
        .await;
        if let Err(e) = written {
            tracing::warn!("[Ipc] Output closed: {}", e);
            break;
        }
    }
}

/// Handles one raw line and returns its response.
pub async fn handle_line(state: &AppState, line: &str, events: &EventSink) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            return Response::failure(
                None,
                CommandError::new("invalid_request", format!("Malformed request: {}", e)),
            );
        }
    };

    tracing::debug!("[Ipc] #{} {}", request.id, request.channel);
    match commands::dispatch(state, &request, events).await {
        Ok(result) => Response::success(request.id, result),
        Err(error) => {
            tracing::debug!(
                "[Ipc] #{} {} failed: {} ({})",
                request.id,
                request.channel,
                error.message,
                error.code
            );
            Response::failure(Some(request.id), error)
        }
    }
}

/// Serves requests from `input` until end of stream.
///
/// Every request runs on its own task. On end of input the in-flight
/// requests are awaited and their responses written before returning.
pub async fn serve<R, W>(
    state: Arc<AppState>,
    input: R,
    output: W,
    events: EventSink,
    outbound: UnboundedReceiver<Outbound>,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let writer = tokio::spawn(write_loop(output, outbound));
    let mut in_flight = JoinSet::new();
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let state = state.clone();
        let events = events.clone();
        in_flight.spawn(async move {
            let response = handle_line(&state, &line, &events).await;
            events.respond(response);
        });
        // Reap finished handlers so the set does not grow unbounded.
        while let Some(done) = in_flight.try_join_next() {
            if let Err(e) = done {
                tracing::error!("[Ipc] Request handler failed: {}", e);
            }
        }
    }

    tracing::info!("[Ipc] Input closed, draining {} request(s)", in_flight.len());
    while let Some(done) = in_flight.join_next().await {
        if let Err(e) = done {
            tracing::error!("[Ipc] Request handler failed: {}", e);
        }
    }
    events.close();
    writer.await?;
    Ok(())
}
