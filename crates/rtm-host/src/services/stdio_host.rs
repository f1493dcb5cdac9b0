// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Line-delimited JSON transport.
//
// Each input line is a request frame `{id?, method, arguments}`. Requests are
// queued with the dispatcher in input order; their replies are written as
// they resolve, tagged with the request id. Published events are interleaved
// on the same output as `{"event": {...}}`. EOF waits for outstanding
// replies, then shuts the dispatcher down.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use rtm_core::BridgeError;
use rtm_core::error::Result;
use rtm_dispatch::{BridgeEvent, BridgeHandle, Reply};

#[derive(Debug, Deserialize)]
struct RequestFrame {
    method: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct ReplyFrame<'a> {
    id: &'a Value,
    result: &'a Reply,
}

#[derive(Debug, Serialize)]
struct EventFrame<'a> {
    event: &'a BridgeEvent,
}

/// Serve frames from `input` until EOF, writing replies and events to
/// `output`. The dispatcher behind `bridge` is shut down before returning.
pub async fn serve<R, W>(bridge: BridgeHandle, input: R, output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (lines_tx, lines_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(write_lines(output, lines_rx));

    let (stop_tx, stop_rx) = watch::channel(false);
    let forwarder = tokio::spawn(forward_events(bridge.subscribe(), lines_tx.clone(), stop_rx));

    let (read, mut in_flight) = read_requests(&bridge, input, &lines_tx).await;

    info!(outstanding = in_flight.len(), "input closed, draining");
    while in_flight.join_next().await.is_some() {}
    bridge.shutdown().await;

    let _ = stop_tx.send(true);
    let _ = forwarder.await;
    drop(lines_tx);
    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(e.into()),
        Err(e) => error!(error = %e, "output writer task failed"),
    }
    read
}

/// Submit every frame from `input` in order. Request tasks that have written
/// their reply are reaped as reading goes on; the ones still waiting at EOF
/// are returned.
async fn read_requests<R>(
    bridge: &BridgeHandle,
    input: R,
    lines_tx: &mpsc::UnboundedSender<String>,
) -> (Result<()>, JoinSet<()>)
where
    R: AsyncBufRead + Unpin,
{
    let mut in_flight = JoinSet::new();
    let mut lines = input.lines();
    let read = loop {
        let next = tokio::select! {
            biased;
            Some(done) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = done {
                    error!(error = %e, "request task failed");
                }
                continue;
            }
            next = lines.next_line() => next,
        };
        let line = match next {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(e) => break Err(BridgeError::from(e)),
        };
        if line.trim().is_empty() {
            continue;
        }
        let (id, frame) = parse_frame(&line);
        match frame {
            Ok(frame) => {
                debug!(id = %id, method = %frame.method, "request frame");
                let ticket = bridge.submit(frame.method, frame.arguments).await;
                let lines_tx = lines_tx.clone();
                in_flight.spawn(async move {
                    let reply = ticket.reply().await;
                    emit(&lines_tx, &ReplyFrame { id: &id, result: &reply });
                });
            }
            Err(e) => {
                warn!(id = %id, error = %e, "malformed frame");
                let reply = Reply::from(e);
                emit(lines_tx, &ReplyFrame { id: &id, result: &reply });
            }
        }
    };
    (read, in_flight)
}

/// Split a raw line into its reply id and request frame. A missing id is
/// replaced with a fresh UUID so every reply can be correlated.
fn parse_frame(line: &str) -> (Value, Result<RequestFrame>) {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => return (Value::Null, Err(BridgeError::decode("frame", "line", e))),
    };
    let id = match value.get("id") {
        Some(id) if !id.is_null() => id.clone(),
        _ => Value::String(uuid::Uuid::new_v4().to_string()),
    };
    let frame = serde_json::from_value(value).map_err(|e| BridgeError::decode("frame", "method", e));
    (id, frame)
}

fn emit<T: Serialize>(lines: &mpsc::UnboundedSender<String>, frame: &T) {
    match serde_json::to_string(frame) {
        Ok(line) => {
            if lines.send(line).is_err() {
                debug!("output closed, frame dropped");
            }
        }
        Err(e) => error!(error = %e, "frame serialization failed"),
    }
}

async fn forward_events(
    mut events: broadcast::Receiver<BridgeEvent>,
    lines: mpsc::UnboundedSender<String>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            event = events.recv() => match event {
                Ok(event) => emit(&lines, &EventFrame { event: &event }),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "event output lagging, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
            _ = stop.changed() => break,
        }
    }
    // Flush whatever was published before shutdown completed.
    loop {
        match events.try_recv() {
            Ok(event) => emit(&lines, &EventFrame { event: &event }),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => return,
        }
    }
}

async fn write_lines<W>(mut output: W, mut lines: mpsc::UnboundedReceiver<String>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = lines.recv().await {
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    output.shutdown().await
}
