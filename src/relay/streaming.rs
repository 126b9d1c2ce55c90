//! Reframe an upstream event stream for the client.
//!
//! The upstream body is split into lines. Each `data: ` line is re-emitted as
//! `data: <payload>\n\n`; any other non-empty line becomes an in-band error event. A
//! spawned worker does the reading and hands framed events to the response body
//! through a bounded channel, so a client disconnect is noticed while the worker is
//! still waiting on the upstream.

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::logging::{Level, SharedJournal};

pub const DATA_PREFIX: &str = "data: ";
pub const INVALID_CHUNK: &str = "Invalid chunk format";

/// One unit of streamed output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// Upstream payload with the `data: ` prefix removed.
    Data(String),
    /// Synthesized error, sent as `{"error": <message>}`.
    Error(String),
}

impl RelayEvent {
    pub fn invalid_chunk() -> Self {
        RelayEvent::Error(INVALID_CHUNK.to_string())
    }

    /// Wire form: `data: <payload>\n\n`.
    pub fn to_frame(&self) -> Bytes {
        let frame = match self {
            RelayEvent::Data(payload) => format!("{}{}\n\n", DATA_PREFIX, payload),
            RelayEvent::Error(message) => format!(
                "{}{{\"error\": {}}}\n\n",
                DATA_PREFIX,
                serde_json::Value::String(message.clone())
            ),
        };
        Bytes::from(frame)
    }
}

/// Reframe a single upstream line (without its `\n`). Empty lines yield nothing.
pub fn reframe_line(raw: &[u8]) -> Option<RelayEvent> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    if raw.is_empty() {
        return None;
    }

    let line = String::from_utf8_lossy(raw);
    Some(match line.strip_prefix(DATA_PREFIX) {
        Some(payload) => RelayEvent::Data(payload.to_string()),
        None => RelayEvent::invalid_chunk(),
    })
}

/// Splits arbitrary upstream chunks into lines. Bytes are held until their line is
/// complete, so a multibyte character split across chunks decodes intact.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<RelayEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = reframe_line(&line[..pos]) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line that had no terminating newline.
    pub fn finish(&mut self) -> Option<RelayEvent> {
        let rest = std::mem::take(&mut self.buffer);
        reframe_line(&rest)
    }
}

/// Owns the upstream body for the lifetime of a relay. Dropping it releases the
/// upstream connection, which happens exactly once whichever way the relay ends.
struct UpstreamGuard<S> {
    inner: Pin<Box<S>>,
}

impl<S> UpstreamGuard<S> {
    fn new(inner: S) -> Self {
        Self {
            inner: Box::pin(inner),
        }
    }
}

impl<S: Stream> Stream for UpstreamGuard<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl<S> Drop for UpstreamGuard<S> {
    fn drop(&mut self) {
        tracing::debug!("upstream connection released");
    }
}

#[derive(Debug)]
enum Outcome {
    Completed,
    UpstreamFailed(String),
    ClientGone,
}

/// Relay an upstream byte stream to the client as framed events.
///
/// The returned stream ends when the upstream ends or fails. If it is dropped early
/// (client disconnect), the worker stops and releases the upstream promptly.
pub fn relay_stream<S, E>(
    upstream: S,
    journal: SharedJournal,
) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> + Send + 'static
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    // Capacity 1: the relay holds at most one event ahead of the client.
    let (tx, rx) = mpsc::channel::<Bytes>(1);

    tokio::spawn(async move {
        let mut upstream = UpstreamGuard::new(upstream);
        let mut framer = LineFramer::default();
        let mut forwarded: usize = 0;

        let outcome = 'relay: loop {
            let next = tokio::select! {
                biased;
                _ = tx.closed() => break 'relay Outcome::ClientGone,
                next = upstream.next() => next,
            };

            let events = match next {
                Some(Ok(chunk)) => framer.push(&chunk),
                Some(Err(e)) => {
                    let message = e.to_string();
                    let _ = tx.send(RelayEvent::Error(message.clone()).to_frame()).await;
                    break 'relay Outcome::UpstreamFailed(message);
                }
                None => {
                    if let Some(event) = framer.finish() {
                        if tx.send(event.to_frame()).await.is_ok() {
                            forwarded += 1;
                        }
                    }
                    break 'relay Outcome::Completed;
                }
            };

            for event in events {
                if tx.send(event.to_frame()).await.is_err() {
                    break 'relay Outcome::ClientGone;
                }
                forwarded += 1;
            }
        };

        drop(upstream);

        let context = serde_json::json!({ "events": forwarded });
        match outcome {
            Outcome::Completed => {
                journal.with_context(Level::Info, "stream", "Stream completed", context)
            }
            Outcome::ClientGone => journal.with_context(
                Level::Warn,
                "stream",
                "Client disconnected, upstream closed",
                context,
            ),
            Outcome::UpstreamFailed(message) => journal.with_context(
                Level::Error,
                "stream",
                format!("Upstream stream failed: {}", message),
                context,
            ),
        }
    });

    ReceiverStream::new(rx).map(Ok::<_, Infallible>)
}
