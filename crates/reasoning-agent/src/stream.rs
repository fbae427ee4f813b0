use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::transport::{parse_line, LineBuffer};
use crate::types::Message;
use crate::{ReasoningError, Result};

// ─── ResponseStream ───────────────────────────────────────────────────────

/// An async stream of [`Message`]s from one completion call.
///
/// Backed by a Tokio mpsc channel. A background task owns the response body
/// and forwards messages until it receives the terminal `final` message or
/// the body ends. Dropping `ResponseStream` closes the receiver, which
/// causes the background task to exit on the next send attempt.
pub struct ResponseStream {
    rx: mpsc::Receiver<Result<Message>>,
}

impl ResponseStream {
    /// Drive a chunked JSONL body in a background task.
    pub(crate) fn from_body<S, B, E>(body: S) -> Self
    where
        S: Stream<Item = std::result::Result<B, E>> + Send + Unpin + 'static,
        B: AsRef<[u8]> + Send + 'static,
        E: Into<ReasoningError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(pump(body, tx));
        ResponseStream { rx }
    }

    /// Wrap a raw receiver. Used by in-process reasoners and test fakes.
    pub fn from_channel(rx: mpsc::Receiver<Result<Message>>) -> Self {
        Self { rx }
    }

    /// A stream that yields the given messages in order, then ends.
    pub fn from_messages(messages: Vec<Result<Message>>) -> Self {
        let (tx, rx) = mpsc::channel(messages.len().max(1));
        for msg in messages {
            // Capacity covers every message, so try_send cannot fill up.
            if tx.try_send(msg).is_err() {
                break;
            }
        }
        Self { rx }
    }
}

impl Stream for ResponseStream {
    type Item = Result<Message>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ─── Internal ─────────────────────────────────────────────────────────────

async fn pump<S, B, E>(mut body: S, tx: mpsc::Sender<Result<Message>>)
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<ReasoningError>,
{
    let mut lines = LineBuffer::new();
    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                let _ = tx.send(Err(e.into())).await;
                return;
            }
        };
        for line in lines.push(chunk.as_ref()) {
            if forward(&line, &tx).await {
                return;
            }
        }
    }
    if let Some(tail) = lines.finish() {
        forward(&tail, &tx).await;
    }
}

/// Send one parsed line. Returns `true` when the pump should stop: after the
/// terminal message, on a parse error, or when the receiver is gone.
async fn forward(line: &str, tx: &mpsc::Sender<Result<Message>>) -> bool {
    match parse_line(line) {
        Ok(None) => false,
        Ok(Some(msg)) => {
            let terminal = !msg.is_partial();
            tx.send(Ok(msg)).await.is_err() || terminal
        }
        Err(e) => {
            let _ = tx.send(Err(e)).await;
            true
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
