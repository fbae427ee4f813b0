use futures::StreamExt;

use crate::reasoner::Reasoner;
use crate::stream::ResponseStream;
use crate::types::{Completion, CompletionRequest, Message};
use crate::{ReasoningError, Result};

// ─── Public API ───────────────────────────────────────────────────────────

/// Send one request and wait for its terminal [`Completion`].
///
/// Partial fragments are logged at trace level and otherwise discarded;
/// groundedness and tool calls are only ever read from the final message.
pub async fn complete<R: Reasoner + ?Sized>(
    reasoner: &R,
    request: CompletionRequest,
) -> Result<Completion> {
    let stream = reasoner.stream(request).await?;
    collect(stream).await
}

/// Consume a [`ResponseStream`] and extract the terminal [`Completion`].
///
/// Returns `Err` if the stream ends without a `final` message or if any
/// message fails to parse.
pub async fn collect(stream: ResponseStream) -> Result<Completion> {
    let mut stream = stream;
    while let Some(msg) = stream.next().await {
        match msg? {
            Message::Partial(p) => tracing::trace!(text = %p.text, "partial"),
            Message::Final(c) => return Ok(c),
        }
    }
    Err(ReasoningError::Stream(
        "stream ended without a final message".into(),
    ))
}

// ─── Tests ────────────────────────────────────────────────────────────────
