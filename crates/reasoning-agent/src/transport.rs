use crate::types::Message;
use crate::{ReasoningError, Result};

// ─── LineBuffer ───────────────────────────────────────────────────────────

/// Splits an arbitrarily chunked byte stream into newline-terminated lines.
///
/// HTTP bodies arrive in chunks that do not respect line boundaries, so a
/// partial trailing line is held until the next chunk (or [`finish`]).
///
/// [`finish`]: LineBuffer::finish
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..line.len() - 1]).into_owned());
        }
        lines
    }

    /// Flush a trailing line that had no terminating newline.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

// ─── Line parsing ─────────────────────────────────────────────────────────

/// Deserialize one JSONL line.
///
/// Returns `Ok(None)` for blank lines and for well-formed JSON carrying a
/// `"type"` this crate does not know (e.g. keep-alive or usage events).
pub(crate) fn parse_line(line: &str) -> Result<Option<Message>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match serde_json::from_str::<Message>(trimmed) {
        Ok(msg) => Ok(Some(msg)),
        Err(e) => {
            if is_unknown_message_type(trimmed) {
                tracing::debug!(line = trimmed, "skipping unknown message type");
                return Ok(None);
            }
            Err(ReasoningError::Parse {
                line: trimmed.to_owned(),
                source: e,
            })
        }
    }
}

/// Valid JSON with a `"type"` we don't recognise is skipped, not fatal.
fn is_unknown_message_type(line: &str) -> bool {
    match serde_json::from_str::<serde_json::Value>(line) {
        Ok(v) => match v.get("type").and_then(|t| t.as_str()) {
            Some(t) => t != "partial" && t != "final",
            None => false,
        },
        Err(_) => false,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
