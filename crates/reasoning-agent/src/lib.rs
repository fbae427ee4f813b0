//! `reasoning-agent`: typed client for the reasoning/completion service.
//!
//! # Architecture
//!
//! ```text
//! CompletionRequest   ← model, instructions, transcript, scoped tool list
//!     │
//!     ▼
//! Reasoner            ← capability trait; HttpReasoner posts JSON and
//!     │                  reads a JSONL body
//!     ▼
//! ResponseStream      ← implements futures::Stream<Item = Result<Message>>
//!     │                  background task + mpsc channel
//!     ▼
//! runner::collect     ← skips partials, returns the terminal Completion
//! ```

pub mod error;
pub mod reasoner;
pub mod runner;
pub mod stream;
pub mod types;

pub(crate) mod transport;

#[cfg(test)]
mod tests;

pub use error::ReasoningError;
pub use reasoner::{HttpReasoner, Reasoner};
pub use runner::{collect, complete};
pub use stream::ResponseStream;
pub use types::{
    Completion, CompletionRequest, GroundingChunk, GroundingMetadata, GroundingSource, Message,
    PartialMessage, ToolCall, ToolSpec, Turn,
};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ReasoningError>;
