use serde::{Deserialize, Serialize};

// ─── Response messages ────────────────────────────────────────────────────

/// Every message emitted on the reasoning service's response stream.
/// Discriminated by the JSON `"type"` field.
///
/// A well-formed stream is zero or more `partial` fragments followed by
/// exactly one `final` message.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Incremental text fragment. Never carries tool calls or grounding.
    Partial(PartialMessage),
    /// Terminal message for one completion call.
    Final(Completion),
}

impl Message {
    pub fn is_partial(&self) -> bool {
        matches!(self, Message::Partial(_))
    }

    /// Returns `Some(&Completion)` if this is the terminal message.
    pub fn as_final(&self) -> Option<&Completion> {
        if let Message::Final(c) = self {
            Some(c)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PartialMessage {
    pub text: String,
}

/// The terminal result of one completion call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Completion {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding: Option<GroundingMetadata>,
    /// Model reasoning, present only when the request asked for thoughts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thoughts: Option<String>,
}

impl Completion {
    /// Text-only completion with no tool calls.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// True when grounding metadata carries at least one chunk.
    pub fn is_grounded(&self) -> bool {
        self.grounding
            .as_ref()
            .is_some_and(|g| !g.grounding_chunks.is_empty())
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Tool arguments are schema-polymorphic (varies per tool), so Value is correct here.
    #[serde(default)]
    pub args: serde_json::Value,
}

// ─── Grounding ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GroundingMetadata {
    #[serde(default)]
    pub retrieval_queries: Vec<String>,
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

/// One supporting reference behind a grounded response.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundingChunk {
    Web { uri: String, title: String },
    RetrievedContext { document_name: String, text: String },
}

// ─── Requests ─────────────────────────────────────────────────────────────

/// One completion call. The tool list is scoped per call; the service must
/// not offer the model any tool that is not declared here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub instructions: String,
    #[serde(default)]
    pub turns: Vec<Turn>,
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding: Option<GroundingSource>,
    #[serde(default)]
    pub include_thoughts: bool,
}

/// Conversation transcript entry, discriminated by `"role"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    User {
        text: String,
    },
    Assistant {
        #[serde(default)]
        text: String,
        #[serde(default)]
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        call_id: String,
        name: String,
        output: serde_json::Value,
    },
}

/// Tool declaration offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: serde_json::Value,
}

impl ToolSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Retrieval backend the service grounds its answer on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GroundingSource {
    /// Fetch and read the given pages.
    Web { urls: Vec<String> },
    /// Search a managed document index.
    Datastore { id: String },
}
