//! Delegate steps sequenced by the root controller.
//!
//! Each step reads and writes the [`WorkflowState`](crate::state::WorkflowState)
//! slots named in its docs. Expected failures come back as tagged outcomes or
//! recoverable errors; only invariant breaches escape as hard errors.

pub mod action_executor;
pub mod analyzer;
pub mod documentation;
pub mod incident_retriever;
pub mod instructions;
pub mod prior_incidents;
pub mod report;
pub mod rule_retriever;
pub mod severity;
pub mod update;

use serde_json::Value;

/// Operator-facing description of any failed store query; the detail is logged.
pub const STORE_FAILED: &str = "SQL call failed";

/// String argument of a tool call, or an error reply naming it.
pub(crate) fn string_arg(args: &Value, key: &str) -> Result<String, Value> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| crate::capability::error_reply(format!("missing argument '{key}'")))
}
