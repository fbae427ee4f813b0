use async_trait::async_trait;
use reasoning_agent::{ToolCall, ToolSpec};
use serde_json::json;

use crate::agent_loop::{drive, StepContext, StepTools, ToolReply};
use crate::capability::error_reply;
use crate::error::Result;
use crate::state::{require, Slot, WorkflowState};

use super::string_arg;

const RECEIVE_INSTRUCTIONS: &str = "receive_instructions";

struct InstructionTools<'a> {
    state: &'a mut WorkflowState,
}

#[async_trait]
impl StepTools for InstructionTools<'_> {
    fn specs(&self) -> Vec<ToolSpec> {
        vec![ToolSpec::new(
            RECEIVE_INSTRUCTIONS,
            "Store the generated analysis instructions.",
            json!({
                "type": "object",
                "properties": { "instructions": { "type": "string" } },
                "required": ["instructions"]
            }),
        )]
    }

    async fn call(&mut self, call: &ToolCall) -> Result<ToolReply> {
        if call.name != RECEIVE_INSTRUCTIONS {
            return Ok(ToolReply::Continue(error_reply(format!(
                "tool '{}' is not available",
                call.name
            ))));
        }
        match string_arg(&call.args, "instructions") {
            Ok(text) => {
                self.state.instructions = Some(text);
                Ok(ToolReply::Finish(json!({ "status": "success" })))
            }
            Err(reply) => Ok(ToolReply::Continue(reply)),
        }
    }
}

/// Turn the processing rules into one instruction text for the analyzer.
/// Writes `instructions`.
pub async fn synthesize(ctx: &StepContext<'_>, state: &mut WorkflowState) -> Result<String> {
    let rules = require(&state.processing_rules, Slot::ProcessingRules)?;
    let rules_text = if rules.is_empty() {
        "No incident specific rules were found.".to_string()
    } else {
        rules
            .iter()
            .enumerate()
            .map(|(i, r)| format!("{}. {r}", i + 1))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let instructions = format!(
        "Generate the instructions for a root cause analysis agent based on the information about the incident.\n\n\
         Use these rules to generate the instructions:\n{rules_text}\n\n\
         Call the {RECEIVE_INSTRUCTIONS} tool with the generated instructions."
    );
    let prompt = match &state.incident {
        Some(incident) => incident.summary(),
        None => "Generate the instructions.".to_string(),
    };
    let mut tools = InstructionTools { state: &mut *state };
    drive(ctx, instructions, prompt, &mut tools).await?;
    tracing::info!("instructions generated");
    Ok(state.instructions.clone().unwrap_or_default())
}
