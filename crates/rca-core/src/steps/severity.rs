use async_trait::async_trait;
use reasoning_agent::{ToolCall, ToolSpec};
use serde_json::json;

use crate::agent_loop::{call_network_tool, drive, StepContext, StepTools, ToolReply};
use crate::capability::{error_reply, CapabilitySet, NetworkTools};
use crate::error::Result;
use crate::state::{require, Slot, WorkflowState};
use crate::types::Severity;

use super::string_arg;

pub const UPDATE_SEVERITY_LEVEL: &str = "update_severity_level";

struct SeverityTools<'a> {
    state: &'a mut WorkflowState,
    network: &'a NetworkTools,
    caps: CapabilitySet,
}

#[async_trait]
impl StepTools for SeverityTools<'_> {
    fn specs(&self) -> Vec<ToolSpec> {
        let levels: Vec<&str> = Severity::all().iter().map(|s| s.as_str()).collect();
        let mut specs = self.caps.specs();
        specs.push(ToolSpec::new(
            UPDATE_SEVERITY_LEVEL,
            "Record the incident severity and a brief explanation of why it was chosen.",
            json!({
                "type": "object",
                "properties": {
                    "severity": { "type": "string", "enum": levels },
                    "explanation": { "type": "string" }
                },
                "required": ["severity", "explanation"]
            }),
        ));
        specs
    }

    async fn call(&mut self, call: &ToolCall) -> Result<ToolReply> {
        if call.name != UPDATE_SEVERITY_LEVEL {
            return call_network_tool(&self.caps, self.network, &mut *self.state, call).await;
        }
        let raw = match string_arg(&call.args, "severity") {
            Ok(s) => s,
            Err(reply) => return Ok(ToolReply::Continue(reply)),
        };
        // Out-of-range values go back to the model to correct.
        let severity = match raw.parse::<Severity>() {
            Ok(s) => s,
            Err(_) => {
                tracing::warn!(severity = %raw, "rejected severity value");
                return Ok(ToolReply::Continue(error_reply(format!(
                    "'{raw}' is not a valid severity; use HIGH, MEDIUM, or LOW"
                ))));
            }
        };
        let explanation = string_arg(&call.args, "explanation").unwrap_or_default();
        self.state.severity = Some(severity);
        self.state.severity_explanation = Some(explanation);
        Ok(ToolReply::Finish(json!({ "status": "success" })))
    }
}

/// Classify the incident from the severity rules, restricted to the tools in
/// `severity_determination_rule_tools`. Writes the severity and explanation.
pub async fn classify(
    ctx: &StepContext<'_>,
    network: &NetworkTools,
    state: &mut WorkflowState,
) -> Result<Severity> {
    let rules = require(&state.severity_rules, Slot::SeverityDeterminationRules)?;
    let rules_text = if rules.is_empty() {
        "No severity rules matched this incident; use your judgement.".to_string()
    } else {
        rules.join("\n\n")
    };
    let incident = state.incident()?.summary();
    let caps = CapabilitySet::from_names(state.severity_rule_tools.as_deref().unwrap_or_default());

    let instructions = format!(
        "Classify the severity of the following incident:\n\n{incident}\n\
         Use the following rules to do the classification:\n\n{rules_text}\n\n\
         The severity must be only HIGH, MEDIUM, or LOW.\n\n\
         You must call the {UPDATE_SEVERITY_LEVEL} tool with the severity and a brief explanation why you selected it."
    );
    let mut tools = SeverityTools {
        state: &mut *state,
        network,
        caps,
    };
    drive(ctx, instructions, "Classify the incident severity.".to_string(), &mut tools).await?;
    let severity = require(&state.severity, Slot::SeverityLevel)?;
    tracing::info!(severity = %severity, "severity classified");
    Ok(*severity)
}
