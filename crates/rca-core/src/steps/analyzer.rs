use async_trait::async_trait;
use reasoning_agent::{ToolCall, ToolSpec};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::agent_loop::{call_network_tool, drive, StepContext, StepTools, ToolReply};
use crate::capability::{error_reply, CapabilitySet, NetworkTool, NetworkTools};
use crate::error::Result;
use crate::state::{require, Action, Slot, WorkflowState};

use super::string_arg;

pub const ADD_ACTION: &str = "add_action";
pub const SAVE_ANALYSIS: &str = "save_analysis";

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub analysis: String,
    /// Actions proposed during this run of the step.
    pub proposed: usize,
}

struct AnalyzerTools<'a> {
    state: &'a mut WorkflowState,
    network: &'a NetworkTools,
    caps: CapabilitySet,
    proposed: usize,
}

impl AnalyzerTools<'_> {
    fn add_action(&mut self, args: &Value) -> Value {
        let tool_name = match string_arg(args, "tool_name") {
            Ok(name) => name,
            Err(reply) => return reply,
        };
        if tool_name.parse::<NetworkTool>().is_err() {
            return error_reply(format!("unknown tool '{tool_name}'"));
        }
        let reason = match string_arg(args, "reason") {
            Ok(r) => r,
            Err(reply) => return reply,
        };
        let parameters: BTreeMap<String, Value> = match args.get("parameters") {
            Some(Value::Object(map)) => map.clone().into_iter().collect(),
            None | Some(Value::Null) => BTreeMap::new(),
            Some(_) => return error_reply("'parameters' must be an object"),
        };
        tracing::info!(tool = %tool_name, "action suggested");
        self.state
            .actions
            .push(Action::suggested(tool_name, parameters, reason));
        self.proposed += 1;
        json!({ "status": "success" })
    }
}

#[async_trait]
impl StepTools for AnalyzerTools<'_> {
    fn specs(&self) -> Vec<ToolSpec> {
        let mut specs = self.caps.specs();
        specs.push(ToolSpec::new(
            ADD_ACTION,
            "Propose a remediation action. It is not executed now; the operator decides later.",
            json!({
                "type": "object",
                "properties": {
                    "tool_name": { "type": "string" },
                    "parameters": { "type": "object" },
                    "reason": { "type": "string" }
                },
                "required": ["tool_name", "parameters", "reason"]
            }),
        ));
        specs.push(ToolSpec::new(
            SAVE_ANALYSIS,
            "Save the completed root cause analysis. Call this once, last.",
            json!({
                "type": "object",
                "properties": { "analysis": { "type": "string" } },
                "required": ["analysis"]
            }),
        ));
        specs
    }

    async fn call(&mut self, call: &ToolCall) -> Result<ToolReply> {
        match call.name.as_str() {
            ADD_ACTION => Ok(ToolReply::Continue(self.add_action(&call.args))),
            SAVE_ANALYSIS => match string_arg(&call.args, "analysis") {
                Ok(text) => {
                    self.state.analysis = Some(text);
                    Ok(ToolReply::Finish(json!({ "status": "success" })))
                }
                Err(reply) => Ok(ToolReply::Continue(reply)),
            },
            _ => call_network_tool(&self.caps, self.network, &mut *self.state, call).await,
        }
    }
}

/// Run the analysis with the synthesized instructions, restricted to the
/// tools in `processing_rule_tools`. Proposed actions are only recorded.
/// Writes `analysis` and appends to `actions`.
pub async fn analyze(
    ctx: &StepContext<'_>,
    network: &NetworkTools,
    state: &mut WorkflowState,
) -> Result<AnalysisOutcome> {
    let instructions = require(&state.instructions, Slot::Instructions)?.clone();
    let prompt = state.incident()?.summary();
    let caps = CapabilitySet::from_names(state.processing_rule_tools.as_deref().unwrap_or_default());
    tracing::info!(tools = ?caps.names(), "analysis started");

    let instructions = format!(
        "{instructions}\n\nPropose remediation with the {ADD_ACTION} tool when appropriate. \
         Once you successfully complete the analysis, save it using the {SAVE_ANALYSIS} tool."
    );
    let mut tools = AnalyzerTools {
        state: &mut *state,
        network,
        caps,
        proposed: 0,
    };
    drive(ctx, instructions, prompt, &mut tools).await?;
    let proposed = tools.proposed;
    Ok(AnalysisOutcome {
        analysis: state.analysis.clone().unwrap_or_default(),
        proposed,
    })
}
