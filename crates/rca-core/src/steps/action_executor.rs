use serde_json::Value;

use crate::capability::{CapabilitySet, NetworkTools};
use crate::controller::Operator;
use crate::error::Result;
use crate::state::WorkflowState;
use crate::types::ActionStatus;

pub const NO_SUGGESTED_ACTIONS: &str = "There are no suggested automated actions to be taken.";

/// Why control went back to the root controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorExit {
    NoneSuggested,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorSummary {
    pub executed: usize,
    pub failed: usize,
    pub exit: ExecutorExit,
}

/// Suggested actions in full, then every other action by name and status.
/// The second section is omitted when there is nothing in it.
pub fn render_actions(state: &WorkflowState) -> String {
    let mut out = String::from("Suggested actions:\n");
    for (n, (_, action)) in state.suggested_actions().enumerate() {
        out.push_str(&format!(
            "{}. {}\n   Parameters: {}\n   Reason: {}\n",
            n + 1,
            action.tool_name,
            action.parameters_display(),
            action.reason_to_perform
        ));
    }
    let others: Vec<String> = state
        .actions
        .iter()
        .filter(|a| a.status != ActionStatus::Suggested)
        .map(|a| format!("- {}: {}", a.tool_name, a.status))
        .collect();
    if !others.is_empty() {
        out.push_str("\nOther actions:\n");
        out.push_str(&others.join("\n"));
        out.push('\n');
    }
    out
}

fn is_error_reply(v: &Value) -> bool {
    v.get("status").and_then(Value::as_str) == Some("error")
}

/// Present the suggested actions and run the ones the operator picks, one at
/// a time, until none remain or the operator declines.
pub async fn run(
    network: &NetworkTools,
    state: &mut WorkflowState,
    operator: &mut dyn Operator,
) -> Result<ExecutorSummary> {
    let mut summary = ExecutorSummary {
        executed: 0,
        failed: 0,
        exit: ExecutorExit::NoneSuggested,
    };
    let names: Vec<String> = state.actions.iter().map(|a| a.tool_name.clone()).collect();
    let caps = CapabilitySet::from_names(&names);

    loop {
        let suggested: Vec<usize> = state.suggested_actions().map(|(i, _)| i).collect();
        if suggested.is_empty() {
            operator.show(NO_SUGGESTED_ACTIONS);
            summary.exit = ExecutorExit::NoneSuggested;
            return Ok(summary);
        }
        let listing = render_actions(state);
        let Some(choice) = operator.choose_action(&listing, suggested.len()) else {
            tracing::info!("operator declined to run an action");
            summary.exit = ExecutorExit::Declined;
            return Ok(summary);
        };
        let Some(&index) = suggested.get(choice) else {
            operator.show(&format!("There is no suggested action number {}.", choice + 1));
            continue;
        };

        let action = state.actions[index].clone();
        let params = Value::Object(action.parameters.clone().into_iter().collect());
        let reply = match caps.resolve(&action.tool_name) {
            Some(tool) => network.invoke(tool, &params, state).await?,
            None => crate::capability::error_reply(format!("unknown tool '{}'", action.tool_name)),
        };
        let status = if is_error_reply(&reply) {
            summary.failed += 1;
            ActionStatus::Failed
        } else {
            summary.executed += 1;
            ActionStatus::Executed
        };
        tracing::info!(tool = %action.tool_name, status = %status, "action run");
        state.actions[index].status = status;
        operator.show(&format!("{} -> {}\n{reply}", action.tool_name, status));
    }
}
