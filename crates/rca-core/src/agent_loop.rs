//! Tool-calling loop shared by the reasoning steps.
//!
//! A step declares its tools through [`StepTools`]. [`drive`] calls the
//! reasoning service with exactly those declarations, executes whatever tool
//! calls come back, feeds the results into the transcript and repeats until a
//! terminal tool reports [`ToolReply::Finish`] or the turn budget runs out.

use async_trait::async_trait;
use reasoning_agent::{complete, CompletionRequest, Reasoner, ToolCall, ToolSpec, Turn};
use serde_json::Value;

use crate::capability::{error_reply, CapabilitySet, NetworkTools};
use crate::error::{RcaError, Result};
use crate::state::WorkflowState;

/// Per-step call settings.
pub struct StepContext<'a> {
    pub reasoner: &'a dyn Reasoner,
    pub model: &'a str,
    pub max_turns: u32,
    pub include_thoughts: bool,
}

pub enum ToolReply {
    /// Hand the value back to the model and keep going.
    Continue(Value),
    /// The step's terminal tool ran; the value is still recorded.
    Finish(Value),
}

#[async_trait]
pub trait StepTools: Send {
    fn specs(&self) -> Vec<ToolSpec>;
    async fn call(&mut self, call: &ToolCall) -> Result<ToolReply>;
}

/// Run the loop until a terminal tool finishes the step.
pub async fn drive<T>(
    ctx: &StepContext<'_>,
    instructions: String,
    prompt: String,
    tools: &mut T,
) -> Result<()>
where
    T: StepTools + ?Sized,
{
    let mut turns = vec![Turn::User { text: prompt }];
    for turn in 0..ctx.max_turns {
        let request = CompletionRequest {
            model: ctx.model.to_string(),
            instructions: instructions.clone(),
            turns: turns.clone(),
            tools: tools.specs(),
            grounding: None,
            include_thoughts: ctx.include_thoughts,
        };
        let completion = complete(ctx.reasoner, request).await?;
        if let Some(thoughts) = &completion.thoughts {
            tracing::info!(turn, thoughts = %thoughts, "model thoughts");
        }
        turns.push(Turn::Assistant {
            text: completion.text.clone(),
            tool_calls: completion.tool_calls.clone(),
        });

        if completion.tool_calls.is_empty() {
            let names: Vec<String> = tools.specs().into_iter().map(|s| s.name).collect();
            tracing::debug!(turn, "no tool calls, nudging model");
            turns.push(Turn::User {
                text: format!(
                    "Continue. Finish the task by calling one of: {}.",
                    names.join(", ")
                ),
            });
            continue;
        }

        let mut finished = false;
        for call in &completion.tool_calls {
            tracing::debug!(turn, tool = %call.name, "tool call");
            let output = match tools.call(call).await? {
                ToolReply::Continue(v) => v,
                ToolReply::Finish(v) => {
                    finished = true;
                    v
                }
            };
            turns.push(Turn::ToolResult {
                call_id: call.id.clone(),
                name: call.name.clone(),
                output,
            });
        }
        if finished {
            return Ok(());
        }
    }
    tracing::error!(max_turns = ctx.max_turns, "step did not finish");
    Err(RcaError::Upstream(format!(
        "reasoning step did not finish within {} turns",
        ctx.max_turns
    )))
}

/// Dispatch a call to an allow-listed network tool. Anything outside the
/// capability set is refused back to the model.
pub async fn call_network_tool(
    caps: &CapabilitySet,
    network: &NetworkTools,
    state: &mut WorkflowState,
    call: &ToolCall,
) -> Result<ToolReply> {
    match caps.resolve(&call.name) {
        Some(tool) => Ok(ToolReply::Continue(
            network.invoke(tool, &call.args, state).await?,
        )),
        None => {
            tracing::warn!(tool = %call.name, "model called a tool outside its allow-list");
            Ok(ToolReply::Continue(error_reply(format!(
                "tool '{}' is not available",
                call.name
            ))))
        }
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

/// Scripted reasoner: returns the queued completions in order and records
/// every request it saw.
#[cfg(test)]
pub(crate) mod scripted {
    use async_trait::async_trait;
    use reasoning_agent::{Completion, CompletionRequest, Message, Reasoner, ResponseStream, ToolCall};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct ScriptedReasoner {
        replies: Mutex<VecDeque<Completion>>,
        pub requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedReasoner {
        pub fn new(replies: Vec<Completion>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Reasoner for ScriptedReasoner {
        async fn stream(&self, request: CompletionRequest) -> reasoning_agent::Result<ResponseStream> {
            self.requests.lock().unwrap().push(request);
            let next = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Completion::text("no more scripted replies"));
            Ok(ResponseStream::from_messages(vec![Ok(Message::Final(next))]))
        }
    }

    pub fn call(name: &str, args: serde_json::Value) -> Completion {
        calls(&[(name, args)])
    }

    pub fn calls(items: &[(&str, serde_json::Value)]) -> Completion {
        Completion {
            tool_calls: items
                .iter()
                .enumerate()
                .map(|(i, (name, args))| ToolCall {
                    id: format!("call-{i}"),
                    name: name.to_string(),
                    args: args.clone(),
                })
                .collect(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
