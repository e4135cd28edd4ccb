use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::llm::{ChatModel, ConversationTurn, LlmError, ModelRequest, ToolCallRequest, ToolChoice};
use crate::prompt::analysis_prompt;
use crate::registry::{CallContext, ToolError, ToolRegistry};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("model request failed during {phase}: {source}")]
    ModelRequest {
        phase: Phase,
        #[source]
        source: LlmError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Drafting,
    AwaitingInitialResponse,
    ExecutingTools,
    AwaitingFinalResponse,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Drafting => "drafting",
            Phase::AwaitingInitialResponse => "initial response",
            Phase::ExecutingTools => "tool execution",
            Phase::AwaitingFinalResponse => "final response",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// The answer to one tool call, correlated by `call_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub call_id: String,
    pub content: String,
}

/// Drives one analysis: prompt -> optional tool calls -> final answer.
/// Holds no per-analysis state, so one instance serves concurrent requests.
#[derive(Clone)]
pub struct Orchestrator {
    model: Arc<dyn ChatModel>,
    registry: Arc<ToolRegistry>,
}

impl Orchestrator {
    pub fn new(model: Arc<dyn ChatModel>, registry: Arc<ToolRegistry>) -> Self {
        Self { model, registry }
    }

    /// Analyzes a forwarded message and returns the text to reply with.
    pub async fn analyze(&self, context: &CallContext) -> Result<String, AnalysisError> {
        info!(
            "Analyzing message from {} (forwarded by {})",
            context.original_sender, context.current_sender
        );
        let prompt = analysis_prompt(context);
        self.run(prompt, context).await
    }

    pub async fn run(&self, prompt: String, context: &CallContext) -> Result<String, AnalysisError> {
        debug!("Analysis phase: {}", Phase::Drafting);
        let user_turn = ConversationTurn::User { content: prompt };
        let tools = self.registry.all_declarations();

        debug!("Analysis phase: {}", Phase::AwaitingInitialResponse);
        let initial = self
            .model
            .complete(ModelRequest {
                turns: vec![user_turn.clone()],
                tools,
                tool_choice: Some(ToolChoice::Auto),
            })
            .await
            .map_err(|source| {
                error!("Initial model request failed: {}", source);
                AnalysisError::ModelRequest {
                    phase: Phase::AwaitingInitialResponse,
                    source,
                }
            })?;

        if initial.tool_calls.is_empty() {
            info!("No tool calls requested; returning the model's answer");
            debug!("Analysis phase: {}", Phase::Done);
            return Ok(initial.content.unwrap_or_default());
        }

        debug!("Analysis phase: {}", Phase::ExecutingTools);
        info!("Model requested {} tool call(s)", initial.tool_calls.len());
        let results = self.execute_calls(&initial.tool_calls, context).await;

        debug!("Analysis phase: {}", Phase::AwaitingFinalResponse);
        let mut turns = Vec::with_capacity(2 + results.len());
        turns.push(user_turn);
        turns.push(ConversationTurn::Assistant {
            content: initial.content,
            tool_calls: initial.tool_calls,
        });
        turns.extend(results.into_iter().map(|result| ConversationTurn::Tool {
            call_id: result.call_id,
            content: result.content,
        }));

        let last = self
            .model
            .complete(ModelRequest {
                turns,
                tools: Vec::new(),
                tool_choice: None,
            })
            .await
            .map_err(|source| {
                error!("Final model request failed: {}", source);
                AnalysisError::ModelRequest {
                    phase: Phase::AwaitingFinalResponse,
                    source,
                }
            })?;

        debug!("Analysis phase: {}", Phase::Done);
        Ok(last.content.unwrap_or_default())
    }

    /// One result per call, in the order the model issued them.
    pub async fn execute_calls(
        &self,
        calls: &[ToolCallRequest],
        context: &CallContext,
    ) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let content = match self.execute_call(call, context).await {
                Ok(output) => output,
                Err(err) => {
                    warn!("Tool call '{}' ({}) failed: {}", call.tool_name, call.call_id, err);
                    describe_failure(&call.tool_name, &err)
                }
            };
            results.push(ToolResult {
                call_id: call.call_id.clone(),
                content,
            });
        }
        results
    }

    async fn execute_call(
        &self,
        call: &ToolCallRequest,
        context: &CallContext,
    ) -> Result<String, ToolError> {
        info!("Calling tool '{}' ({})", call.tool_name, call.call_id);
        let arguments = parse_call_arguments(&call.arguments_json)?;
        let handler = self.registry.lookup(&call.tool_name)?;
        handler.invoke(arguments, context).await
    }
}

fn parse_call_arguments(raw: &str) -> Result<Value, ToolError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(ToolError::MalformedArguments(
            "arguments must be a JSON object".to_string(),
        )),
        Err(e) => Err(ToolError::MalformedArguments(e.to_string())),
    }
}

// Model-visible text for a failed call.
fn describe_failure(tool_name: &str, err: &ToolError) -> String {
    match err {
        ToolError::UnknownTool(name) => format!("❌ Unknown function: {}", name),
        ToolError::MalformedArguments(reason) => {
            format!("❌ Malformed arguments for {}: {}", tool_name, reason)
        }
        ToolError::Failed(reason) => format!("❌ Error running {}: {}", tool_name, reason),
    }
}
