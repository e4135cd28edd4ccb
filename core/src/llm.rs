use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
        ChatCompletionRequestMessage, ChatCompletionRequestToolMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionTool, ChatCompletionToolArgs,
        ChatCompletionToolChoiceOption, ChatCompletionToolType, CreateChatCompletionRequestArgs,
        FunctionCall, FunctionObjectArgs,
    },
    Client,
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::LlmSettings;
use crate::registry::ToolDeclaration;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub call_id: String,
    pub tool_name: String,
    /// Serialized JSON object, exactly as the model produced it.
    pub arguments_json: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ConversationTurn {
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        tool_calls: Vec<ToolCallRequest>,
    },
    Tool {
        call_id: String,
        content: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub turns: Vec<ConversationTurn>,
    pub tools: Vec<ToolDeclaration>,
    pub tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("provider request failed: {0}")]
    Provider(#[from] OpenAIError),

    #[error("could not encode tool schema: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("provider returned no choices")]
    EmptyResponse,
}

/// One round trip with a language model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, LlmError>;
}

pub struct Brain {
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: u32,
}

impl Brain {
    pub fn new(settings: &LlmSettings) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(settings.api_key.clone());
        if let Some(base) = &settings.api_base {
            config = config.with_api_base(base.clone());
        }
        // Failures surface to the caller on the first attempt; no provider-side retries.
        let no_retry = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();
        let client = Client::with_config(config).with_backoff(no_retry);

        info!("Brain connected. Model: {}", settings.model);
        Self {
            client,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
        }
    }

    pub async fn ping(&self) -> Result<String, LlmError> {
        let response = self
            .complete(ModelRequest {
                turns: vec![ConversationTurn::User {
                    content: "Hello! Reply with 'System Online'.".to_string(),
                }],
                tools: Vec::new(),
                tool_choice: None,
            })
            .await?;
        Ok(response.content.unwrap_or_default())
    }

    fn to_openai_tool(declaration: &ToolDeclaration) -> Result<ChatCompletionTool, LlmError> {
        let function = FunctionObjectArgs::default()
            .name(&declaration.name)
            .description(&declaration.description)
            .parameters(serde_json::to_value(&declaration.parameters)?)
            .build()?;

        Ok(ChatCompletionToolArgs::default()
            .r#type(ChatCompletionToolType::Function)
            .function(function)
            .build()?)
    }

    fn to_openai_message(turn: &ConversationTurn) -> Result<ChatCompletionRequestMessage, LlmError> {
        let message = match turn {
            ConversationTurn::User { content } => ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(content.as_str())
                    .build()?,
            ),
            ConversationTurn::Assistant {
                content,
                tool_calls,
            } => {
                let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                if let Some(content) = content {
                    args.content(content.as_str());
                }
                if !tool_calls.is_empty() {
                    args.tool_calls(
                        tool_calls
                            .iter()
                            .map(|call| ChatCompletionMessageToolCall {
                                id: call.call_id.clone(),
                                r#type: ChatCompletionToolType::Function,
                                function: FunctionCall {
                                    name: call.tool_name.clone(),
                                    arguments: call.arguments_json.clone(),
                                },
                            })
                            .collect::<Vec<_>>(),
                    );
                }
                ChatCompletionRequestMessage::Assistant(args.build()?)
            }
            ConversationTurn::Tool { call_id, content } => ChatCompletionRequestMessage::Tool(
                ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(call_id.as_str())
                    .content(content.as_str())
                    .build()?,
            ),
        };
        Ok(message)
    }
}

#[async_trait]
impl ChatModel for Brain {
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, LlmError> {
        // 1. Convert our turns + registry declarations -> OpenAI types
        let messages = request
            .turns
            .iter()
            .map(Self::to_openai_message)
            .collect::<Result<Vec<_>, _>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(messages)
            .max_completion_tokens(self.max_tokens);

        if !request.tools.is_empty() {
            let tools = request
                .tools
                .iter()
                .map(Self::to_openai_tool)
                .collect::<Result<Vec<_>, _>>()?;
            args.tools(tools);
        }
        if let Some(ToolChoice::Auto) = request.tool_choice {
            args.tool_choice(ChatCompletionToolChoiceOption::Auto);
        }

        // 2. Send to AI
        let response = self.client.chat().create(args.build()?).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?;

        // 3. Back to our shape
        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCallRequest {
                call_id: call.id,
                tool_name: call.function.name,
                arguments_json: call.function.arguments,
            })
            .collect::<Vec<_>>();

        debug!(
            "Model answered: content={}, tool_calls={}",
            choice.message.content.is_some(),
            tool_calls.len()
        );

        Ok(ModelResponse {
            content: choice.message.content,
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn turns_serialize_with_role_tags() {
        let turn = ConversationTurn::Tool {
            call_id: "call_1".to_string(),
            content: "done".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&turn).unwrap(),
            json!({ "role": "tool", "call_id": "call_1", "content": "done" })
        );
    }

    #[test]
    fn assistant_turn_keeps_tool_calls() {
        let turn = ConversationTurn::Assistant {
            content: None,
            tool_calls: vec![ToolCallRequest {
                call_id: "call_1".to_string(),
                tool_name: "send_account_compromise_alert".to_string(),
                arguments_json: "{}".to_string(),
            }],
        };

        let message = Brain::to_openai_message(&turn).unwrap();
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["role"], "assistant");
        assert_eq!(value["tool_calls"][0]["id"], "call_1");
        assert_eq!(
            value["tool_calls"][0]["function"]["name"],
            "send_account_compromise_alert"
        );
    }
}
