use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::schema::ParameterSchema;

// What the model sees about a tool (the "menu" entry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    // This allows the Brain to know *how* to call the tool.
    pub parameters: ParameterSchema,
}

/// Ambient context of the message under analysis. Handlers receive it,
/// the model never supplies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub original_sender: String,
    pub current_sender: String,
    pub message_text: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool with name '{0}' already registered")]
    DuplicateTool(String),

    #[error("tool '{0}' requires parameters it does not declare")]
    InconsistentSchema(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unknown function: {0}")]
    UnknownTool(String),

    #[error("Malformed arguments: {0}")]
    MalformedArguments(String),

    #[error("{0}")]
    Failed(String),
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, arguments: Value, context: &CallContext) -> Result<String, ToolError>;
}

/// Parses a raw argument object into a tool's typed payload.
pub fn parse_arguments<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::MalformedArguments(e.to_string()))
}

struct RegisteredTool {
    declaration: ToolDeclaration,
    handler: Arc<dyn ToolHandler>,
}

/// Tool name -> (declaration, handler). Built once at startup, then shared read-only.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(
        &mut self,
        name: &str,
        description: &str,
        parameters: ParameterSchema,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), RegistryError> {
        if self.tools.contains_key(name) {
            return Err(RegistryError::DuplicateTool(name.to_string()));
        }
        if !parameters.is_consistent() {
            return Err(RegistryError::InconsistentSchema(name.to_string()));
        }

        tracing::debug!("Registered tool '{}'", name);
        self.tools.insert(
            name.to_string(),
            RegisteredTool {
                declaration: ToolDeclaration {
                    name: name.to_string(),
                    description: description.to_string(),
                    parameters,
                },
                handler,
            },
        );
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn ToolHandler>, ToolError> {
        self.tools
            .get(name)
            .map(|tool| Arc::clone(&tool.handler))
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    // Sorted by name, so every request carries the same order.
    pub fn all_declarations(&self) -> Vec<ToolDeclaration> {
        self.tools
            .values()
            .map(|tool| tool.declaration.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
