//! Forwarded-message triage: asks a chat model whether a forward looks like a
//! compromised or impersonated account, and lets it raise an alert through a
//! declared tool.

pub mod alert;
pub mod config;
pub mod llm;
pub mod orchestrator;
pub mod prompt;
pub mod registry;
pub mod schema;

pub use alert::{AlertDispatcher, ALERT_TOOL_NAME};
pub use config::Settings;
pub use llm::{Brain, ChatModel};
pub use orchestrator::{AnalysisError, Orchestrator};
pub use registry::{CallContext, ToolRegistry};
