use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

use crate::config::AlertSettings;
use crate::registry::{parse_arguments, CallContext, RegistryError, ToolError, ToolHandler, ToolRegistry};
use crate::schema::{infer_parameters, ParameterSchema, Signature, TypeHint};

pub const ALERT_TOOL_NAME: &str = "send_account_compromise_alert";

const ALERT_TOOL_DESCRIPTION: &str = "Send an alert when potential account compromise or impersonation is detected. Use this tool when you identify suspicious activity that indicates an account may be compromised.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

/// The four fields the model must supply. Missing ones are a parse error,
/// never a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AlertArguments {
    pub compromised_account: String,
    pub indicators: String,
    pub recommendation: String,
    pub confidence_level: ConfidenceLevel,
}

// Wire body of the alert POST.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertPayload {
    pub alert_type: &'static str,
    pub timestamp: f64,
    pub compromised_account: String,
    pub indicators: String,
    pub recommendation: String,
    #[serde(skip)]
    pub confidence_level: ConfidenceLevel,
    pub original_sender: String,
    pub current_sender: String,
    pub message_content: String,
    pub severity: &'static str,
}

impl AlertPayload {
    pub fn new(arguments: AlertArguments, context: &CallContext) -> Self {
        let now = chrono::Utc::now();
        Self {
            alert_type: "account_compromise",
            timestamp: now.timestamp_micros() as f64 / 1_000_000.0,
            compromised_account: arguments.compromised_account,
            indicators: arguments.indicators,
            recommendation: arguments.recommendation,
            confidence_level: arguments.confidence_level,
            original_sender: context.original_sender.clone(),
            current_sender: context.current_sender.clone(),
            message_content: context.message_text.clone(),
            severity: "high",
        }
    }
}

#[derive(Debug, Error)]
pub enum DeliveryFailure {
    #[error("alert endpoint answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("alert endpoint timed out")]
    Timeout,

    #[error("alert transport error: {0}")]
    Transport(#[source] reqwest::Error),
}

impl From<reqwest::Error> for DeliveryFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DeliveryFailure::Timeout
        } else {
            DeliveryFailure::Transport(err)
        }
    }
}

/// Posts compromise alerts to the monitoring endpoint.
pub struct AlertDispatcher {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl AlertDispatcher {
    pub fn new(settings: &AlertSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            timeout: settings.timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn declaration_schema() -> ParameterSchema {
        let signature = Signature::new()
            .required("compromised_account", TypeHint::Str)
            .required("indicators", TypeHint::Str)
            .required("recommendation", TypeHint::Str)
            .required("confidence_level", TypeHint::Str);

        infer_parameters(&signature)
            .describe(
                "compromised_account",
                "The username or name of the account that appears to be compromised",
            )
            .describe(
                "indicators",
                "Specific reasons and evidence for suspecting account compromise",
            )
            .describe(
                "recommendation",
                "Recommended actions users should take to address the compromise",
            )
            .describe(
                "confidence_level",
                "Confidence level in the compromise assessment",
            )
            .restrict("confidence_level", &["low", "medium", "high"])
    }

    /// Declares this dispatcher as the alert tool.
    pub fn register(self: Arc<Self>, registry: &mut ToolRegistry) -> Result<(), RegistryError> {
        registry.declare(
            ALERT_TOOL_NAME,
            ALERT_TOOL_DESCRIPTION,
            Self::declaration_schema(),
            self,
        )
    }

    /// One POST, bounded by the client timeout. Only HTTP 200 counts as delivered.
    pub async fn deliver(&self, payload: &AlertPayload) -> Result<(), DeliveryFailure> {
        let response = self.client.post(&self.endpoint).json(payload).send().await?;

        let status = response.status();
        if status.as_u16() == 200 {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryFailure::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ToolHandler for AlertDispatcher {
    async fn invoke(&self, arguments: Value, context: &CallContext) -> Result<String, ToolError> {
        let arguments: AlertArguments = parse_arguments(arguments)?;
        let account = arguments.compromised_account.clone();
        let payload = AlertPayload::new(arguments, context);

        match self.deliver(&payload).await {
            Ok(()) => {
                info!(
                    "Successfully sent compromise alert for account: {} (confidence {:?})",
                    account, payload.confidence_level
                );
                Ok(format!(
                    "✅ Alert successfully sent for compromised account: {}",
                    account
                ))
            }
            Err(failure) => {
                error!("Failed to send compromise alert for {}: {}", account, failure);
                Ok("❌ Failed to send alert - check logs for details".to_string())
            }
        }
    }
}
