use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::api::{AnalyzeRequest, AnalyzeResponse, ErrorResponse};
use crate::telegram::{SendMessage, Update};
use relaywatch_core::{CallContext, Orchestrator};

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

const ANALYSIS_FAILED_REPLY: &str =
    "⚠️ Sorry, I couldn't analyze this message right now. Please try again later.";
const EMPTY_ANALYSIS_REPLY: &str = "ℹ️ The analysis came back empty.";
const UNKNOWN_ORIGIN_REPLY: &str = "Could not determine original sender of forwarded message.";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub webhook_secret: Option<Arc<str>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/analyze", post(analyze))
        .route("/telegram/webhook", post(telegram_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- HANDLERS ---

async fn health_check() -> &'static str {
    "RelayWatch Gateway: Operational"
}

async fn analyze(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, (StatusCode, Json<ErrorResponse>)> {
    let context = CallContext::from(payload);

    match state.orchestrator.analyze(&context).await {
        Ok(analysis) => Ok(Json(AnalyzeResponse { analysis })),
        Err(e) => {
            error!("Analysis failed: {}", e);
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: "analysis failed".to_string(),
                }),
            ))
        }
    }
}

async fn telegram_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> Response {
    if let Some(secret) = &state.webhook_secret {
        let presented = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if presented != Some(secret.as_ref()) {
            warn!("Rejected webhook call with a missing or wrong secret token");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    debug!("Received update {}", update.update_id);
    let Some(message) = update.message else {
        return StatusCode::OK.into_response();
    };

    if message.is_command("hello") {
        let name = message
            .from
            .as_ref()
            .map(|u| u.first_name.as_str())
            .unwrap_or("there");
        return Json(SendMessage::reply_to(&message, &format!("Hello {}", name))).into_response();
    }

    let Some(origin) = &message.forward_origin else {
        return StatusCode::OK.into_response();
    };

    let Some(original_sender) = origin.sender_name() else {
        return Json(SendMessage::reply_to(&message, UNKNOWN_ORIGIN_REPLY)).into_response();
    };

    let context = CallContext {
        original_sender,
        current_sender: message.current_sender(),
        message_text: message.body_text(),
    };

    let reply = match state.orchestrator.analyze(&context).await {
        Ok(analysis) if analysis.trim().is_empty() => EMPTY_ANALYSIS_REPLY.to_string(),
        Ok(analysis) => {
            info!("Analysis complete for message {}", message.message_id);
            analysis
        }
        Err(e) => {
            error!("Error analyzing message {}: {}", message.message_id, e);
            ANALYSIS_FAILED_REPLY.to_string()
        }
    };

    Json(SendMessage::reply_to(&message, &reply)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use relaywatch_core::llm::{ChatModel, LlmError, ModelRequest, ModelResponse};
    use relaywatch_core::ToolRegistry;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Answers every request with the same text and keeps the prompts.
    struct FixedModel {
        answer: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatModel for FixedModel {
        async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, LlmError> {
            if let Some(relaywatch_core::llm::ConversationTurn::User { content }) =
                request.turns.first()
            {
                self.prompts.lock().unwrap().push(content.clone());
            }
            match &self.answer {
                Some(text) => Ok(ModelResponse {
                    content: Some(text.clone()),
                    tool_calls: Vec::new(),
                }),
                None => Err(LlmError::EmptyResponse),
            }
        }
    }

    fn app(answer: Option<&str>, secret: Option<&str>) -> (Router, Arc<FixedModel>) {
        let model = Arc::new(FixedModel {
            answer: answer.map(str::to_string),
            prompts: Mutex::new(Vec::new()),
        });
        let orchestrator = Orchestrator::new(model.clone(), Arc::new(ToolRegistry::new()));
        let state = AppState {
            orchestrator,
            webhook_secret: secret.map(Arc::from),
        };
        (router(state), model)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn forwarded_update() -> Value {
        json!({
            "update_id": 1,
            "message": {
                "message_id": 42,
                "from": { "id": 2, "is_bot": false, "first_name": "Bob", "username": "bob" },
                "chat": { "id": 100, "type": "private" },
                "date": 1700000100,
                "text": "Send me your login code please",
                "forward_origin": {
                    "type": "user",
                    "date": 1700000000,
                    "sender_user": { "id": 1, "is_bot": false, "first_name": "Alice", "username": "alice" }
                }
            }
        })
    }

    #[tokio::test]
    async fn health_reports_operational() {
        let (app, _) = app(Some("ok"), None);
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn analyze_endpoint_returns_model_text() {
        let (app, model) = app(Some("Message appears legitimate"), None);
        let response = app
            .oneshot(post_json(
                "/analyze",
                json!({
                    "original_sender": "@alice",
                    "current_sender": "@bob",
                    "message_text": "see you at lunch"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "analysis": "Message appears legitimate" })
        );
        assert!(model.prompts.lock().unwrap()[0].contains("Original sender: @alice"));
    }

    #[tokio::test]
    async fn analyze_endpoint_hides_provider_errors() {
        let (app, _) = app(None, None);
        let response = app
            .oneshot(post_json(
                "/analyze",
                json!({ "original_sender": "a", "current_sender": "b", "message_text": "c" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await, json!({ "error": "analysis failed" }));
    }

    #[tokio::test]
    async fn webhook_replies_to_forward() {
        let (app, model) = app(Some("✅ Message appears legitimate"), None);
        let response = app
            .oneshot(post_json("/telegram/webhook", forwarded_update()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({
                "method": "sendMessage",
                "chat_id": 100,
                "text": "✅ Message appears legitimate",
                "reply_parameters": { "message_id": 42 }
            })
        );

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("Original sender: @alice"));
        assert!(prompts[0].contains("Current sender: @bob"));
        assert!(prompts[0].contains("Send me your login code please"));
    }

    #[tokio::test]
    async fn webhook_sends_generic_error_on_failure() {
        let (app, _) = app(None, None);
        let response = app
            .oneshot(post_json("/telegram/webhook", forwarded_update()))
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body["text"], ANALYSIS_FAILED_REPLY);
    }

    #[tokio::test]
    async fn webhook_replaces_empty_analysis_with_notice() {
        let (app, _) = app(Some("   "), None);
        let response = app
            .oneshot(post_json("/telegram/webhook", forwarded_update()))
            .await
            .unwrap();

        assert_eq!(json_body(response).await["text"], EMPTY_ANALYSIS_REPLY);
    }

    #[tokio::test]
    async fn webhook_ignores_plain_messages() {
        let (app, model) = app(Some("unused"), None);
        let response = app
            .oneshot(post_json(
                "/telegram/webhook",
                json!({
                    "update_id": 2,
                    "message": {
                        "message_id": 1,
                        "chat": { "id": 100, "type": "private" },
                        "text": "just chatting"
                    }
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn webhook_greets_on_hello() {
        let (app, _) = app(Some("unused"), None);
        let response = app
            .oneshot(post_json(
                "/telegram/webhook",
                json!({
                    "update_id": 3,
                    "message": {
                        "message_id": 5,
                        "from": { "id": 2, "is_bot": false, "first_name": "Bob" },
                        "chat": { "id": 100, "type": "private" },
                        "text": "/hello"
                    }
                }),
            ))
            .await
            .unwrap();

        assert_eq!(json_body(response).await["text"], "Hello Bob");
    }

    #[tokio::test]
    async fn webhook_reports_unresolvable_origin() {
        let (app, model) = app(Some("unused"), None);
        let response = app
            .oneshot(post_json(
                "/telegram/webhook",
                json!({
                    "update_id": 4,
                    "message": {
                        "message_id": 6,
                        "chat": { "id": 100, "type": "private" },
                        "text": "forwarded",
                        "forward_origin": {
                            "type": "channel",
                            "date": 1700000000,
                            "message_id": 1,
                            "chat": { "id": -1, "type": "channel" }
                        }
                    }
                }),
            ))
            .await
            .unwrap();

        assert_eq!(json_body(response).await["text"], UNKNOWN_ORIGIN_REPLY);
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn webhook_checks_secret_token() {
        let (app, _) = app(Some("ok"), Some("s3cret"));

        let rejected = app
            .clone()
            .oneshot(post_json("/telegram/webhook", forwarded_update()))
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);

        let mut request = post_json("/telegram/webhook", forwarded_update());
        request
            .headers_mut()
            .insert(SECRET_HEADER, "s3cret".parse().unwrap());
        let accepted = app.oneshot(request).await.unwrap();
        assert_eq!(accepted.status(), StatusCode::OK);
    }
}
