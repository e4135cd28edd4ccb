use serde::{Deserialize, Serialize};

use relaywatch_core::CallContext;

// Input: a forward already resolved by some other platform layer
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub original_sender: String, // Who wrote it?
    pub current_sender: String,  // Who forwarded it?
    #[serde(default)]
    pub message_text: String,
}

impl From<AnalyzeRequest> for CallContext {
    fn from(request: AnalyzeRequest) -> Self {
        CallContext {
            original_sender: request.original_sender,
            current_sender: request.current_sender,
            message_text: request.message_text,
        }
    }
}

// Output: What we send back
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub analysis: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
