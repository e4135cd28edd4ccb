use crate::alert::ALERT_TOOL_NAME;
use crate::registry::CallContext;

pub const LEGITIMATE_REPLY: &str = "✅ Message appears legitimate - no signs of compromise detected.";
pub const OFF_TOPIC_REPLY: &str = "🚫 This message is off topic and does not require any action.";

pub const SUSPICIOUS_SIGNS: [&str; 6] = [
    "Account compromise/hacking (content that doesn't match the sender's typical behavior)",
    "Impersonation attempts (claiming to be someone else)",
    "Scam messages (phishing, fake giveaways, suspicious links)",
    "Unusual language patterns or requests",
    "Social engineering attempts",
    "Urgency tactics or pressure to act quickly",
];

/// The single user turn of an analysis.
pub fn analysis_prompt(context: &CallContext) -> String {
    let signs = SUSPICIOUS_SIGNS
        .iter()
        .enumerate()
        .map(|(i, sign)| format!("{}. {}", i + 1, sign))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyze this forwarded message for potential account impersonation or compromise:

Original sender: {original}
Current sender: {current}
Message content: \"{text}\"

Look for signs of:
{signs}

IMPORTANT: If you detect ANY potential compromise or impersonation, you MUST use the {tool} tool to send an alert.

For suspicious messages:
1. Call the {tool} tool with appropriate details
2. Then provide your analysis explaining what you found

For legitimate messages:
- Respond with \"{legit}\"

For off-topic messages:
- Respond with \"{off_topic}\"

Err on the side of caution. When in doubt about potential compromise, use the alert tool.",
        original = context.original_sender,
        current = context.current_sender,
        text = context.message_text,
        signs = signs,
        tool = ALERT_TOOL_NAME,
        legit = LEGITIMATE_REPLY,
        off_topic = OFF_TOPIC_REPLY,
    )
}
