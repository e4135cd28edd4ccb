use serde::{Deserialize, Serialize};

// Telegram caps a single message at 4096 characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

// Only the parts of the Bot API `Update` we read.
#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub forward_origin: Option<MessageOrigin>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Where a forwarded message originally came from.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageOrigin {
    User { sender_user: User },
    HiddenUser { sender_user_name: String },
    Chat { sender_chat: Chat },
    Channel { chat: Chat },
}

impl User {
    /// `@username` when set, else the first name.
    pub fn display_name(&self) -> String {
        match &self.username {
            Some(username) if !username.is_empty() => format!("@{}", username),
            _ => self.first_name.clone(),
        }
    }
}

impl Chat {
    pub fn display_name(&self) -> Option<String> {
        self.title
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| {
                self.username
                    .as_ref()
                    .filter(|u| !u.is_empty())
                    .map(|u| format!("@{}", u))
            })
    }
}

impl MessageOrigin {
    pub fn sender_name(&self) -> Option<String> {
        match self {
            MessageOrigin::User { sender_user } => Some(sender_user.display_name()),
            MessageOrigin::HiddenUser { sender_user_name } => {
                Some(sender_user_name.clone()).filter(|n| !n.is_empty())
            }
            MessageOrigin::Chat { sender_chat } => sender_chat.display_name(),
            MessageOrigin::Channel { chat } => chat.display_name(),
        }
    }
}

impl Message {
    pub fn body_text(&self) -> String {
        self.text
            .clone()
            .or_else(|| self.caption.clone())
            .unwrap_or_default()
    }

    /// Who relayed the message to us.
    pub fn current_sender(&self) -> String {
        self.from
            .as_ref()
            .map(User::display_name)
            .or_else(|| self.chat.display_name())
            .unwrap_or_else(|| "unknown sender".to_string())
    }

    /// Matches `/name`, `/name args` and `/name@bot`.
    pub fn is_command(&self, name: &str) -> bool {
        let Some(text) = self.text.as_deref() else {
            return false;
        };
        let Some(first) = text.split_whitespace().next() else {
            return false;
        };
        let command = first.split('@').next().unwrap_or(first);
        command.strip_prefix('/') == Some(name)
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ReplyParameters {
    pub message_id: i64,
}

/// A `sendMessage` call returned inline as the webhook response body.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SendMessage {
    pub method: &'static str,
    pub chat_id: i64,
    pub text: String,
    pub reply_parameters: ReplyParameters,
}

impl SendMessage {
    pub fn reply_to(message: &Message, text: &str) -> Self {
        Self {
            method: "sendMessage",
            chat_id: message.chat.id,
            text: text.chars().take(MAX_MESSAGE_CHARS).collect(),
            reply_parameters: ReplyParameters {
                message_id: message.message_id,
            },
        }
    }
}
