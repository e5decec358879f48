//! Chat history replayed by the editor on every command

use serde::{Deserialize, Serialize};

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One part of a message; only text parts feed the prompts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// A chat message in either the parts shape or the legacy `content` shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: ChatRole,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MessagePart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::from_text(ChatRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::from_text(ChatRole::Assistant, text)
    }

    fn from_text(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            id: None,
            role,
            parts: vec![MessagePart::Text { text: text.into() }],
            content: None,
        }
    }

    /// Concatenated text parts, or `content` when there are none
    pub fn text(&self) -> String {
        let from_parts: Vec<&str> = self
            .parts
            .iter()
            .filter_map(|part| match part {
                MessagePart::Text { text } => Some(text.as_str()),
                MessagePart::Other => None,
            })
            .collect();

        if from_parts.is_empty() {
            self.content.clone().unwrap_or_default()
        } else {
            from_parts.join("")
        }
    }
}

/// Render the last `limit` non-empty messages as `USER:`/`ASSISTANT:` lines
pub fn format_history(messages: &[ChatMessage], limit: usize) -> String {
    let rendered: Vec<String> = messages
        .iter()
        .filter_map(|message| {
            let text = message.text();
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            let role = match message.role {
                ChatRole::User => "USER",
                ChatRole::Assistant => "ASSISTANT",
            };
            Some(format!("{role}: {text}"))
        })
        .collect();

    let skip = rendered.len().saturating_sub(limit);
    rendered[skip..].join("\n")
}

/// Text of the most recent user message
pub fn last_user_instruction(messages: &[ChatMessage]) -> Option<String> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == ChatRole::User)
        .map(ChatMessage::text)
        .filter(|text| !text.trim().is_empty())
}
