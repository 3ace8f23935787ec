//! Core channel types: the inbound event vocabulary, outgoing responses, and
//! the `Channel` trait every transport implements.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use uuid::Uuid;

use crate::error::ChannelError;

/// Stream of inbound messages produced by a channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// Bot commands the survey reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Cancel,
}

/// What the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// `/start` or `/cancel`.
    Command { command: Command },
    /// Click on an inline button carrying `token`.
    ButtonClick { token: String },
    /// Free-text message.
    Text { text: String },
    /// Anything without text (stickers, photos, empty callbacks).
    Unsupported,
}

impl InboundEvent {
    /// Classify a text message. `/start` and `/cancel` (optionally addressed
    /// as `/start@botname`, case-insensitive) become commands; everything
    /// else, other slash-words included, stays text.
    pub fn from_text(text: &str) -> Self {
        if let Some(rest) = text.trim().strip_prefix('/') {
            let word = rest.split_whitespace().next().unwrap_or_default();
            let name = word.split('@').next().unwrap_or_default();
            match name.to_lowercase().as_str() {
                "start" => return Self::command(Command::Start),
                "cancel" => return Self::command(Command::Cancel),
                _ => {}
            }
        }
        Self::Text {
            text: text.to_string(),
        }
    }

    pub fn command(command: Command) -> Self {
        Self::Command { command }
    }

    pub fn button(token: impl Into<String>) -> Self {
        Self::ButtonClick {
            token: token.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Command {
                command: Command::Start,
            } => "start",
            Self::Command {
                command: Command::Cancel,
            } => "cancel",
            Self::ButtonClick { .. } => "button",
            Self::Text { .. } => "text",
            Self::Unsupported => "unsupported",
        }
    }
}

/// A message received from a channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Unique per message; ties log lines for one update together.
    pub id: Uuid,
    /// Name of the channel that produced the message.
    pub channel: String,
    /// Stable per-user identifier; conversations are keyed on it.
    pub user_id: String,
    /// Display name, when the transport knows it.
    pub user_name: Option<String>,
    pub event: InboundEvent,
    /// Transport-specific routing data (e.g. Telegram `chat_id`).
    pub metadata: serde_json::Value,
    /// When the channel received it; drives idle-survey eviction.
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn new(channel: impl Into<String>, user_id: impl Into<String>, event: InboundEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            user_id: user_id.into(),
            user_name: None,
            event,
            metadata: serde_json::Value::Null,
            received_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }
}

/// A selectable inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    /// Opaque token echoed back in the click event.
    pub token: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            token: token.into(),
        }
    }
}

/// A reply to send back to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub content: String,
    /// Keyboard rows; empty for plain text.
    pub buttons: Vec<Vec<InlineButton>>,
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_buttons(mut self, rows: Vec<Vec<InlineButton>>) -> Self {
        self.buttons = rows;
        self
    }

    pub fn has_buttons(&self) -> bool {
        self.buttons.iter().any(|row| !row.is_empty())
    }
}

/// A messaging transport.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Start receiving; the returned stream ends when the transport stops.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Send `response` to the user `msg` came from.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_and_cancel_are_commands() {
        assert_eq!(InboundEvent::from_text("/start"), InboundEvent::command(Command::Start));
        assert_eq!(InboundEvent::from_text("/cancel"), InboundEvent::command(Command::Cancel));
        assert_eq!(
            InboundEvent::from_text("  /START  "),
            InboundEvent::command(Command::Start)
        );
    }

    #[test]
    fn addressed_commands_are_recognised() {
        assert_eq!(
            InboundEvent::from_text("/start@anketa_bot"),
            InboundEvent::command(Command::Start)
        );
        assert_eq!(
            InboundEvent::from_text("/cancel@anketa_bot now"),
            InboundEvent::command(Command::Cancel)
        );
    }

    #[test]
    fn other_text_stays_text() {
        assert_eq!(InboundEvent::from_text("Alice"), InboundEvent::text("Alice"));
        assert_eq!(InboundEvent::from_text("/help"), InboundEvent::text("/help"));
        assert_eq!(InboundEvent::from_text("start"), InboundEvent::text("start"));
        assert_eq!(InboundEvent::from_text("/"), InboundEvent::text("/"));
    }

    #[test]
    fn event_kinds() {
        assert_eq!(InboundEvent::button("x1").kind(), "button");
        assert_eq!(InboundEvent::Unsupported.kind(), "unsupported");
        assert_eq!(InboundEvent::command(Command::Cancel).kind(), "cancel");
    }

    #[test]
    fn response_buttons() {
        let plain = OutgoingResponse::text("hi");
        assert!(!plain.has_buttons());

        let with = OutgoingResponse::text("pick").with_buttons(vec![vec![
            InlineButton::new("A", "1"),
            InlineButton::new("B", "2"),
        ]]);
        assert!(with.has_buttons());
        assert_eq!(with.buttons[0][1].token, "2");
    }

    #[test]
    fn incoming_message_metadata_has_chat_id() {
        let msg = IncomingMessage::new("telegram", "user123", InboundEvent::text("hello"))
            .with_metadata(serde_json::json!({"chat_id": "99887766"}));

        let chat_id = msg.metadata.get("chat_id").and_then(|v| v.as_str());
        assert_eq!(chat_id, Some("99887766"));
    }
}
