//! Telegram channel. Long-polls the Bot API for updates.
//!
//! Handles plain messages and inline-button callbacks. Every callback from an
//! allowed user is acknowledged with `answerCallbackQuery` as soon as it
//! arrives so the client stops showing the loading spinner.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::{Value, json};

use crate::channels::{Channel, InboundEvent, IncomingMessage, MessageStream, OutgoingResponse};
use crate::config::TelegramConfig;
use crate::error::ChannelError;

/// Telegram channel. Connects to the Bot API via long-polling.
pub struct TelegramChannel {
    /// `{api_url}/bot{token}`; every method URL hangs off it.
    base_url: String,
    allowed_users: Vec<String>,
    poll_timeout: Duration,
    read_timeout: Duration,
    /// Pause after a failed poll.
    retry_delay: Duration,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            base_url: format!(
                "{}/bot{}",
                config.api_url.trim_end_matches('/'),
                config.token.expose_secret()
            ),
            allowed_users: config.allowed_users,
            poll_timeout: config.poll_timeout,
            read_timeout: config.read_timeout,
            retry_delay: config.poll_retry_delay,
            client,
        })
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    /// Send a text message, attaching an inline keyboard when the response
    /// carries buttons.
    async fn send_message(&self, chat_id: &str, response: &OutgoingResponse) -> Result<(), ChannelError> {
        let body = send_message_body(chat_id, response);

        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("sendMessage returned {status}: {err}"),
            });
        }

        Ok(())
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let updates_url = self.api_url("getUpdates");
        let answer_url = self.api_url("answerCallbackQuery");
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();
        let poll_secs = self.poll_timeout.as_secs();
        let request_timeout = self.poll_timeout + self.read_timeout;
        let retry_delay = self.retry_delay;

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for messages...");

            loop {
                let body = json!({
                    "offset": offset,
                    "timeout": poll_secs,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client
                    .post(&updates_url)
                    .timeout(request_timeout)
                    .json(&body)
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(retry_delay).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(retry_delay).await;
                        continue;
                    }
                };

                let Some(results) = data.get("result").and_then(Value::as_array) else {
                    tracing::warn!(response = %data, "Telegram getUpdates returned no result");
                    tokio::time::sleep(retry_delay).await;
                    continue;
                };

                for update in results {
                    // Advance offset past this update
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(incoming) = parse_update(update) else {
                        continue;
                    };

                    let username = incoming
                        .metadata
                        .get("username")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown");
                    if !check_user_allowed(&allowed_users, [username, incoming.user_id.as_str()]) {
                        tracing::warn!(
                            "Telegram: ignoring update from unauthorized user: \
                             username={username}, user_id={}",
                            incoming.user_id
                        );
                        continue;
                    }

                    if let Some(callback_id) = update
                        .get("callback_query")
                        .and_then(|q| q.get("id"))
                        .and_then(Value::as_str)
                    {
                        answer_callback(&client, &answer_url, callback_id).await;
                    }

                    if tx.send(incoming).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let chat_id = msg
            .metadata
            .get("chat_id")
            .and_then(Value::as_str)
            .ok_or_else(|| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: "No chat_id in message metadata".into(),
            })?;

        self.send_message(chat_id, &response).await
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::HealthCheckFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(ChannelError::HealthCheckFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            });
        }

        let info: Value = resp
            .json()
            .await
            .map_err(|e| ChannelError::HealthCheckFailed {
                name: "telegram".into(),
                reason: format!("getMe returned malformed body: {e}"),
            })?;
        let username = info
            .get("result")
            .and_then(|r| r.get("username"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        tracing::info!(bot = username, "Connected to Telegram Bot API");
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Acknowledge a button click. Failures only cost the user a spinner.
async fn answer_callback(client: &reqwest::Client, url: &str, callback_id: &str) {
    let result = client
        .post(url)
        .json(&json!({ "callback_query_id": callback_id }))
        .send()
        .await;
    if let Err(e) = result {
        tracing::warn!(callback_id, "Telegram answerCallbackQuery failed: {e}");
    }
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// Turn one `getUpdates` entry into an `IncomingMessage`.
///
/// Messages become commands or text (`Unsupported` without text); callback
/// queries become button clicks. Updates without a sender are dropped.
fn parse_update(update: &Value) -> Option<IncomingMessage> {
    let (from, chat_id, event) = if let Some(message) = update.get("message") {
        let event = match message.get("text").and_then(Value::as_str) {
            Some(text) => InboundEvent::from_text(text),
            None => InboundEvent::Unsupported,
        };
        let chat_id = message.get("chat").and_then(|c| c.get("id")).and_then(Value::as_i64);
        (message.get("from")?, chat_id, event)
    } else if let Some(query) = update.get("callback_query") {
        let event = match query.get("data").and_then(Value::as_str) {
            Some(data) => InboundEvent::button(data),
            None => InboundEvent::Unsupported,
        };
        let chat_id = query
            .get("message")
            .and_then(|m| m.get("chat"))
            .and_then(|c| c.get("id"))
            .and_then(Value::as_i64);
        (query.get("from")?, chat_id, event)
    } else {
        return None;
    };

    let user_id = from.get("id").and_then(Value::as_i64)?.to_string();
    let username = from.get("username").and_then(Value::as_str).unwrap_or("unknown");
    // Private chats share the user's id; callbacks on very old messages may lack a chat.
    let chat_id = chat_id.map(|id| id.to_string()).unwrap_or_else(|| user_id.clone());

    let display_name = from.get("first_name").and_then(Value::as_str).unwrap_or(username);

    let incoming = IncomingMessage::new("telegram", user_id, event)
        .with_metadata(json!({
            "chat_id": chat_id,
            "username": username,
        }))
        .with_user_name(display_name);
    Some(incoming)
}

/// Build the `sendMessage` request body.
fn send_message_body(chat_id: &str, response: &OutgoingResponse) -> Value {
    let mut body = json!({
        "chat_id": chat_id,
        "text": response.content,
    });
    if response.has_buttons() {
        let keyboard: Vec<Vec<Value>> = response
            .buttons
            .iter()
            .map(|row| {
                row.iter()
                    .map(|b| json!({ "text": b.label, "callback_data": b.token }))
                    .collect()
            })
            .collect();
        body["reply_markup"] = json!({ "inline_keyboard": keyboard });
    }
    body
}

// ── Tests ───────────────────────────────────────────────────────────
