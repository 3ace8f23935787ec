//! Main bot loop. Pulls one inbound message at a time, runs it through the
//! survey dispatcher and sends every reply before taking the next message.

use std::time::Duration;

use futures::StreamExt;

use crate::channels::{ChannelManager, IncomingMessage, OutgoingResponse};
use crate::config::DEFAULT_IDLE_TIMEOUT;
use crate::error::Error;
use crate::survey::SurveyDispatcher;

/// How often idle surveys are swept.
const PRUNE_INTERVAL: Duration = Duration::from_secs(600);

/// The bot: channels plus the single dispatcher that owns all sessions.
pub struct Bot {
    channels: ChannelManager,
    dispatcher: SurveyDispatcher,
    idle_timeout: Duration,
}

impl Bot {
    pub fn new(channels: ChannelManager) -> Self {
        Self {
            channels,
            dispatcher: SurveyDispatcher::new(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Run until Ctrl+C or until every channel stream ends.
    pub async fn run(mut self) -> Result<(), Error> {
        self.channels.health_check_all().await?;
        let mut message_stream = self.channels.start_all().await?;

        let mut prune = tokio::time::interval(
            self.idle_timeout.clamp(Duration::from_secs(1), PRUNE_INTERVAL),
        );
        prune.tick().await; // Skip immediate first tick

        tracing::info!(channels = ?self.channels.names(), "Bot ready and listening");

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                msg = message_stream.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            tracing::info!("All channel streams ended, shutting down...");
                            break;
                        }
                    }
                }
                _ = prune.tick() => {
                    let pruned = self
                        .dispatcher
                        .prune_idle(self.idle_timeout, chrono::Utc::now());
                    if pruned > 0 {
                        tracing::info!(pruned, "Dropped idle surveys");
                    }
                    continue;
                }
            };

            for reply in self.handle_message(&message) {
                if let Err(e) = self.channels.respond(&message, reply).await {
                    tracing::error!(
                        message_id = %message.id,
                        user_id = %message.user_id,
                        "Failed to send reply: {}",
                        e
                    );
                }
            }
        }

        tracing::info!(
            active = self.dispatcher.active_conversations(),
            "Bot shutting down..."
        );
        self.channels.shutdown_all().await?;

        Ok(())
    }

    fn handle_message(&mut self, message: &IncomingMessage) -> Vec<OutgoingResponse> {
        tracing::debug!(
            message_id = %message.id,
            channel = %message.channel,
            user_id = %message.user_id,
            user_name = message.user_name.as_deref().unwrap_or("unknown"),
            event = message.event.kind(),
            "Received message"
        );
        self.dispatcher
            .handle_at(&message.user_id, &message.event, message.received_at)
    }
}
