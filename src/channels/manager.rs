//! ChannelManager owns the active channels, merges their inbound streams
//! and routes responses back to the channel a message came from.

use futures::stream;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

/// Registry of active channels.
#[derive(Default)]
pub struct ChannelManager {
    channels: Vec<Box<dyn Channel>>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, channel: Box<dyn Channel>) {
        tracing::debug!(channel = channel.name(), "Registered channel");
        self.channels.push(channel);
    }

    pub fn names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    fn get(&self, name: &str) -> Result<&dyn Channel, ChannelError> {
        self.channels
            .iter()
            .find(|c| c.name() == name)
            .map(|c| &**c)
            .ok_or_else(|| ChannelError::UnknownChannel(name.to_string()))
    }

    /// Start every channel and merge their streams into one.
    pub async fn start_all(&self) -> Result<MessageStream, ChannelError> {
        let mut streams = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            streams.push(channel.start().await?);
            tracing::info!(channel = channel.name(), "Channel started");
        }
        Ok(Box::pin(stream::select_all(streams)))
    }

    /// Route a response to the channel the message arrived on.
    pub async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        self.get(&msg.channel)?.respond(msg, response).await
    }

    pub async fn health_check_all(&self) -> Result<(), ChannelError> {
        for channel in &self.channels {
            channel.health_check().await?;
        }
        Ok(())
    }

    /// Shut down every channel, returning the first error after trying all.
    pub async fn shutdown_all(&self) -> Result<(), ChannelError> {
        let mut first_err = None;
        for channel in &self.channels {
            if let Err(e) = channel.shutdown().await {
                tracing::warn!(channel = channel.name(), error = %e, "Channel shutdown failed");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use futures::StreamExt;

    use super::*;
    use crate::channels::InboundEvent;

    struct FixedChannel {
        name: &'static str,
        users: Vec<&'static str>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Channel for FixedChannel {
        fn name(&self) -> &str {
            self.name
        }

        async fn start(&self) -> Result<MessageStream, ChannelError> {
            let msgs: Vec<IncomingMessage> = self
                .users
                .iter()
                .map(|u| IncomingMessage::new(self.name, *u, InboundEvent::text("hi")))
                .collect();
            Ok(Box::pin(stream::iter(msgs)))
        }

        async fn respond(
            &self,
            _msg: &IncomingMessage,
            response: OutgoingResponse,
        ) -> Result<(), ChannelError> {
            self.sent
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, response.content));
            Ok(())
        }

        async fn health_check(&self) -> Result<(), ChannelError> {
            Ok(())
        }

        async fn shutdown(&self) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    fn manager(sent: &Arc<Mutex<Vec<String>>>) -> ChannelManager {
        let mut m = ChannelManager::new();
        m.add(Box::new(FixedChannel {
            name: "a",
            users: vec!["u1", "u2"],
            sent: Arc::clone(sent),
        }));
        m.add(Box::new(FixedChannel {
            name: "b",
            users: vec!["u3"],
            sent: Arc::clone(sent),
        }));
        m
    }

    #[tokio::test]
    async fn start_all_merges_streams() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let m = manager(&sent);
        assert_eq!(m.names(), vec!["a", "b"]);

        let mut users: Vec<String> = m
            .start_all()
            .await
            .unwrap()
            .map(|msg| msg.user_id)
            .collect()
            .await;
        users.sort();
        assert_eq!(users, vec!["u1", "u2", "u3"]);
    }

    #[tokio::test]
    async fn respond_routes_by_channel_name() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let m = manager(&sent);

        let msg = IncomingMessage::new("b", "u3", InboundEvent::text("hi"));
        m.respond(&msg, OutgoingResponse::text("pong")).await.unwrap();
        assert_eq!(*sent.lock().unwrap(), vec!["b:pong"]);
    }

    #[tokio::test]
    async fn respond_to_unknown_channel_fails() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let m = manager(&sent);

        let msg = IncomingMessage::new("zzz", "u", InboundEvent::text("hi"));
        let err = m.respond(&msg, OutgoingResponse::text("x")).await.unwrap_err();
        assert!(matches!(err, ChannelError::UnknownChannel(ref n) if n == "zzz"));
    }
}
