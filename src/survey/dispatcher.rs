//! SurveyDispatcher owns every user's conversation and applies transitions.
//!
//! Handling takes `&mut self`, so events are processed one at a time by
//! whoever owns the dispatcher. Conversations live only while a survey is in
//! progress: reaching `Terminal` removes the entry, and `prune_idle` drops
//! surveys the user walked away from.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::channels::{InboundEvent, OutgoingResponse};

use super::state::{Conversation, Session, SurveyState};
use super::transition::transition;
use super::validators::gender_label;

/// A survey in progress plus the time of the user's last event.
#[derive(Debug)]
struct Tracked {
    conversation: Conversation,
    last_seen: DateTime<Utc>,
}

/// Per-user survey store plus the dispatch entry point.
#[derive(Debug, Default)]
pub struct SurveyDispatcher {
    conversations: HashMap<String, Tracked>,
}

impl SurveyDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle one event from `user_id` received now.
    pub fn handle(&mut self, user_id: &str, event: &InboundEvent) -> Vec<OutgoingResponse> {
        self.handle_at(user_id, event, Utc::now())
    }

    /// Handle one event from `user_id` received at `at` and return the
    /// replies to send.
    pub fn handle_at(
        &mut self,
        user_id: &str,
        event: &InboundEvent,
        at: DateTime<Utc>,
    ) -> Vec<OutgoingResponse> {
        let current = self.conversations.get(user_id).map(|t| &t.conversation);
        let from = current.map(|c| c.state);

        tracing::debug!(
            user_id,
            event = event.kind(),
            state = %from.map_or_else(|| "none".to_string(), |s| s.to_string()),
            "Handling survey event"
        );

        let result = transition(current, event);

        match result.next {
            Some(conv) if conv.state.is_terminal() => {
                self.conversations.remove(user_id);
                if conv.session.age.is_some() {
                    log_completed(user_id, &conv.session);
                } else {
                    tracing::info!(user_id, "Survey cancelled");
                }
            }
            Some(conv) => {
                if from != Some(conv.state) {
                    tracing::info!(
                        user_id,
                        state = %conv.state,
                        session = ?conv.session,
                        "Survey advanced"
                    );
                }
                self.conversations.insert(
                    user_id.to_string(),
                    Tracked {
                        conversation: conv,
                        last_seen: at,
                    },
                );
            }
            None => {
                if self.conversations.remove(user_id).is_some() {
                    tracing::info!(user_id, "Survey discarded");
                }
            }
        }

        result.replies
    }

    /// Drop surveys with no activity for longer than `idle_timeout`.
    /// Returns how many were removed.
    pub fn prune_idle(&mut self, idle_timeout: Duration, now: DateTime<Utc>) -> usize {
        let idle = TimeDelta::from_std(idle_timeout).unwrap_or(TimeDelta::MAX);
        let before = self.conversations.len();
        self.conversations.retain(|user_id, tracked| {
            let keep = now - tracked.last_seen <= idle;
            if !keep {
                tracing::info!(
                    user_id = %user_id,
                    state = %tracked.conversation.state,
                    "Pruned idle survey"
                );
            }
            keep
        });
        before - self.conversations.len()
    }

    /// Current state for `user_id`; `None` when no survey is in progress.
    pub fn state_of(&self, user_id: &str) -> Option<SurveyState> {
        self.conversations.get(user_id).map(|t| t.conversation.state)
    }

    /// Answers collected so far for `user_id`.
    pub fn session_of(&self, user_id: &str) -> Option<&Session> {
        self.conversations.get(user_id).map(|t| &t.conversation.session)
    }

    /// Number of surveys in progress.
    pub fn active_conversations(&self) -> usize {
        self.conversations.len()
    }
}

/// Answers are not persisted; the completed record goes to the log.
fn log_completed(user_id: &str, session: &Session) {
    tracing::info!(
        user_id,
        name = session.name.as_deref().unwrap_or_default(),
        gender = session.gender.and_then(gender_label).unwrap_or_default(),
        age = ?session.age,
        completed_at = %Utc::now().to_rfc3339(),
        "Survey completed"
    );
}
