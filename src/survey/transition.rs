//! Pure survey transition function.
//!
//! Given the user's current conversation (if any) and one inbound event,
//! decide the next conversation and the replies to send. No I/O happens
//! here; the dispatcher stores the result and the bot sends the replies.

use crate::channels::{Command, InboundEvent, OutgoingResponse};

use super::prompts::{self, START_TOKEN};
use super::state::{Conversation, SurveyState};
use super::validators::{parse_gender_token, validate_age};

/// Result of a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    /// `None` means the user has no survey in progress afterwards. A
    /// conversation in `Terminal` carries the final answers and is discarded
    /// by the dispatcher.
    pub next: Option<Conversation>,
    pub replies: Vec<OutgoingResponse>,
}

impl TransitionResult {
    fn idle(reply: OutgoingResponse) -> Self {
        Self {
            next: None,
            replies: vec![reply],
        }
    }

    fn to(conversation: Conversation, reply: OutgoingResponse) -> Self {
        Self {
            next: Some(conversation),
            replies: vec![reply],
        }
    }
}

/// Compute the transition for `event` from `current`.
pub fn transition(current: Option<&Conversation>, event: &InboundEvent) -> TransitionResult {
    // Terminal conversations are never resumed.
    let current = current.filter(|c| !c.state.is_terminal());

    match (current, event) {
        // ── Commands apply in every state ───────────────────────────
        (
            Some(conv),
            InboundEvent::Command {
                command: Command::Cancel,
            },
        ) => TransitionResult::to(
            finish(conv.clone()),
            OutgoingResponse::text(prompts::CANCELLED),
        ),
        (
            None,
            InboundEvent::Command {
                command: Command::Cancel,
            },
        ) => TransitionResult::idle(OutgoingResponse::text(prompts::CANCELLED)),

        // Restarting drops whatever was collected.
        (
            _,
            InboundEvent::Command {
                command: Command::Start,
            },
        ) => TransitionResult::idle(prompts::start_buttons()),

        // ── Entry point ─────────────────────────────────────────────
        (None, InboundEvent::ButtonClick { token }) if token == START_TOKEN => {
            TransitionResult::to(Conversation::begin(), OutgoingResponse::text(prompts::NAME_PROMPT))
        }
        (None, InboundEvent::ButtonClick { token }) => {
            tracing::debug!(token = %token, "Unexpected token outside a survey");
            TransitionResult::idle(OutgoingResponse::text(prompts::GENERIC_ERROR))
        }
        (None, InboundEvent::Text { .. } | InboundEvent::Unsupported) => {
            TransitionResult::idle(OutgoingResponse::text(prompts::HELP))
        }

        // ── Name ────────────────────────────────────────────────────
        (Some(conv), InboundEvent::Text { text }) if conv.state == SurveyState::AwaitingName => {
            let name = text.trim();
            if name.is_empty() {
                return TransitionResult::to(conv.clone(), OutgoingResponse::text(prompts::NAME_PROMPT));
            }
            let mut next = conv.clone();
            next.session.name = Some(name.to_string());
            step(&mut next, SurveyState::AwaitingGender);
            TransitionResult::to(next, prompts::gender_buttons())
        }
        (Some(conv), _) if conv.state == SurveyState::AwaitingName => {
            TransitionResult::to(conv.clone(), OutgoingResponse::text(prompts::NAME_PROMPT))
        }

        // ── Gender ──────────────────────────────────────────────────
        (Some(conv), InboundEvent::ButtonClick { token })
            if conv.state == SurveyState::AwaitingGender =>
        {
            match parse_gender_token(token) {
                Some(code) => {
                    let mut next = conv.clone();
                    next.session.gender = Some(code);
                    step(&mut next, SurveyState::AwaitingAge);
                    TransitionResult::to(next, OutgoingResponse::text(prompts::AGE_PROMPT))
                }
                None => {
                    tracing::debug!(token = %token, "Unknown gender token");
                    TransitionResult::to(conv.clone(), OutgoingResponse::text(prompts::GENERIC_ERROR))
                }
            }
        }
        (Some(conv), _) if conv.state == SurveyState::AwaitingGender => {
            TransitionResult::to(conv.clone(), prompts::gender_buttons())
        }

        // ── Age ─────────────────────────────────────────────────────
        (Some(conv), InboundEvent::Text { text }) => match validate_age(text) {
            Some(age) => {
                let mut next = conv.clone();
                next.session.age = Some(age);
                let summary = prompts::summary(&next.session);
                TransitionResult::to(finish(next), OutgoingResponse::text(summary))
            }
            None => TransitionResult::to(conv.clone(), OutgoingResponse::text(prompts::INVALID_AGE)),
        },
        (Some(conv), _) => {
            TransitionResult::to(conv.clone(), OutgoingResponse::text(prompts::INVALID_AGE))
        }
    }
}

/// Forward step; the arms above only request valid targets.
fn step(conv: &mut Conversation, target: SurveyState) {
    if let Err(e) = conv.advance_to(target) {
        tracing::error!("{e}");
    }
}

fn finish(mut conv: Conversation) -> Conversation {
    step(&mut conv, SurveyState::Terminal);
    conv
}
