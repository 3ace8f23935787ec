//! Survey state machine: which question the user is answering.

use serde::{Deserialize, Serialize};

/// The steps of the survey.
///
/// Progresses linearly: AwaitingName → AwaitingGender → AwaitingAge →
/// Terminal. Any step may jump straight to Terminal (cancel). A user with no
/// stored conversation has no state at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyState {
    AwaitingName,
    AwaitingGender,
    AwaitingAge,
    Terminal,
}

impl SurveyState {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: SurveyState) -> bool {
        use SurveyState::*;
        matches!(
            (self, target),
            (AwaitingName, AwaitingGender)
                | (AwaitingGender, AwaitingAge)
                | (AwaitingAge, Terminal)
                | (AwaitingName | AwaitingGender, Terminal)
        )
    }

    /// Whether the survey is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal)
    }
}

impl std::fmt::Display for SurveyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AwaitingName => "awaiting_name",
            Self::AwaitingGender => "awaiting_gender",
            Self::AwaitingAge => "awaiting_age",
            Self::Terminal => "terminal",
        };
        write!(f, "{s}")
    }
}

/// Answers collected so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub name: Option<String>,
    pub gender: Option<u8>,
    pub age: Option<u8>,
}

/// One user's survey in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub state: SurveyState,
    pub session: Session,
}

impl Conversation {
    /// A fresh survey waiting for the user's name.
    pub fn begin() -> Self {
        Self {
            state: SurveyState::AwaitingName,
            session: Session::default(),
        }
    }

    /// Move to `target`, rejecting anything but a forward step or Terminal.
    pub fn advance_to(&mut self, target: SurveyState) -> Result<(), String> {
        if !self.state.can_transition_to(target) {
            return Err(format!("Cannot transition from {} to {}", self.state, target));
        }
        self.state = target;
        Ok(())
    }
}
