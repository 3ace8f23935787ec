//! The three-question survey: validators, state machine, and dispatcher.
//!
//! A user starts with `/start`, clicks the start button, then answers name,
//! gender (inline buttons) and age in that order. `/cancel` ends the survey
//! at any point.

pub mod dispatcher;
pub mod prompts;
pub mod state;
pub mod transition;
pub mod validators;

pub use dispatcher::SurveyDispatcher;
pub use state::{Conversation, Session, SurveyState};
pub use transition::{TransitionResult, transition};
pub use validators::{gender_label, validate_age};
