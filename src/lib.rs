//! Anketa bot: a three-question survey over Telegram.

pub mod bot;
pub mod channels;
pub mod config;
pub mod error;
pub mod survey;
