//! User-facing texts and keyboards.

use crate::channels::{InlineButton, OutgoingResponse};

use super::state::Session;
use super::validators::{GENDERS, gender_label};

/// Token carried by the "Начать" button.
pub const START_TOKEN: &str = "x1";

pub const START_PROMPT: &str = "Нажми на кнопку:";
pub const START_BUTTON: &str = "Начать";
pub const NAME_PROMPT: &str = "Введи своё имя чтобы продолжить:";
pub const GENDER_PROMPT: &str = "Выберите свой пол чтобы продолжить";
pub const AGE_PROMPT: &str = "Введите свой возраст:";
pub const INVALID_AGE: &str = "Пожалуйста, введите корректный возраст!";
pub const GENERIC_ERROR: &str = "Что-то пошло не так, обратитесь к администратору бота";
pub const CANCELLED: &str = "Отмена. Для начала с нуля нажмите /start";
pub const HELP: &str = "Нажмите /start для заполнения анкеты!";

pub fn start_buttons() -> OutgoingResponse {
    OutgoingResponse::text(START_PROMPT)
        .with_buttons(vec![vec![InlineButton::new(START_BUTTON, START_TOKEN)]])
}

/// Gender choice, one row in table order, tokens are the codes.
pub fn gender_buttons() -> OutgoingResponse {
    let row: Vec<InlineButton> = GENDERS
        .iter()
        .map(|(code, label)| InlineButton::new(*label, code.to_string()))
        .collect();
    OutgoingResponse::text(GENDER_PROMPT).with_buttons(vec![row])
}

pub fn summary(session: &Session) -> String {
    format!(
        "Все данные успешно сохранены!\nВы: {}, пол: {}, возраст: {}",
        session.name.as_deref().unwrap_or("-"),
        session.gender.and_then(gender_label).unwrap_or("-"),
        session.age.map(|a| a.to_string()).unwrap_or_else(|| "-".into()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_button_carries_start_token() {
        let r = start_buttons();
        assert_eq!(r.content, START_PROMPT);
        assert_eq!(r.buttons, vec![vec![InlineButton::new(START_BUTTON, START_TOKEN)]]);
    }

    #[test]
    fn gender_buttons_follow_table() {
        let r = gender_buttons();
        assert_eq!(r.buttons.len(), 1);
        let labels: Vec<&str> = r.buttons[0].iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["мужской", "женский", "не знаю"]);
        let tokens: Vec<&str> = r.buttons[0].iter().map(|b| b.token.as_str()).collect();
        assert_eq!(tokens, vec!["1", "2", "3"]);
    }

    #[test]
    fn summary_lists_all_answers() {
        let session = Session {
            name: Some("Alice".into()),
            gender: Some(2),
            age: Some(18),
        };
        assert_eq!(
            summary(&session),
            "Все данные успешно сохранены!\nВы: Alice, пол: женский, возраст: 18"
        );
    }
}
