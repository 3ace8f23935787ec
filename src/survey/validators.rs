//! Answer validation: age range and the fixed gender table.

/// Gender codes and their labels, in the order the buttons are shown.
pub const GENDERS: [(u8, &str); 3] = [(1, "мужской"), (2, "женский"), (3, "не знаю")];

/// Oldest accepted age.
pub const MAX_AGE: u8 = 100;

/// Parse an age answer. Accepts ASCII base-10 integers in `0..=100` with an
/// optional sign, surrounding whitespace ignored. Digit separators and
/// non-ASCII digits are rejected.
pub fn validate_age(text: &str) -> Option<u8> {
    let age: i64 = text.trim().parse().ok()?;
    if !(0..=i64::from(MAX_AGE)).contains(&age) {
        return None;
    }
    u8::try_from(age).ok()
}

/// Human-readable label for a gender code.
pub fn gender_label(code: u8) -> Option<&'static str> {
    GENDERS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
}

/// Decode a gender button token. Only codes present in [`GENDERS`] pass.
pub fn parse_gender_token(token: &str) -> Option<u8> {
    let code: u8 = token.trim().parse().ok()?;
    gender_label(code).map(|_| code)
}
