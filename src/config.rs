//! Configuration types.
//!
//! Everything is read from the environment. `from_lookup` takes the lookup
//! function explicitly so tests never touch the process environment.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default Bot API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Surveys untouched for this long are dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(3600);

/// Which transport the bot runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Telegram,
    Cli,
}

/// Telegram transport configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather.
    pub token: SecretString,
    /// Base URL of the Bot API, without the `/bot<token>` suffix.
    pub api_url: String,
    /// TCP connect timeout for every request.
    pub connect_timeout: Duration,
    /// Read timeout for regular requests. Long polls add `poll_timeout` on top.
    pub read_timeout: Duration,
    /// Server-side long-polling timeout passed to `getUpdates`.
    pub poll_timeout: Duration,
    /// Pause after a failed or garbled `getUpdates` response.
    pub poll_retry_delay: Duration,
    /// Usernames or numeric ids allowed to talk to the bot (`*` = everyone).
    pub allowed_users: Vec<String>,
}

impl TelegramConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            api_url: DEFAULT_API_URL.to_string(),
            connect_timeout: Duration::from_millis(500),
            read_timeout: Duration::from_millis(1000),
            poll_timeout: Duration::from_secs(30),
            poll_retry_delay: Duration::from_secs(5),
            allowed_users: vec!["*".to_string()],
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    pub fn with_poll_retry_delay(mut self, delay: Duration) -> Self {
        self.poll_retry_delay = delay;
        self
    }

    pub fn with_allowed_users(mut self, allowed_users: Vec<String>) -> Self {
        self.allowed_users = allowed_users;
        self
    }
}

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub channel: ChannelKind,
    /// Present when `channel` is `Telegram`.
    pub telegram: Option<TelegramConfig>,
    /// How long an unfinished survey may sit idle before it is dropped.
    pub session_idle_timeout: Duration,
}

impl BotConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let channel = match lookup("BOT_CHANNEL").as_deref().map(str::trim) {
            None | Some("") | Some("telegram") => ChannelKind::Telegram,
            Some("cli") => ChannelKind::Cli,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "BOT_CHANNEL".into(),
                    message: format!("expected 'telegram' or 'cli', got '{other}'"),
                });
            }
        };

        let telegram = match channel {
            ChannelKind::Cli => None,
            ChannelKind::Telegram => Some(telegram_from_lookup(&lookup)?),
        };

        let session_idle_timeout = parse_u64(&lookup, "SURVEY_IDLE_TIMEOUT_SECS")?
            .map_or(DEFAULT_IDLE_TIMEOUT, Duration::from_secs);

        Ok(Self {
            channel,
            telegram,
            session_idle_timeout,
        })
    }
}

fn telegram_from_lookup<F>(lookup: &F) -> Result<TelegramConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let token = lookup("TG_TOKEN")
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar("TG_TOKEN".into()))?;

    let mut config = TelegramConfig::new(token.trim());

    if let Some(url) = lookup("TG_API_URL").filter(|u| !u.trim().is_empty()) {
        config.api_url = url.trim().trim_end_matches('/').to_string();
    }
    if let Some(ms) = parse_u64(lookup, "TG_CONNECT_TIMEOUT_MS")? {
        config.connect_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = parse_u64(lookup, "TG_READ_TIMEOUT_MS")? {
        config.read_timeout = Duration::from_millis(ms);
    }
    if let Some(secs) = parse_u64(lookup, "TG_POLL_TIMEOUT_SECS")? {
        config.poll_timeout = Duration::from_secs(secs);
    }
    if let Some(ms) = parse_u64(lookup, "TG_POLL_RETRY_MS")? {
        config.poll_retry_delay = Duration::from_millis(ms);
    }
    if let Some(users) = lookup("TELEGRAM_ALLOWED_USERS") {
        config.allowed_users = users
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    Ok(config)
}

fn parse_u64<F>(lookup: &F, key: &str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn telegram_defaults() {
        let config = BotConfig::from_lookup(lookup(&[("TG_TOKEN", "123:ABC")])).unwrap();
        assert_eq!(config.channel, ChannelKind::Telegram);

        let tg = config.telegram.unwrap();
        assert_eq!(tg.token.expose_secret(), "123:ABC");
        assert_eq!(tg.api_url, DEFAULT_API_URL);
        assert_eq!(tg.connect_timeout, Duration::from_millis(500));
        assert_eq!(tg.read_timeout, Duration::from_millis(1000));
        assert_eq!(tg.poll_timeout, Duration::from_secs(30));
        assert_eq!(tg.poll_retry_delay, Duration::from_secs(5));
        assert_eq!(tg.allowed_users, vec!["*"]);
        assert_eq!(config.session_idle_timeout, DEFAULT_IDLE_TIMEOUT);
    }

    #[test]
    fn telegram_requires_token() {
        let err = BotConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "TG_TOKEN"));

        let err = BotConfig::from_lookup(lookup(&[("TG_TOKEN", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn cli_needs_no_token() {
        let config = BotConfig::from_lookup(lookup(&[("BOT_CHANNEL", "cli")])).unwrap();
        assert_eq!(config.channel, ChannelKind::Cli);
        assert!(config.telegram.is_none());
    }

    #[test]
    fn unknown_channel_rejected() {
        let err = BotConfig::from_lookup(lookup(&[("BOT_CHANNEL", "irc")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "BOT_CHANNEL"));
    }

    #[test]
    fn overrides_are_applied() {
        let config = BotConfig::from_lookup(lookup(&[
            ("TG_TOKEN", "t"),
            ("TG_API_URL", "http://localhost:8081/"),
            ("TG_CONNECT_TIMEOUT_MS", "250"),
            ("TG_READ_TIMEOUT_MS", "2000"),
            ("TG_POLL_TIMEOUT_SECS", "5"),
            ("TG_POLL_RETRY_MS", "100"),
            ("TELEGRAM_ALLOWED_USERS", "alice, 42,,"),
            ("SURVEY_IDLE_TIMEOUT_SECS", "600"),
        ]))
        .unwrap();
        assert_eq!(config.session_idle_timeout, Duration::from_secs(600));

        let tg = config.telegram.unwrap();
        assert_eq!(tg.api_url, "http://localhost:8081");
        assert_eq!(tg.connect_timeout, Duration::from_millis(250));
        assert_eq!(tg.read_timeout, Duration::from_secs(2));
        assert_eq!(tg.poll_timeout, Duration::from_secs(5));
        assert_eq!(tg.poll_retry_delay, Duration::from_millis(100));
        assert_eq!(tg.allowed_users, vec!["alice", "42"]);
    }

    #[test]
    fn invalid_timeout_rejected() {
        let err = BotConfig::from_lookup(lookup(&[
            ("TG_TOKEN", "t"),
            ("TG_READ_TIMEOUT_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "TG_READ_TIMEOUT_MS")
        );
    }

    #[test]
    fn token_is_redacted_in_debug() {
        let config = TelegramConfig::new("super-secret");
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}
