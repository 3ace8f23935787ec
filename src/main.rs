use anketa_bot::bot::Bot;
use anketa_bot::channels::{ChannelManager, CliChannel, TelegramChannel};
use anketa_bot::config::{BotConfig, ChannelKind};
use anketa_bot::error::{ConfigError, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env()?;

    eprintln!("📋 Anketa bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Idle surveys dropped after: {}s",
        config.session_idle_timeout.as_secs()
    );

    let mut channels = ChannelManager::new();
    match config.channel {
        ChannelKind::Cli => {
            eprintln!("   Channel: cli (type /start, click buttons with #token)\n");
            channels.add(Box::new(CliChannel::new()));
        }
        ChannelKind::Telegram => {
            let telegram = config
                .telegram
                .ok_or_else(|| ConfigError::MissingEnvVar("TG_TOKEN".into()))?;
            eprintln!("   Channel: telegram ({})", telegram.api_url);
            eprintln!(
                "   Allowed users: {}\n",
                if telegram.allowed_users.iter().any(|u| u == "*") {
                    "everyone".to_string()
                } else {
                    telegram.allowed_users.join(", ")
                }
            );
            channels.add(Box::new(TelegramChannel::new(telegram)?));
        }
    }

    tracing::info!("Started Anketa bot");
    Bot::new(channels)
        .with_idle_timeout(config.session_idle_timeout)
        .run()
        .await?;
    tracing::info!("Stopped Anketa bot");

    Ok(())
}
