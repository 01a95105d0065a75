//! Discord channel notifier.
//!
//! Messages are posted to a single channel through the bot REST API and
//! wrapped in a code block. Delivery is best-effort: any failure, and the
//! console mode, print the message to the log instead.

use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const DISCORD_API_URL: &str = "https://discord.com/api/v10";

/// Header line prepended to every channel message.
pub const MESSAGE_HEADER: &str = ">> DYAD Monitor";

/// Discord delivery configuration.
#[derive(Debug, Clone, Default)]
pub struct DiscordConfig {
    /// Bot token (without the `Bot ` prefix)
    pub token: Option<String>,
    /// Target channel snowflake
    pub channel_id: Option<String>,
    /// Print messages instead of sending them
    pub console_only: bool,
}

impl DiscordConfig {
    /// Read `DISCORD_APP_TOKEN`, `DISCORD_CHANNEL_ID` and `MONITOR_ENV`.
    pub fn from_env() -> Self {
        let token = std::env::var("DISCORD_APP_TOKEN").ok().filter(|s| !s.is_empty());
        let channel_id = std::env::var("DISCORD_CHANNEL_ID").ok().filter(|s| !s.is_empty());
        let console_only = std::env::var("MONITOR_ENV")
            .map(|v| v.eq_ignore_ascii_case("dev"))
            .unwrap_or(false);

        Self {
            token,
            channel_id,
            console_only,
        }
    }

    /// True when messages can actually reach Discord.
    pub fn is_deliverable(&self) -> bool {
        !self.console_only && self.token.is_some() && self.channel_id.is_some()
    }
}

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

/// Posts monitor messages to a Discord channel.
#[derive(Clone)]
pub struct DiscordNotifier {
    client: reqwest::Client,
    config: DiscordConfig,
}

impl std::fmt::Debug for DiscordNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordNotifier")
            .field("channel_id", &self.config.channel_id)
            .field("console_only", &self.config.console_only)
            .finish()
    }
}

impl DiscordNotifier {
    pub fn new(config: DiscordConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        if !config.is_deliverable() {
            info!(console_only = config.console_only, "Discord delivery disabled, messages go to the log");
        }

        Self { client, config }
    }

    /// Deliver `message`. Never fails; errors fall back to logging.
    #[instrument(skip_all, fields(len = message.len()))]
    pub async fn send(&self, message: &str) {
        if !self.config.is_deliverable() {
            println!("{message}");
            return;
        }

        if let Err(e) = self.post(message).await {
            warn!(error = %e, "Discord send failed");
            println!("{message}");
        }
    }

    async fn post(&self, message: &str) -> Result<()> {
        let (Some(token), Some(channel_id)) = (&self.config.token, &self.config.channel_id) else {
            anyhow::bail!("discord credentials missing");
        };

        let url = format!("{}/channels/{}/messages", DISCORD_API_URL, channel_id);
        let content = wrap_message(message);

        self.client
            .post(&url)
            .header("Authorization", format!("Bot {token}"))
            .json(&CreateMessage { content: &content })
            .send()
            .await
            .context("discord request failed")?
            .error_for_status()?;

        debug!(channel_id = %channel_id, "Discord message sent");
        Ok(())
    }
}

/// Wrap a message the way the channel expects it.
pub fn wrap_message(message: &str) -> String {
    format!("```{MESSAGE_HEADER}\n===\n{message}```")
}
