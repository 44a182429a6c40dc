use parley_common::{Error, Result};
use serenity::all::GatewayIntents;

/// Gateway settings derived from the `discord` config section.
#[derive(Debug, Clone)]
pub struct DiscordGatewayConfig {
    /// Bot token for authenticating with Discord.
    pub bot_token: String,

    /// Gateway intents to request from Discord.
    pub intents: GatewayIntents,
}

impl DiscordGatewayConfig {
    pub fn from_settings(settings: &parley_config::DiscordConfig) -> Result<Self> {
        let bot_token = settings.bot_token.trim();
        if bot_token.is_empty() {
            return Err(Error::Config("discord bot_token is required".into()));
        }

        // - GUILDS: guild, channel, and member cache for permission checks
        // - GUILD_MESSAGES + MESSAGE_CONTENT: read server channel messages
        // - DIRECT_MESSAGES: receive DMs
        // - *_REACTIONS: feedback on the bot's own messages
        // - GUILD_EMOJIS_AND_STICKERS: custom emoji names for reactions
        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
            | GatewayIntents::GUILD_MESSAGE_REACTIONS
            | GatewayIntents::DIRECT_MESSAGE_REACTIONS
            | GatewayIntents::GUILD_EMOJIS_AND_STICKERS;

        Ok(Self {
            bot_token: bot_token.to_string(),
            intents,
        })
    }
}
