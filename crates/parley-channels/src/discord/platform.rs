use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_common::{ChannelId, Error, GuildId, Message, MessageId, Result};
use serenity::all::{
    self as serenity_model, CreateAttachment, CreateMessage, EmojiId, GetMessages, Http,
};
use serenity::http::HttpError;
use tracing::debug;

use super::convert;
use crate::traits::{ChatPlatform, CustomEmoji, OutgoingMessage, Reaction};

/// Discord's page size cap for message history requests. Config validation
/// keeps `history_limit` within one page.
const HISTORY_PAGE_SIZE: u8 = parley_config::MAX_HISTORY_LIMIT as u8;

/// [`ChatPlatform`] backed by serenity's HTTP client.
#[derive(Clone)]
pub struct DiscordPlatform {
    http: Arc<Http>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    /// Fetches one page (the latest 100 messages before the trigger).
    async fn history(
        &self,
        trigger: &Message,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<Message>> {
        let channel_id = serenity_model::ChannelId::new(trigger.channel_id.get());
        let builder = GetMessages::new()
            .before(serenity_model::MessageId::new(trigger.id.get()))
            .limit(HISTORY_PAGE_SIZE);

        let messages = channel_id
            .messages(&*self.http, builder)
            .await
            .map_err(|e| Error::Channel(format!("failed to fetch discord history: {e}")))?;

        // Discord returns newest first
        let history: Vec<Message> = messages
            .iter()
            .rev()
            .map(convert::discord_message_to_parley)
            .filter(|m| m.timestamp > after && m.timestamp < before)
            .collect();

        debug!(
            count = history.len(),
            channel_id = %channel_id,
            "fetched discord message history"
        );
        Ok(history)
    }

    async fn fetch_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<Message> {
        let msg = serenity_model::ChannelId::new(channel_id.get())
            .message(&*self.http, serenity_model::MessageId::new(message_id.get()))
            .await
            .map_err(|e| Error::Channel(format!("failed to fetch discord message: {e}")))?;
        Ok(convert::discord_message_to_parley(&msg))
    }

    async fn custom_emojis(&self, guild_id: GuildId) -> Result<Vec<CustomEmoji>> {
        let emojis = serenity_model::GuildId::new(guild_id.get())
            .emojis(&*self.http)
            .await
            .map_err(|e| Error::Channel(format!("failed to fetch guild emojis: {e}")))?;

        Ok(emojis
            .into_iter()
            .map(|e| CustomEmoji {
                id: e.id.get(),
                name: e.name,
                animated: e.animated,
            })
            .collect())
    }

    async fn add_reaction(&self, message: &Message, reaction: &Reaction) -> Result<()> {
        let reaction_type = match reaction {
            Reaction::Unicode(emoji) => serenity_model::ReactionType::Unicode(emoji.clone()),
            Reaction::Custom(emoji) => serenity_model::ReactionType::Custom {
                animated: emoji.animated,
                id: EmojiId::new(emoji.id),
                name: Some(emoji.name.clone()),
            },
        };

        serenity_model::ChannelId::new(message.channel_id.get())
            .create_reaction(
                &*self.http,
                serenity_model::MessageId::new(message.id.get()),
                reaction_type,
            )
            .await
            .map_err(|e| map_send_error("failed to add reaction", e))
    }

    async fn broadcast_typing(&self, channel_id: ChannelId) -> Result<()> {
        serenity_model::ChannelId::new(channel_id.get())
            .broadcast_typing(&*self.http)
            .await
            .map_err(|e| map_send_error("failed to start typing", e))
    }

    async fn send(&self, message: &Message, outgoing: OutgoingMessage) -> Result<()> {
        let channel_id = serenity_model::ChannelId::new(message.channel_id.get());

        let mut builder = CreateMessage::new().content(outgoing.content);
        if let Some(file) = outgoing.file {
            builder = builder.add_file(CreateAttachment::bytes(file.data.to_vec(), file.filename));
        }
        if outgoing.as_reply {
            builder = builder.reference_message((
                channel_id,
                serenity_model::MessageId::new(message.id.get()),
            ));
        }

        channel_id
            .send_message(&*self.http, builder)
            .await
            .map(|_| ())
            .map_err(|e| map_send_error("failed to send discord message", e))
    }
}

fn map_send_error(context: &str, err: serenity::Error) -> Error {
    if is_forbidden(&err) {
        Error::Forbidden(format!("{context}: {err}"))
    } else {
        Error::Channel(format!("{context}: {err}"))
    }
}

fn is_forbidden(err: &serenity::Error) -> bool {
    match err {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => {
            response.status_code.as_u16() == 403
        }
        serenity::Error::Model(serenity::model::ModelError::InvalidPermissions { .. }) => true,
        _ => false,
    }
}
