use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChannelId, GuildId, MessageId, UserId};

/// A platform message, reduced to what the bot needs to build context and reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub channel_kind: ChannelKind,
    /// Channel name, when the platform has one (guild channels).
    pub channel_name: Option<String>,
    pub author: Author,
    pub content: String,
    pub attachments: Vec<Attachment>,
    /// Users mentioned directly (e.g. `<@123>`), not by name.
    pub mentions: Vec<UserId>,
    /// Author of the message this one replies to, if it is a reply and the
    /// referenced message still exists.
    pub reply_to_author: Option<UserId>,
    /// Whether the bot may post in this message's channel.
    pub bot_can_send: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub id: UserId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChannelKind {
    /// One-to-one conversation with the bot.
    Direct,
    /// A text channel inside a guild.
    Guild,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: Option<String>,
    /// URL the file can be fetched from. `None` when the platform gave no usable link.
    pub url: Option<String>,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"))
    }
}

impl Message {
    /// Build a plain text message with no attachments, mentions, or reply target.
    pub fn text(
        id: MessageId,
        channel_id: ChannelId,
        author: Author,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            channel_id,
            guild_id: None,
            channel_kind: ChannelKind::Direct,
            channel_name: None,
            author,
            content: content.into(),
            attachments: Vec::new(),
            mentions: Vec::new(),
            reply_to_author: None,
            bot_can_send: true,
            timestamp,
        }
    }

    pub fn in_guild(mut self, guild_id: GuildId, channel_name: impl Into<String>) -> Self {
        self.guild_id = Some(guild_id);
        self.channel_kind = ChannelKind::Guild;
        self.channel_name = Some(channel_name.into());
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn is_authored_by(&self, user_id: UserId) -> bool {
        self.author.id == user_id
    }
}
