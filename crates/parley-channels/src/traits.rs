use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parley_common::{BotIdentity, ChannelId, GuildId, Message, MessageId, Result, UserId};
use serde::{Deserialize, Serialize};

/// Operations the bot needs from a chat platform.
///
/// Implementations are cheap handles around the platform's HTTP client and
/// can be shared via `Arc` across the tasks handling individual messages.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Messages in the trigger's channel posted strictly after `after` and
    /// strictly before `before`, oldest first. The trigger itself is excluded.
    async fn history(
        &self,
        trigger: &Message,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<Message>>;

    async fn fetch_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<Message>;

    /// Custom emojis available in a guild.
    async fn custom_emojis(&self, guild_id: GuildId) -> Result<Vec<CustomEmoji>>;

    async fn add_reaction(&self, message: &Message, reaction: &Reaction) -> Result<()>;

    /// Show the "bot is typing" indicator in a channel.
    async fn broadcast_typing(&self, channel_id: ChannelId) -> Result<()>;

    /// Send a message to the channel `message` was posted in, optionally as a reply to it.
    ///
    /// Returns [`parley_common::Error::Forbidden`] when the bot lacks permission to post.
    async fn send(&self, message: &Message, outgoing: OutgoingMessage) -> Result<()>;
}

/// Receives inbound platform events. Each event is handled in its own task.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn on_message(
        &self,
        platform: Arc<dyn ChatPlatform>,
        identity: BotIdentity,
        message: Message,
    );

    async fn on_reaction(
        &self,
        platform: Arc<dyn ChatPlatform>,
        identity: BotIdentity,
        event: ReactionEvent,
    );
}

/// A guild-specific emoji, addressed by name when reacting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomEmoji {
    pub id: u64,
    pub name: String,
    pub animated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    Unicode(String),
    Custom(CustomEmoji),
}

#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub content: String,
    pub file: Option<OutgoingFile>,
    /// Reply to the triggering message instead of posting a new one.
    pub as_reply: bool,
}

#[derive(Debug, Clone)]
pub struct OutgoingFile {
    pub filename: String,
    pub data: Bytes,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            file: None,
            as_reply: false,
        }
    }

    pub fn with_file(mut self, file: OutgoingFile) -> Self {
        self.file = Some(file);
        self
    }

    pub fn as_reply(mut self, as_reply: bool) -> Self {
        self.as_reply = as_reply;
        self
    }
}

/// A reaction someone added to a message.
#[derive(Debug, Clone)]
pub struct ReactionEvent {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub user_id: Option<UserId>,
    /// Unicode emoji, or the custom emoji's name.
    pub emoji: String,
    /// Set when the reaction came from a guild member (not from a DM).
    pub from_guild_member: bool,
}
