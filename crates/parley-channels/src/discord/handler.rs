use std::sync::Arc;

use parley_common::{BotIdentity, ChannelId, MessageId, UserId};
use serenity::all::{
    self as serenity_model, Context, EventHandler, Message as SerenityMessage, Ready,
};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::convert;
use super::platform::DiscordPlatform;
use crate::traits::{ChatPlatform, InboundHandler, ReactionEvent};

/// Serenity event handler that forwards Discord events to an [`InboundHandler`].
pub struct DiscordHandler {
    inbound: Arc<dyn InboundHandler>,

    /// Filled in once the gateway reports ready. Events before that are dropped.
    identity: RwLock<Option<BotIdentity>>,
}

impl DiscordHandler {
    pub fn new(inbound: Arc<dyn InboundHandler>) -> Self {
        Self {
            inbound,
            identity: RwLock::new(None),
        }
    }

    async fn identity(&self) -> Option<BotIdentity> {
        self.identity.read().await.clone()
    }

    fn platform(ctx: &Context) -> Arc<dyn ChatPlatform> {
        Arc::new(DiscordPlatform::new(ctx.http.clone()))
    }
}

#[serenity::async_trait]
impl EventHandler for DiscordHandler {
    /// Fired when the bot successfully connects and is ready.
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            bot_id = %ready.user.id,
            guilds = ready.guilds.len(),
            "discord bot connected"
        );

        *self.identity.write().await = Some(BotIdentity {
            user_id: UserId(ready.user.id.get()),
            name: ready.user.name.clone(),
        });
    }

    /// Fired when the bot resumes a previously interrupted gateway connection.
    async fn resume(&self, _ctx: Context, _: serenity_model::ResumedEvent) {
        info!("discord gateway connection resumed");
    }

    /// Fired when a message is received in any channel the bot can see.
    async fn message(&self, ctx: Context, msg: SerenityMessage) {
        let Some(identity) = self.identity().await else {
            return;
        };

        // Never answer ourselves
        if msg.author.id.get() == identity.user_id.get() {
            return;
        }

        let mut message = convert::discord_message_to_parley(&msg);
        if let Some((channel_name, can_send)) = guild_channel_state(&ctx, &msg, identity.user_id) {
            message.channel_name = channel_name;
            message.bot_can_send = can_send;
        }

        tracing::debug!(
            message_id = %msg.id,
            author = %msg.author.name,
            channel = %msg.channel_id,
            "received discord message"
        );

        self.inbound
            .on_message(Self::platform(&ctx), identity, message)
            .await;
    }

    /// Fired when a reaction is added to a message.
    async fn reaction_add(&self, ctx: Context, reaction: serenity_model::Reaction) {
        let Some(identity) = self.identity().await else {
            return;
        };

        let event = ReactionEvent {
            channel_id: ChannelId(reaction.channel_id.get()),
            message_id: MessageId(reaction.message_id.get()),
            user_id: reaction.user_id.map(|id| UserId(id.get())),
            emoji: convert::reaction_emoji_name(&reaction.emoji),
            from_guild_member: reaction.member.is_some(),
        };

        tracing::debug!(
            emoji = %event.emoji,
            message_id = %reaction.message_id,
            "received discord reaction"
        );

        self.inbound
            .on_reaction(Self::platform(&ctx), identity, event)
            .await;
    }
}

/// Channel name and whether the bot may post there, read from the guild cache.
///
/// Returns `None` for DMs. A guild message whose guild, member, or channel is
/// missing from the cache is treated as not sendable.
fn guild_channel_state(
    ctx: &Context,
    msg: &SerenityMessage,
    bot_id: UserId,
) -> Option<(Option<String>, bool)> {
    let guild_id = msg.guild_id?;

    let Some(guild) = ctx.cache.guild(guild_id) else {
        warn!(guild_id = %guild_id, "message from a guild missing from the cache");
        return Some((None, false));
    };

    let channel = guild.channels.get(&msg.channel_id).or_else(|| {
        guild
            .threads
            .iter()
            .find(|thread| thread.id == msg.channel_id)
    });
    let Some(channel) = channel else {
        warn!(channel_id = %msg.channel_id, "message from a channel missing from the cache");
        return Some((None, false));
    };

    let Some(member) = guild.members.get(&serenity_model::UserId::new(bot_id.get())) else {
        error!(guild_id = %guild_id, "couldn't get server member for the bot");
        return Some((Some(channel.name.clone()), false));
    };

    let can_send = guild
        .user_permissions_in(channel, member)
        .send_messages();
    Some((Some(channel.name.clone()), can_send))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parley_common::Message;

    struct NoopInbound;

    #[async_trait]
    impl InboundHandler for NoopInbound {
        async fn on_message(&self, _: Arc<dyn ChatPlatform>, _: BotIdentity, _: Message) {}
        async fn on_reaction(&self, _: Arc<dyn ChatPlatform>, _: BotIdentity, _: ReactionEvent) {}
    }

    #[tokio::test]
    async fn identity_is_unknown_until_ready() {
        let handler = DiscordHandler::new(Arc::new(NoopInbound));
        assert!(handler.identity().await.is_none());

        *handler.identity.write().await = Some(BotIdentity {
            user_id: UserId(99),
            name: "parley".into(),
        });
        assert_eq!(handler.identity().await.unwrap().user_id, UserId(99));
    }
}
