use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parley_channels::{ChatPlatform, InboundHandler, OutgoingFile, OutgoingMessage, ReactionEvent};
use parley_common::{BotIdentity, ChannelId, ChannelKind, Error, Message, Result};
use reqwest::{Client, StatusCode};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::feedback::{self, Feedback};
use crate::responder::{AgentServices, Reply, Responder};
use crate::settings::BehaviorSettings;

const IMAGE_FILENAME: &str = "image.png";

/// Discord clears the typing indicator after about ten seconds.
const TYPING_REFRESH: Duration = Duration::from_secs(8);

/// Routes platform events: decides whether to answer, react, or stay quiet,
/// and delivers the result.
pub struct Bot {
    services: AgentServices,
    behavior: Arc<BehaviorSettings>,
    http: Client,
}

impl Bot {
    pub fn new(services: AgentServices, behavior: BehaviorSettings) -> Self {
        Self {
            services,
            behavior: Arc::new(behavior),
            http: Client::new(),
        }
    }

    async fn handle_guild_message(
        &self,
        platform: Arc<dyn ChatPlatform>,
        identity: BotIdentity,
        message: Message,
    ) -> Result<()> {
        debug!(content = %message.content, "guild message");

        if self.behavior.is_ignored_sender(&message.author.name) {
            info!("ignoring message from ignored sender");
            return self.maybe_react(platform, identity, &message).await;
        }
        if !message.bot_can_send {
            debug!("no permission to send messages in this channel");
            return self.maybe_react(platform, identity, &message).await;
        }

        if is_mentioned(&message, &identity, &self.behavior.bot_name)
            || is_reply_to_bot(&message, &identity)
        {
            return self.respond(platform, identity, &message).await;
        }

        if roll(self.behavior.random_reply_chance) {
            info!("randomly replying");
            return self.respond(platform, identity, &message).await;
        }

        Ok(())
    }

    async fn maybe_react(
        &self,
        platform: Arc<dyn ChatPlatform>,
        identity: BotIdentity,
        message: &Message,
    ) -> Result<()> {
        if !roll(self.behavior.random_reaction_chance) {
            return Ok(());
        }
        let responder = Responder::new(platform, identity, &self.services);
        let context = responder.context(message).await?;
        responder.react(message, &context).await?;
        Ok(())
    }

    async fn respond(
        &self,
        platform: Arc<dyn ChatPlatform>,
        identity: BotIdentity,
        message: &Message,
    ) -> Result<()> {
        let _typing = keep_typing(platform.clone(), message.channel_id, TYPING_REFRESH).await;

        let responder = Responder::new(platform.clone(), identity, &self.services);
        let context = responder.context(message).await?;
        responder.react(message, &context).await?;
        let reply = responder.reply(message, &context).await?;

        let in_guild = message.channel_kind == ChannelKind::Guild;
        if reply.is_empty() {
            info!("nothing to send");
            if in_guild && roll(self.behavior.random_reaction_chance) {
                responder.react(message, &context).await?;
            }
            return Ok(());
        }

        let as_reply = in_guild && roll(self.behavior.reply_as_reply_chance);
        self.deliver(platform.as_ref(), message, reply, as_reply).await;
        Ok(())
    }

    /// Send the reply. Failures are logged here and never retried.
    async fn deliver(
        &self,
        platform: &dyn ChatPlatform,
        message: &Message,
        reply: Reply,
        as_reply: bool,
    ) {
        let mut outgoing = OutgoingMessage::text(reply.text.unwrap_or_default()).as_reply(as_reply);
        if let Some(url) = reply.image_url {
            if let Some(file) = self.download_image(&url).await {
                outgoing = outgoing.with_file(file);
            }
        }

        match platform.send(message, outgoing).await {
            Ok(()) => debug!(as_reply, "message sent"),
            Err(Error::Forbidden(e)) => error!(
                channel = message.channel_name.as_deref().unwrap_or_default(),
                error = %e,
                "missing permissions to send messages"
            ),
            Err(e) => error!(error = %e, "error sending message"),
        }
    }

    async fn download_image(&self, url: &str) -> Option<OutgoingFile> {
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "could not download image file to attach to message");
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            warn!(status = %response.status(), "could not download image file to attach to message");
            return None;
        }

        match response.bytes().await {
            Ok(data) => Some(OutgoingFile {
                filename: IMAGE_FILENAME.to_string(),
                data,
            }),
            Err(e) => {
                warn!(error = %e, "could not read downloaded image");
                None
            }
        }
    }

    async fn handle_reaction(
        &self,
        platform: Arc<dyn ChatPlatform>,
        identity: BotIdentity,
        event: ReactionEvent,
    ) -> Result<()> {
        if !event.from_guild_member {
            return Ok(());
        }

        let message = platform
            .fetch_message(event.channel_id, event.message_id)
            .await?;
        // reaction events arrive for every message, not only the bot's
        if !message.is_authored_by(identity.user_id) {
            return Ok(());
        }

        info!(emoji = %event.emoji, message_id = %event.message_id, "reaction added to message");
        match feedback::classify(&event.emoji, &self.behavior) {
            Some(Feedback::Positive) => info!("positive feedback received"),
            Some(Feedback::Negative) => info!("negative feedback received"),
            None => {}
        }
        Ok(())
    }
}

#[async_trait]
impl InboundHandler for Bot {
    async fn on_message(
        &self,
        platform: Arc<dyn ChatPlatform>,
        identity: BotIdentity,
        message: Message,
    ) {
        if message.is_authored_by(identity.user_id) {
            return;
        }

        let span = info_span!(
            "message",
            author = %message.author.name,
            channel_type = ?message.channel_kind,
            server = message.guild_id.map(|g| g.get()),
            channel = message.channel_name.as_deref(),
        );

        async move {
            let result = match message.channel_kind {
                ChannelKind::Direct => self.respond(platform, identity, &message).await,
                ChannelKind::Guild => self.handle_guild_message(platform, identity, message).await,
            };
            if let Err(e) = result {
                error!(error = %e, "failed to handle message");
            }
        }
        .instrument(span)
        .await;
    }

    async fn on_reaction(
        &self,
        platform: Arc<dyn ChatPlatform>,
        identity: BotIdentity,
        event: ReactionEvent,
    ) {
        let span = info_span!("reaction", channel_id = %event.channel_id, emoji = %event.emoji);
        if let Err(e) = self
            .handle_reaction(platform, identity, event)
            .instrument(span)
            .await
        {
            warn!(error = %e, "failed to handle reaction");
        }
    }
}

/// Stops refreshing the typing indicator when dropped.
struct TypingGuard {
    refresh: Option<JoinHandle<()>>,
}

impl Drop for TypingGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.refresh.take() {
            handle.abort();
        }
    }
}

/// Show the typing indicator now and re-broadcast it every `every` until the
/// returned guard is dropped. Stops at the first failure.
async fn keep_typing(
    platform: Arc<dyn ChatPlatform>,
    channel_id: ChannelId,
    every: Duration,
) -> TypingGuard {
    if let Err(e) = platform.broadcast_typing(channel_id).await {
        warn!(error = %e, "failed to start typing indicator");
        return TypingGuard { refresh: None };
    }

    let refresh = tokio::spawn(async move {
        loop {
            tokio::time::sleep(every).await;
            if let Err(e) = platform.broadcast_typing(channel_id).await {
                debug!(error = %e, "stopped refreshing typing indicator");
                break;
            }
        }
    });
    TypingGuard {
        refresh: Some(refresh),
    }
}

/// Direct mention, or the bot's username or configured name anywhere in the
/// text (case-insensitive).
pub fn is_mentioned(message: &Message, identity: &BotIdentity, bot_name: &str) -> bool {
    if message.mentions.contains(&identity.user_id) {
        return true;
    }

    let content = message.content.to_lowercase();
    [identity.name.to_lowercase(), bot_name.to_lowercase()]
        .iter()
        .any(|name| !name.is_empty() && content.contains(name.as_str()))
}

pub fn is_reply_to_bot(message: &Message, identity: &BotIdentity) -> bool {
    message.reply_to_author == Some(identity.user_id)
}

/// `true` with probability `chance`. Exact at 0.0 and 1.0.
fn roll(chance: f64) -> bool {
    rand::random::<f64>() < chance
}
