use parley_common::{
    Attachment, Author, ChannelId, ChannelKind, GuildId, Message, MessageId, UserId,
};
use serenity::all as serenity_model;

/// Convert a serenity Discord message into a Parley `Message`.
///
/// Channel name and send permission are not part of the message payload; the
/// caller fills them in from the cache when it has one.
pub fn discord_message_to_parley(msg: &serenity_model::Message) -> Message {
    let attachments = msg
        .attachments
        .iter()
        .map(|a| Attachment {
            filename: a.filename.clone(),
            content_type: a.content_type.clone(),
            url: attachment_url(&a.proxy_url, &a.url),
        })
        .collect();

    let reply_to_author = msg
        .referenced_message
        .as_ref()
        .map(|referenced| UserId(referenced.author.id.get()));

    Message {
        id: MessageId(msg.id.get()),
        channel_id: ChannelId(msg.channel_id.get()),
        guild_id: msg.guild_id.map(|g| GuildId(g.get())),
        channel_kind: if msg.guild_id.is_some() {
            ChannelKind::Guild
        } else {
            ChannelKind::Direct
        },
        channel_name: None,
        author: Author {
            id: UserId(msg.author.id.get()),
            name: msg.author.name.clone(),
        },
        content: msg.content.clone(),
        attachments,
        mentions: msg.mentions.iter().map(|u| UserId(u.id.get())).collect(),
        reply_to_author,
        bot_can_send: true,
        timestamp: *msg.timestamp,
    }
}

/// Prefer the media proxy URL, fall back to the CDN URL, and treat empty strings as missing.
fn attachment_url(proxy_url: &str, url: &str) -> Option<String> {
    [proxy_url, url]
        .into_iter()
        .map(str::trim)
        .find(|u| !u.is_empty())
        .map(str::to_string)
}

/// Name used to classify a reaction: the Unicode emoji itself or the custom emoji's name.
pub fn reaction_emoji_name(emoji: &serenity_model::ReactionType) -> String {
    match emoji {
        serenity_model::ReactionType::Unicode(s) => s.clone(),
        serenity_model::ReactionType::Custom { name, id, .. } => {
            name.clone().unwrap_or_else(|| format!("<:emoji:{}>", id))
        }
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_url_prefers_proxy() {
        assert_eq!(
            attachment_url("https://media.example/a.png", "https://cdn.example/a.png").as_deref(),
            Some("https://media.example/a.png")
        );
    }

    #[test]
    fn attachment_url_falls_back_to_cdn() {
        assert_eq!(
            attachment_url("", "https://cdn.example/a.png").as_deref(),
            Some("https://cdn.example/a.png")
        );
    }

    #[test]
    fn attachment_url_missing_when_both_empty() {
        assert!(attachment_url(" ", "").is_none());
    }

    #[test]
    fn unicode_reaction_name_is_the_emoji() {
        let emoji = serenity_model::ReactionType::Unicode("👍".into());
        assert_eq!(reaction_emoji_name(&emoji), "👍");
    }

    #[test]
    fn custom_reaction_name_is_the_emoji_name() {
        let emoji = serenity_model::ReactionType::Custom {
            animated: false,
            id: serenity_model::EmojiId::new(42),
            name: Some("partyblob".into()),
        };
        assert_eq!(reaction_emoji_name(&emoji), "partyblob");
    }
}
