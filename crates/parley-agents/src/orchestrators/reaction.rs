use std::collections::HashMap;
use std::sync::Arc;

use parley_channels::{ChatPlatform, CustomEmoji, Reaction};
use parley_common::{Message, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::context::augment;
use crate::providers::ChatMessage;
use crate::tools::{AUTO, ToolBinding, ToolDispatcher, ToolKind};

/// Lets the model optionally react to the trigger message with emojis.
#[derive(Clone)]
pub struct ReactionOrchestrator {
    platform: Arc<dyn ChatPlatform>,
    dispatcher: ToolDispatcher,
}

impl ReactionOrchestrator {
    pub fn new(platform: Arc<dyn ChatPlatform>, dispatcher: ToolDispatcher) -> Self {
        Self {
            platform,
            dispatcher,
        }
    }

    /// Ask the model for reactions and apply them to `trigger`.
    ///
    /// `base` is only read; the reaction instruction goes into a throwaway copy.
    /// Returns the reactions that were applied, in order.
    pub async fn react(&self, trigger: &Message, base: &[ChatMessage]) -> Result<Vec<Reaction>> {
        let custom_emojis = match trigger.guild_id {
            Some(guild_id) => self.platform.custom_emojis(guild_id).await?,
            None => Vec::new(),
        };

        let instruction = format!(
            "NOT REQUIRED: Optionally add a reaction to the previous message with {}",
            emoji_options(&custom_emojis)
        );
        let context = augment(base, [ChatMessage::system(instruction)]);

        let invocations = self
            .dispatcher
            .dispatch(&context, &[ToolKind::GenerateMessageReaction.name(), AUTO])
            .await?;

        let by_name: HashMap<String, CustomEmoji> = custom_emojis
            .into_iter()
            .map(|emoji| (emoji.name.clone(), emoji))
            .collect();

        let mut applied = Vec::new();
        for invocation in invocations {
            if invocation.binding != ToolBinding::GenerateMessageReaction {
                continue;
            }

            let tokens = emoji_tokens(invocation.parameters.get("emojis"));
            info!(
                emojis = ?tokens,
                reasoning = invocation.str_param("reasoning").unwrap_or_default(),
                "adding reactions to message"
            );

            for token in tokens {
                let Some(reaction) = resolve_emoji(&token, &by_name) else {
                    continue;
                };
                self.platform.add_reaction(trigger, &reaction).await?;
                applied.push(reaction);
            }
        }

        Ok(applied)
    }
}

/// Resolve one emoji token from the model.
///
/// Single characters are Unicode emoji; anything longer is looked up by name
/// among the guild's custom emojis. Multi-codepoint Unicode emoji (skin tones,
/// ZWJ sequences) are therefore treated as custom names and usually skipped.
pub fn resolve_emoji(token: &str, custom: &HashMap<String, CustomEmoji>) -> Option<Reaction> {
    let token = token.trim();
    match token.chars().count() {
        0 => None,
        1 => Some(Reaction::Unicode(token.to_string())),
        _ => match custom.get(token) {
            Some(emoji) => Some(Reaction::Custom(emoji.clone())),
            None => {
                warn!(emoji = token, "reaction not found in server emojis");
                None
            }
        },
    }
}

fn emoji_options(custom_emojis: &[CustomEmoji]) -> String {
    if custom_emojis.is_empty() {
        return "emoji(s).".to_string();
    }
    let names: Vec<&str> = custom_emojis.iter().map(|e| e.name.as_str()).collect();
    format!(
        "the name(s) of one or more available server emoji(s): {names:?}\n\n...or emoji(s)."
    )
}

/// `emojis` as a list of strings. A bare string counts as one token; other
/// shapes and non-string items are ignored.
fn emoji_tokens(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(single)) => vec![single.clone()],
        _ => Vec::new(),
    }
}
