use serde::{Deserialize, Serialize};

/// Top-level configuration, as read from `parley.yml` plus environment overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub openai: OpenAiConfig,
    pub behavior: BehaviorConfig,
    pub feedback: FeedbackConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub bot_token: String,

    /// Extra name the bot answers to when it appears in message text,
    /// on top of its platform username.
    pub bot_name: String,

    /// Authors whose guild messages never get a reply.
    pub ignore_sender_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: String,

    /// Override for OpenAI-compatible endpoints. `None` uses the public API.
    pub base_url: Option<String>,

    /// Model used for tool decisions and the final text response.
    pub model: String,

    pub starting_prompt: String,

    /// Vision model for summarizing image attachments. Summaries are skipped when unset.
    pub vision_model: Option<String>,

    pub vision_max_tokens: u32,

    /// Image generation model. Image tool calls are never offered when unset.
    pub image_model: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            model: String::new(),
            starting_prompt: String::new(),
            vision_model: None,
            vision_max_tokens: 300,
            image_model: None,
        }
    }
}

/// Discord returns at most this many messages per history request.
pub const MAX_HISTORY_LIMIT: usize = 100;

/// One week.
pub const MAX_HISTORY_LOOKBACK_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Chance to answer a guild message that neither mentions nor replies to the bot.
    pub random_reply_chance: f64,

    /// Chance to consider reacting to a guild message the bot will not answer.
    pub random_reaction_chance: f64,

    /// Chance that a guild answer is sent as a reply rather than a plain message.
    pub reply_as_reply_chance: f64,

    /// Maximum number of earlier messages included as context.
    pub history_limit: usize,

    /// How far back earlier messages may be, in minutes.
    pub history_lookback_minutes: i64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            random_reply_chance: 0.05,
            random_reaction_chance: 0.1,
            reply_as_reply_chance: 0.7,
            history_limit: 10,
            history_lookback_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub positive_emojis: Vec<String>,
    pub negative_emojis: Vec<String>,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            positive_emojis: vec!["👍".into(), "❤️".into(), "😂".into()],
            negative_emojis: vec!["👎".into()],
        }
    }
}
