use chrono::Duration;
use parley_config::{AppConfig, MAX_HISTORY_LOOKBACK_MINUTES};

/// Model and context settings for one bot instance, built once at startup.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Model for tool decisions and the final text response.
    pub model: String,
    pub starting_prompt: String,
    /// `None` disables attachment summaries.
    pub vision_model: Option<String>,
    pub vision_max_tokens: u32,
    /// `None` disables image generation.
    pub image_model: Option<String>,
    pub history_limit: usize,
    pub history_lookback: Duration,
}

impl AgentSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let non_empty = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            model: config.openai.model.clone(),
            starting_prompt: config.openai.starting_prompt.clone(),
            vision_model: non_empty(&config.openai.vision_model),
            vision_max_tokens: config.openai.vision_max_tokens,
            image_model: non_empty(&config.openai.image_model),
            history_limit: config.behavior.history_limit,
            history_lookback: Duration::minutes(
                config
                    .behavior
                    .history_lookback_minutes
                    .clamp(0, MAX_HISTORY_LOOKBACK_MINUTES),
            ),
        }
    }
}

/// Routing and feedback knobs for the Discord-facing side of the bot.
#[derive(Debug, Clone)]
pub struct BehaviorSettings {
    /// Extra name the bot answers to, lowercased. Empty means none.
    pub bot_name: String,
    pub ignore_sender_names: Vec<String>,
    pub random_reply_chance: f64,
    pub random_reaction_chance: f64,
    pub reply_as_reply_chance: f64,
    pub positive_emojis: Vec<String>,
    pub negative_emojis: Vec<String>,
}

impl BehaviorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            bot_name: config.discord.bot_name.trim().to_lowercase(),
            ignore_sender_names: config.discord.ignore_sender_names.clone(),
            random_reply_chance: config.behavior.random_reply_chance,
            random_reaction_chance: config.behavior.random_reaction_chance,
            reply_as_reply_chance: config.behavior.reply_as_reply_chance,
            positive_emojis: config.feedback.positive_emojis.clone(),
            negative_emojis: config.feedback.negative_emojis.clone(),
        }
    }

    pub fn is_ignored_sender(&self, name: &str) -> bool {
        self.ignore_sender_names.iter().any(|n| n == name)
    }
}
