pub mod loader;
pub mod model;

pub use loader::ConfigLoader;
pub use model::{
    AppConfig, BehaviorConfig, DiscordConfig, FeedbackConfig, MAX_HISTORY_LIMIT,
    MAX_HISTORY_LOOKBACK_MINUTES, OpenAiConfig,
};
