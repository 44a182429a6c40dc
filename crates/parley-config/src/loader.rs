use std::path::{Path, PathBuf};

use parley_common::{Error, Result};
use tracing::{debug, info};

use crate::model::{AppConfig, MAX_HISTORY_LIMIT, MAX_HISTORY_LOOKBACK_MINUTES};

/// Loads [`AppConfig`] from an optional YAML file, then applies environment overrides.
pub struct ConfigLoader {
    path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { path: None }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Load using the process environment.
    pub fn load(&self) -> Result<AppConfig> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// Load using `env` to look up override variables.
    pub fn load_with_env(&self, env: impl Fn(&str) -> Option<String>) -> Result<AppConfig> {
        let mut config = match &self.path {
            Some(path) if path.exists() => read_file(path)?,
            Some(path) => {
                debug!("config file {} not found, using defaults", path.display());
                AppConfig::default()
            }
            None => AppConfig::default(),
        };

        apply_env_overrides(&mut config, env)?;
        validate(&config)?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_file(path: &Path) -> Result<AppConfig> {
    let raw = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_yaml::from_str(&raw)
        .map_err(|e| Error::Config(format!("invalid config file {}: {e}", path.display())))?;
    info!("loaded config from {}", path.display());
    Ok(config)
}

fn apply_env_overrides(
    config: &mut AppConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_empty("DISCORD_BOT_TOKEN") {
        config.discord.bot_token = v;
    }
    if let Some(v) = non_empty("DISCORD_BOT_NAME") {
        config.discord.bot_name = v;
    }
    if let Some(v) = non_empty("OPENAI_API_KEY") {
        config.openai.api_key = v;
    }
    if let Some(v) = non_empty("OPENAI_BASE_URL") {
        config.openai.base_url = Some(v);
    }
    if let Some(v) = non_empty("OPENAI_MODEL") {
        config.openai.model = v;
    }
    if let Some(v) = non_empty("OPENAI_STARTING_PROMPT") {
        config.openai.starting_prompt = v;
    }
    if let Some(v) = non_empty("OPENAI_VISION_MODEL") {
        config.openai.vision_model = Some(v);
    }
    if let Some(v) = non_empty("OPENAI_IMAGE_GEN_MODEL") {
        config.openai.image_model = Some(v);
    }
    if let Some(v) = non_empty("RANDOM_REPLY_CHANCE") {
        config.behavior.random_reply_chance = parse_chance("RANDOM_REPLY_CHANCE", &v)?;
    }
    if let Some(v) = non_empty("RANDOM_REACTION_CHANCE") {
        config.behavior.random_reaction_chance = parse_chance("RANDOM_REACTION_CHANCE", &v)?;
    }

    Ok(())
}

fn parse_chance(key: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| Error::Config(format!("{key} must be a number: {e}")))
}

fn validate(config: &AppConfig) -> Result<()> {
    if config.discord.bot_token.trim().is_empty() {
        return Err(Error::Config("discord bot_token is required".into()));
    }
    if config.openai.api_key.trim().is_empty() {
        return Err(Error::Config("openai api_key is required".into()));
    }
    if config.openai.model.trim().is_empty() {
        return Err(Error::Config("openai model is required".into()));
    }

    let behavior = &config.behavior;
    for (name, chance) in [
        ("random_reply_chance", behavior.random_reply_chance),
        ("random_reaction_chance", behavior.random_reaction_chance),
        ("reply_as_reply_chance", behavior.reply_as_reply_chance),
    ] {
        if !(0.0..=1.0).contains(&chance) {
            return Err(Error::Config(format!(
                "{name} must be between 0.0 and 1.0, got {chance}"
            )));
        }
    }
    if !(1..=MAX_HISTORY_LOOKBACK_MINUTES).contains(&behavior.history_lookback_minutes) {
        return Err(Error::Config(format!(
            "history_lookback_minutes must be between 1 and {MAX_HISTORY_LOOKBACK_MINUTES}, got {}",
            behavior.history_lookback_minutes
        )));
    }
    if behavior.history_limit > MAX_HISTORY_LIMIT {
        return Err(Error::Config(format!(
            "history_limit must be at most {MAX_HISTORY_LIMIT}, got {}",
            behavior.history_limit
        )));
    }

    Ok(())
}
