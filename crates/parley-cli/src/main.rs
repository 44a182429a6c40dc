mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use parley_agents::{
    AgentServices, AgentSettings, BehaviorSettings, Bot, LlmProvider, OpenAiProvider, ToolCatalog,
};
use parley_channels::discord::{DiscordChannel, DiscordGatewayConfig};
use parley_config::{AppConfig, ConfigLoader};
use tracing::{info, warn};

use crate::logging::LogFormat;

/// Discord chat bot backed by an OpenAI-compatible model.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the YAML config file. Missing files fall back to environment variables.
    #[arg(short, long, env = "PARLEY_CONFIG", default_value = "parley.yml")]
    config: PathBuf,

    /// Log output format.
    #[arg(long, env = "PARLEY_LOG_FORMAT", value_enum, default_value = "plain")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Connect to Discord and start answering messages (default).
    Run,
    /// Validate the configuration and check that the model API is reachable.
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    logging::init(cli.log_format);

    let config = ConfigLoader::new()
        .with_file(&cli.config)
        .load()
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Check => check(config).await,
    }
}

fn openai_provider(config: &AppConfig) -> Arc<OpenAiProvider> {
    Arc::new(OpenAiProvider::new(
        config.openai.api_key.clone(),
        config.openai.base_url.clone(),
    ))
}

async fn run(config: AppConfig) -> Result<()> {
    let provider = openai_provider(&config);
    let settings = AgentSettings::from_config(&config);

    info!(
        model = %settings.model,
        vision_model = settings.vision_model.as_deref().unwrap_or("disabled"),
        image_model = settings.image_model.as_deref().unwrap_or("disabled"),
        base_url = provider.base_url(),
        "starting parley"
    );

    let services = AgentServices {
        provider: provider.clone(),
        images: provider,
        catalog: Arc::new(ToolCatalog::standard()),
        settings: Arc::new(settings),
    };
    let bot = Arc::new(Bot::new(services, BehaviorSettings::from_config(&config)));

    let gateway = DiscordGatewayConfig::from_settings(&config.discord)?;
    DiscordChannel::new(gateway, bot)
        .run()
        .await
        .context("discord connection ended with an error")
}

async fn check(config: AppConfig) -> Result<()> {
    DiscordGatewayConfig::from_settings(&config.discord)?;
    let settings = AgentSettings::from_config(&config);
    if settings.vision_model.is_none() {
        warn!("no vision model configured; image attachments will not be summarized");
    }
    if settings.image_model.is_none() {
        warn!("no image model configured; image generation is disabled");
    }

    let provider = openai_provider(&config);
    if !provider.health_check().await? {
        bail!("model API at {} is not reachable", provider.base_url());
    }

    info!(base_url = provider.base_url(), "configuration ok, model API reachable");
    Ok(())
}
