mod config;
mod convert;
mod handler;
mod platform;

pub use config::DiscordGatewayConfig;
pub use handler::DiscordHandler;
pub use platform::DiscordPlatform;

use std::sync::Arc;

use parley_common::{Error, Result};
use tracing::info;

use crate::traits::InboundHandler;

/// Runs the Discord gateway connection and forwards events to an [`InboundHandler`].
pub struct DiscordChannel {
    config: DiscordGatewayConfig,
    inbound: Arc<dyn InboundHandler>,
}

impl DiscordChannel {
    pub fn new(config: DiscordGatewayConfig, inbound: Arc<dyn InboundHandler>) -> Self {
        Self { config, inbound }
    }

    /// Connect and process events until the gateway shuts down.
    pub async fn run(self) -> Result<()> {
        let handler = DiscordHandler::new(self.inbound);

        let mut client = serenity::Client::builder(&self.config.bot_token, self.config.intents)
            .event_handler(handler)
            .await
            .map_err(|e| Error::Channel(format!("failed to build discord client: {e}")))?;

        info!("starting discord gateway connection");
        client
            .start()
            .await
            .map_err(|e| Error::Channel(format!("discord gateway error: {e}")))
    }
}
