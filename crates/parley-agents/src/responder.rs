use std::sync::Arc;

use parley_channels::{ChatPlatform, Reaction};
use parley_common::{BotIdentity, Message, Result};
use tracing::info;

use crate::attachments::AttachmentSummarizer;
use crate::context::{ContextAssembler, augment};
use crate::orchestrators::{ImageOrchestrator, ReactionOrchestrator};
use crate::providers::{ChatMessage, ImageGenerator, LlmProvider, LlmRequest};
use crate::settings::AgentSettings;
use crate::tools::{ToolCatalog, ToolDispatcher};

/// Shared, read-only services every trigger is handled with.
#[derive(Clone)]
pub struct AgentServices {
    pub provider: Arc<dyn LlmProvider>,
    pub images: Arc<dyn ImageGenerator>,
    pub catalog: Arc<ToolCatalog>,
    pub settings: Arc<AgentSettings>,
}

/// What the bot wants to post in answer to a trigger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub text: Option<String>,
    pub image_url: Option<String>,
}

impl Reply {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.image_url.is_none()
    }
}

/// Per-trigger pipeline: context, optional reactions, optional image, final text.
pub struct Responder {
    assembler: ContextAssembler,
    reactions: ReactionOrchestrator,
    images: Option<ImageOrchestrator>,
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl Responder {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        identity: BotIdentity,
        services: &AgentServices,
    ) -> Self {
        let settings = &services.settings;

        let summarizer = settings.vision_model.as_ref().map(|model| {
            AttachmentSummarizer::new(
                services.provider.clone(),
                model.clone(),
                settings.vision_max_tokens,
            )
        });
        let assembler =
            ContextAssembler::new(platform.clone(), identity, settings.clone(), summarizer);

        let dispatcher = ToolDispatcher::new(
            services.provider.clone(),
            services.catalog.clone(),
            settings.model.clone(),
        );
        let images = settings.image_model.as_ref().map(|model| {
            ImageOrchestrator::new(dispatcher.clone(), services.images.clone(), model.clone())
        });

        Self {
            assembler,
            reactions: ReactionOrchestrator::new(platform, dispatcher),
            images,
            provider: services.provider.clone(),
            model: settings.model.clone(),
        }
    }

    /// Context for `trigger`, with attachment summaries.
    pub async fn context(&self, trigger: &Message) -> Result<Vec<ChatMessage>> {
        self.assembler.assemble(trigger, true).await
    }

    pub async fn react(&self, trigger: &Message, context: &[ChatMessage]) -> Result<Vec<Reaction>> {
        self.reactions.react(trigger, context).await
    }

    /// Generate an image if asked for, then the text answer.
    pub async fn reply(&self, trigger: &Message, context: &[ChatMessage]) -> Result<Reply> {
        let generated = match &self.images {
            Some(images) => images.maybe_generate(trigger, context).await?,
            None => None,
        };

        let (messages, image_url) = match generated {
            Some(image) => (augment(context, [image.annotation]), Some(image.url)),
            None => (context.to_vec(), None),
        };

        let mut request = LlmRequest::new(self.model.clone(), messages);
        request.user = Some(trigger.author.name.clone());

        let response = self.provider.complete(&request).await?;
        let text = response.text();
        info!(response = %text, has_image = image_url.is_some(), "generated response");

        Ok(Reply {
            text: (!text.trim().is_empty()).then_some(text),
            image_url,
        })
    }
}
