use std::sync::Arc;

use parley_common::{Message, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::context::augment;
use crate::providers::{ChatMessage, ImageGenerator, ImageRequest, ImageStyle};
use crate::tools::{AUTO, ToolBinding, ToolDispatcher, ToolInvocation, ToolKind};

const IMAGE_INSTRUCTION: &str = "Generate an image if the user is asking for an image to be created or edited. Otherwise, move on.";

/// Trailing base context entries the image decision looks at.
const RECENT_ENTRIES: usize = 2;

/// An image created for the reply, plus the context entry telling the model about it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub url: String,
    pub annotation: ChatMessage,
}

/// Decides whether the latest messages ask for an image and generates it.
#[derive(Clone)]
pub struct ImageOrchestrator {
    dispatcher: ToolDispatcher,
    images: Arc<dyn ImageGenerator>,
    model: String,
}

impl ImageOrchestrator {
    pub fn new(
        dispatcher: ToolDispatcher,
        images: Arc<dyn ImageGenerator>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            images,
            model: model.into(),
        }
    }

    pub async fn maybe_generate(
        &self,
        trigger: &Message,
        base: &[ChatMessage],
    ) -> Result<Option<GeneratedImage>> {
        let recent = &base[base.len().saturating_sub(RECENT_ENTRIES)..];
        let context = augment(recent, [ChatMessage::system(IMAGE_INSTRUCTION)]);

        let invocations = self
            .dispatcher
            .dispatch(&context, &[ToolKind::GenerateImage.name(), AUTO])
            .await?;

        for invocation in invocations {
            if invocation.binding != ToolBinding::GenerateImage {
                continue;
            }

            let Some(prompt) = invocation.str_param("prompt").filter(|p| !p.is_empty()) else {
                warn!(parameters = ?invocation.parameters, "missing prompt in image tool call");
                return Ok(None);
            };

            let request = ImageRequest {
                model: self.model.clone(),
                prompt: prompt.to_string(),
                style: image_style(&invocation),
                user: trigger.author.name.clone(),
            };
            info!(prompt = %request.prompt, style = request.style.as_str(), "generating image");

            match self.images.generate_image(&request).await? {
                Some(url) => {
                    return Ok(Some(GeneratedImage {
                        url,
                        annotation: ChatMessage::system(annotation(&request.prompt)),
                    }));
                }
                None => warn!(prompt = %request.prompt, "image generation returned no URL"),
            }
        }

        Ok(None)
    }
}

fn image_style(invocation: &ToolInvocation) -> ImageStyle {
    match invocation.parameters.get("style") {
        None | Some(Value::Null) => ImageStyle::default(),
        Some(Value::String(style)) => ImageStyle::parse(style).unwrap_or_else(|| {
            warn!(style = %style, "unknown image style, using vivid");
            ImageStyle::default()
        }),
        Some(other) => {
            warn!(style = %other, "unknown image style, using vivid");
            ImageStyle::default()
        }
    }
}

fn annotation(prompt: &str) -> String {
    format!(
        "The image was successfully generated with the following prompt: `'{prompt}'`\n\nYou will attach it in your response; DON'T ADD IMAGE MARKDOWN SYNTAX."
    )
}
