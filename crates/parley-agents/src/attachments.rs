use std::sync::Arc;

use parley_common::{Message, Result};
use tracing::{debug, info};

use crate::providers::{ChatMessage, ChatRole, ContentBlock, LlmProvider, LlmRequest, MessagePart};

/// Turns the image attachments of a message into a one-paragraph summary
/// from a vision model, so text-only completions can "see" them.
#[derive(Clone)]
pub struct AttachmentSummarizer {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
}

impl AttachmentSummarizer {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens,
        }
    }

    /// Summarize the message's image attachments as a system context entry.
    ///
    /// Returns `Ok(None)` without calling the model when the message has no
    /// image attachment with a usable URL.
    pub async fn summarize(&self, message: &Message) -> Result<Option<ChatMessage>> {
        let image_urls: Vec<&str> = message
            .attachments
            .iter()
            .filter(|a| a.is_image())
            .filter_map(|a| a.url.as_deref())
            .collect();

        if image_urls.is_empty() {
            return Ok(None);
        }

        let num_attached_images = image_urls.len();
        info!(num_attached_images, "summarizing attached image(s)");

        let mut parts = vec![ContentBlock::Text {
            text: vision_prompt(num_attached_images),
        }];
        parts.extend(image_urls.into_iter().map(|url| ContentBlock::Image {
            url: url.to_string(),
        }));

        let mut request = LlmRequest::new(
            self.model.clone(),
            vec![ChatMessage {
                role: ChatRole::User,
                content: MessagePart::Parts(parts),
                name: None,
            }],
        );
        request.max_tokens = Some(self.max_tokens);

        let response = self.provider.complete(&request).await?;
        let summary = response.text();
        debug!(num_attached_images, summary = %summary, "vision response");

        Ok(Some(ChatMessage::system(format!(
            "{} uploaded {num_attached_images} image(s):\n{summary}",
            message.author.name
        ))))
    }
}

fn vision_prompt(count: usize) -> String {
    let subject = if count > 1 {
        format!("these {count} images")
    } else {
        "this image".to_string()
    };
    format!("Give a simple, concise summary of what's in {subject}")
}
