use crate::providers::{
    ChatMessage, ChatRole, ContentBlock, ImageGenerator, ImageRequest, LlmProvider, LlmRequest,
    LlmResponse, MessagePart, ToolChoice, Usage,
};
use async_trait::async_trait;
use parley_common::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const IMAGE_SIZE: &str = "1024x1024";
const IMAGE_QUALITY: &str = "standard";

/// Client for the OpenAI chat completions and image generation endpoints.
///
/// Works with any OpenAI-compatible server via `base_url`.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}/{endpoint}", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Agent(format!("openai request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Agent(format!(
                "openai API error: status={status}, body={body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Agent(format!("failed to parse openai response: {e}")))
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let openai_request = convert_request(request);
        debug!(
            model = %openai_request.model,
            messages = openai_request.messages.len(),
            tools = openai_request.tools.as_ref().map_or(0, Vec::len),
            "sending chat completion request"
        );

        let response: OpenAiResponse = self.post_json("chat/completions", &openai_request).await?;
        convert_response(response)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.base_url);
        let response = self.client.get(&url).bearer_auth(&self.api_key).send().await;

        match response {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) => {
                warn!(error = %e, "openai health check request failed");
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl ImageGenerator for OpenAiProvider {
    async fn generate_image(&self, request: &ImageRequest) -> Result<Option<String>> {
        let body = OpenAiImageRequest {
            model: &request.model,
            prompt: &request.prompt,
            size: IMAGE_SIZE,
            quality: IMAGE_QUALITY,
            style: request.style.as_str(),
            n: 1,
            user: &request.user,
        };

        let response: OpenAiImageResponse = self.post_json("images/generations", &body).await?;
        Ok(response
            .data
            .into_iter()
            .next()
            .and_then(|image| image.url)
            .filter(|url| !url.is_empty()))
    }
}

fn convert_request(request: &LlmRequest) -> OpenAiRequest {
    let messages = request.messages.iter().map(convert_message).collect();

    let tools = if request.tools.is_empty() {
        None
    } else {
        Some(
            request
                .tools
                .iter()
                .map(|t| OpenAiTool {
                    kind: "function".to_string(),
                    function: OpenAiFunctionDefinition {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.input_schema.clone(),
                    },
                })
                .collect(),
        )
    };

    // tool_choice without tools is rejected by the API
    let tool_choice = tools
        .as_ref()
        .and(request.tool_choice.as_ref())
        .map(convert_tool_choice);

    OpenAiRequest {
        model: request.model.clone(),
        messages,
        max_tokens: request.max_tokens,
        tools,
        tool_choice,
        user: request.user.clone(),
    }
}

fn convert_tool_choice(choice: &ToolChoice) -> OpenAiToolChoice {
    match choice {
        ToolChoice::Auto => OpenAiToolChoice::Mode("auto".to_string()),
        ToolChoice::Function(name) => OpenAiToolChoice::Function {
            kind: "function".to_string(),
            function: OpenAiToolChoiceFunction { name: name.clone() },
        },
    }
}

fn convert_message(msg: &ChatMessage) -> OpenAiMessage {
    let name = msg.name.clone().filter(|n| !n.is_empty());

    match msg.role {
        ChatRole::System => OpenAiMessage::System {
            content: msg.text(),
            name,
        },
        ChatRole::User => {
            let content = match &msg.content {
                MessagePart::Text(t) => OpenAiUserContent::Text(t.clone()),
                MessagePart::Parts(parts) => OpenAiUserContent::Parts(
                    parts
                        .iter()
                        .filter_map(|part| match part {
                            ContentBlock::Text { text } => {
                                Some(OpenAiContentPart::Text { text: text.clone() })
                            }
                            ContentBlock::Image { url } => Some(OpenAiContentPart::ImageUrl {
                                image_url: OpenAiImageUrl { url: url.clone() },
                            }),
                            ContentBlock::ToolUse { .. } => None,
                        })
                        .collect(),
                ),
            };
            OpenAiMessage::User { content, name }
        }
        ChatRole::Assistant => OpenAiMessage::Assistant {
            content: msg.text(),
            name,
        },
    }
}

fn convert_response(response: OpenAiResponse) -> Result<LlmResponse> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::Agent("no choices in openai response".to_string()))?;
    let message = choice.message;

    let mut content = Vec::new();

    if let Some(text) = message.content {
        content.push(ContentBlock::Text { text });
    }

    // Arguments stay as raw text; validating them is the dispatcher's job.
    for tc in message.tool_calls.unwrap_or_default() {
        let Some(function) = tc.function else {
            debug!(id = %tc.id, "skipping tool call without a function payload");
            continue;
        };
        content.push(ContentBlock::ToolUse {
            id: tc.id,
            name: function.name,
            arguments: function.arguments,
        });
    }

    Ok(LlmResponse {
        content,
        model: response.model,
        usage: response.usage.map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        }),
        stop_reason: choice.finish_reason,
    })
}

// Request Types
#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<OpenAiToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
}

#[derive(Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
enum OpenAiMessage {
    System {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    User {
        content: OpenAiUserContent,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Assistant {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

#[derive(Serialize)]
#[serde(untagged)]
enum OpenAiUserContent {
    Text(String),
    Parts(Vec<OpenAiContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAiContentPart {
    Text { text: String },
    ImageUrl { image_url: OpenAiImageUrl },
}

#[derive(Serialize)]
struct OpenAiImageUrl {
    url: String,
}

#[derive(Serialize)]
#[serde(untagged)]
enum OpenAiToolChoice {
    Mode(String),
    Function {
        #[serde(rename = "type")]
        kind: String,
        function: OpenAiToolChoiceFunction,
    },
}

#[derive(Serialize)]
struct OpenAiToolChoiceFunction {
    name: String,
}

#[derive(Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(default)]
    function: Option<OpenAiFunctionCall>,
}

#[derive(Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    kind: String,
    function: OpenAiFunctionDefinition,
}

#[derive(Serialize)]
struct OpenAiFunctionDefinition {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Serialize)]
struct OpenAiImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    quality: &'a str,
    style: &'a str,
    n: u8,
    user: &'a str,
}

// Response Types
#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAiImageResponse {
    #[serde(default)]
    data: Vec<OpenAiImageData>,
}

#[derive(Deserialize)]
struct OpenAiImageData {
    url: Option<String>,
}
