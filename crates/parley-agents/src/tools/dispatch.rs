use std::sync::Arc;

use parley_common::Result;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{AUTO, ToolCatalog, ToolInvocation};
use crate::providers::{ChatMessage, ContentBlock, LlmProvider, LlmRequest, ToolChoice};

/// `auto` unless exactly one concrete tool name is allowed, in which case
/// the model is forced to call that tool.
pub fn tool_choice_for(allowed: &[&str]) -> ToolChoice {
    match allowed {
        [name] if *name != AUTO => ToolChoice::Function((*name).to_string()),
        _ => ToolChoice::Auto,
    }
}

/// Asks the model which tools to call and validates its answer.
///
/// The dispatcher never runs a tool; it only returns the calls that survived
/// validation, in the order the model emitted them.
#[derive(Clone)]
pub struct ToolDispatcher {
    provider: Arc<dyn LlmProvider>,
    catalog: Arc<ToolCatalog>,
    model: String,
}

impl ToolDispatcher {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        catalog: Arc<ToolCatalog>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            catalog,
            model: model.into(),
        }
    }

    #[instrument(skip(self, context), fields(tool_choice = tracing::field::Empty))]
    pub async fn dispatch(
        &self,
        context: &[ChatMessage],
        allowed: &[&str],
    ) -> Result<Vec<ToolInvocation>> {
        let tool_choice = tool_choice_for(allowed);
        tracing::Span::current().record("tool_choice", tracing::field::debug(&tool_choice));

        let tools = self.catalog.definitions_for(allowed);
        if tools.is_empty() {
            warn!("no catalog tools match the allowed names");
            return Ok(Vec::new());
        }

        let mut request = LlmRequest::new(self.model.clone(), context.to_vec());
        request.tools = tools;
        request.tool_choice = Some(tool_choice);

        debug!("getting tool call response");
        let response = self.provider.complete(&request).await?;

        let mut invocations = Vec::new();
        for block in response.content {
            let ContentBlock::ToolUse {
                name, arguments, ..
            } = block
            else {
                continue;
            };
            info!(tool = %name, arguments = %arguments, "model decided to call tool");

            if name == AUTO || !allowed.contains(&name.as_str()) {
                info!(tool = %name, "dropping call to a tool that was not offered");
                continue;
            }

            let parameters = match serde_json::from_str::<Value>(&arguments) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    warn!(tool = %name, arguments = %other, "tool arguments are not a JSON object");
                    continue;
                }
                Err(e) => {
                    warn!(tool = %name, arguments = %arguments, error = %e, "invalid JSON in tool call");
                    continue;
                }
            };

            let Some(binding) = self.catalog.lookup(&name).and_then(|kind| kind.binding()) else {
                debug!(tool = %name, "tool has no executable binding");
                continue;
            };

            invocations.push(ToolInvocation {
                binding,
                parameters,
            });
        }

        if invocations.is_empty() {
            info!("decided not to call any tool");
        }
        Ok(invocations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockProvider, text_response, tool_response};
    use crate::tools::{ToolBinding, ToolKind};

    fn dispatcher(provider: Arc<MockProvider>) -> ToolDispatcher {
        ToolDispatcher::new(provider, Arc::new(ToolCatalog::standard()), "gpt-4o")
    }

    fn context() -> Vec<ChatMessage> {
        vec![
            ChatMessage::system("You are user ID 1."),
            ChatMessage::user("alice", "draw me a cat in space"),
        ]
    }

    #[test]
    fn single_name_forces_that_tool() {
        assert_eq!(
            tool_choice_for(&["generate_image"]),
            ToolChoice::Function("generate_image".into())
        );
    }

    #[test]
    fn auto_or_several_names_let_the_model_choose() {
        assert_eq!(tool_choice_for(&["generate_image", AUTO]), ToolChoice::Auto);
        assert_eq!(
            tool_choice_for(&["generate_image", "generate_message_reaction"]),
            ToolChoice::Auto
        );
        assert_eq!(tool_choice_for(&[AUTO]), ToolChoice::Auto);
        assert_eq!(tool_choice_for(&[]), ToolChoice::Auto);
    }

    #[tokio::test]
    async fn request_offers_only_allowed_tools() {
        let provider = Arc::new(MockProvider::with_responses(vec![text_response("")]));
        let dispatcher = dispatcher(provider.clone());

        dispatcher
            .dispatch(&context(), &["generate_message_reaction", AUTO])
            .await
            .unwrap();

        let request = &provider.requests()[0];
        assert_eq!(request.tools.len(), 1);
        assert_eq!(request.tools[0].name, "generate_message_reaction");
        assert_eq!(request.tool_choice, Some(ToolChoice::Auto));
        assert_eq!(request.messages, context());
    }

    #[tokio::test]
    async fn no_matching_tools_skips_the_call() {
        let provider = Arc::new(MockProvider::new());
        let dispatcher = dispatcher(provider.clone());

        let result = dispatcher.dispatch(&context(), &[AUTO, "unknown"]).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn valid_calls_keep_emission_order() {
        let provider = Arc::new(MockProvider::with_responses(vec![tool_response(&[
            ("generate_message_reaction", r#"{"emojis": ["👍"], "reasoning": "nice"}"#),
            ("generate_image", r#"{"prompt": "a cat in space"}"#),
        ])]));
        let dispatcher = dispatcher(provider);

        let result = dispatcher
            .dispatch(
                &context(),
                &["generate_image", "generate_message_reaction", AUTO],
            )
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].binding, ToolBinding::GenerateMessageReaction);
        assert_eq!(result[1].binding, ToolBinding::GenerateImage);
        assert_eq!(result[1].str_param("prompt"), Some("a cat in space"));
    }

    #[tokio::test]
    async fn hallucinated_and_unoffered_names_are_dropped() {
        let provider = Arc::new(MockProvider::with_responses(vec![tool_response(&[
            ("delete_server", "{}"),
            ("generate_message_reaction", r#"{"emojis": ["👍"]}"#),
            ("generate_image", r#"{"prompt": "cat"}"#),
        ])]));
        let dispatcher = dispatcher(provider);

        let result = dispatcher
            .dispatch(&context(), &["generate_image", AUTO])
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].binding, ToolBinding::GenerateImage);
    }

    #[tokio::test]
    async fn malformed_arguments_drop_only_that_call() {
        let provider = Arc::new(MockProvider::with_responses(vec![tool_response(&[
            ("generate_image", "{not valid json"),
            ("generate_image", r#""just a string""#),
            ("generate_image", r#"{"prompt": "a cat"}"#),
        ])]));
        let dispatcher = dispatcher(provider);

        let result = dispatcher
            .dispatch(&context(), &["generate_image", AUTO])
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].str_param("prompt"), Some("a cat"));
    }

    #[tokio::test]
    async fn only_invalid_json_yields_empty_result() {
        let provider = Arc::new(MockProvider::with_responses(vec![tool_response(&[(
            "generate_image",
            "{not valid json",
        )])]));
        let dispatcher = dispatcher(provider);

        let result = dispatcher
            .dispatch(&context(), &["generate_image", AUTO])
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn unbound_tool_is_dropped_without_error() {
        let provider = Arc::new(MockProvider::with_responses(vec![tool_response(&[(
            "generate_text_response",
            r#"{"response_text": "hi"}"#,
        )])]));
        let dispatcher = dispatcher(provider.clone());

        let result = dispatcher
            .dispatch(&context(), &[ToolKind::GenerateTextResponse.name()])
            .await
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(
            provider.requests()[0].tool_choice,
            Some(ToolChoice::Function("generate_text_response".into()))
        );
    }

    #[tokio::test]
    async fn completion_failure_propagates() {
        let provider = Arc::new(MockProvider::new());
        provider.push_error("rate limited");
        let dispatcher = dispatcher(provider);

        let err = dispatcher
            .dispatch(&context(), &["generate_image", AUTO])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }
}
