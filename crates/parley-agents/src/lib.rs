pub mod attachments;
pub mod bot;
pub mod context;
pub mod feedback;
pub mod openai;
pub mod orchestrators;
pub mod providers;
pub mod responder;
pub mod settings;
pub mod tools;

#[cfg(test)]
mod test_support;

pub use attachments::AttachmentSummarizer;
pub use bot::Bot;
pub use context::{ContextAssembler, ConversationWindow, augment};
pub use openai::OpenAiProvider;
pub use orchestrators::{GeneratedImage, ImageOrchestrator, ReactionOrchestrator};
pub use providers::{
    ChatMessage, ChatRole, ContentBlock, ImageGenerator, ImageRequest, ImageStyle, LlmProvider,
    LlmRequest, LlmResponse, MessagePart, ToolChoice, ToolDefinition, Usage,
};
pub use responder::{AgentServices, Reply, Responder};
pub use settings::{AgentSettings, BehaviorSettings};
pub use tools::{AUTO, ToolBinding, ToolCatalog, ToolDispatcher, ToolInvocation, ToolKind};
