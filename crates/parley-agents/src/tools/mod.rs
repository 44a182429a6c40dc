pub mod dispatch;

pub use dispatch::{ToolDispatcher, tool_choice_for};

use serde_json::{Map, Value, json};

use crate::providers::ToolDefinition;

/// Allow-list entry that lets the model choose freely among the other names.
pub const AUTO: &str = "auto";

/// Every tool the bot knows how to describe to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    GenerateImage,
    GenerateMessageReaction,
    /// Offered to the model but never executed.
    GenerateTextResponse,
}

/// Side effects a tool call can be turned into. Executed by the orchestrators,
/// never by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolBinding {
    GenerateImage,
    GenerateMessageReaction,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [
        ToolKind::GenerateImage,
        ToolKind::GenerateMessageReaction,
        ToolKind::GenerateTextResponse,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::GenerateImage => "generate_image",
            ToolKind::GenerateMessageReaction => "generate_message_reaction",
            ToolKind::GenerateTextResponse => "generate_text_response",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn binding(self) -> Option<ToolBinding> {
        match self {
            ToolKind::GenerateImage => Some(ToolBinding::GenerateImage),
            ToolKind::GenerateMessageReaction => Some(ToolBinding::GenerateMessageReaction),
            ToolKind::GenerateTextResponse => None,
        }
    }

    pub fn definition(self) -> ToolDefinition {
        let (description, input_schema) = match self {
            ToolKind::GenerateImage => (
                "Generate an image based on the previous messages in the thread.",
                json!({
                    "type": "object",
                    "properties": {
                        "prompt": {
                            "type": "string",
                            "description": "The prompt to use when generating the image."
                        },
                        "style": {
                            "type": "string",
                            "enum": ["vivid", "natural"],
                            "description": "Vivid causes the model to lean towards generating hyper-real and dramatic images. Natural causes the model to produce more natural, less hyper-real looking images.",
                            "default": "vivid"
                        }
                    },
                    "required": ["prompt"]
                }),
            ),
            ToolKind::GenerateMessageReaction => (
                "Generate a reaction to the previous message in the conversation.",
                json!({
                    "type": "object",
                    "properties": {
                        "emojis": {
                            "type": "array",
                            "description": "The emoji(s) or name(s) of a server reaction(s) (if available) to use when generating the reaction(s).",
                            "items": { "type": "string" }
                        },
                        "reasoning": {
                            "type": "string",
                            "description": "Reasoning or justification for the chosen reaction(s)."
                        }
                    },
                    "required": ["emojis", "reasoning"]
                }),
            ),
            ToolKind::GenerateTextResponse => (
                "Generate a text response to the previous message in the conversation.",
                json!({
                    "type": "object",
                    "properties": {
                        "response_text": {
                            "type": "string",
                            "description": "Text to return as a response to the last message."
                        }
                    }
                }),
            ),
        };

        ToolDefinition {
            name: self.name().to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// Read-only registry of tool definitions, built once at startup.
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    entries: Vec<(ToolKind, ToolDefinition)>,
}

impl ToolCatalog {
    pub fn new(kinds: impl IntoIterator<Item = ToolKind>) -> Self {
        let mut entries: Vec<(ToolKind, ToolDefinition)> = Vec::new();
        for kind in kinds {
            if !entries.iter().any(|(k, _)| *k == kind) {
                entries.push((kind, kind.definition()));
            }
        }
        Self { entries }
    }

    pub fn standard() -> Self {
        Self::new(ToolKind::ALL)
    }

    pub fn lookup(&self, name: &str) -> Option<ToolKind> {
        self.entries
            .iter()
            .find(|(kind, _)| kind.name() == name)
            .map(|(kind, _)| *kind)
    }

    /// Definitions whose names appear in `names`, in catalog order.
    pub fn definitions_for(&self, names: &[&str]) -> Vec<ToolDefinition> {
        self.entries
            .iter()
            .filter(|(kind, _)| names.contains(&kind.name()))
            .map(|(_, definition)| definition.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// A validated tool call: allow-listed, bound, and with object arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub binding: ToolBinding,
    pub parameters: Map<String, Value>,
}

impl ToolInvocation {
    /// String parameter, `None` when missing or not a string.
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }
}
