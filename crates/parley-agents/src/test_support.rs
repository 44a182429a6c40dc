//! In-memory providers and platform used by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parley_channels::{ChatPlatform, CustomEmoji, OutgoingMessage, Reaction};
use parley_common::{
    Author, ChannelId, Error, GuildId, Message, MessageId, Result, UserId,
};

use crate::providers::{
    ContentBlock, ImageGenerator, ImageRequest, LlmProvider, LlmRequest, LlmResponse,
};

pub const BOT_ID: UserId = UserId(999);

pub fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
}

pub fn user(id: u64, name: &str) -> Author {
    Author {
        id: UserId(id),
        name: name.to_string(),
    }
}

pub fn bot_author() -> Author {
    Author {
        id: BOT_ID,
        name: "parley".to_string(),
    }
}

pub fn message(id: u64, author: Author, content: &str, timestamp: DateTime<Utc>) -> Message {
    Message::text(MessageId(id), ChannelId(1), author, content, timestamp)
}

pub fn text_response(text: &str) -> LlmResponse {
    LlmResponse {
        content: vec![ContentBlock::Text {
            text: text.to_string(),
        }],
        model: "mock".to_string(),
        usage: None,
        stop_reason: Some("stop".to_string()),
    }
}

/// A response made of tool calls, given as `(name, raw arguments)` pairs.
pub fn tool_response(calls: &[(&str, &str)]) -> LlmResponse {
    LlmResponse {
        content: calls
            .iter()
            .enumerate()
            .map(|(i, (name, arguments))| ContentBlock::ToolUse {
                id: format!("call_{i}"),
                name: name.to_string(),
                arguments: arguments.to_string(),
            })
            .collect(),
        model: "mock".to_string(),
        usage: None,
        stop_reason: Some("tool_calls".to_string()),
    }
}

/// Replays queued responses in order and records every request.
/// Answers with an empty text response once the queue runs dry.
#[derive(Default)]
pub struct MockProvider {
    responses: Mutex<VecDeque<Result<LlmResponse>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: Vec<LlmResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_error(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(Error::Agent(message.to_string())));
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(text_response("")))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Returns queued image URLs in order (`None` once exhausted) and records requests.
#[derive(Default)]
pub struct MockImages {
    urls: Mutex<VecDeque<Option<String>>>,
    requests: Mutex<Vec<ImageRequest>>,
}

impl MockImages {
    pub fn with_urls(urls: Vec<Option<&str>>) -> Self {
        Self {
            urls: Mutex::new(urls.into_iter().map(|u| u.map(str::to_string)).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ImageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for MockImages {
    async fn generate_image(&self, request: &ImageRequest) -> Result<Option<String>> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.urls.lock().unwrap().pop_front().flatten())
    }
}

/// Platform double. `history` returns the configured messages unfiltered so
/// callers' own window bounds are exercised.
#[derive(Default)]
pub struct MockPlatform {
    pub history: Vec<Message>,
    pub emojis: Vec<CustomEmoji>,
    pub messages: HashMap<MessageId, Message>,
    /// Error returned by `send`, if any. Built fresh per call.
    pub send_error: Option<fn() -> Error>,
    pub reactions: Mutex<Vec<(MessageId, Reaction)>>,
    pub sent: Mutex<Vec<OutgoingMessage>>,
    pub emoji_fetches: AtomicUsize,
    pub typing: AtomicUsize,
}

impl MockPlatform {
    pub fn with_history(history: Vec<Message>) -> Self {
        Self {
            history,
            ..Default::default()
        }
    }

    pub fn reactions(&self) -> Vec<Reaction> {
        self.reactions
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    async fn history(
        &self,
        _trigger: &Message,
        _after: DateTime<Utc>,
        _before: DateTime<Utc>,
    ) -> Result<Vec<Message>> {
        Ok(self.history.clone())
    }

    async fn fetch_message(&self, _channel_id: ChannelId, message_id: MessageId) -> Result<Message> {
        self.messages
            .get(&message_id)
            .cloned()
            .ok_or_else(|| Error::Channel(format!("unknown message {message_id}")))
    }

    async fn custom_emojis(&self, _guild_id: GuildId) -> Result<Vec<CustomEmoji>> {
        self.emoji_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.emojis.clone())
    }

    async fn add_reaction(&self, message: &Message, reaction: &Reaction) -> Result<()> {
        self.reactions
            .lock()
            .unwrap()
            .push((message.id, reaction.clone()));
        Ok(())
    }

    async fn broadcast_typing(&self, _channel_id: ChannelId) -> Result<()> {
        self.typing.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, _message: &Message, outgoing: OutgoingMessage) -> Result<()> {
        if let Some(make_error) = self.send_error {
            return Err(make_error());
        }
        self.sent.lock().unwrap().push(outgoing);
        Ok(())
    }
}
