use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parley_channels::ChatPlatform;
use parley_common::{BotIdentity, Error, Message, Result};
use tracing::debug;

use crate::attachments::AttachmentSummarizer;
use crate::providers::{ChatMessage, ChatRole};
use crate::settings::AgentSettings;

/// The trailing slice of a channel's history that a reply is based on.
///
/// Ascending by timestamp and always ends with the trigger message.
#[derive(Debug, Clone)]
pub struct ConversationWindow {
    messages: Vec<Message>,
}

impl ConversationWindow {
    /// Keep history strictly inside `(trigger - lookback, trigger)`, cap it to
    /// the `limit` most recent messages, and append the trigger. Fails with a
    /// config error when `lookback` reaches before the earliest representable time.
    pub fn from_history(
        trigger: &Message,
        history: Vec<Message>,
        lookback: Duration,
        limit: usize,
    ) -> Result<Self> {
        let after = window_start(trigger, lookback)?;
        let before = trigger.timestamp;

        let mut messages: Vec<Message> = history
            .into_iter()
            .filter(|m| m.id != trigger.id && m.timestamp > after && m.timestamp < before)
            .collect();
        messages.sort_by_key(|m| m.timestamp);

        if messages.len() > limit {
            messages.drain(..messages.len() - limit);
        }
        messages.push(trigger.clone());

        Ok(Self { messages })
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn trigger(&self) -> &Message {
        // from_history always pushes the trigger
        &self.messages[self.messages.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

fn window_start(trigger: &Message, lookback: Duration) -> Result<DateTime<Utc>> {
    trigger.timestamp.checked_sub_signed(lookback).ok_or_else(|| {
        Error::Config(format!(
            "history lookback of {} minutes is out of range",
            lookback.num_minutes()
        ))
    })
}

/// Builds the model context for a trigger message: system prompt, then the
/// conversation window, with attachment summaries after their source message.
#[derive(Clone)]
pub struct ContextAssembler {
    platform: Arc<dyn ChatPlatform>,
    identity: BotIdentity,
    settings: Arc<AgentSettings>,
    summarizer: Option<AttachmentSummarizer>,
}

impl ContextAssembler {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        identity: BotIdentity,
        settings: Arc<AgentSettings>,
        summarizer: Option<AttachmentSummarizer>,
    ) -> Self {
        Self {
            platform,
            identity,
            settings,
            summarizer,
        }
    }

    pub async fn window(&self, trigger: &Message) -> Result<ConversationWindow> {
        let after = window_start(trigger, self.settings.history_lookback)?;
        let history = self
            .platform
            .history(trigger, after, trigger.timestamp)
            .await?;

        ConversationWindow::from_history(
            trigger,
            history,
            self.settings.history_lookback,
            self.settings.history_limit,
        )
    }

    /// Assemble the context for `trigger`. With `summarize_attachments`, each
    /// window message with images is followed by a vision summary; a failed
    /// summary fails the whole assembly.
    pub async fn assemble(
        &self,
        trigger: &Message,
        summarize_attachments: bool,
    ) -> Result<Vec<ChatMessage>> {
        let window = self.window(trigger).await?;

        let mut context = Vec::with_capacity(window.len() + 1);
        context.push(ChatMessage::system(system_prompt(
            &self.identity,
            &self.settings.starting_prompt,
        )));

        let mut debug_lines = Vec::with_capacity(window.len());
        for message in window.messages() {
            let time = message.timestamp.format("%Y-%m-%d %H:%M:%S");
            let entry = self.to_chat_message(message);
            debug_lines.push(format!("{time} | {}", describe(&entry)));
            context.push(entry);

            let Some(summarizer) = self.summarizer.as_ref().filter(|_| summarize_attachments)
            else {
                continue;
            };
            if let Some(summary) = summarizer.summarize(message).await? {
                debug_lines.push(format!("{time} | {}", describe(&summary)));
                context.push(summary);
            }
        }

        debug!(
            trigger_id = %trigger.id,
            entries = context.len(),
            "assembled context:\n{}",
            debug_lines.join("\n")
        );
        Ok(context)
    }

    fn to_chat_message(&self, message: &Message) -> ChatMessage {
        if message.is_authored_by(self.identity.user_id) {
            ChatMessage::assistant(message.content.clone())
        } else {
            ChatMessage::user(message.author.name.clone(), message.content.clone())
        }
    }
}

/// A new context made of `base` followed by `extra`. `base` is left untouched.
pub fn augment(
    base: &[ChatMessage],
    extra: impl IntoIterator<Item = ChatMessage>,
) -> Vec<ChatMessage> {
    base.iter().cloned().chain(extra).collect()
}

fn system_prompt(identity: &BotIdentity, starting_prompt: &str) -> String {
    format!("You are user ID {}. {starting_prompt}", identity.user_id)
        .trim_end()
        .to_string()
}

fn describe(entry: &ChatMessage) -> String {
    match (&entry.role, &entry.name) {
        (ChatRole::User, Some(name)) => format!("user ({name}): {}", entry.text()),
        (role, _) => format!("{}: {}", role.as_str(), entry.text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        BOT_ID, MockPlatform, MockProvider, at, bot_author, message, text_response, user,
    };
    use chrono::Utc;
    use parley_common::Attachment;

    fn settings(limit: usize) -> Arc<AgentSettings> {
        Arc::new(AgentSettings {
            model: "gpt-4o".into(),
            starting_prompt: "Be brief.".into(),
            vision_model: Some("gpt-4o".into()),
            vision_max_tokens: 300,
            image_model: None,
            history_limit: limit,
            history_lookback: Duration::hours(1),
        })
    }

    fn identity() -> BotIdentity {
        BotIdentity {
            user_id: BOT_ID,
            name: "parley".into(),
        }
    }

    #[test]
    fn window_excludes_messages_outside_bounds() {
        let trigger = message(10, user(1, "alice"), "now", at(30));
        let history = vec![
            // exactly one hour before: excluded
            message(1, user(2, "bob"), "too old", at(30) - Duration::hours(1)),
            message(2, user(2, "bob"), "in range", at(0)),
            // same instant as the trigger: excluded
            message(3, user(2, "bob"), "same time", at(30)),
            message(4, user(2, "bob"), "after", at(31)),
        ];

        let window =
            ConversationWindow::from_history(&trigger, history, Duration::hours(1), 10).unwrap();
        let ids: Vec<u64> = window.messages().iter().map(|m| m.id.get()).collect();
        assert_eq!(ids, vec![2, 10]);
        assert_eq!(window.trigger().id.get(), 10);
    }

    #[test]
    fn window_keeps_most_recent_in_ascending_order() {
        let trigger = message(100, user(1, "alice"), "now", at(59));
        // deliberately out of order
        let history = (1..=15)
            .rev()
            .map(|i| message(i, user(2, "bob"), "msg", at(i as u32)))
            .collect();

        let window =
            ConversationWindow::from_history(&trigger, history, Duration::hours(1), 10).unwrap();
        let ids: Vec<u64> = window.messages().iter().map(|m| m.id.get()).collect();
        assert_eq!(ids, vec![6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 100]);
    }

    #[test]
    fn window_with_no_history_is_just_the_trigger() {
        let trigger = message(1, user(1, "alice"), "hi", Utc::now());
        let window =
            ConversationWindow::from_history(&trigger, vec![], Duration::hours(1), 10).unwrap();
        assert_eq!(window.len(), 1);
        assert!(!window.is_empty());
    }

    #[test]
    fn window_rejects_lookback_before_representable_time() {
        let trigger = message(1, user(1, "alice"), "hi", at(0));
        let err = ConversationWindow::from_history(
            &trigger,
            vec![],
            Duration::days(365 * 300_000),
            10,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn assemble_with_overflowing_lookback_errors() {
        let platform = Arc::new(MockPlatform::with_history(vec![]));
        let mut settings = (*settings(10)).clone();
        settings.history_lookback = Duration::days(365 * 300_000);
        let assembler = ContextAssembler::new(platform, identity(), Arc::new(settings), None);

        let trigger = message(1, user(1, "alice"), "hi", at(0));
        let err = assembler.assemble(&trigger, false).await.unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[tokio::test]
    async fn assemble_maps_roles_and_names() {
        let platform = Arc::new(MockPlatform::with_history(vec![
            message(1, user(2, "bob"), "hey bot", at(0)),
            message(2, bot_author(), "hey bob", at(1)),
        ]));
        let assembler = ContextAssembler::new(platform, identity(), settings(10), None);

        let trigger = message(3, user(1, "alice"), "what's up", at(2));
        let context = assembler.assemble(&trigger, false).await.unwrap();

        assert_eq!(context.len(), 4);
        assert_eq!(context[0], ChatMessage::system("You are user ID 999. Be brief."));
        assert_eq!(context[1], ChatMessage::user("bob", "hey bot"));
        assert_eq!(context[2], ChatMessage::assistant("hey bob"));
        assert_eq!(context[3], ChatMessage::user("alice", "what's up"));
    }

    #[tokio::test]
    async fn empty_starting_prompt_leaves_no_trailing_space() {
        let platform = Arc::new(MockPlatform::default());
        let mut agent_settings = (*settings(10)).clone();
        agent_settings.starting_prompt = String::new();
        let assembler =
            ContextAssembler::new(platform, identity(), Arc::new(agent_settings), None);

        let trigger = message(1, user(1, "alice"), "hi", at(0));
        let context = assembler.assemble(&trigger, false).await.unwrap();
        assert_eq!(context[0].text(), "You are user ID 999.");
    }

    #[tokio::test]
    async fn summaries_follow_their_source_message() {
        let image = Attachment {
            filename: "cat.png".into(),
            content_type: Some("image/png".into()),
            url: Some("https://media.example/cat.png".into()),
        };
        let platform = Arc::new(MockPlatform::with_history(vec![
            message(1, user(2, "bob"), "look", at(0)).with_attachment(image),
            message(2, user(2, "bob"), "cute right", at(1)),
        ]));
        let provider = Arc::new(MockProvider::with_responses(vec![text_response("A cat.")]));
        let summarizer = AttachmentSummarizer::new(provider.clone(), "gpt-4o", 300);
        let assembler =
            ContextAssembler::new(platform, identity(), settings(10), Some(summarizer));

        let trigger = message(3, user(1, "alice"), "lol", at(2));
        let context = assembler.assemble(&trigger, true).await.unwrap();

        assert_eq!(context.len(), 5);
        assert_eq!(context[1].text(), "look");
        assert_eq!(context[2], ChatMessage::system("bob uploaded 1 image(s):\nA cat."));
        assert_eq!(context[3].text(), "cute right");
        assert_eq!(context[4].text(), "lol");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn summaries_skipped_when_disabled() {
        let image = Attachment {
            filename: "cat.png".into(),
            content_type: Some("image/png".into()),
            url: Some("https://media.example/cat.png".into()),
        };
        let platform = Arc::new(MockPlatform::default());
        let provider = Arc::new(MockProvider::new());
        let summarizer = AttachmentSummarizer::new(provider.clone(), "gpt-4o", 300);
        let assembler =
            ContextAssembler::new(platform, identity(), settings(10), Some(summarizer));

        let trigger = message(1, user(1, "alice"), "look", at(0)).with_attachment(image);
        let context = assembler.assemble(&trigger, false).await.unwrap();
        assert_eq!(context.len(), 2);
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn augment_leaves_base_untouched() {
        let base = vec![ChatMessage::system("prompt"), ChatMessage::user("a", "hi")];
        let extended = augment(&base, [ChatMessage::system("extra")]);

        assert_eq!(base.len(), 2);
        assert_eq!(extended.len(), 3);
        assert_eq!(extended[2].text(), "extra");
        assert_eq!(&extended[..2], &base[..]);
    }
}
