use crate::settings::BehaviorSettings;

/// How a user rated one of the bot's messages by reacting to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Positive,
    Negative,
}

/// Classify a reaction emoji (Unicode, or a custom emoji's name).
pub fn classify(emoji: &str, settings: &BehaviorSettings) -> Option<Feedback> {
    if settings.positive_emojis.iter().any(|e| e == emoji) {
        Some(Feedback::Positive)
    } else if settings.negative_emojis.iter().any(|e| e == emoji) {
        Some(Feedback::Negative)
    } else {
        None
    }
}
