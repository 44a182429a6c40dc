pub mod error;
pub mod message;
pub mod types;

pub use error::{Error, Result};
pub use message::{Attachment, Author, ChannelKind, Message};
pub use types::{BotIdentity, ChannelId, GuildId, MessageId, UserId};
