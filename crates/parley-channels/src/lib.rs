pub mod traits;

#[cfg(feature = "discord")]
pub mod discord;

pub use traits::{
    ChatPlatform, CustomEmoji, InboundHandler, OutgoingFile, OutgoingMessage, Reaction,
    ReactionEvent,
};
