pub mod image;
pub mod reaction;

pub use image::{GeneratedImage, ImageOrchestrator};
pub use reaction::{ReactionOrchestrator, resolve_emoji};
